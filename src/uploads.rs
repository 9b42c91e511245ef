use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use anyhow::Context;
use axum::extract::Multipart;
use bytes::Bytes;
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;

pub const MAX_PHOTO_BYTES: usize = 2 * 1024 * 1024;

pub struct UploadedPhoto {
    pub body: Bytes,
    pub content_type: String,
}

/// Text fields plus the optional `photo` file collected from a multipart form.
pub struct PhotoForm {
    pub fields: HashMap<String, String>,
    pub photo: Option<UploadedPhoto>,
}

impl PhotoForm {
    pub async fn read(mut mp: Multipart) -> ApiResult<Self> {
        let mut fields = HashMap::new();
        let mut photo = None;
        while let Some(field) = mp.next_field().await? {
            let Some(name) = field.name().map(|s| s.to_string()) else {
                continue;
            };
            if name == "photo" {
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".into());
                let body = field.bytes().await?;
                // an empty file part means "no photo"
                if body.is_empty() {
                    continue;
                }
                photo = Some(check_photo(UploadedPhoto { body, content_type })?);
            } else {
                fields.insert(name, field.text().await?);
            }
        }
        Ok(Self { fields, photo })
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn require(&self, name: &'static str) -> ApiResult<&str> {
        self.text(name)
            .ok_or_else(|| ApiError::field(name, format!("The {name} field is required")))
    }

    pub fn parse<T: FromStr>(&self, name: &'static str) -> ApiResult<Option<T>> {
        match self.text(name) {
            None => Ok(None),
            Some(raw) => raw.parse::<T>().map(Some).map_err(|_| {
                ApiError::field(name, format!("The {name} field must be a valid number"))
            }),
        }
    }

    pub fn parse_bool(&self, name: &'static str) -> ApiResult<Option<bool>> {
        match self.text(name) {
            None => Ok(None),
            Some("true") | Some("1") => Ok(Some(true)),
            Some("false") | Some("0") => Ok(Some(false)),
            Some(_) => Err(ApiError::field(
                name,
                format!("The {name} field must be true or false"),
            )),
        }
    }
}

fn check_photo(photo: UploadedPhoto) -> ApiResult<UploadedPhoto> {
    if ext_from_mime(&photo.content_type).is_none() {
        return Err(ApiError::field(
            "photo",
            "The photo must be a jpeg, jpg or png image",
        ));
    }
    if photo.body.len() > MAX_PHOTO_BYTES {
        return Err(ApiError::field(
            "photo",
            "The photo may not be larger than 2 MB",
        ));
    }
    Ok(photo)
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        _ => None,
    }
}

/// Uploads the photo under `prefix/owner/` and returns the object key.
pub async fn save_photo(
    st: &AppState,
    prefix: &str,
    owner: Uuid,
    photo: &UploadedPhoto,
) -> ApiResult<String> {
    let ext = ext_from_mime(&photo.content_type).unwrap_or("jpg");
    let key = format!("{}/{}/{}.{}", prefix, owner, Uuid::new_v4(), ext);
    st.storage
        .put_object(&key, photo.body.clone(), &photo.content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;
    Ok(key)
}

/// Best-effort delete; a missing object is not worth failing the request over.
pub async fn remove_photo(st: &AppState, key: &str) {
    if let Err(e) = st.storage.delete_object(key).await {
        tracing::warn!(error = %e, key, "failed to delete photo object");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ext_from_mime() {
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/jpg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/png"), Some("png"));
        assert_eq!(ext_from_mime("image/webp"), None);
        assert_eq!(ext_from_mime("application/octet-stream"), None);
    }

    #[test]
    fn rejects_oversized_and_foreign_photos() {
        let png = UploadedPhoto {
            body: Bytes::from(vec![0u8; 16]),
            content_type: "image/png".into(),
        };
        assert!(check_photo(png).is_ok());

        let huge = UploadedPhoto {
            body: Bytes::from(vec![0u8; MAX_PHOTO_BYTES + 1]),
            content_type: "image/png".into(),
        };
        assert!(check_photo(huge).is_err());

        let gif = UploadedPhoto {
            body: Bytes::from(vec![0u8; 16]),
            content_type: "image/gif".into(),
        };
        assert!(check_photo(gif).is_err());
    }

    #[test]
    fn form_getters_trim_and_parse() {
        let mut fields = HashMap::new();
        fields.insert("name".to_string(), "  Kopi Susu  ".to_string());
        fields.insert("stock".to_string(), "12".to_string());
        fields.insert("is_active".to_string(), "1".to_string());
        fields.insert("blank".to_string(), "   ".to_string());
        let form = PhotoForm {
            fields,
            photo: None,
        };

        assert_eq!(form.text("name"), Some("Kopi Susu"));
        assert_eq!(form.text("blank"), None);
        assert!(form.require("missing").is_err());
        assert_eq!(form.parse::<i32>("stock").unwrap(), Some(12));
        assert_eq!(form.parse_bool("is_active").unwrap(), Some(true));
        assert!(form.parse::<i32>("name").is_err());
    }
}
