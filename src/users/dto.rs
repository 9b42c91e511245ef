use crate::auth::identity::Role;
use crate::config::AppConfig;
use crate::users::repo::{User, UserProfile};
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub address: Option<String>,
    pub phone: Option<String>,
    pub photo_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub profile: Option<ProfileResponse>,
}

impl UserResponse {
    pub fn from_parts(user: User, profile: Option<UserProfile>, config: &AppConfig) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            created_at: user.created_at,
            updated_at: user.updated_at,
            profile: profile.map(|p| ProfileResponse {
                address: p.address,
                phone: p.phone,
                photo_url: p.photo_key.map(|k| config.photo_url(&k)),
            }),
        }
    }
}

/// Collected from the multipart update form; every field is optional.
#[derive(Debug, Default, Validate)]
pub struct UpdateUserInput {
    #[validate(length(min = 1, max = 100, message = "The name may not be longer than 100 characters"))]
    pub name: Option<String>,
    #[validate(email(message = "The email must be a valid email address"))]
    pub email: Option<String>,
    #[validate(length(min = 8, message = "The password must be at least 8 characters"))]
    pub password: Option<String>,
    #[validate(must_match(other = "password", message = "The password confirmation does not match"))]
    pub password_confirmation: Option<String>,
    pub role: Option<Role>,
    pub address: Option<String>,
    pub phone: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_update_is_valid() {
        assert!(UpdateUserInput::default().validate().is_ok());
    }

    #[test]
    fn password_change_requires_matching_confirmation() {
        let input = UpdateUserInput {
            password: Some("new-password-1".into()),
            password_confirmation: None,
            ..Default::default()
        };
        let errs = input.validate().unwrap_err();
        assert!(errs.field_errors().contains_key("password_confirmation"));

        let input = UpdateUserInput {
            password: Some("new-password-1".into()),
            password_confirmation: Some("new-password-1".into()),
            ..Default::default()
        };
        assert!(input.validate().is_ok());
    }
}
