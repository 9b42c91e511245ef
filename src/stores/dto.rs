use crate::config::AppConfig;
use crate::stores::repo::{Store, StoreOwner};
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize)]
pub struct StoreResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub address: Option<String>,
    pub photo_url: Option<String>,
    pub owner: Option<StoreOwner>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl StoreResponse {
    pub fn from_parts(store: Store, owner: Option<StoreOwner>, config: &AppConfig) -> Self {
        Self {
            id: store.id,
            name: store.name,
            description: store.description,
            address: store.address,
            photo_url: store.photo_key.map(|k| config.photo_url(&k)),
            owner,
            created_at: store.created_at,
            updated_at: store.updated_at,
        }
    }
}

#[derive(Debug, Validate)]
pub struct CreateStoreInput {
    #[validate(length(min = 1, max = 100, message = "The name may not be longer than 100 characters"))]
    pub name: String,
    pub description: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Default, Validate)]
pub struct UpdateStoreInput {
    #[validate(length(min = 1, max = 100, message = "The name may not be longer than 100 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_requires_reasonable_name() {
        let input = CreateStoreInput {
            name: "Toko Sejahtera".into(),
            description: None,
            address: None,
        };
        assert!(input.validate().is_ok());

        let input = CreateStoreInput {
            name: "x".repeat(101),
            description: None,
            address: None,
        };
        assert!(input.validate().is_err());
    }
}
