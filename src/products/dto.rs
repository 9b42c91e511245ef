use crate::config::AppConfig;
use crate::products::repo::{Product, StoreSummary};
use rust_decimal::Decimal;
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub id: Uuid,
    pub store_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    pub category: Option<String>,
    pub photo_url: Option<String>,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<StoreSummary>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl ProductResponse {
    pub fn from_parts(
        product: Product,
        store: Option<StoreSummary>,
        config: &AppConfig,
    ) -> Self {
        let photo_url = product.photo_key.as_deref().map(|key| config.photo_url(key));
        Self {
            id: product.id,
            store_id: product.store_id,
            name: product.name,
            description: product.description,
            price: product.price,
            stock: product.stock,
            category: product.category,
            photo_url,
            is_active: product.is_active,
            store,
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

fn non_negative(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_negative() {
        let mut err = ValidationError::new("min");
        err.message = Some("The price must be at least 0".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Validate)]
pub struct CreateProductInput {
    #[validate(length(min = 1, max = 100, message = "The name must be between 1 and 100 characters"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(custom = "non_negative")]
    pub price: Decimal,
    #[validate(range(min = 0, message = "The stock must be at least 0"))]
    pub stock: i32,
    #[validate(length(max = 50, message = "The category may not be greater than 50 characters"))]
    pub category: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Default, Validate)]
pub struct UpdateProductInput {
    #[validate(length(min = 1, max = 100, message = "The name must be between 1 and 100 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(custom = "non_negative")]
    pub price: Option<Decimal>,
    #[validate(range(min = 0, message = "The stock must be at least 0"))]
    pub stock: Option<i32>,
    #[validate(length(max = 50, message = "The category may not be greater than 50 characters"))]
    pub category: Option<String>,
    pub is_active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn negative_price_is_rejected() {
        let input = CreateProductInput {
            name: "Keyboard".into(),
            description: None,
            price: dec!(-1.50),
            stock: 3,
            category: None,
            is_active: true,
        };
        let errs = input.validate().unwrap_err();
        assert!(errs.field_errors().contains_key("price"));
    }

    #[test]
    fn zero_price_and_stock_are_valid() {
        let input = CreateProductInput {
            name: "Sample".into(),
            description: None,
            price: dec!(0.00),
            stock: 0,
            category: Some("misc".into()),
            is_active: true,
        };
        assert!(input.validate().is_ok());
    }

    #[test]
    fn update_rejects_negative_stock() {
        let input = UpdateProductInput {
            stock: Some(-2),
            ..Default::default()
        };
        let errs = input.validate().unwrap_err();
        assert!(errs.field_errors().contains_key("stock"));
    }
}
