use crate::carts::repo::CartLine;
use crate::config::AppConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct AddItemRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "The quantity must be at least 1"))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateItemRequest {
    #[validate(range(min = 1, message = "The quantity must be at least 1"))]
    pub quantity: i32,
}

#[derive(Debug, Serialize)]
pub struct CartItemChanged {
    pub cart_item_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Serialize)]
pub struct CartStoreInfo {
    pub id: Uuid,
    pub name: String,
    pub photo_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CartProductInfo {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub photo_url: Option<String>,
    pub stock: i32,
}

#[derive(Debug, Serialize)]
pub struct CartItemResponse {
    pub id: Uuid,
    pub product: CartProductInfo,
    pub quantity: i32,
    pub subtotal: Decimal,
}

impl CartItemResponse {
    /// Subtotals come from the live product price, not a stored value.
    pub fn from_line(line: CartLine, config: &AppConfig) -> Self {
        let subtotal = line.product_price * Decimal::from(line.quantity);
        Self {
            id: line.id,
            product: CartProductInfo {
                id: line.product_id,
                name: line.product_name,
                price: line.product_price,
                photo_url: line
                    .product_photo_key
                    .as_deref()
                    .map(|key| config.photo_url(key)),
                stock: line.product_stock,
            },
            quantity: line.quantity,
            subtotal,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub id: Uuid,
    pub store: CartStoreInfo,
    pub items: Vec<CartItemResponse>,
    pub total: Decimal,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JwtConfig;
    use rust_decimal_macros::dec;
    use time::OffsetDateTime;

    fn test_config() -> AppConfig {
        AppConfig {
            database_url: "postgres://localhost/pasar".into(),
            jwt: JwtConfig {
                secret: "s".into(),
                issuer: "pasar".into(),
                audience: "pasar-api".into(),
                ttl_minutes: 60,
                refresh_ttl_minutes: 120,
            },
            minio_endpoint: "http://localhost:9000".into(),
            minio_bucket: "pasar".into(),
            minio_access_key: "k".into(),
            minio_secret_key: "k".into(),
            minio_public_url: "http://localhost:9000".into(),
        }
    }

    #[test]
    fn subtotal_uses_live_price_and_serializes_as_string() {
        let line = CartLine {
            id: Uuid::new_v4(),
            cart_id: Uuid::new_v4(),
            quantity: 2,
            product_id: Uuid::new_v4(),
            product_name: "Kopi Susu".into(),
            product_price: dec!(20.00),
            product_stock: 5,
            product_photo_key: Some("products/p/1.jpg".into()),
        };
        let item = CartItemResponse::from_line(line, &test_config());
        assert_eq!(item.subtotal, dec!(40.00));

        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["subtotal"], "40.00");
        assert_eq!(json["product"]["price"], "20.00");
        assert_eq!(
            json["product"]["photo_url"],
            "http://localhost:9000/pasar/products/p/1.jpg"
        );
    }

    #[test]
    fn zero_quantity_fails_validation() {
        let req = AddItemRequest {
            product_id: Uuid::new_v4(),
            quantity: 0,
        };
        let errs = req.validate().unwrap_err();
        assert!(errs.field_errors().contains_key("quantity"));

        let req = UpdateItemRequest { quantity: 1 };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn cart_created_at_is_rfc3339() {
        let cart = CartResponse {
            id: Uuid::new_v4(),
            store: CartStoreInfo {
                id: Uuid::new_v4(),
                name: "Warung Kopi".into(),
                photo_url: None,
            },
            items: vec![],
            total: dec!(0),
            created_at: OffsetDateTime::UNIX_EPOCH,
        };
        let json = serde_json::to_value(&cart).unwrap();
        assert_eq!(json["created_at"], "1970-01-01T00:00:00Z");
    }
}
