use crate::config::AppConfig;
use crate::orders::repo::{Buyer, Order, OrderItem};
use crate::orders::status::OrderStatus;
use crate::stores::repo::Store;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub cart_id: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PartialCheckoutRequest {
    #[validate(length(min = 1, message = "The cart_item_ids field is required"))]
    pub cart_item_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub order_id: Uuid,
    pub total_price: Decimal,
    pub status: OrderStatus,
}

impl From<Order> for CheckoutResponse {
    fn from(order: Order) -> Self {
        Self {
            order_id: order.id,
            total_price: order.total_price,
            status: order.status,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub order_id: Uuid,
    pub status: OrderStatus,
}

#[derive(Debug, Serialize)]
pub struct OrderStoreInfo {
    pub id: Uuid,
    pub name: String,
    pub photo_url: Option<String>,
    pub address: Option<String>,
}

impl OrderStoreInfo {
    pub fn from_store(store: &Store, config: &AppConfig) -> Self {
        Self {
            id: store.id,
            name: store.name.clone(),
            photo_url: store
                .photo_key
                .as_deref()
                .map(|key| config.photo_url(key)),
            address: store.address.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub product_id: Option<Uuid>,
    pub product_name: String,
    pub price: Decimal,
    pub quantity: i32,
    pub subtotal: Decimal,
}

impl From<OrderItem> for OrderItemResponse {
    fn from(item: OrderItem) -> Self {
        Self {
            id: item.id,
            product_id: item.product_id,
            product_name: item.product_name,
            price: item.price_at_purchase,
            quantity: item.quantity,
            subtotal: item.subtotal,
        }
    }
}

/// Buyer-side view of an order with its snapshot lines.
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: Uuid,
    pub store: Option<OrderStoreInfo>,
    pub items: Vec<OrderItemResponse>,
    pub total_price: Decimal,
    pub status: OrderStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl OrderResponse {
    pub fn from_parts(
        order: Order,
        store: Option<OrderStoreInfo>,
        items: Vec<OrderItemResponse>,
    ) -> Self {
        Self {
            id: order.id,
            store,
            items,
            total_price: order.total_price,
            status: order.status,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

/// Merchant-side row for the incoming orders listing.
#[derive(Debug, Serialize)]
pub struct StoreOrderResponse {
    pub id: Uuid,
    pub user: Option<Buyer>,
    pub items_count: i64,
    pub total_price: Decimal,
    pub status: OrderStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn checkout_response_serializes_money_as_string() {
        let order = Order {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            store_id: Uuid::new_v4(),
            status: OrderStatus::Pending,
            total_price: dec!(40.00),
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        };
        let json = serde_json::to_value(CheckoutResponse::from(order)).unwrap();
        assert_eq!(json["total_price"], "40.00");
        assert_eq!(json["status"], "pending");
    }

    #[test]
    fn order_item_keeps_the_purchase_snapshot() {
        let item = OrderItem {
            id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            product_id: None,
            product_name: "Kopi Susu".into(),
            price_at_purchase: dec!(20.00),
            quantity: 2,
            subtotal: dec!(40.00),
            created_at: OffsetDateTime::UNIX_EPOCH,
        };
        let json = serde_json::to_value(OrderItemResponse::from(item)).unwrap();
        assert_eq!(json["product_id"], serde_json::Value::Null);
        assert_eq!(json["product_name"], "Kopi Susu");
        assert_eq!(json["price"], "20.00");
        assert_eq!(json["subtotal"], "40.00");
    }

    #[test]
    fn empty_item_selection_fails_validation() {
        let req = PartialCheckoutRequest {
            cart_item_ids: vec![],
        };
        let errs = req.validate().unwrap_err();
        assert!(errs.field_errors().contains_key("cart_item_ids"));
    }
}
