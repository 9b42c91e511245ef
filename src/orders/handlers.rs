use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::auth::identity::Role;
use crate::auth::jwt::AuthUser;
use crate::error::{done, ok, ApiError, ApiResult};
use crate::orders::dto::{
    CheckoutRequest, CheckoutResponse, OrderItemResponse, OrderResponse, OrderStoreInfo,
    PartialCheckoutRequest, StatusResponse, StoreOrderResponse, UpdateStatusRequest,
};
use crate::orders::repo::{self, Buyer, Order};
use crate::orders::service;
use crate::orders::status::OrderStatus;
use crate::state::AppState;
use crate::stores::repo::Store;

#[instrument(skip(state))]
pub async fn checkout(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Json(req): Json<CheckoutRequest>,
) -> ApiResult<impl IntoResponse> {
    let order = service::full_checkout(&state, who, req.cart_id).await?;
    Ok(ok(CheckoutResponse::from(order), "Checkout successful"))
}

#[instrument(skip(state))]
pub async fn partial_checkout(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Json(req): Json<PartialCheckoutRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;
    let order = service::partial_checkout(&state, who, &req.cart_item_ids).await?;
    Ok(ok(CheckoutResponse::from(order), "Checkout successful"))
}

#[instrument(skip(state))]
pub async fn my_orders(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
) -> ApiResult<impl IntoResponse> {
    let orders = Order::list_for_user(&state.db, who.user_id).await?;
    let data = order_views(&state, orders).await?;
    Ok(ok(data, "Orders retrieved"))
}

#[instrument(skip(state))]
pub async fn get_order(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let order = Order::find_for_user(&state.db, id, who.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order not found"))?;
    let mut views = order_views(&state, vec![order]).await?;
    let view = views
        .pop()
        .ok_or_else(|| ApiError::not_found("Order not found"))?;
    Ok(ok(view, "Order retrieved"))
}

#[instrument(skip(state))]
pub async fn cancel_order(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    service::cancel(&state, who, id).await?;
    Ok(done("Order cancelled"))
}

#[instrument(skip(state))]
pub async fn store_orders(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
) -> ApiResult<impl IntoResponse> {
    who.require_role(&[Role::Merchant])?;
    let store = Store::find_by_user(&state.db, who.user_id)
        .await?
        .ok_or_else(|| ApiError::forbidden("You do not have a store"))?;

    let orders = Order::list_for_store(&state.db, store.id).await?;
    let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let buyer_ids: Vec<Uuid> = orders.iter().map(|o| o.user_id).collect();

    let counts: HashMap<Uuid, i64> = repo::item_counts(&state.db, &order_ids)
        .await?
        .into_iter()
        .collect();
    let buyers: HashMap<Uuid, Buyer> = repo::buyers(&state.db, &buyer_ids)
        .await?
        .into_iter()
        .map(|b| (b.id, b))
        .collect();

    let data: Vec<StoreOrderResponse> = orders
        .into_iter()
        .map(|o| StoreOrderResponse {
            id: o.id,
            user: buyers.get(&o.user_id).cloned(),
            items_count: counts.get(&o.id).copied().unwrap_or(0),
            total_price: o.total_price,
            status: o.status,
            created_at: o.created_at,
        })
        .collect();
    Ok(ok(data, "Orders retrieved"))
}

#[instrument(skip(state))]
pub async fn update_status(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> ApiResult<impl IntoResponse> {
    who.require_role(&[Role::Merchant])?;
    let next = req
        .status
        .parse::<OrderStatus>()
        .ok()
        .filter(|s| *s != OrderStatus::Pending)
        .ok_or_else(|| ApiError::field("status", "The selected status is invalid"))?;

    let order = service::update_status(&state, who, id, next).await?;
    Ok(ok(
        StatusResponse {
            order_id: order.id,
            status: order.status,
        },
        "Order status updated",
    ))
}

/// Builds buyer-side order views with store and line item embeds batched.
async fn order_views(state: &AppState, orders: Vec<Order>) -> ApiResult<Vec<OrderResponse>> {
    let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let store_ids: Vec<Uuid> = orders.iter().map(|o| o.store_id).collect();

    let stores: HashMap<Uuid, Store> = Store::by_ids(&state.db, &store_ids)
        .await?
        .into_iter()
        .map(|s| (s.id, s))
        .collect();
    let mut items_by_order: HashMap<Uuid, Vec<OrderItemResponse>> = HashMap::new();
    for item in repo::items_for_orders(&state.db, &order_ids).await? {
        items_by_order
            .entry(item.order_id)
            .or_default()
            .push(OrderItemResponse::from(item));
    }

    let views = orders
        .into_iter()
        .map(|order| {
            let store = stores
                .get(&order.store_id)
                .map(|s| OrderStoreInfo::from_store(s, &state.config));
            let items = items_by_order.remove(&order.id).unwrap_or_default();
            OrderResponse::from_parts(order, store, items)
        })
        .collect();
    Ok(views)
}
