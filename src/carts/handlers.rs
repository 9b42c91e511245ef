use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::auth::jwt::AuthUser;
use crate::carts::dto::{
    AddItemRequest, CartItemChanged, CartItemResponse, CartResponse, CartStoreInfo,
    UpdateItemRequest,
};
use crate::carts::repo::{self, Cart};
use crate::carts::service;
use crate::error::{done, ok, ApiError, ApiResult};
use crate::state::AppState;
use crate::stores::repo::Store;

#[instrument(skip(state))]
pub async fn list_carts(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
) -> ApiResult<impl IntoResponse> {
    let carts = Cart::list_for_user(&state.db, who.user_id).await?;

    let cart_ids: Vec<Uuid> = carts.iter().map(|c| c.id).collect();
    let store_ids: Vec<Uuid> = carts.iter().map(|c| c.store_id).collect();
    let lines = repo::lines_for_carts(&state.db, &cart_ids).await?;
    let stores: HashMap<Uuid, Store> = Store::by_ids(&state.db, &store_ids)
        .await?
        .into_iter()
        .map(|s| (s.id, s))
        .collect();

    let mut items_by_cart: HashMap<Uuid, Vec<CartItemResponse>> = HashMap::new();
    for line in lines {
        let cart_id = line.cart_id;
        items_by_cart
            .entry(cart_id)
            .or_default()
            .push(CartItemResponse::from_line(line, &state.config));
    }

    let data: Vec<CartResponse> = carts
        .into_iter()
        .filter_map(|cart| {
            let store = stores.get(&cart.store_id)?;
            let items = items_by_cart.remove(&cart.id).unwrap_or_default();
            let total = items.iter().map(|i| i.subtotal).sum();
            Some(CartResponse {
                id: cart.id,
                store: CartStoreInfo {
                    id: store.id,
                    name: store.name.clone(),
                    photo_url: store
                        .photo_key
                        .as_deref()
                        .map(|key| state.config.photo_url(key)),
                },
                items,
                total,
                created_at: cart.created_at,
            })
        })
        .collect();

    Ok(ok(data, "Carts retrieved"))
}

#[instrument(skip(state))]
pub async fn add_item(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Json(req): Json<AddItemRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;
    let added = service::add_item(&state, who, req.product_id, req.quantity).await?;
    Ok(ok(
        CartItemChanged {
            cart_item_id: added.cart_item_id,
            quantity: added.quantity,
        },
        "Product added to cart",
    ))
}

#[instrument(skip(state))]
pub async fn update_item(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Path(item_id): Path<Uuid>,
    Json(req): Json<UpdateItemRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;
    let item = repo::find_item_for_user(&state.db, item_id, who.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Cart item not found"))?;
    if item.product_stock < req.quantity {
        return Err(ApiError::business("Insufficient stock"));
    }

    repo::set_item_quantity(&state.db, item.id, req.quantity).await?;
    Ok(ok(
        CartItemChanged {
            cart_item_id: item.id,
            quantity: req.quantity,
        },
        "Quantity updated",
    ))
}

#[instrument(skip(state))]
pub async fn remove_item(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Path(item_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    service::remove_item(&state, who, item_id).await?;
    Ok(done("Item removed from cart"))
}

#[instrument(skip(state))]
pub async fn clear_cart(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Path(cart_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    service::clear_cart(&state, who, cart_id).await?;
    Ok(done("Cart cleared"))
}
