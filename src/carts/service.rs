use crate::auth::identity::Identity;
use crate::carts::repo::{self, Cart};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use anyhow::Context;
use tracing::info;
use uuid::Uuid;

pub struct AddedItem {
    pub cart_item_id: Uuid,
    pub quantity: i32,
}

/// Adds a product to the caller's cart for that product's store.
///
/// Quantities accumulate onto an existing line. The accumulated amount is
/// checked against stock after the upsert, inside the same transaction, so
/// two overlapping adds cannot slip past the stock ceiling together.
pub async fn add_item(
    state: &AppState,
    who: Identity,
    product_id: Uuid,
    quantity: i32,
) -> ApiResult<AddedItem> {
    let mut tx = state.db.begin().await.context("begin add item")?;

    let product = repo::product_for_cart_tx(&mut tx, product_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product not found"))?;
    if !product.is_active {
        return Err(ApiError::business("Product is not available"));
    }
    if product.stock < quantity {
        return Err(ApiError::business("Insufficient stock"));
    }

    let cart_id = repo::upsert_cart_tx(&mut tx, who.user_id, product.store_id).await?;
    let (item_id, accumulated) =
        repo::accumulate_item_tx(&mut tx, cart_id, product_id, quantity).await?;
    if accumulated > product.stock {
        tx.rollback().await.context("rollback add item")?;
        return Err(ApiError::business("Insufficient stock"));
    }

    tx.commit().await.context("commit add item")?;
    info!(cart_item_id = %item_id, quantity = accumulated, "cart item added");
    Ok(AddedItem {
        cart_item_id: item_id,
        quantity: accumulated,
    })
}

pub async fn remove_item(state: &AppState, who: Identity, item_id: Uuid) -> ApiResult<()> {
    let item = repo::find_item_for_user(&state.db, item_id, who.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Cart item not found"))?;

    let mut tx = state.db.begin().await.context("begin remove item")?;
    repo::delete_item_tx(&mut tx, item.id).await?;
    repo::prune_cart_tx(&mut tx, item.cart_id).await?;
    tx.commit().await.context("commit remove item")?;

    info!(cart_item_id = %item_id, "cart item removed");
    Ok(())
}

pub async fn clear_cart(state: &AppState, who: Identity, cart_id: Uuid) -> ApiResult<()> {
    let cart = Cart::find_for_user(&state.db, cart_id, who.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Cart not found"))?;

    let mut tx = state.db.begin().await.context("begin clear cart")?;
    repo::clear_cart_tx(&mut tx, cart.id).await?;
    tx.commit().await.context("commit clear cart")?;

    info!(cart_id = %cart_id, "cart cleared");
    Ok(())
}
