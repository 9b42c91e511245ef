use crate::auth::identity::Identity;
use crate::carts::repo as carts;
use crate::error::{ApiError, ApiResult};
use crate::notifications::repo::{
    self as notifications, NewNotification, NotificationType, RelatedType,
};
use crate::orders::repo::{self, LockedProduct, Order, PickedItem};
use crate::orders::status::OrderStatus;
use crate::state::AppState;
use crate::stores::repo::Store;
use anyhow::Context;
use rust_decimal::Decimal;
use sqlx::{Postgres, Transaction};
use std::collections::{BTreeSet, HashMap};
use tracing::info;
use uuid::Uuid;

/// Remaining units below which the seller gets a low stock alert.
const LOW_STOCK_THRESHOLD: i32 = 5;

#[derive(Debug)]
struct OrderLine {
    product_id: Uuid,
    name: String,
    price: Decimal,
    quantity: i32,
}

/// Validates every picked line against the locked product state and prices
/// the order. The first violation aborts the whole checkout.
fn build_order_lines(
    picked: &[PickedItem],
    products: &HashMap<Uuid, LockedProduct>,
) -> Result<(Vec<OrderLine>, Decimal), ApiError> {
    let mut lines = Vec::with_capacity(picked.len());
    let mut total = Decimal::ZERO;
    for item in picked {
        let product = products
            .get(&item.product_id)
            .ok_or_else(|| ApiError::not_found("Product not found"))?;
        if !product.is_active {
            return Err(ApiError::business(format!(
                "{} is not available",
                product.name
            )));
        }
        if product.stock < item.quantity {
            return Err(ApiError::business(format!(
                "Insufficient stock for {}",
                product.name
            )));
        }
        total += product.price * Decimal::from(item.quantity);
        lines.push(OrderLine {
            product_id: product.id,
            name: product.name.clone(),
            price: product.price,
            quantity: item.quantity,
        });
    }
    Ok((lines, total))
}

/// The shared checkout algorithm. Runs entirely inside the caller's
/// transaction: locks the products, snapshots them into order items,
/// decrements stock, consumes the cart lines and writes the notification
/// ledger. Any error rolls the whole thing back.
async fn place_order(
    tx: &mut Transaction<'_, Postgres>,
    buyer: Identity,
    store: &Store,
    picked: Vec<PickedItem>,
) -> ApiResult<Order> {
    let product_ids: Vec<Uuid> = picked
        .iter()
        .map(|i| i.product_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let products: HashMap<Uuid, LockedProduct> = repo::lock_products_tx(tx, &product_ids)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let (lines, total) = build_order_lines(&picked, &products)?;
    let order = repo::insert_order_tx(tx, buyer.user_id, store.id, total).await?;

    for line in &lines {
        repo::insert_item_tx(tx, order.id, line.product_id, &line.name, line.price, line.quantity)
            .await?;
        // The lock already rules out a concurrent decrement, but the guard
        // keeps stock from ever going negative regardless.
        let remaining = repo::try_decrement_stock_tx(tx, line.product_id, line.quantity)
            .await?
            .ok_or_else(|| {
                ApiError::business(format!("Insufficient stock for {}", line.name))
            })?;
        if remaining < LOW_STOCK_THRESHOLD {
            notifications::insert_tx(
                tx,
                NewNotification {
                    user_id: store.user_id,
                    title: "Low stock".into(),
                    message: format!("{} has only {} left in stock", line.name, remaining),
                    kind: NotificationType::LowStock,
                    related_id: Some(line.product_id),
                    related_type: Some(RelatedType::Product),
                },
            )
            .await?;
        }
    }

    let item_ids: Vec<Uuid> = picked.iter().map(|i| i.id).collect();
    repo::delete_items_tx(tx, &item_ids).await?;
    let mut cart_ids: Vec<Uuid> = picked.iter().map(|i| i.cart_id).collect();
    cart_ids.sort_unstable();
    cart_ids.dedup();
    for cart_id in cart_ids {
        carts::prune_cart_tx(tx, cart_id).await?;
    }

    notifications::insert_tx(
        tx,
        NewNotification {
            user_id: buyer.user_id,
            title: "Order placed".into(),
            message: format!("Your order at {} has been placed", store.name),
            kind: NotificationType::OrderCreated,
            related_id: Some(order.id),
            related_type: Some(RelatedType::Order),
        },
    )
    .await?;
    notifications::insert_tx(
        tx,
        NewNotification {
            user_id: store.user_id,
            title: "New order".into(),
            message: format!("You have a new order worth {}", order.total_price),
            kind: NotificationType::NewOrder,
            related_id: Some(order.id),
            related_type: Some(RelatedType::Order),
        },
    )
    .await?;

    Ok(order)
}

pub async fn full_checkout(state: &AppState, who: Identity, cart_id: Uuid) -> ApiResult<Order> {
    let cart = carts::Cart::find_for_user(&state.db, cart_id, who.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Cart not found"))?;
    let store = Store::find(&state.db, cart.store_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Store not found"))?;

    let mut tx = state.db.begin().await.context("begin checkout")?;
    let picked = repo::items_of_cart_tx(&mut tx, cart.id).await?;
    if picked.is_empty() {
        return Err(ApiError::business("Cart is empty"));
    }
    let order = place_order(&mut tx, who, &store, picked).await?;
    tx.commit().await.context("commit checkout")?;

    info!(order_id = %order.id, user_id = %who.user_id, total = %order.total_price, "checkout completed");
    Ok(order)
}

pub async fn partial_checkout(
    state: &AppState,
    who: Identity,
    item_ids: &[Uuid],
) -> ApiResult<Order> {
    let mut tx = state.db.begin().await.context("begin partial checkout")?;
    let picked = repo::items_by_ids_tx(&mut tx, item_ids, who.user_id).await?;
    if picked.is_empty() {
        return Err(ApiError::not_found("Cart items not found"));
    }
    let store_ids: BTreeSet<Uuid> = picked.iter().map(|i| i.store_id).collect();
    if store_ids.len() > 1 {
        return Err(ApiError::business("All items must belong to the same store"));
    }

    let store = Store::find(&state.db, picked[0].store_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Store not found"))?;
    let order = place_order(&mut tx, who, &store, picked).await?;
    tx.commit().await.context("commit partial checkout")?;

    info!(order_id = %order.id, user_id = %who.user_id, total = %order.total_price, "partial checkout completed");
    Ok(order)
}

/// Cancels the caller's own pending order and puts the stock back.
pub async fn cancel(state: &AppState, who: Identity, order_id: Uuid) -> ApiResult<()> {
    let order = Order::find_for_user(&state.db, order_id, who.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order not found"))?;
    if order.status != OrderStatus::Pending {
        return Err(ApiError::business("Order can no longer be cancelled"));
    }

    let mut tx = state.db.begin().await.context("begin cancel")?;
    let changed =
        repo::set_status_if_tx(&mut tx, order.id, OrderStatus::Pending, OrderStatus::Cancelled)
            .await?;
    if !changed {
        return Err(ApiError::business("Order can no longer be cancelled"));
    }
    restore_order_stock(&mut tx, order.id).await?;
    tx.commit().await.context("commit cancel")?;

    info!(order_id = %order.id, "order cancelled");
    Ok(())
}

/// Merchant-side status advance on an order of their store.
pub async fn update_status(
    state: &AppState,
    who: Identity,
    order_id: Uuid,
    next: OrderStatus,
) -> ApiResult<Order> {
    let store = Store::find_by_user(&state.db, who.user_id)
        .await?
        .ok_or_else(|| ApiError::forbidden("You do not have a store"))?;
    let order = Order::find_for_store(&state.db, order_id, store.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order not found"))?;
    if !order.status.can_transition(next) {
        return Err(ApiError::business(format!(
            "Order status cannot change from {} to {}",
            order.status, next
        )));
    }

    let mut tx = state.db.begin().await.context("begin status update")?;
    let changed = repo::set_status_if_tx(&mut tx, order.id, order.status, next).await?;
    if !changed {
        return Err(ApiError::business(
            "Order status has changed, please try again",
        ));
    }
    if next == OrderStatus::Cancelled {
        restore_order_stock(&mut tx, order.id).await?;
    }
    match next {
        OrderStatus::Paid => {
            notifications::insert_tx(
                &mut tx,
                NewNotification {
                    user_id: order.user_id,
                    title: "Order confirmed".into(),
                    message: format!("Your order at {} has been confirmed", store.name),
                    kind: NotificationType::OrderConfirmed,
                    related_id: Some(order.id),
                    related_type: Some(RelatedType::Order),
                },
            )
            .await?;
        }
        OrderStatus::Completed => {
            notifications::insert_tx(
                &mut tx,
                NewNotification {
                    user_id: order.user_id,
                    title: "Order completed".into(),
                    message: format!("Your order at {} has been completed", store.name),
                    kind: NotificationType::OrderDone,
                    related_id: Some(order.id),
                    related_type: Some(RelatedType::Order),
                },
            )
            .await?;
        }
        _ => {}
    }
    tx.commit().await.context("commit status update")?;

    info!(order_id = %order.id, status = %next, "order status updated");
    Ok(Order {
        status: next,
        ..order
    })
}

async fn restore_order_stock(
    tx: &mut Transaction<'_, Postgres>,
    order_id: Uuid,
) -> anyhow::Result<()> {
    let items = repo::items_for_order_tx(tx, order_id).await?;
    for item in items {
        // the product may have been deleted since purchase
        if let Some(product_id) = item.product_id {
            repo::restore_stock_tx(tx, product_id, item.quantity).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn picked(product_id: Uuid, quantity: i32) -> PickedItem {
        PickedItem {
            id: Uuid::new_v4(),
            cart_id: Uuid::new_v4(),
            store_id: Uuid::new_v4(),
            product_id,
            quantity,
        }
    }

    fn product(id: Uuid, price: Decimal, stock: i32, is_active: bool) -> LockedProduct {
        LockedProduct {
            id,
            name: "Kopi Susu".into(),
            price,
            stock,
            is_active,
        }
    }

    #[test]
    fn prices_the_order_from_locked_state() {
        let id = Uuid::new_v4();
        let products = HashMap::from([(id, product(id, dec!(20.00), 5, true))]);
        let (lines, total) = build_order_lines(&[picked(id, 2)], &products).unwrap();

        assert_eq!(total, dec!(40.00));
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].price, dec!(20.00));
        assert_eq!(lines[0].quantity, 2);
        assert_eq!(lines[0].product_id, id);
    }

    #[test]
    fn totals_span_multiple_lines() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let products = HashMap::from([
            (a, product(a, dec!(20.00), 5, true)),
            (b, product(b, dec!(7.50), 3, true)),
        ]);
        let (_, total) = build_order_lines(&[picked(a, 2), picked(b, 3)], &products).unwrap();
        assert_eq!(total, dec!(62.50));
    }

    #[test]
    fn insufficient_stock_names_the_product() {
        let id = Uuid::new_v4();
        let products = HashMap::from([(id, product(id, dec!(10.00), 1, true))]);
        let err = build_order_lines(&[picked(id, 2)], &products).unwrap_err();
        match err {
            ApiError::BusinessRule(msg) => {
                assert_eq!(msg, "Insufficient stock for Kopi Susu")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn inactive_product_aborts_checkout() {
        let id = Uuid::new_v4();
        let products = HashMap::from([(id, product(id, dec!(10.00), 10, false))]);
        let err = build_order_lines(&[picked(id, 1)], &products).unwrap_err();
        match err {
            ApiError::BusinessRule(msg) => assert_eq!(msg, "Kopi Susu is not available"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_product_is_not_found() {
        let err = build_order_lines(&[picked(Uuid::new_v4(), 1)], &HashMap::new()).unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn first_violation_wins_and_nothing_is_priced() {
        let ok_id = Uuid::new_v4();
        let bad_id = Uuid::new_v4();
        let products = HashMap::from([
            (ok_id, product(ok_id, dec!(5.00), 10, true)),
            (bad_id, product(bad_id, dec!(5.00), 0, true)),
        ]);
        let err =
            build_order_lines(&[picked(bad_id, 1), picked(ok_id, 1)], &products).unwrap_err();
        assert!(matches!(err, ApiError::BusinessRule(_)));
    }
}
