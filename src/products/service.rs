use crate::notifications::repo::{self as notifications, NewNotification, NotificationType, RelatedType};
use crate::products::repo::{self as products, Product};
use crate::state::AppState;
use crate::uploads;
use anyhow::Context;
use std::collections::HashSet;
use tracing::info;

/// Deletes a product together with every cart line that still holds it.
///
/// Customers whose carts are touched get a `product_deleted` notification in
/// the same transaction, so the ledger entry and the removal are atomic.
/// Carts emptied by the cascade are dropped as well.
pub async fn delete_product(state: &AppState, product: Product) -> anyhow::Result<()> {
    let mut tx = state.db.begin().await.context("begin delete product")?;

    let holders = products::carts_holding_product_tx(&mut tx, product.id).await?;
    let cart_ids: Vec<_> = holders.iter().map(|(cart_id, _)| *cart_id).collect();
    let user_ids: HashSet<_> = holders.iter().map(|(_, user_id)| *user_id).collect();

    for user_id in &user_ids {
        notifications::insert_tx(
            &mut tx,
            NewNotification {
                user_id: *user_id,
                title: "Product removed".into(),
                message: format!(
                    "{} is no longer available and was removed from your cart",
                    product.name
                ),
                kind: NotificationType::ProductDeleted,
                related_id: Some(product.id),
                related_type: Some(RelatedType::Product),
            },
        )
        .await?;
    }

    products::delete_product_tx(&mut tx, product.id).await?;
    if !cart_ids.is_empty() {
        products::prune_empty_carts_tx(&mut tx, &cart_ids).await?;
    }

    tx.commit().await.context("commit delete product")?;

    info!(
        product_id = %product.id,
        notified = user_ids.len(),
        "product deleted"
    );

    if let Some(key) = product.photo_key.as_deref() {
        uploads::remove_photo(state, key).await;
    }
    Ok(())
}
