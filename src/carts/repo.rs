use anyhow::Context;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Cart {
    pub id: Uuid,
    pub user_id: Uuid,
    pub store_id: Uuid,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Cart line joined with the live state of its product.
#[derive(Debug, Clone, FromRow)]
pub struct CartLine {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub quantity: i32,
    pub product_id: Uuid,
    pub product_name: String,
    pub product_price: Decimal,
    pub product_stock: i32,
    pub product_photo_key: Option<String>,
}

impl Cart {
    pub async fn find_for_user(
        db: &PgPool,
        cart_id: Uuid,
        user_id: Uuid,
    ) -> anyhow::Result<Option<Cart>> {
        let cart = sqlx::query_as::<_, Cart>(
            r#"
            SELECT id, user_id, store_id, created_at, updated_at
            FROM carts
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(cart_id)
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(cart)
    }

    pub async fn list_for_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Cart>> {
        let carts = sqlx::query_as::<_, Cart>(
            r#"
            SELECT id, user_id, store_id, created_at, updated_at
            FROM carts
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await?;
        Ok(carts)
    }
}

pub async fn lines_for_carts(db: &PgPool, cart_ids: &[Uuid]) -> anyhow::Result<Vec<CartLine>> {
    let lines = sqlx::query_as::<_, CartLine>(
        r#"
        SELECT ci.id, ci.cart_id, ci.quantity,
               p.id AS product_id, p.name AS product_name, p.price AS product_price,
               p.stock AS product_stock, p.photo_key AS product_photo_key
        FROM cart_items ci
        JOIN products p ON p.id = ci.product_id
        WHERE ci.cart_id = ANY($1)
        ORDER BY ci.created_at
        "#,
    )
    .bind(cart_ids)
    .fetch_all(db)
    .await?;
    Ok(lines)
}

/// A cart item the caller owns, with the stock it is checked against.
#[derive(Debug, Clone, FromRow)]
pub struct OwnedItem {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub product_stock: i32,
}

pub async fn find_item_for_user(
    db: &PgPool,
    item_id: Uuid,
    user_id: Uuid,
) -> anyhow::Result<Option<OwnedItem>> {
    let item = sqlx::query_as::<_, OwnedItem>(
        r#"
        SELECT ci.id, ci.cart_id, ci.product_id, ci.quantity, p.stock AS product_stock
        FROM cart_items ci
        JOIN carts c ON c.id = ci.cart_id
        JOIN products p ON p.id = ci.product_id
        WHERE ci.id = $1 AND c.user_id = $2
        "#,
    )
    .bind(item_id)
    .bind(user_id)
    .fetch_optional(db)
    .await?;
    Ok(item)
}

pub async fn set_item_quantity(db: &PgPool, item_id: Uuid, quantity: i32) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        UPDATE cart_items
        SET quantity = $2, updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(item_id)
    .bind(quantity)
    .execute(db)
    .await?;
    Ok(())
}

/// Product fields the add-item flow checks, read inside its transaction.
#[derive(Debug, Clone, FromRow)]
pub struct CartProduct {
    pub id: Uuid,
    pub store_id: Uuid,
    pub stock: i32,
    pub is_active: bool,
}

pub async fn product_for_cart_tx(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
) -> anyhow::Result<Option<CartProduct>> {
    let product = sqlx::query_as::<_, CartProduct>(
        r#"
        SELECT id, store_id, stock, is_active
        FROM products
        WHERE id = $1
        "#,
    )
    .bind(product_id)
    .fetch_optional(&mut **tx)
    .await
    .context("read product for cart")?;
    Ok(product)
}

/// Finds or creates the caller's cart for a store, keyed by (user_id, store_id).
pub async fn upsert_cart_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    store_id: Uuid,
) -> anyhow::Result<Uuid> {
    let (cart_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO carts (user_id, store_id)
        VALUES ($1, $2)
        ON CONFLICT (user_id, store_id) DO UPDATE SET updated_at = now()
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(store_id)
    .fetch_one(&mut **tx)
    .await
    .context("upsert cart")?;
    Ok(cart_id)
}

/// Adds the quantity onto an existing line, or inserts a new one.
/// Returns the line id and the accumulated quantity.
pub async fn accumulate_item_tx(
    tx: &mut Transaction<'_, Postgres>,
    cart_id: Uuid,
    product_id: Uuid,
    quantity: i32,
) -> anyhow::Result<(Uuid, i32)> {
    let row: (Uuid, i32) = sqlx::query_as(
        r#"
        INSERT INTO cart_items (cart_id, product_id, quantity)
        VALUES ($1, $2, $3)
        ON CONFLICT (cart_id, product_id)
        DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity, updated_at = now()
        RETURNING id, quantity
        "#,
    )
    .bind(cart_id)
    .bind(product_id)
    .bind(quantity)
    .fetch_one(&mut **tx)
    .await
    .context("accumulate cart item")?;
    Ok(row)
}

pub async fn delete_item_tx(tx: &mut Transaction<'_, Postgres>, item_id: Uuid) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM cart_items WHERE id = $1")
        .bind(item_id)
        .execute(&mut **tx)
        .await
        .context("delete cart item")?;
    Ok(())
}

/// Drops the cart if it has no items left.
pub async fn prune_cart_tx(tx: &mut Transaction<'_, Postgres>, cart_id: Uuid) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        DELETE FROM carts c
        WHERE c.id = $1
          AND NOT EXISTS (SELECT 1 FROM cart_items ci WHERE ci.cart_id = c.id)
        "#,
    )
    .bind(cart_id)
    .execute(&mut **tx)
    .await
    .context("prune cart")?;
    Ok(())
}

pub async fn clear_cart_tx(tx: &mut Transaction<'_, Postgres>, cart_id: Uuid) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
        .bind(cart_id)
        .execute(&mut **tx)
        .await
        .context("clear cart items")?;
    sqlx::query("DELETE FROM carts WHERE id = $1")
        .bind(cart_id)
        .execute(&mut **tx)
        .await
        .context("delete cart")?;
    Ok(())
}
