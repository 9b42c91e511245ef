use crate::orders::status::OrderStatus;
use anyhow::Context;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub store_id: Uuid,
    pub status: OrderStatus,
    pub total_price: Decimal,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Immutable line snapshot. `product_id` goes NULL if the product is later
/// deleted; the name and price stay as they were at purchase time.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Option<Uuid>,
    pub product_name: String,
    pub price_at_purchase: Decimal,
    pub quantity: i32,
    pub subtotal: Decimal,
    pub created_at: OffsetDateTime,
}

impl Order {
    pub async fn find_for_user(
        db: &PgPool,
        order_id: Uuid,
        user_id: Uuid,
    ) -> anyhow::Result<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, user_id, store_id, status, total_price, created_at, updated_at
            FROM orders
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(order_id)
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(order)
    }

    pub async fn find_for_store(
        db: &PgPool,
        order_id: Uuid,
        store_id: Uuid,
    ) -> anyhow::Result<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, user_id, store_id, status, total_price, created_at, updated_at
            FROM orders
            WHERE id = $1 AND store_id = $2
            "#,
        )
        .bind(order_id)
        .bind(store_id)
        .fetch_optional(db)
        .await?;
        Ok(order)
    }

    pub async fn list_for_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, user_id, store_id, status, total_price, created_at, updated_at
            FROM orders
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await?;
        Ok(orders)
    }

    pub async fn list_for_store(db: &PgPool, store_id: Uuid) -> anyhow::Result<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, user_id, store_id, status, total_price, created_at, updated_at
            FROM orders
            WHERE store_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(store_id)
        .fetch_all(db)
        .await?;
        Ok(orders)
    }
}

pub async fn items_for_orders(db: &PgPool, order_ids: &[Uuid]) -> anyhow::Result<Vec<OrderItem>> {
    let items = sqlx::query_as::<_, OrderItem>(
        r#"
        SELECT id, order_id, product_id, product_name, price_at_purchase,
               quantity, subtotal, created_at
        FROM order_items
        WHERE order_id = ANY($1)
        ORDER BY created_at
        "#,
    )
    .bind(order_ids)
    .fetch_all(db)
    .await?;
    Ok(items)
}

pub async fn items_for_order_tx(
    tx: &mut Transaction<'_, Postgres>,
    order_id: Uuid,
) -> anyhow::Result<Vec<OrderItem>> {
    let items = sqlx::query_as::<_, OrderItem>(
        r#"
        SELECT id, order_id, product_id, product_name, price_at_purchase,
               quantity, subtotal, created_at
        FROM order_items
        WHERE order_id = $1
        "#,
    )
    .bind(order_id)
    .fetch_all(&mut **tx)
    .await
    .context("order items")?;
    Ok(items)
}

/// Line counts per order, for the merchant listing.
pub async fn item_counts(db: &PgPool, order_ids: &[Uuid]) -> anyhow::Result<Vec<(Uuid, i64)>> {
    let counts: Vec<(Uuid, i64)> = sqlx::query_as(
        r#"
        SELECT order_id, COUNT(*)
        FROM order_items
        WHERE order_id = ANY($1)
        GROUP BY order_id
        "#,
    )
    .bind(order_ids)
    .fetch_all(db)
    .await?;
    Ok(counts)
}

/// Buyer summary for the merchant listing.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Buyer {
    pub id: Uuid,
    pub name: String,
    pub phone: Option<String>,
}

pub async fn buyers(db: &PgPool, user_ids: &[Uuid]) -> anyhow::Result<Vec<Buyer>> {
    let rows = sqlx::query_as::<_, Buyer>(
        r#"
        SELECT u.id, u.name, p.phone
        FROM users u
        LEFT JOIN user_profiles p ON p.user_id = u.id
        WHERE u.id = ANY($1)
        "#,
    )
    .bind(user_ids)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// Cart line picked for checkout, with the cart it came from.
#[derive(Debug, Clone, FromRow)]
pub struct PickedItem {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub store_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
}

pub async fn items_of_cart_tx(
    tx: &mut Transaction<'_, Postgres>,
    cart_id: Uuid,
) -> anyhow::Result<Vec<PickedItem>> {
    let items = sqlx::query_as::<_, PickedItem>(
        r#"
        SELECT ci.id, ci.cart_id, c.store_id, ci.product_id, ci.quantity
        FROM cart_items ci
        JOIN carts c ON c.id = ci.cart_id
        WHERE ci.cart_id = $1
        "#,
    )
    .bind(cart_id)
    .fetch_all(&mut **tx)
    .await
    .context("cart items for checkout")?;
    Ok(items)
}

pub async fn items_by_ids_tx(
    tx: &mut Transaction<'_, Postgres>,
    item_ids: &[Uuid],
    user_id: Uuid,
) -> anyhow::Result<Vec<PickedItem>> {
    let items = sqlx::query_as::<_, PickedItem>(
        r#"
        SELECT ci.id, ci.cart_id, c.store_id, ci.product_id, ci.quantity
        FROM cart_items ci
        JOIN carts c ON c.id = ci.cart_id
        WHERE ci.id = ANY($1) AND c.user_id = $2
        "#,
    )
    .bind(item_ids)
    .bind(user_id)
    .fetch_all(&mut **tx)
    .await
    .context("selected cart items")?;
    Ok(items)
}

/// Product state read under a row lock during checkout.
#[derive(Debug, Clone, FromRow)]
pub struct LockedProduct {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub stock: i32,
    pub is_active: bool,
}

/// Locks the product rows in id order so concurrent checkouts cannot deadlock,
/// and returns their current state.
pub async fn lock_products_tx(
    tx: &mut Transaction<'_, Postgres>,
    product_ids: &[Uuid],
) -> anyhow::Result<Vec<LockedProduct>> {
    let products = sqlx::query_as::<_, LockedProduct>(
        r#"
        SELECT id, name, price, stock, is_active
        FROM products
        WHERE id = ANY($1)
        ORDER BY id
        FOR UPDATE
        "#,
    )
    .bind(product_ids)
    .fetch_all(&mut **tx)
    .await
    .context("lock products")?;
    Ok(products)
}

pub async fn insert_order_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    store_id: Uuid,
    total_price: Decimal,
) -> anyhow::Result<Order> {
    let order = sqlx::query_as::<_, Order>(
        r#"
        INSERT INTO orders (user_id, store_id, status, total_price)
        VALUES ($1, $2, 'pending', $3)
        RETURNING id, user_id, store_id, status, total_price, created_at, updated_at
        "#,
    )
    .bind(user_id)
    .bind(store_id)
    .bind(total_price)
    .fetch_one(&mut **tx)
    .await
    .context("insert order")?;
    Ok(order)
}

pub async fn insert_item_tx(
    tx: &mut Transaction<'_, Postgres>,
    order_id: Uuid,
    product_id: Uuid,
    product_name: &str,
    price_at_purchase: Decimal,
    quantity: i32,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO order_items (order_id, product_id, product_name, price_at_purchase, quantity)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(order_id)
    .bind(product_id)
    .bind(product_name)
    .bind(price_at_purchase)
    .bind(quantity)
    .execute(&mut **tx)
    .await
    .context("insert order item")?;
    Ok(())
}

/// Conditional decrement; returns the remaining stock, or `None` when the
/// guard failed and no row was touched.
pub async fn try_decrement_stock_tx(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
    quantity: i32,
) -> anyhow::Result<Option<i32>> {
    let remaining: Option<(i32,)> = sqlx::query_as(
        r#"
        UPDATE products
        SET stock = stock - $2, updated_at = now()
        WHERE id = $1 AND stock >= $2
        RETURNING stock
        "#,
    )
    .bind(product_id)
    .bind(quantity)
    .fetch_optional(&mut **tx)
    .await
    .context("decrement stock")?;
    Ok(remaining.map(|(stock,)| stock))
}

pub async fn restore_stock_tx(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
    quantity: i32,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        UPDATE products
        SET stock = stock + $2, updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(product_id)
    .bind(quantity)
    .execute(&mut **tx)
    .await
    .context("restore stock")?;
    Ok(())
}

pub async fn delete_items_tx(
    tx: &mut Transaction<'_, Postgres>,
    item_ids: &[Uuid],
) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM cart_items WHERE id = ANY($1)")
        .bind(item_ids)
        .execute(&mut **tx)
        .await
        .context("delete consumed cart items")?;
    Ok(())
}

/// Moves the order from one status to another; false when another writer got
/// there first.
pub async fn set_status_if_tx(
    tx: &mut Transaction<'_, Postgres>,
    order_id: Uuid,
    from: OrderStatus,
    to: OrderStatus,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE orders
        SET status = $3, updated_at = now()
        WHERE id = $1 AND status = $2
        "#,
    )
    .bind(order_id)
    .bind(from)
    .bind(to)
    .execute(&mut **tx)
    .await
    .context("set order status")?;
    Ok(result.rows_affected() == 1)
}
