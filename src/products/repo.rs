use crate::pagination::ListParams;
use anyhow::Context;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

pub const SORTABLE: &[&str] = &["id", "name", "price", "stock", "category", "created_at"];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub store_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    pub category: Option<String>,
    pub photo_key: Option<String>,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Store summary embedded in product responses.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StoreSummary {
    pub id: Uuid,
    pub name: String,
}

pub struct NewProduct<'a> {
    pub store_id: Uuid,
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub price: Decimal,
    pub stock: i32,
    pub category: Option<&'a str>,
    pub photo_key: Option<&'a str>,
    pub is_active: bool,
}

/// Patch for an existing product; `None` keeps the stored value.
#[derive(Default)]
pub struct ProductChanges<'a> {
    pub name: Option<&'a str>,
    pub description: Option<&'a str>,
    pub price: Option<Decimal>,
    pub stock: Option<i32>,
    pub category: Option<&'a str>,
    pub photo_key: Option<&'a str>,
    pub is_active: Option<bool>,
}

impl Product {
    pub async fn find(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, store_id, name, description, price, stock, category,
                   photo_key, is_active, created_at, updated_at
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(product)
    }

    pub async fn create(db: &PgPool, new: NewProduct<'_>) -> anyhow::Result<Product> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (store_id, name, description, price, stock, category, photo_key, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, store_id, name, description, price, stock, category,
                      photo_key, is_active, created_at, updated_at
            "#,
        )
        .bind(new.store_id)
        .bind(new.name)
        .bind(new.description)
        .bind(new.price)
        .bind(new.stock)
        .bind(new.category)
        .bind(new.photo_key)
        .bind(new.is_active)
        .fetch_one(db)
        .await?;
        Ok(product)
    }

    pub async fn update(
        db: &PgPool,
        id: Uuid,
        changes: ProductChanges<'_>,
    ) -> anyhow::Result<Product> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                price = COALESCE($4, price),
                stock = COALESCE($5, stock),
                category = COALESCE($6, category),
                photo_key = COALESCE($7, photo_key),
                is_active = COALESCE($8, is_active),
                updated_at = now()
            WHERE id = $1
            RETURNING id, store_id, name, description, price, stock, category,
                      photo_key, is_active, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(changes.name)
        .bind(changes.description)
        .bind(changes.price)
        .bind(changes.stock)
        .bind(changes.category)
        .bind(changes.photo_key)
        .bind(changes.is_active)
        .fetch_one(db)
        .await?;
        Ok(product)
    }

    pub async fn list_by_store(db: &PgPool, store_id: Uuid) -> anyhow::Result<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, store_id, name, description, price, stock, category,
                   photo_key, is_active, created_at, updated_at
            FROM products
            WHERE store_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(store_id)
        .fetch_all(db)
        .await?;
        Ok(products)
    }

    /// One page of products plus the total row count for the same filter.
    pub async fn page(db: &PgPool, params: &ListParams) -> anyhow::Result<(Vec<Product>, i64)> {
        let pattern = params.search_pattern();

        let (total,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM products
            WHERE ($1::text IS NULL OR name ILIKE $1 OR description ILIKE $1 OR category ILIKE $1)
            "#,
        )
        .bind(pattern.as_deref())
        .fetch_one(db)
        .await?;

        let sql = format!(
            r#"
            SELECT id, store_id, name, description, price, stock, category,
                   photo_key, is_active, created_at, updated_at
            FROM products
            WHERE ($1::text IS NULL OR name ILIKE $1 OR description ILIKE $1 OR category ILIKE $1)
            ORDER BY {} {}
            LIMIT $2 OFFSET $3
            "#,
            params.sort_column(SORTABLE),
            params.sort_direction(),
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(pattern.as_deref())
            .bind(params.limit())
            .bind(params.offset())
            .fetch_all(db)
            .await?;

        Ok((products, total))
    }
}

pub async fn store_summaries(db: &PgPool, store_ids: &[Uuid]) -> anyhow::Result<Vec<StoreSummary>> {
    let rows = sqlx::query_as::<_, StoreSummary>(
        r#"
        SELECT id, name
        FROM stores
        WHERE id = ANY($1)
        "#,
    )
    .bind(store_ids)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// Carts currently holding the product, with their owners.
pub async fn carts_holding_product_tx(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
) -> anyhow::Result<Vec<(Uuid, Uuid)>> {
    let rows: Vec<(Uuid, Uuid)> = sqlx::query_as(
        r#"
        SELECT c.id, c.user_id
        FROM carts c
        JOIN cart_items ci ON ci.cart_id = c.id
        WHERE ci.product_id = $1
        "#,
    )
    .bind(product_id)
    .fetch_all(&mut **tx)
    .await
    .context("carts holding product")?;
    Ok(rows)
}

pub async fn delete_product_tx(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(product_id)
        .execute(&mut **tx)
        .await
        .context("delete product")?;
    Ok(())
}

/// Drops the listed carts if the delete left them without items.
pub async fn prune_empty_carts_tx(
    tx: &mut Transaction<'_, Postgres>,
    cart_ids: &[Uuid],
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        DELETE FROM carts c
        WHERE c.id = ANY($1)
          AND NOT EXISTS (SELECT 1 FROM cart_items ci WHERE ci.cart_id = c.id)
        "#,
    )
    .bind(cart_ids)
    .execute(&mut **tx)
    .await
    .context("prune empty carts")?;
    Ok(())
}
