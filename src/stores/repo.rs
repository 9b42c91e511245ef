use crate::auth::identity::Role;
use crate::pagination::ListParams;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

pub const SORTABLE: &[&str] = &["id", "name", "address", "created_at"];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Store {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub address: Option<String>,
    pub photo_key: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Owner summary embedded in store responses.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StoreOwner {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl Store {
    pub async fn find(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Store>> {
        let store = sqlx::query_as::<_, Store>(
            r#"
            SELECT id, user_id, name, description, address, photo_key, created_at, updated_at
            FROM stores
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(store)
    }

    pub async fn find_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Option<Store>> {
        let store = sqlx::query_as::<_, Store>(
            r#"
            SELECT id, user_id, name, description, address, photo_key, created_at, updated_at
            FROM stores
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(store)
    }

    pub async fn by_ids(db: &PgPool, ids: &[Uuid]) -> anyhow::Result<Vec<Store>> {
        let stores = sqlx::query_as::<_, Store>(
            r#"
            SELECT id, user_id, name, description, address, photo_key, created_at, updated_at
            FROM stores
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(db)
        .await?;
        Ok(stores)
    }

    pub async fn create(
        db: &PgPool,
        user_id: Uuid,
        name: &str,
        description: Option<&str>,
        address: Option<&str>,
        photo_key: Option<&str>,
    ) -> anyhow::Result<Store> {
        let store = sqlx::query_as::<_, Store>(
            r#"
            INSERT INTO stores (user_id, name, description, address, photo_key)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, name, description, address, photo_key, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(name)
        .bind(description)
        .bind(address)
        .bind(photo_key)
        .fetch_one(db)
        .await?;
        Ok(store)
    }

    /// Partial update; `None` keeps the stored value.
    pub async fn update(
        db: &PgPool,
        id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
        address: Option<&str>,
        photo_key: Option<&str>,
    ) -> anyhow::Result<Store> {
        let store = sqlx::query_as::<_, Store>(
            r#"
            UPDATE stores
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                address = COALESCE($4, address),
                photo_key = COALESCE($5, photo_key),
                updated_at = now()
            WHERE id = $1
            RETURNING id, user_id, name, description, address, photo_key, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .bind(address)
        .bind(photo_key)
        .fetch_one(db)
        .await?;
        Ok(store)
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM stores WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn has_orders(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM orders WHERE store_id = $1)")
                .bind(id)
                .fetch_one(db)
                .await?;
        Ok(exists)
    }

    /// One page of stores plus the total row count for the same filter.
    pub async fn page(db: &PgPool, params: &ListParams) -> anyhow::Result<(Vec<Store>, i64)> {
        let pattern = params.search_pattern();

        let (total,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM stores
            WHERE ($1::text IS NULL OR name ILIKE $1 OR address ILIKE $1 OR description ILIKE $1)
            "#,
        )
        .bind(pattern.as_deref())
        .fetch_one(db)
        .await?;

        let sql = format!(
            r#"
            SELECT id, user_id, name, description, address, photo_key, created_at, updated_at
            FROM stores
            WHERE ($1::text IS NULL OR name ILIKE $1 OR address ILIKE $1 OR description ILIKE $1)
            ORDER BY {} {}
            LIMIT $2 OFFSET $3
            "#,
            params.sort_column(SORTABLE),
            params.sort_direction(),
        );
        let stores = sqlx::query_as::<_, Store>(&sql)
            .bind(pattern.as_deref())
            .bind(params.limit())
            .bind(params.offset())
            .fetch_all(db)
            .await?;

        Ok((stores, total))
    }
}

pub async fn owners(db: &PgPool, user_ids: &[Uuid]) -> anyhow::Result<Vec<StoreOwner>> {
    let rows = sqlx::query_as::<_, StoreOwner>(
        r#"
        SELECT id, name, email, role
        FROM users
        WHERE id = ANY($1)
        "#,
    )
    .bind(user_ids)
    .fetch_all(db)
    .await?;
    Ok(rows)
}
