use anyhow::Context;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum NotificationType {
    OrderCreated,
    OrderConfirmed,
    OrderDone,
    NewOrder,
    LowStock,
    ProductDeleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum RelatedType {
    Order,
    Product,
    System,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: Option<String>,
    pub message: Option<String>,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub related_id: Option<Uuid>,
    pub related_type: Option<RelatedType>,
    pub is_read: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

pub struct NewNotification {
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub kind: NotificationType,
    pub related_id: Option<Uuid>,
    pub related_type: Option<RelatedType>,
}

/// Append an entry inside the surrounding business transaction.
pub async fn insert_tx(
    tx: &mut Transaction<'_, Postgres>,
    entry: NewNotification,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO notifications (user_id, title, message, type, related_id, related_type)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(entry.user_id)
    .bind(&entry.title)
    .bind(&entry.message)
    .bind(entry.kind)
    .bind(entry.related_id)
    .bind(entry.related_type)
    .execute(&mut **tx)
    .await
    .context("insert notification")?;
    Ok(())
}

pub async fn list_for_user(
    db: &PgPool,
    user_id: Uuid,
    unread_only: bool,
) -> anyhow::Result<Vec<Notification>> {
    let rows = sqlx::query_as::<_, Notification>(
        r#"
        SELECT id, user_id, title, message, type, related_id, related_type,
               is_read, created_at, updated_at
        FROM notifications
        WHERE user_id = $1 AND (NOT $2 OR is_read = FALSE)
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .bind(unread_only)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// Flips the read flag; `None` when the entry is absent or owned by someone else.
pub async fn mark_read(
    db: &PgPool,
    id: Uuid,
    user_id: Uuid,
) -> anyhow::Result<Option<Notification>> {
    let row = sqlx::query_as::<_, Notification>(
        r#"
        UPDATE notifications
        SET is_read = TRUE, updated_at = now()
        WHERE id = $1 AND user_id = $2
        RETURNING id, user_id, title, message, type, related_id, related_type,
                  is_read, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}
