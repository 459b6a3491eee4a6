//! Channel Repository

use super::{RepoError, RepoResult};
use shared::models::{Channel, ChannelCreate};
use sqlx::SqlitePool;

const COLUMNS: &str = "id, name, slug, currency_code, is_active, include_draft_order_in_voucher_usage, prices_entered_with_tax, created_at";

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Channel>> {
    let row = sqlx::query_as::<_, Channel>(&format!("SELECT {COLUMNS} FROM channel WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_by_slug(pool: &SqlitePool, slug: &str) -> RepoResult<Option<Channel>> {
    let row =
        sqlx::query_as::<_, Channel>(&format!("SELECT {COLUMNS} FROM channel WHERE slug = ?"))
            .bind(slug)
            .fetch_optional(pool)
            .await?;
    Ok(row)
}

pub async fn create(pool: &SqlitePool, data: ChannelCreate) -> RepoResult<Channel> {
    if find_by_slug(pool, &data.slug).await?.is_some() {
        return Err(RepoError::Duplicate(format!(
            "Channel '{}' already exists",
            data.slug
        )));
    }

    let now = shared::util::now_millis();
    let row = sqlx::query_as::<_, Channel>(&format!(
        "INSERT INTO channel (name, slug, currency_code, is_active, include_draft_order_in_voucher_usage, prices_entered_with_tax, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) RETURNING {COLUMNS}"
    ))
    .bind(&data.name)
    .bind(&data.slug)
    .bind(&data.currency_code)
    .bind(data.is_active.unwrap_or(true))
    .bind(data.include_draft_order_in_voucher_usage.unwrap_or(false))
    .bind(data.prices_entered_with_tax.unwrap_or(true))
    .bind(now)
    .fetch_one(pool)
    .await?;
    Ok(row)
}
