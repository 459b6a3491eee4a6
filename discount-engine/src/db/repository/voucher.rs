//! Voucher Repository
//!
//! Vouchers, their per-channel listings and catalogue restrictions.

use super::{RepoError, RepoResult};
use shared::models::{
    CatalogueTargetType, Voucher, VoucherCatalogue, VoucherChannelListing,
    VoucherChannelListingCreate, VoucherCreate,
};
use sqlx::SqlitePool;

const COLUMNS: &str = "id, name, voucher_type, discount_value_type, usage_limit, single_use, apply_once_per_order, apply_once_per_customer, only_for_staff, min_checkout_items_quantity, start_date, end_date, created_at";

const LISTING_COLUMNS: &str =
    "id, voucher_id, channel_id, discount_value, currency, min_spent_amount";

/// Voucher is usable in the channel at `now`: inside its date window, listed
/// in that (active) channel, and the usage limit not exhausted by its codes.
const ACTIVE_IN_CHANNEL: &str = "
    FROM voucher v
    JOIN voucher_channel_listing l ON l.voucher_id = v.id
    JOIN channel c ON c.id = l.channel_id
    WHERE c.slug = ?1 AND c.is_active = 1
      AND v.start_date <= ?2
      AND (v.end_date IS NULL OR v.end_date >= ?2)
      AND (v.usage_limit IS NULL
           OR v.usage_limit > (SELECT COALESCE(SUM(vc.used), 0) FROM voucher_code vc WHERE vc.voucher_id = v.id))";

// ── Voucher ──────────────────────────────────────────────────

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Voucher>> {
    let row = sqlx::query_as::<_, Voucher>(&format!("SELECT {COLUMNS} FROM voucher WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn create(pool: &SqlitePool, data: VoucherCreate) -> RepoResult<Voucher> {
    if let Some(limit) = data.usage_limit
        && limit < 0
    {
        return Err(RepoError::Validation(format!(
            "usage_limit must be non-negative, got {limit}"
        )));
    }
    if let Some(qty) = data.min_checkout_items_quantity
        && qty < 0
    {
        return Err(RepoError::Validation(format!(
            "min_checkout_items_quantity must be non-negative, got {qty}"
        )));
    }

    let now = shared::util::now_millis();
    let start_date = data.start_date.unwrap_or(now);
    if let Some(end) = data.end_date
        && end < start_date
    {
        return Err(RepoError::Validation(
            "end_date must not be before start_date".into(),
        ));
    }

    let row = sqlx::query_as::<_, Voucher>(&format!(
        "INSERT INTO voucher (name, voucher_type, discount_value_type, usage_limit, single_use, apply_once_per_order, apply_once_per_customer, only_for_staff, min_checkout_items_quantity, start_date, end_date, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12) RETURNING {COLUMNS}"
    ))
    .bind(&data.name)
    .bind(data.voucher_type)
    .bind(data.discount_value_type)
    .bind(data.usage_limit)
    .bind(data.single_use.unwrap_or(false))
    .bind(data.apply_once_per_order.unwrap_or(false))
    .bind(data.apply_once_per_customer.unwrap_or(false))
    .bind(data.only_for_staff.unwrap_or(false))
    .bind(data.min_checkout_items_quantity)
    .bind(start_date)
    .bind(data.end_date)
    .bind(now)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Is the voucher active in the channel at `now`
pub async fn is_active_in_channel(
    pool: &SqlitePool,
    voucher_id: i64,
    channel_slug: &str,
    now: i64,
) -> RepoResult<bool> {
    let sql = format!("SELECT EXISTS (SELECT 1 {ACTIVE_IN_CHANNEL} AND v.id = ?3)");
    let exists: bool = sqlx::query_scalar(&sql)
        .bind(channel_slug)
        .bind(now)
        .bind(voucher_id)
        .fetch_one(pool)
        .await?;
    Ok(exists)
}

/// Is there a voucher active in the channel that owns this active code
pub async fn exists_active_with_code(
    pool: &SqlitePool,
    code: &str,
    channel_slug: &str,
    now: i64,
) -> RepoResult<bool> {
    let sql = format!(
        "SELECT EXISTS (SELECT 1 {ACTIVE_IN_CHANNEL} AND EXISTS (SELECT 1 FROM voucher_code vc WHERE vc.voucher_id = v.id AND vc.code = ?3 AND vc.is_active = 1))"
    );
    let exists: bool = sqlx::query_scalar(&sql)
        .bind(channel_slug)
        .bind(now)
        .bind(code)
        .fetch_one(pool)
        .await?;
    Ok(exists)
}

// ── Channel listings ─────────────────────────────────────────

pub async fn find_channel_listings(
    pool: &SqlitePool,
    voucher_id: i64,
) -> RepoResult<Vec<VoucherChannelListing>> {
    let rows = sqlx::query_as::<_, VoucherChannelListing>(&format!(
        "SELECT {LISTING_COLUMNS} FROM voucher_channel_listing WHERE voucher_id = ? ORDER BY channel_id"
    ))
    .bind(voucher_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Create or replace the voucher terms for one channel
pub async fn upsert_channel_listing(
    pool: &SqlitePool,
    voucher_id: i64,
    data: VoucherChannelListingCreate,
) -> RepoResult<VoucherChannelListing> {
    if !data.discount_value.is_finite() || data.discount_value < 0.0 {
        return Err(RepoError::Validation(format!(
            "discount_value must be a non-negative number, got {}",
            data.discount_value
        )));
    }
    if let Some(min_spent) = data.min_spent_amount
        && (!min_spent.is_finite() || min_spent < 0.0)
    {
        return Err(RepoError::Validation(format!(
            "min_spent_amount must be a non-negative number, got {min_spent}"
        )));
    }

    let row = sqlx::query_as::<_, VoucherChannelListing>(&format!(
        "INSERT INTO voucher_channel_listing (voucher_id, channel_id, discount_value, currency, min_spent_amount) VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(voucher_id, channel_id) DO UPDATE SET discount_value = excluded.discount_value, currency = excluded.currency, min_spent_amount = excluded.min_spent_amount
         RETURNING {LISTING_COLUMNS}"
    ))
    .bind(voucher_id)
    .bind(data.channel_id)
    .bind(data.discount_value)
    .bind(&data.currency)
    .bind(data.min_spent_amount)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

// ── Catalogue restrictions ───────────────────────────────────

pub async fn add_catalogue_target(
    pool: &SqlitePool,
    voucher_id: i64,
    target_type: CatalogueTargetType,
    target_id: i64,
) -> RepoResult<()> {
    sqlx::query(
        "INSERT OR IGNORE INTO voucher_catalogue_target (voucher_id, target_type, target_id) VALUES (?1, ?2, ?3)",
    )
    .bind(voucher_id)
    .bind(target_type)
    .bind(target_id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn find_catalogue(pool: &SqlitePool, voucher_id: i64) -> RepoResult<VoucherCatalogue> {
    let rows = sqlx::query_as::<_, (CatalogueTargetType, i64)>(
        "SELECT target_type, target_id FROM voucher_catalogue_target WHERE voucher_id = ? ORDER BY target_id",
    )
    .bind(voucher_id)
    .fetch_all(pool)
    .await?;

    let mut catalogue = VoucherCatalogue::default();
    for (target_type, target_id) in rows {
        catalogue.push(target_type, target_id);
    }
    Ok(catalogue)
}
