//! Voucher Code Repository

use super::{RepoError, RepoResult};
use shared::models::VoucherCode;
use sqlx::{SqliteExecutor, SqlitePool};

const COLUMNS: &str = "id, code, voucher_id, used, is_active, created_at";

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<VoucherCode>> {
    let row =
        sqlx::query_as::<_, VoucherCode>(&format!("SELECT {COLUMNS} FROM voucher_code WHERE id = ?"))
            .bind(id)
            .fetch_optional(pool)
            .await?;
    Ok(row)
}

pub async fn find_by_code(pool: &SqlitePool, code: &str) -> RepoResult<Option<VoucherCode>> {
    let row = sqlx::query_as::<_, VoucherCode>(&format!(
        "SELECT {COLUMNS} FROM voucher_code WHERE code = ?"
    ))
    .bind(code)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// First (oldest) active code of a voucher
pub async fn find_first_active(
    pool: &SqlitePool,
    voucher_id: i64,
) -> RepoResult<Option<VoucherCode>> {
    let row = sqlx::query_as::<_, VoucherCode>(&format!(
        "SELECT {COLUMNS} FROM voucher_code WHERE voucher_id = ? AND is_active = 1 ORDER BY id LIMIT 1"
    ))
    .bind(voucher_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn create(pool: &SqlitePool, voucher_id: i64, code: &str) -> RepoResult<VoucherCode> {
    if code.trim().is_empty() {
        return Err(RepoError::Validation("voucher code must not be empty".into()));
    }

    let now = shared::util::now_millis();
    let row = sqlx::query_as::<_, VoucherCode>(&format!(
        "INSERT INTO voucher_code (code, voucher_id, used, is_active, created_at) VALUES (?1, ?2, 0, 1, ?3) RETURNING {COLUMNS}"
    ))
    .bind(code)
    .bind(voucher_id)
    .bind(now)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// `used = used + 1`, evaluated in the database
pub async fn increment_used<'e, E>(executor: E, id: i64) -> RepoResult<VoucherCode>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query_as::<_, VoucherCode>(&format!(
        "UPDATE voucher_code SET used = used + 1 WHERE id = ? RETURNING {COLUMNS}"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;
    row.ok_or_else(|| RepoError::NotFound(format!("Voucher code {id} not found")))
}

/// `used = used - 1`, floored at zero
pub async fn decrement_used<'e, E>(executor: E, id: i64) -> RepoResult<VoucherCode>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query_as::<_, VoucherCode>(&format!(
        "UPDATE voucher_code SET used = MAX(used - 1, 0) WHERE id = ? RETURNING {COLUMNS}"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;
    row.ok_or_else(|| RepoError::NotFound(format!("Voucher code {id} not found")))
}

pub async fn set_active<'e, E>(executor: E, id: i64, is_active: bool) -> RepoResult<VoucherCode>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query_as::<_, VoucherCode>(&format!(
        "UPDATE voucher_code SET is_active = ? WHERE id = ? RETURNING {COLUMNS}"
    ))
    .bind(is_active)
    .bind(id)
    .fetch_optional(executor)
    .await?;
    row.ok_or_else(|| RepoError::NotFound(format!("Voucher code {id} not found")))
}
