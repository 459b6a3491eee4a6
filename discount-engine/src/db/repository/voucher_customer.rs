//! Voucher Customer Repository (once-per-customer bookkeeping)

use super::RepoResult;
use sqlx::{SqliteExecutor, SqlitePool};

/// Record that `customer_email` redeemed the code.
///
/// Returns `false` when the pair was already recorded.
pub async fn insert_if_absent<'e, E>(
    executor: E,
    voucher_code_id: i64,
    customer_email: &str,
) -> RepoResult<bool>
where
    E: SqliteExecutor<'e>,
{
    // INSERT OR IGNORE: only inserts if (voucher_code_id, customer_email) pair doesn't exist
    let rows = sqlx::query(
        "INSERT OR IGNORE INTO voucher_customer (voucher_code_id, customer_email) VALUES (?1, ?2)",
    )
    .bind(voucher_code_id)
    .bind(customer_email)
    .execute(executor)
    .await?;
    Ok(rows.rows_affected() > 0)
}

pub async fn delete<'e, E>(executor: E, voucher_code_id: i64, customer_email: &str) -> RepoResult<bool>
where
    E: SqliteExecutor<'e>,
{
    let rows = sqlx::query(
        "DELETE FROM voucher_customer WHERE voucher_code_id = ?1 AND customer_email = ?2",
    )
    .bind(voucher_code_id)
    .bind(customer_email)
    .execute(executor)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// Did the customer already redeem any code of the voucher
pub async fn exists_for_voucher(
    pool: &SqlitePool,
    voucher_id: i64,
    customer_email: &str,
) -> RepoResult<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM voucher_customer vcu JOIN voucher_code vc ON vc.id = vcu.voucher_code_id WHERE vc.voucher_id = ?1 AND vcu.customer_email = ?2)",
    )
    .bind(voucher_id)
    .bind(customer_email)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

pub async fn count_for_code(pool: &SqlitePool, voucher_code_id: i64) -> RepoResult<i64> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM voucher_customer WHERE voucher_code_id = ?")
            .bind(voucher_code_id)
            .fetch_one(pool)
            .await?;
    Ok(count)
}
