//! Order Discount Repository (order-level discount objects)

use super::{RepoError, RepoResult};
use shared::models::{DiscountInfo, DiscountType, OrderDiscount};
use sqlx::{SqliteExecutor, SqlitePool};

const COLUMNS: &str = "id, order_id, discount_type, value_type, value, amount_value, currency, name, translated_name, reason, voucher_id, voucher_code, created_at";

pub async fn find_by_order(pool: &SqlitePool, order_id: i64) -> RepoResult<Vec<OrderDiscount>> {
    let rows = sqlx::query_as::<_, OrderDiscount>(&format!(
        "SELECT {COLUMNS} FROM order_discount WHERE order_id = ? ORDER BY id"
    ))
    .bind(order_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn find_by_type(
    pool: &SqlitePool,
    order_id: i64,
    discount_type: DiscountType,
) -> RepoResult<Vec<OrderDiscount>> {
    let rows = sqlx::query_as::<_, OrderDiscount>(&format!(
        "SELECT {COLUMNS} FROM order_discount WHERE order_id = ? AND discount_type = ? ORDER BY id"
    ))
    .bind(order_id)
    .bind(discount_type)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn exists_of_type(
    pool: &SqlitePool,
    order_id: i64,
    discount_type: DiscountType,
) -> RepoResult<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM order_discount WHERE order_id = ? AND discount_type = ?)",
    )
    .bind(order_id)
    .bind(discount_type)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

pub async fn create<'e, E>(executor: E, order_id: i64, data: &DiscountInfo) -> RepoResult<OrderDiscount>
where
    E: SqliteExecutor<'e>,
{
    let now = shared::util::now_millis();
    let row = sqlx::query_as::<_, OrderDiscount>(&format!(
        "INSERT INTO order_discount (order_id, discount_type, value_type, value, amount_value, currency, name, translated_name, reason, voucher_id, voucher_code, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12) RETURNING {COLUMNS}"
    ))
    .bind(order_id)
    .bind(data.discount_type)
    .bind(data.value_type)
    .bind(data.value)
    .bind(data.amount_value)
    .bind(&data.currency)
    .bind(&data.name)
    .bind(&data.translated_name)
    .bind(&data.reason)
    .bind(data.voucher_id)
    .bind(&data.voucher_code)
    .bind(now)
    .fetch_one(executor)
    .await?;
    Ok(row)
}

/// Write back every mutable column of the discount
pub async fn update<'e, E>(executor: E, discount: &OrderDiscount) -> RepoResult<()>
where
    E: SqliteExecutor<'e>,
{
    let rows = sqlx::query(
        "UPDATE order_discount SET value_type = ?1, value = ?2, amount_value = ?3, currency = ?4, name = ?5, translated_name = ?6, reason = ?7, voucher_id = ?8, voucher_code = ?9 WHERE id = ?10",
    )
    .bind(discount.value_type)
    .bind(discount.value)
    .bind(discount.amount_value)
    .bind(&discount.currency)
    .bind(&discount.name)
    .bind(&discount.translated_name)
    .bind(&discount.reason)
    .bind(discount.voucher_id)
    .bind(&discount.voucher_code)
    .bind(discount.id)
    .execute(executor)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!(
            "Order discount {} not found",
            discount.id
        )));
    }
    Ok(())
}

/// Only deletes when the discount belongs to `order_id`
pub async fn delete_by_id(pool: &SqlitePool, order_id: i64, id: i64) -> RepoResult<bool> {
    let rows = sqlx::query("DELETE FROM order_discount WHERE id = ? AND order_id = ?")
        .bind(id)
        .bind(order_id)
        .execute(pool)
        .await?;
    Ok(rows.rows_affected() > 0)
}

pub async fn delete_by_type(
    pool: &SqlitePool,
    order_id: i64,
    discount_type: DiscountType,
) -> RepoResult<u64> {
    let rows = sqlx::query("DELETE FROM order_discount WHERE order_id = ? AND discount_type = ?")
        .bind(order_id)
        .bind(discount_type)
        .execute(pool)
        .await?;
    Ok(rows.rows_affected())
}

/// Delete all order discounts except the one coming from a shipping voucher
pub async fn delete_except_shipping_voucher<'e, E>(executor: E, order_id: i64) -> RepoResult<u64>
where
    E: SqliteExecutor<'e>,
{
    let rows = sqlx::query(
        "DELETE FROM order_discount WHERE order_id = ?1 AND (voucher_id IS NULL OR voucher_id NOT IN (SELECT id FROM voucher WHERE voucher_type = 'SHIPPING'))",
    )
    .bind(order_id)
    .execute(executor)
    .await?;
    Ok(rows.rows_affected())
}
