//! Order Line Discount Repository

use super::{RepoError, RepoResult};
use shared::models::{DiscountInfo, OrderLineDiscount};
use sqlx::{SqliteExecutor, SqlitePool};

const COLUMNS: &str = "id, line_id, discount_type, value_type, value, amount_value, currency, name, translated_name, reason, voucher_id, voucher_code, unique_type, created_at";

pub async fn find_by_line(pool: &SqlitePool, line_id: i64) -> RepoResult<Vec<OrderLineDiscount>> {
    let rows = sqlx::query_as::<_, OrderLineDiscount>(&format!(
        "SELECT {COLUMNS} FROM order_line_discount WHERE line_id = ? ORDER BY id"
    ))
    .bind(line_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// All line discounts of an order, ordered by line then id
pub async fn find_by_order(
    pool: &SqlitePool,
    order_id: i64,
) -> RepoResult<Vec<OrderLineDiscount>> {
    let rows = sqlx::query_as::<_, OrderLineDiscount>(&format!(
        "SELECT {COLUMNS} FROM order_line_discount WHERE line_id IN (SELECT id FROM order_line WHERE order_id = ?) ORDER BY line_id, id"
    ))
    .bind(order_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn create<'e, E>(
    executor: E,
    line_id: i64,
    data: &DiscountInfo,
) -> RepoResult<OrderLineDiscount>
where
    E: SqliteExecutor<'e>,
{
    let now = shared::util::now_millis();
    let row = sqlx::query_as::<_, OrderLineDiscount>(&format!(
        "INSERT INTO order_line_discount (line_id, discount_type, value_type, value, amount_value, currency, name, translated_name, reason, voucher_id, voucher_code, unique_type, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13) RETURNING {COLUMNS}"
    ))
    .bind(line_id)
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
    .bind(data.unique_type)
    .bind(now)
    .fetch_one(executor)
    .await?;
    Ok(row)
}

pub async fn update<'e, E>(executor: E, discount: &OrderLineDiscount) -> RepoResult<()>
where
    E: SqliteExecutor<'e>,
{
    let rows = sqlx::query(
        "UPDATE order_line_discount SET value_type = ?1, value = ?2, amount_value = ?3, currency = ?4, name = ?5, translated_name = ?6, reason = ?7, voucher_id = ?8, voucher_code = ?9 WHERE id = ?10",
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
            "Order line discount {} not found",
            discount.id
        )));
    }
    Ok(())
}

pub async fn delete_by_id<'e, E>(executor: E, id: i64) -> RepoResult<bool>
where
    E: SqliteExecutor<'e>,
{
    let rows = sqlx::query("DELETE FROM order_line_discount WHERE id = ?")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(rows.rows_affected() > 0)
}

pub async fn delete_for_line(pool: &SqlitePool, line_id: i64) -> RepoResult<u64> {
    let rows = sqlx::query("DELETE FROM order_line_discount WHERE line_id = ?")
        .bind(line_id)
        .execute(pool)
        .await?;
    Ok(rows.rows_affected())
}
