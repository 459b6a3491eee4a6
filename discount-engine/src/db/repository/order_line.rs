//! Order Line Repository

use super::{RepoError, RepoResult};
use shared::models::{OrderLine, OrderLineCreate};
use sqlx::{SqliteExecutor, SqlitePool};

const COLUMNS: &str = "id, order_id, product_id, variant_id, category_id, product_name, quantity, is_gift, currency, undiscounted_base_unit_price, base_unit_price, unit_discount_amount, unit_discount_reason, unit_discount_type, unit_discount_value, voucher_code, created_at";

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<OrderLine>> {
    let row =
        sqlx::query_as::<_, OrderLine>(&format!("SELECT {COLUMNS} FROM order_line WHERE id = ?"))
            .bind(id)
            .fetch_optional(pool)
            .await?;
    Ok(row)
}

pub async fn find_by_order(pool: &SqlitePool, order_id: i64) -> RepoResult<Vec<OrderLine>> {
    let rows = sqlx::query_as::<_, OrderLine>(&format!(
        "SELECT {COLUMNS} FROM order_line WHERE order_id = ? ORDER BY id"
    ))
    .bind(order_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn create(
    pool: &SqlitePool,
    order_id: i64,
    currency: &str,
    data: OrderLineCreate,
) -> RepoResult<OrderLine> {
    if data.quantity <= 0 {
        return Err(RepoError::Validation(format!(
            "quantity must be positive, got {}",
            data.quantity
        )));
    }
    if !data.undiscounted_base_unit_price.is_finite() || data.undiscounted_base_unit_price < 0.0 {
        return Err(RepoError::Validation(format!(
            "unit price must be non-negative, got {}",
            data.undiscounted_base_unit_price
        )));
    }

    let now = shared::util::now_millis();
    let row = sqlx::query_as::<_, OrderLine>(&format!(
        "INSERT INTO order_line (order_id, product_id, variant_id, category_id, product_name, quantity, is_gift, currency, undiscounted_base_unit_price, base_unit_price, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9, ?10) RETURNING {COLUMNS}"
    ))
    .bind(order_id)
    .bind(data.product_id)
    .bind(data.variant_id)
    .bind(data.category_id)
    .bind(&data.product_name)
    .bind(data.quantity)
    .bind(data.is_gift)
    .bind(currency)
    .bind(data.undiscounted_base_unit_price)
    .bind(now)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Persist base price and unit discount summary of a line
pub async fn update_discount_fields<'e, E>(executor: E, line: &OrderLine) -> RepoResult<()>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        "UPDATE order_line SET base_unit_price = ?1, unit_discount_amount = ?2, unit_discount_reason = ?3, unit_discount_type = ?4, unit_discount_value = ?5, voucher_code = ?6 WHERE id = ?7",
    )
    .bind(line.base_unit_price)
    .bind(line.unit_discount_amount)
    .bind(&line.unit_discount_reason)
    .bind(line.unit_discount_type)
    .bind(line.unit_discount_value)
    .bind(&line.voucher_code)
    .bind(line.id)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn update_quantity(pool: &SqlitePool, id: i64, quantity: i64) -> RepoResult<()> {
    if quantity <= 0 {
        return Err(RepoError::Validation(format!(
            "quantity must be positive, got {quantity}"
        )));
    }
    let rows = sqlx::query("UPDATE order_line SET quantity = ?1 WHERE id = ?2")
        .bind(quantity)
        .bind(id)
        .execute(pool)
        .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Order line {id} not found")));
    }
    Ok(())
}

pub async fn delete(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    let rows = sqlx::query("DELETE FROM order_line WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(rows.rows_affected() > 0)
}

/// Remove the free gift lines of an order
pub async fn delete_gifts<'e, E>(executor: E, order_id: i64) -> RepoResult<u64>
where
    E: SqliteExecutor<'e>,
{
    let rows = sqlx::query("DELETE FROM order_line WHERE order_id = ? AND is_gift = 1")
        .bind(order_id)
        .execute(executor)
        .await?;
    Ok(rows.rows_affected())
}
