//! Order Repository

use super::{RepoError, RepoResult};
use shared::models::{Order, OrderCreate, OrderStatus};
use sqlx::SqlitePool;

const COLUMNS: &str = "id, channel_id, status, user_id, user_email, voucher_id, voucher_code, voucher_denormalized_info, currency, subtotal_net, subtotal_gross, undiscounted_total_gross, undiscounted_base_shipping_price, base_shipping_price, created_at, updated_at";

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Order>> {
    let row = sqlx::query_as::<_, Order>(&format!("SELECT {COLUMNS} FROM orders WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn create(pool: &SqlitePool, data: OrderCreate) -> RepoResult<Order> {
    let now = shared::util::now_millis();
    let row = sqlx::query_as::<_, Order>(&format!(
        "INSERT INTO orders (channel_id, status, user_id, user_email, currency, subtotal_net, subtotal_gross, undiscounted_total_gross, undiscounted_base_shipping_price, base_shipping_price, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9, ?10, ?10) RETURNING {COLUMNS}"
    ))
    .bind(data.channel_id)
    .bind(data.status)
    .bind(data.user_id)
    .bind(&data.user_email)
    .bind(&data.currency)
    .bind(data.subtotal_net)
    .bind(data.subtotal_gross)
    .bind(data.undiscounted_total_gross)
    .bind(data.undiscounted_base_shipping_price)
    .bind(now)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Attach (or clear, with `None`s) the voucher and its frozen snapshot
pub async fn update_voucher(
    pool: &SqlitePool,
    id: i64,
    voucher_id: Option<i64>,
    voucher_code: Option<&str>,
    voucher_denormalized_info: Option<&str>,
) -> RepoResult<()> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE orders SET voucher_id = ?1, voucher_code = ?2, voucher_denormalized_info = ?3, updated_at = ?4 WHERE id = ?5",
    )
    .bind(voucher_id)
    .bind(voucher_code)
    .bind(voucher_denormalized_info)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Order {id} not found")));
    }
    Ok(())
}

pub async fn update_base_shipping_price(
    pool: &SqlitePool,
    id: i64,
    base_shipping_price: f64,
) -> RepoResult<()> {
    let now = shared::util::now_millis();
    sqlx::query("UPDATE orders SET base_shipping_price = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(base_shipping_price)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn update_status(pool: &SqlitePool, id: i64, status: OrderStatus) -> RepoResult<()> {
    let now = shared::util::now_millis();
    let rows = sqlx::query("UPDATE orders SET status = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(status)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Order {id} not found")));
    }
    Ok(())
}
