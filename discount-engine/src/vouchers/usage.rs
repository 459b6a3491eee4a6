//! Voucher usage counters
//!
//! Every increase has a compensating release used when an order is canceled
//! or a voucher is removed again.

use super::error::{DiscountError, DiscountResult};
use super::validation::{OrderContext, get_customer_email_for_voucher_usage};
use crate::db::repository::{RepoResult, voucher, voucher_code, voucher_customer};
use shared::models::{Order, OrderStatus, Voucher, VoucherCode};
use sqlx::{SqliteExecutor, SqlitePool};

/// Count one redemption of `code`
///
/// Counter, customer usage and deactivation are written in one transaction:
/// a rejected customer leaves the code untouched.
pub async fn increase_voucher_usage(
    pool: &SqlitePool,
    voucher: &Voucher,
    code: &VoucherCode,
    customer_email: Option<&str>,
    increase_voucher_customer_usage: bool,
) -> DiscountResult<()> {
    let mut tx = pool.begin().await?;
    if voucher.usage_limit.is_some_and(|limit| limit > 0) {
        let updated = voucher_code::increment_used(&mut *tx, code.id).await?;
        tracing::debug!(code = %updated.code, used = updated.used, "Voucher code usage increased");
    }
    if voucher.apply_once_per_customer && increase_voucher_customer_usage {
        record_customer_usage(&mut *tx, code, customer_email).await?;
    }
    if voucher.single_use {
        voucher_code::set_active(&mut *tx, code.id, false).await?;
    }
    tx.commit().await?;

    tracing::info!(code = %code.code, voucher_id = voucher.id, "Voucher usage increased");
    Ok(())
}

pub async fn increase_voucher_code_usage_value(
    pool: &SqlitePool,
    code: &VoucherCode,
) -> RepoResult<VoucherCode> {
    let updated = voucher_code::increment_used(pool, code.id).await?;
    tracing::info!(code = %updated.code, used = updated.used, "Voucher code usage increased");
    Ok(updated)
}

pub async fn decrease_voucher_code_usage_value(
    pool: &SqlitePool,
    code: &VoucherCode,
) -> RepoResult<VoucherCode> {
    let updated = voucher_code::decrement_used(pool, code.id).await?;
    tracing::info!(code = %updated.code, used = updated.used, "Voucher code usage decreased");
    Ok(updated)
}

/// Mark the code as used up
pub async fn deactivate_voucher_code(pool: &SqlitePool, code: &VoucherCode) -> RepoResult<VoucherCode> {
    let updated = voucher_code::set_active(pool, code.id, false).await?;
    tracing::info!(code = %updated.code, "Voucher code deactivated");
    Ok(updated)
}

pub async fn activate_voucher_code(pool: &SqlitePool, code: &VoucherCode) -> RepoResult<VoucherCode> {
    let updated = voucher_code::set_active(pool, code.id, true).await?;
    tracing::info!(code = %updated.code, "Voucher code activated");
    Ok(updated)
}

/// Record that the customer redeemed the code
pub async fn add_voucher_usage_by_customer(
    pool: &SqlitePool,
    code: &VoucherCode,
    customer_email: Option<&str>,
) -> DiscountResult<()> {
    record_customer_usage(pool, code, customer_email).await
}

async fn record_customer_usage<'e, E>(
    executor: E,
    code: &VoucherCode,
    customer_email: Option<&str>,
) -> DiscountResult<()>
where
    E: SqliteExecutor<'e>,
{
    let Some(email) = customer_email.filter(|e| !e.is_empty()) else {
        tracing::warn!(code = %code.code, "Voucher usage rejected: no customer email");
        return Err(DiscountError::not_applicable(
            "Unable to apply voucher as customer details are missing.",
        ));
    };

    if !voucher_customer::insert_if_absent(executor, code.id, email).await? {
        tracing::warn!(code = %code.code, email = %email, "Voucher already used by customer");
        return Err(DiscountError::not_applicable(
            "This offer is only valid once per customer.",
        ));
    }
    Ok(())
}

pub async fn remove_voucher_usage_by_customer(
    pool: &SqlitePool,
    code: &VoucherCode,
    customer_email: &str,
) -> RepoResult<()> {
    if voucher_customer::delete(pool, code.id, customer_email).await? {
        tracing::info!(code = %code.code, email = %customer_email, "Voucher customer usage removed");
    }
    Ok(())
}

/// Undo [`increase_voucher_usage`]
pub async fn release_voucher_code_usage(
    pool: &SqlitePool,
    code: Option<&VoucherCode>,
    voucher: Option<&Voucher>,
    user_email: Option<&str>,
) -> RepoResult<()> {
    let Some(code) = code else {
        return Ok(());
    };
    let mut tx = pool.begin().await?;
    if let Some(voucher) = voucher {
        if voucher.usage_limit.is_some_and(|limit| limit > 0) {
            voucher_code::decrement_used(&mut *tx, code.id).await?;
        }
        if voucher.single_use {
            voucher_code::set_active(&mut *tx, code.id, true).await?;
        }
    }
    if let Some(email) = user_email {
        voucher_customer::delete(&mut *tx, code.id, email).await?;
    }
    tx.commit().await?;

    tracing::info!(code = %code.code, "Voucher usage released");
    Ok(())
}

/// Draft orders only count when the channel says so
fn counts_usage(ctx: &OrderContext) -> bool {
    ctx.order.status != OrderStatus::Draft || ctx.channel.include_draft_order_in_voucher_usage
}

async fn order_voucher(
    pool: &SqlitePool,
    order: &Order,
) -> RepoResult<Option<(VoucherCode, Voucher)>> {
    let Some(code) = order.voucher_code.as_deref() else {
        return Ok(None);
    };
    let Some(code) = voucher_code::find_by_code(pool, code).await? else {
        return Ok(None);
    };
    let Some(voucher) = voucher::find_by_id(pool, code.voucher_id).await? else {
        return Ok(None);
    };
    Ok(Some((code, voucher)))
}

/// Count the voucher attached to the order
///
/// Returns `false` when nothing was counted (no voucher, or a draft order in a
/// channel that ignores drafts).
pub async fn increase_voucher_usage_for_order(
    pool: &SqlitePool,
    order: &Order,
) -> DiscountResult<bool> {
    let ctx = OrderContext::load(pool, order.clone()).await?;
    if !counts_usage(&ctx) {
        return Ok(false);
    }
    let Some((code, voucher)) = order_voucher(pool, order).await? else {
        return Ok(false);
    };
    let email = get_customer_email_for_voucher_usage(&ctx);
    increase_voucher_usage(pool, &voucher, &code, email.as_deref(), true).await?;
    tracing::info!(order_id = order.id, code = %code.code, "Voucher usage counted for order");
    Ok(true)
}

/// Release the usage counted for the order (cancel, voucher removal)
pub async fn release_voucher_usage_for_order(pool: &SqlitePool, order: &Order) -> DiscountResult<bool> {
    let ctx = OrderContext::load(pool, order.clone()).await?;
    if !counts_usage(&ctx) {
        return Ok(false);
    }
    let Some((code, voucher)) = order_voucher(pool, order).await? else {
        return Ok(false);
    };
    let email = if voucher.apply_once_per_customer {
        get_customer_email_for_voucher_usage(&ctx)
    } else {
        None
    };
    release_voucher_code_usage(pool, Some(&code), Some(&voucher), email.as_deref()).await?;
    tracing::info!(order_id = order.id, code = %code.code, "Voucher usage released for order");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;
    use crate::db::repository::{channel, order};
    use shared::models::{
        ChannelCreate, DiscountValueType, OrderCreate, VoucherCreate, VoucherType,
    };

    async fn setup(
        usage_limit: Option<i64>,
        single_use: bool,
        once_per_customer: bool,
    ) -> (DbService, Voucher, VoucherCode) {
        let db = DbService::in_memory().await.unwrap();
        let voucher = voucher::create(
            &db.pool,
            VoucherCreate {
                name: Some("Promo".to_string()),
                voucher_type: VoucherType::EntireOrder,
                discount_value_type: DiscountValueType::Fixed,
                usage_limit,
                single_use: Some(single_use),
                apply_once_per_order: None,
                apply_once_per_customer: Some(once_per_customer),
                only_for_staff: None,
                min_checkout_items_quantity: None,
                start_date: Some(0),
                end_date: None,
            },
        )
        .await
        .unwrap();
        let code = voucher_code::create(&db.pool, voucher.id, "PROMO").await.unwrap();
        (db, voucher, code)
    }

    #[tokio::test]
    async fn test_increase_usage_with_limit() {
        let (db, voucher, code) = setup(Some(5), false, false).await;
        increase_voucher_usage(&db.pool, &voucher, &code, None, true).await.unwrap();
        increase_voucher_usage(&db.pool, &voucher, &code, None, true).await.unwrap();
        let code = voucher_code::find_by_id(&db.pool, code.id).await.unwrap().unwrap();
        assert_eq!(code.used, 2);
        assert!(code.is_active);
    }

    #[tokio::test]
    async fn test_increase_usage_without_limit_leaves_counter() {
        let (db, voucher, code) = setup(None, false, false).await;
        increase_voucher_usage(&db.pool, &voucher, &code, None, true).await.unwrap();
        let code = voucher_code::find_by_id(&db.pool, code.id).await.unwrap().unwrap();
        assert_eq!(code.used, 0);
    }

    #[tokio::test]
    async fn test_single_use_deactivates_and_release_reactivates() {
        let (db, voucher, code) = setup(Some(1), true, false).await;
        increase_voucher_usage(&db.pool, &voucher, &code, None, true).await.unwrap();
        let used = voucher_code::find_by_id(&db.pool, code.id).await.unwrap().unwrap();
        assert!(!used.is_active);
        assert_eq!(used.used, 1);

        release_voucher_code_usage(&db.pool, Some(&used), Some(&voucher), None)
            .await
            .unwrap();
        let released = voucher_code::find_by_id(&db.pool, code.id).await.unwrap().unwrap();
        assert!(released.is_active);
        assert_eq!(released.used, 0);
    }

    #[tokio::test]
    async fn test_once_per_customer() {
        let (db, voucher, code) = setup(None, false, true).await;

        let err = increase_voucher_usage(&db.pool, &voucher, &code, None, true)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unable to apply voucher as customer details are missing."
        );

        increase_voucher_usage(&db.pool, &voucher, &code, Some("a@example.com"), true)
            .await
            .unwrap();
        let err = increase_voucher_usage(&db.pool, &voucher, &code, Some("a@example.com"), true)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "This offer is only valid once per customer.");

        // customer usage can be skipped explicitly
        increase_voucher_usage(&db.pool, &voucher, &code, Some("a@example.com"), false)
            .await
            .unwrap();

        release_voucher_code_usage(&db.pool, Some(&code), Some(&voucher), Some("a@example.com"))
            .await
            .unwrap();
        assert_eq!(voucher_customer::count_for_code(&db.pool, code.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_decrease_never_negative() {
        let (db, _voucher, code) = setup(Some(3), false, false).await;
        let code = decrease_voucher_code_usage_value(&db.pool, &code).await.unwrap();
        assert_eq!(code.used, 0);
    }

    #[tokio::test]
    async fn test_release_without_code_is_noop() {
        let (db, voucher, _code) = setup(Some(3), true, true).await;
        release_voucher_code_usage(&db.pool, None, Some(&voucher), Some("a@example.com"))
            .await
            .unwrap();
    }

    async fn order_with_code(db: &DbService, status: OrderStatus, include_drafts: bool) -> Order {
        let ch = channel::create(
            &db.pool,
            ChannelCreate {
                name: "Default".to_string(),
                slug: "default".to_string(),
                currency_code: "USD".to_string(),
                is_active: None,
                include_draft_order_in_voucher_usage: Some(include_drafts),
                prices_entered_with_tax: None,
            },
        )
        .await
        .unwrap();
        let created = order::create(
            &db.pool,
            OrderCreate {
                channel_id: ch.id,
                status,
                user_id: None,
                user_email: Some("guest@example.com".to_string()),
                currency: "USD".to_string(),
                subtotal_net: 10.0,
                subtotal_gross: 10.0,
                undiscounted_total_gross: 10.0,
                undiscounted_base_shipping_price: 0.0,
            },
        )
        .await
        .unwrap();
        let code = voucher_code::find_by_code(&db.pool, "PROMO").await.unwrap().unwrap();
        order::update_voucher(&db.pool, created.id, Some(code.voucher_id), Some("PROMO"), None)
            .await
            .unwrap();
        order::find_by_id(&db.pool, created.id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_draft_order_usage_depends_on_channel() {
        let (db, _voucher, code) = setup(Some(10), false, false).await;
        let draft = order_with_code(&db, OrderStatus::Draft, false).await;
        assert!(!increase_voucher_usage_for_order(&db.pool, &draft).await.unwrap());
        let current = voucher_code::find_by_id(&db.pool, code.id).await.unwrap().unwrap();
        assert_eq!(current.used, 0);

        order::update_status(&db.pool, draft.id, OrderStatus::Unfulfilled).await.unwrap();
        let placed = order::find_by_id(&db.pool, draft.id).await.unwrap().unwrap();
        assert!(increase_voucher_usage_for_order(&db.pool, &placed).await.unwrap());
        assert!(release_voucher_usage_for_order(&db.pool, &placed).await.unwrap());
        let current = voucher_code::find_by_id(&db.pool, code.id).await.unwrap().unwrap();
        assert_eq!(current.used, 0);
    }

    #[tokio::test]
    async fn test_draft_order_counted_when_channel_includes_drafts() {
        let (db, _voucher, code) = setup(Some(10), false, true).await;
        let draft = order_with_code(&db, OrderStatus::Draft, true).await;
        assert!(increase_voucher_usage_for_order(&db.pool, &draft).await.unwrap());
        let current = voucher_code::find_by_id(&db.pool, code.id).await.unwrap().unwrap();
        assert_eq!(current.used, 1);
        assert!(
            voucher_customer::exists_for_voucher(&db.pool, code.voucher_id, "guest@example.com")
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_rejected_customer_leaves_code_untouched() {
        let (db, voucher, code) = setup(Some(1), true, true).await;

        let err = increase_voucher_usage(&db.pool, &voucher, &code, None, true)
            .await
            .unwrap_err();
        assert!(matches!(err, DiscountError::NotApplicable(_)));
        let current = voucher_code::find_by_id(&db.pool, code.id).await.unwrap().unwrap();
        assert_eq!(current.used, 0);
        assert!(current.is_active);

        increase_voucher_usage(&db.pool, &voucher, &code, Some("a@example.com"), true)
            .await
            .unwrap();
        let err = increase_voucher_usage(&db.pool, &voucher, &current, Some("a@example.com"), true)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "This offer is only valid once per customer.");
        let current = voucher_code::find_by_id(&db.pool, code.id).await.unwrap().unwrap();
        assert_eq!(current.used, 1);
        assert!(!current.is_active);
    }
}
