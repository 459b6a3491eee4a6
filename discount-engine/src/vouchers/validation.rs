//! Voucher eligibility rules
//!
//! | Rule | Message |
//! |------|---------|
//! | channel listing | This voucher is not assigned to this channel |
//! | min spent | This offer is only valid for orders over {amount}. |
//! | min quantity | This offer is only valid for orders with a minimum of {n} quantity. |
//! | once per customer | This offer is valid only once per customer. |
//! | staff only | This offer is valid only for staff customers. |

use super::calculator::VoucherInfo;
use super::checkout::CheckoutInfo;
use super::error::{DiscountError, DiscountResult};
use crate::db::repository::{RepoError, RepoResult, channel, order_line, user, voucher_customer};
use crate::money::{format_amount, to_decimal};
use rust_decimal::Decimal;
use shared::models::{Channel, Order, OrderLine, User};
use sqlx::SqlitePool;

/// Who is redeeming a voucher
pub trait CustomerSource {
    fn customer_user(&self) -> Option<&User>;
    /// Email entered on the order / checkout itself
    fn customer_email(&self) -> Option<&str>;
}

/// The account email wins over the email stored on the order or checkout
pub fn get_customer_email_for_voucher_usage<S: CustomerSource + ?Sized>(source: &S) -> Option<String> {
    match source.customer_user() {
        Some(user) => Some(user.email.clone()),
        None => source.customer_email().map(str::to_string),
    }
}

/// Order with the records voucher validation needs
#[derive(Debug, Clone)]
pub struct OrderContext {
    pub order: Order,
    pub channel: Channel,
    pub user: Option<User>,
    pub lines: Vec<OrderLine>,
}

impl OrderContext {
    pub async fn load(pool: &SqlitePool, order: Order) -> RepoResult<Self> {
        let channel = channel::find_by_id(pool, order.channel_id)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("Channel {} not found", order.channel_id)))?;
        let user = match order.user_id {
            Some(id) => user::find_by_id(pool, id).await?,
            None => None,
        };
        let lines = order_line::find_by_order(pool, order.id).await?;
        Ok(Self {
            order,
            channel,
            user,
            lines,
        })
    }
}

impl CustomerSource for OrderContext {
    fn customer_user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    fn customer_email(&self) -> Option<&str> {
        self.order.user_email.as_deref()
    }
}

/// Check every eligibility rule of the voucher
pub async fn validate_voucher(
    pool: &SqlitePool,
    voucher_info: &VoucherInfo,
    total_price: Decimal,
    quantity: i64,
    customer_email: Option<&str>,
    channel: &Channel,
    customer: Option<&User>,
) -> DiscountResult<()> {
    let voucher = &voucher_info.voucher;

    // min spent
    let listing = voucher_info.listing_for(channel.id).ok_or_else(|| {
        DiscountError::not_applicable("This voucher is not assigned to this channel")
    })?;
    if let Some(min_spent) = listing.min_spent_amount.map(to_decimal)
        && min_spent > Decimal::ZERO
        && total_price < min_spent
    {
        return Err(DiscountError::NotApplicable(format!(
            "This offer is only valid for orders over {}.",
            format_amount(min_spent, &listing.currency)
        )));
    }

    if let Some(min_quantity) = voucher.min_checkout_items_quantity
        && min_quantity > quantity
    {
        return Err(DiscountError::NotApplicable(format!(
            "This offer is only valid for orders with a minimum of {min_quantity} quantity."
        )));
    }

    if voucher.apply_once_per_customer
        && let Some(email) = customer_email
        && voucher_customer::exists_for_voucher(pool, voucher.id, email).await?
    {
        return Err(DiscountError::not_applicable(
            "This offer is valid only once per customer.",
        ));
    }

    if voucher.only_for_staff && !customer.is_some_and(|c| c.is_staff) {
        return Err(DiscountError::not_applicable(
            "This offer is valid only for staff customers.",
        ));
    }

    Ok(())
}

/// Validate the voucher attached to an order; orders without one pass
pub async fn validate_voucher_in_order(pool: &SqlitePool, ctx: &OrderContext) -> DiscountResult<()> {
    let Some(voucher_id) = ctx.order.voucher_id else {
        return Ok(());
    };
    let Some(voucher_info) =
        VoucherInfo::fetch(pool, voucher_id, ctx.order.voucher_code.clone()).await?
    else {
        return Ok(());
    };

    let value = if ctx.channel.prices_entered_with_tax {
        ctx.order.subtotal_gross
    } else {
        ctx.order.subtotal_net
    };
    let quantity = ctx.lines.iter().map(|l| l.quantity).sum();
    let customer_email = get_customer_email_for_voucher_usage(ctx);

    validate_voucher(
        pool,
        &voucher_info,
        to_decimal(value),
        quantity,
        customer_email.as_deref(),
        &ctx.channel,
        ctx.user.as_ref(),
    )
    .await
}

pub async fn validate_voucher_for_checkout(
    pool: &SqlitePool,
    voucher_info: &VoucherInfo,
    checkout_info: &CheckoutInfo,
) -> DiscountResult<()> {
    let quantity = checkout_info.quantity();
    let subtotal = checkout_info.base_subtotal();
    let customer_email = get_customer_email_for_voucher_usage(checkout_info);

    validate_voucher(
        pool,
        voucher_info,
        subtotal,
        quantity,
        customer_email.as_deref(),
        &checkout_info.channel,
        checkout_info.user.as_ref(),
    )
    .await
}
