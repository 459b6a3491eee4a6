//! Manual (staff) discounts and order discount totals
//!
//! Manual discounts take precedence over vouchers: adding one removes the
//! competing voucher discount, removing it re-evaluates the voucher.

use super::fetch::fetch_draft_order_lines_info;
use crate::db::repository::{
    RepoError, order, order_discount, order_line, order_line_discount, voucher,
};
use crate::money::{apply_discount_to_value, quantize, to_decimal, to_money_f64};
use crate::vouchers::reconcile::{
    create_or_update_discount_object_from_order_level_voucher,
    create_or_update_line_discount_objects_from_voucher, update_unit_discount_data,
};
use crate::vouchers::{
    DiscountResult, VoucherInfo, is_order_level_voucher, is_shipping_voucher,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::models::{
    DiscountInfo, DiscountType, DiscountValueType, Order, OrderDiscount, OrderLine, VoucherType,
};
use sqlx::SqlitePool;
use std::sync::Arc;
use validator::{Validate, ValidationError};

/// Staff discount on the whole order
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_order_discount_percentage"))]
pub struct ManualDiscountInput {
    #[validate(length(max = 255))]
    pub reason: Option<String>,
    pub value_type: DiscountValueType,
    #[validate(range(min = 0.0))]
    pub value: f64,
}

/// Staff discount on one line; missing fields keep the current discount's
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_line_discount_percentage"))]
pub struct ManualLineDiscountInput {
    #[validate(length(max = 255))]
    pub reason: Option<String>,
    pub value_type: Option<DiscountValueType>,
    #[validate(range(min = 0.0))]
    pub value: Option<f64>,
}

fn check_percentage(value_type: Option<DiscountValueType>, value: Option<f64>) -> Result<(), ValidationError> {
    if value_type == Some(DiscountValueType::Percentage) && value.is_some_and(|v| v > 100.0) {
        return Err(ValidationError::new("percentage_over_100"));
    }
    Ok(())
}

fn validate_order_discount_percentage(input: &ManualDiscountInput) -> Result<(), ValidationError> {
    check_percentage(Some(input.value_type), Some(input.value))
}

fn validate_line_discount_percentage(input: &ManualLineDiscountInput) -> Result<(), ValidationError> {
    check_percentage(input.value_type, input.value)
}

async fn load_order(pool: &SqlitePool, order_id: i64) -> DiscountResult<Order> {
    Ok(order::find_by_id(pool, order_id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Order {order_id} not found")))?)
}

async fn load_line(pool: &SqlitePool, line_id: i64) -> DiscountResult<OrderLine> {
    Ok(order_line::find_by_id(pool, line_id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Order line {line_id} not found")))?)
}

async fn load_voucher_info(pool: &SqlitePool, order: &Order) -> DiscountResult<Option<VoucherInfo>> {
    match order.voucher_id {
        Some(id) => Ok(VoucherInfo::fetch(pool, id, order.voucher_code.clone()).await?),
        None => Ok(None),
    }
}

// ── Queries ──────────────────────────────────────────────────

pub async fn get_voucher_discount_assigned_to_order(
    pool: &SqlitePool,
    order_id: i64,
) -> DiscountResult<Option<OrderDiscount>> {
    let discounts = order_discount::find_by_type(pool, order_id, DiscountType::Voucher).await?;
    Ok(discounts.into_iter().next())
}

/// Order discounts added by staff
pub async fn get_order_discounts(pool: &SqlitePool, order_id: i64) -> DiscountResult<Vec<OrderDiscount>> {
    Ok(order_discount::find_by_type(pool, order_id, DiscountType::Manual).await?)
}

fn capped_total(discounts: &[OrderDiscount], order: &Order) -> Decimal {
    let total: Decimal = discounts.iter().map(|d| to_decimal(d.amount_value)).sum();
    quantize(total.min(to_decimal(order.undiscounted_total_gross)), &order.currency)
}

/// Σ order discounts, never more than the undiscounted order total
pub async fn get_total_order_discount(pool: &SqlitePool, order: &Order) -> DiscountResult<Decimal> {
    let discounts = order_discount::find_by_order(pool, order.id).await?;
    Ok(capped_total(&discounts, order))
}

/// Like [`get_total_order_discount`] but without a shipping voucher's discount
pub async fn get_total_order_discount_excluding_shipping(
    pool: &SqlitePool,
    order: &Order,
) -> DiscountResult<Decimal> {
    let mut discounts = order_discount::find_by_order(pool, order.id).await?;
    let has_shipping_voucher = match order.voucher_id {
        Some(id) => voucher::find_by_id(pool, id)
            .await?
            .is_some_and(|v| v.voucher_type == VoucherType::Shipping),
        None => false,
    };
    if has_shipping_voucher {
        discounts.retain(|d| d.discount_type != DiscountType::Voucher);
    }
    Ok(capped_total(&discounts, order))
}

// ── Order level ──────────────────────────────────────────────

/// Add a staff discount on the order total
///
/// Replaces every other order discount except a shipping voucher's, and drops
/// free gift lines.
pub async fn create_manual_order_discount(
    pool: &SqlitePool,
    order_id: i64,
    input: ManualDiscountInput,
) -> DiscountResult<OrderDiscount> {
    input.validate()?;
    let order = load_order(pool, order_id).await?;
    let lines = order_line::find_by_order(pool, order_id).await?;
    let currency = order.currency.as_str();

    let subtotal: Decimal = lines
        .iter()
        .filter(|l| !l.is_gift)
        .map(|l| to_decimal(l.base_unit_price) * Decimal::from(l.quantity))
        .sum();
    let current_total = subtotal + to_decimal(order.base_shipping_price);
    let discounted_total =
        apply_discount_to_value(to_decimal(input.value), input.value_type, currency, current_total);
    let amount = quantize(current_total - discounted_total, currency);

    let data = DiscountInfo {
        discount_type: DiscountType::Manual,
        value_type: input.value_type,
        value: input.value,
        amount_value: to_money_f64(amount, currency),
        currency: currency.to_string(),
        name: None,
        translated_name: None,
        reason: input.reason,
        voucher_id: None,
        voucher_code: None,
        unique_type: None,
    };

    let mut tx = pool.begin().await?;
    order_discount::delete_except_shipping_voucher(&mut *tx, order_id).await?;
    if lines.iter().any(|l| l.is_gift) {
        order_line::delete_gifts(&mut *tx, order_id).await?;
    }
    let created = order_discount::create(&mut *tx, order_id, &data).await?;
    tx.commit().await?;

    tracing::info!(order_id, amount = created.amount_value, "Manual order discount created");
    Ok(created)
}

/// Remove an order discount, then re-evaluate the order voucher
pub async fn remove_order_discount_from_order(
    pool: &SqlitePool,
    order_id: i64,
    discount_id: i64,
) -> DiscountResult<()> {
    let mut order = load_order(pool, order_id).await?;
    if !order_discount::delete_by_id(pool, order_id, discount_id).await? {
        return Err(RepoError::NotFound(format!("Order discount {discount_id} not found")).into());
    }
    tracing::info!(order_id, discount_id, "Order discount removed");

    if order.voucher_id.is_some() {
        let voucher_info = load_voucher_info(pool, &order).await?;
        create_or_update_discount_object_from_order_level_voucher(pool, &mut order, voucher_info.as_ref())
            .await?;
    }
    Ok(())
}

// ── Line level ───────────────────────────────────────────────

/// Set the single manual discount of a line and reprice it
pub async fn update_discount_for_order_line(
    pool: &SqlitePool,
    line_id: i64,
    input: ManualLineDiscountInput,
) -> DiscountResult<OrderLine> {
    input.validate()?;
    let mut line = load_line(pool, line_id).await?;
    let mut line_discounts = order_line_discount::find_by_line(pool, line_id).await?;

    // keep only the first manual discount
    let mut kept_manual = false;
    let mut to_delete = Vec::new();
    line_discounts.retain(|d| {
        if d.discount_type == DiscountType::Manual && !kept_manual {
            kept_manual = true;
            true
        } else {
            to_delete.push(d.id);
            false
        }
    });
    for id in to_delete {
        order_line_discount::delete_by_id(pool, id).await?;
    }

    let (current_value, current_value_type, mut manual) = match line_discounts.pop() {
        Some(discount) => (Some(discount.value), Some(discount.value_type), discount),
        None => {
            let data = DiscountInfo {
                discount_type: DiscountType::Manual,
                value_type: DiscountValueType::Fixed,
                value: 0.0,
                amount_value: 0.0,
                currency: line.currency.clone(),
                name: None,
                translated_name: None,
                reason: None,
                voucher_id: None,
                voucher_code: None,
                unique_type: Some(DiscountType::Manual),
            };
            (None, None, order_line_discount::create(pool, line_id, &data).await?)
        }
    };

    let value = input.value.or(current_value).unwrap_or(0.0);
    let value_type = input
        .value_type
        .or(current_value_type)
        .unwrap_or(DiscountValueType::Fixed);
    let currency = line.currency.clone();
    let undiscounted_unit = to_decimal(line.undiscounted_base_unit_price);

    let value_changed = manual.value != value || manual.value_type != value_type;
    manual.value = value;
    manual.value_type = value_type;
    if let Some(reason) = input.reason {
        manual.reason = Some(reason);
    }
    if value_changed {
        let discounted_unit =
            apply_discount_to_value(to_decimal(value), value_type, &currency, undiscounted_unit);
        let amount = (undiscounted_unit - discounted_unit) * Decimal::from(line.quantity);
        manual.amount_value = to_money_f64(amount, &currency);
    }
    order_line_discount::update(pool, &manual).await?;

    if current_value != Some(value) || current_value_type != Some(value_type) {
        let base_unit_price =
            apply_discount_to_value(to_decimal(value), value_type, &currency, undiscounted_unit);
        line.base_unit_price = to_money_f64(base_unit_price, &currency);
        line.voucher_code = None;
        update_unit_discount_data(&mut line, std::slice::from_ref(&manual));
        order_line::update_discount_fields(pool, &line).await?;
        tracing::info!(line_id, value, ?value_type, "Manual line discount applied");
    }
    Ok(line)
}

/// Drop every discount of a line and restore its undiscounted price
///
/// A line-level voucher of the order is re-evaluated afterwards.
pub async fn remove_discount_from_order_line(
    pool: &SqlitePool,
    line_id: i64,
) -> DiscountResult<OrderLine> {
    let mut line = load_line(pool, line_id).await?;
    order_line_discount::delete_for_line(pool, line_id).await?;
    update_unit_discount_data(&mut line, &[]);
    line.base_unit_price = line.undiscounted_base_unit_price;
    line.voucher_code = None;
    order_line::update_discount_fields(pool, &line).await?;
    tracing::info!(line_id, "Line discounts removed");

    let order = load_order(pool, line.order_id).await?;
    let voucher_info = load_voucher_info(pool, &order).await?.map(Arc::new);
    let voucher = voucher_info.as_ref().map(|info| &info.voucher);
    if voucher.is_some() && !is_order_level_voucher(voucher) && !is_shipping_voucher(voucher) {
        let mut lines_info = fetch_draft_order_lines_info(pool, &order, voucher_info.as_ref()).await?;
        create_or_update_line_discount_objects_from_voucher(pool, &mut lines_info, false).await?;
        let mut tx = pool.begin().await?;
        for info in &lines_info {
            order_line::update_discount_fields(&mut *tx, &info.line).await?;
        }
        tx.commit().await?;
        if let Some(info) = lines_info.into_iter().find(|info| info.line.id == line_id) {
            line = info.line;
        }
    }
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_input_validation() {
        let ok = ManualDiscountInput {
            reason: Some("Loyal customer".to_string()),
            value_type: DiscountValueType::Percentage,
            value: 100.0,
        };
        assert!(ok.validate().is_ok());

        let over = ManualDiscountInput {
            value: 100.5,
            ..ok.clone()
        };
        assert!(over.validate().is_err());

        let negative = ManualDiscountInput {
            value_type: DiscountValueType::Fixed,
            value: -1.0,
            ..ok
        };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_line_input_validation() {
        assert!(ManualLineDiscountInput::default().validate().is_ok());
        let fixed_large = ManualLineDiscountInput {
            value_type: Some(DiscountValueType::Fixed),
            value: Some(250.0),
            ..Default::default()
        };
        assert!(fixed_large.validate().is_ok());
        let pct = ManualLineDiscountInput {
            value_type: Some(DiscountValueType::Percentage),
            value: Some(120.0),
            ..Default::default()
        };
        assert!(pct.validate().is_err());
    }
}
