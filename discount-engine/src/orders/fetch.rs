//! Assembling line infos of an editable order

use super::line_info::EditableOrderLineInfo;
use crate::db::repository::{RepoResult, order_line, order_line_discount, product_collection};
use crate::money::{quantize, to_decimal, unit_price};
use crate::vouchers::{VoucherInfo, attach_voucher_to_line_info, is_line_level_voucher};
use rust_decimal::Decimal;
use shared::models::{DiscountType, Order, OrderLineDiscount, VoucherDenormalizedInfo, VoucherType};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;

/// Load the order lines with discounts, catalogue ids and voucher attachment
///
/// `voucher_info` is the live voucher of the order (if any). The frozen
/// snapshot stored on the order is attached to its origin lines.
pub async fn fetch_draft_order_lines_info(
    pool: &SqlitePool,
    order: &Order,
    voucher_info: Option<&Arc<VoucherInfo>>,
) -> RepoResult<Vec<EditableOrderLineInfo>> {
    let lines = order_line::find_by_order(pool, order.id).await?;
    if lines.is_empty() {
        return Ok(Vec::new());
    }

    let mut discounts_by_line: HashMap<i64, Vec<OrderLineDiscount>> = HashMap::new();
    for discount in order_line_discount::find_by_order(pool, order.id).await? {
        discounts_by_line.entry(discount.line_id).or_default().push(discount);
    }

    let product_ids: Vec<i64> = lines.iter().filter_map(|l| l.product_id).collect();
    let collections = product_collection::find_for_products(pool, &product_ids).await?;

    let mut infos: Vec<EditableOrderLineInfo> = lines
        .into_iter()
        .map(|line| {
            let discounts = discounts_by_line.remove(&line.id).unwrap_or_default();
            let collection_ids = line
                .product_id
                .and_then(|id| collections.get(&id).cloned())
                .unwrap_or_default();
            let variant_discounted_price = catalogue_discounted_unit_price(
                to_decimal(line.undiscounted_base_unit_price),
                line.quantity,
                &line.currency,
                &discounts,
            );
            EditableOrderLineInfo {
                line,
                discounts,
                collection_ids,
                channel_id: order.channel_id,
                variant_discounted_price,
                voucher: None,
                voucher_code: None,
                voucher_denormalized_info: None,
            }
        })
        .collect();

    if let Some(info) = voucher_info
        && is_line_level_voucher(Some(&info.voucher))
    {
        attach_voucher_to_line_info(info, &mut infos);
    }

    if let Some(snapshot) = order.voucher_snapshot() {
        attach_snapshot_to_lines(&snapshot, order.voucher_code.as_deref(), &mut infos);
    }

    Ok(infos)
}

/// Undiscounted unit price minus catalogue promotion discounts per unit
fn catalogue_discounted_unit_price(
    undiscounted: Decimal,
    quantity: i64,
    currency: &str,
    discounts: &[OrderLineDiscount],
) -> Decimal {
    let promotion_total: Decimal = discounts
        .iter()
        .filter(|d| d.discount_type == DiscountType::Promotion)
        .map(|d| to_decimal(d.amount_value))
        .sum();
    let price = undiscounted - unit_price(promotion_total, quantity);
    quantize(price.max(Decimal::ZERO), currency)
}

fn is_line_level_snapshot(snapshot: &VoucherDenormalizedInfo) -> bool {
    snapshot.voucher_type == VoucherType::SpecificProduct || snapshot.apply_once_per_order
}

/// Origin lines still on the order get the snapshot; a once-per-order
/// snapshot goes to the cheapest of them only
fn attach_snapshot_to_lines(
    snapshot: &VoucherDenormalizedInfo,
    voucher_code: Option<&str>,
    infos: &mut [EditableOrderLineInfo],
) {
    if !is_line_level_snapshot(snapshot) {
        return;
    }
    let origin: Vec<usize> = infos
        .iter()
        .enumerate()
        .filter(|(_, info)| snapshot.origin_line_ids.contains(&info.line.id) && !info.line.is_gift)
        .map(|(i, _)| i)
        .collect();

    let selected: Vec<usize> = if snapshot.apply_once_per_order {
        origin
            .iter()
            .copied()
            .min_by_key(|&i| infos[i].variant_discounted_price)
            .into_iter()
            .collect()
    } else {
        origin
    };

    for i in selected {
        let info = &mut infos[i];
        info.voucher_denormalized_info = Some(snapshot.clone());
        if info.voucher_code.is_none() {
            info.voucher_code = voucher_code.map(str::to_string);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::DiscountValueType;

    fn promotion(amount: f64) -> OrderLineDiscount {
        OrderLineDiscount {
            id: 1,
            line_id: 1,
            discount_type: DiscountType::Promotion,
            value_type: DiscountValueType::Fixed,
            value: amount,
            amount_value: amount,
            currency: "USD".to_string(),
            name: None,
            translated_name: None,
            reason: None,
            voucher_id: None,
            voucher_code: None,
            unique_type: Some(DiscountType::Promotion),
            created_at: 0,
        }
    }

    #[test]
    fn test_catalogue_price_subtracts_promotions_per_unit() {
        let price = catalogue_discounted_unit_price(
            to_decimal(10.0),
            4,
            "USD",
            &[promotion(6.0)],
        );
        assert_eq!(price, to_decimal(8.5));
    }

    #[test]
    fn test_catalogue_price_ignores_other_discounts_and_clamps() {
        let mut manual = promotion(100.0);
        manual.discount_type = DiscountType::Manual;
        assert_eq!(
            catalogue_discounted_unit_price(to_decimal(10.0), 1, "USD", &[manual]),
            to_decimal(10.0)
        );
        assert_eq!(
            catalogue_discounted_unit_price(to_decimal(10.0), 1, "USD", &[promotion(30.0)]),
            Decimal::ZERO
        );
    }
}
