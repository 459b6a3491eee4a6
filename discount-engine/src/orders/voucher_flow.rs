//! Attaching and detaching vouchers on editable orders

use super::fetch::fetch_draft_order_lines_info;
use super::line_info::EditableOrderLineInfo;
use crate::db::repository::{RepoError, channel, order, order_line};
use crate::vouchers::reconcile::create_or_update_voucher_discount_objects_for_order;
use crate::vouchers::{
    DiscountError, DiscountResult, OrderContext, VoucherInfo, get_voucher_code_instance,
    validate_voucher_in_order,
};
use shared::models::{Order, VoucherDenormalizedInfo};
use sqlx::SqlitePool;
use std::sync::Arc;

async fn load_editable_order(pool: &SqlitePool, order_id: i64) -> DiscountResult<Order> {
    let order = order::find_by_id(pool, order_id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Order {order_id} not found")))?;
    if !order.status.is_editable() {
        return Err(DiscountError::InvalidInput(format!(
            "Order {order_id} can no longer be edited"
        )));
    }
    Ok(order)
}

/// Freeze the voucher terms and the lines it applies to right now
async fn build_snapshot(
    pool: &SqlitePool,
    order: &Order,
    voucher_info: &Arc<VoucherInfo>,
) -> DiscountResult<VoucherDenormalizedInfo> {
    let listing = voucher_info.listing_for(order.channel_id).ok_or_else(|| {
        DiscountError::not_applicable("This voucher is not assigned to this channel")
    })?;

    let mut live_order = order.clone();
    live_order.voucher_denormalized_info = None;
    let lines_info = fetch_draft_order_lines_info(pool, &live_order, Some(voucher_info)).await?;
    let origin_line_ids = lines_info
        .iter()
        .filter(|info| info.voucher.is_some())
        .map(|info| info.line.id)
        .collect();

    let voucher = &voucher_info.voucher;
    Ok(VoucherDenormalizedInfo {
        discount_value: listing.discount_value,
        discount_value_type: voucher.discount_value_type,
        voucher_type: voucher.voucher_type,
        reason: Some(format!(
            "Voucher code: {}",
            voucher_info.voucher_code.as_deref().unwrap_or_default()
        )),
        name: voucher.name.clone(),
        apply_once_per_order: voucher.apply_once_per_order,
        origin_line_ids,
    })
}

/// Apply a voucher code to an editable order
///
/// The code must be valid in the order channel at `now` and the voucher's
/// rules must accept the order. The voucher terms are frozen on the order and
/// its discount objects reconciled.
pub async fn attach_voucher_to_order(
    pool: &SqlitePool,
    order_id: i64,
    code: &str,
    now: i64,
) -> DiscountResult<Order> {
    let order = load_editable_order(pool, order_id).await?;
    let channel = channel::find_by_id(pool, order.channel_id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Channel {} not found", order.channel_id)))?;

    let code_instance = get_voucher_code_instance(pool, code, &channel.slug, now).await?;
    let voucher_info = VoucherInfo::fetch(pool, code_instance.voucher_id, Some(code_instance.code.clone()))
        .await?
        .map(Arc::new)
        .ok_or(DiscountError::InvalidPromoCode)?;

    let mut candidate = order.clone();
    candidate.voucher_id = Some(voucher_info.voucher.id);
    candidate.voucher_code = Some(code_instance.code.clone());
    let ctx = OrderContext::load(pool, candidate).await?;
    validate_voucher_in_order(pool, &ctx).await?;

    let snapshot = build_snapshot(pool, &order, &voucher_info).await?;
    let raw = serde_json::to_string(&snapshot)
        .map_err(|e| DiscountError::InvalidInput(format!("Unserializable voucher snapshot: {e}")))?;
    order::update_voucher(
        pool,
        order_id,
        Some(voucher_info.voucher.id),
        Some(&code_instance.code),
        Some(&raw),
    )
    .await?;

    let mut order = load_editable_order(pool, order_id).await?;
    create_or_update_voucher_discount_objects_for_order(pool, &mut order, false).await?;
    tracing::info!(order_id, code = %code_instance.code, "Voucher attached to order");
    Ok(order)
}

/// Remove the voucher from an editable order and drop its discounts
pub async fn detach_voucher_from_order(pool: &SqlitePool, order_id: i64) -> DiscountResult<Order> {
    load_editable_order(pool, order_id).await?;
    order::update_voucher(pool, order_id, None, None, None).await?;

    let mut order = load_editable_order(pool, order_id).await?;
    create_or_update_voucher_discount_objects_for_order(pool, &mut order, false).await?;
    tracing::info!(order_id, "Voucher detached from order");
    Ok(order)
}

/// Re-run voucher reconciliation after lines were added, removed or changed
///
/// Orders carrying a voucher snapshot are recalculated from the frozen terms.
pub async fn recalculate_after_line_change(
    pool: &SqlitePool,
    order_id: i64,
) -> DiscountResult<Vec<EditableOrderLineInfo>> {
    let mut order = load_editable_order(pool, order_id).await?;
    let use_denormalized_data = order.voucher_snapshot().is_some();
    create_or_update_voucher_discount_objects_for_order(pool, &mut order, use_denormalized_data).await
}

/// Change a line quantity and recalculate the voucher discounts
///
/// Quantity 0 deletes the line together with its discounts.
pub async fn change_order_line_quantity(
    pool: &SqlitePool,
    line_id: i64,
    quantity: i64,
) -> DiscountResult<Vec<EditableOrderLineInfo>> {
    let line = order_line::find_by_id(pool, line_id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Order line {line_id} not found")))?;
    load_editable_order(pool, line.order_id).await?;
    if quantity == 0 {
        order_line::delete(pool, line_id).await?;
        tracing::debug!(line_id, order_id = line.order_id, "Order line deleted");
    } else {
        order_line::update_quantity(pool, line_id, quantity).await?;
        tracing::debug!(line_id, old = line.quantity, new = quantity, "Order line quantity changed");
    }
    recalculate_after_line_change(pool, line.order_id).await
}
