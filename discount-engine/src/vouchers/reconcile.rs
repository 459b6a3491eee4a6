//! Reconciliation of voucher discount objects
//!
//! Brings the VOUCHER discounts stored on an order and its lines in line with
//! the voucher currently attached, either from live voucher data or from the
//! snapshot frozen when the voucher was applied.

use super::calculator::{
    VoucherInfo, calculate_line_discount_amount_from_voucher,
    calculate_order_line_discount_amount_from_denormalized_voucher,
};
use super::classify::{is_order_level_voucher, is_shipping_voucher};
use super::error::DiscountResult;
use crate::db::repository::{order, order_discount, order_line, order_line_discount};
use crate::money::{to_decimal, to_money_f64, unit_price};
use crate::orders::{EditableOrderLineInfo, fetch_draft_order_lines_info};
use rust_decimal::Decimal;
use shared::models::{
    DiscountInfo, DiscountType, DiscountValueType, Order, OrderDiscount, OrderLine,
    OrderLineDiscount,
};
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::sync::Arc;

/// In-place refresh of a stored discount from a [`DiscountInfo`]
pub trait UpdateDiscount {
    /// Copy changed values, pushing the changed column names into `updated_fields`
    fn update_from(&mut self, data: &DiscountInfo, updated_fields: &mut Vec<&'static str>);
}

fn mark(updated_fields: &mut Vec<&'static str>, field: &'static str) {
    if !updated_fields.contains(&field) {
        updated_fields.push(field);
    }
}

macro_rules! impl_update_discount {
    ($ty:ty) => {
        impl UpdateDiscount for $ty {
            fn update_from(&mut self, data: &DiscountInfo, updated_fields: &mut Vec<&'static str>) {
                if data.voucher_id.is_some() && self.voucher_id != data.voucher_id {
                    self.voucher_id = data.voucher_id;
                    mark(updated_fields, "voucher_id");
                }
                if self.value_type != data.value_type {
                    self.value_type = data.value_type;
                    mark(updated_fields, "value_type");
                }
                if self.value != data.value {
                    self.value = data.value;
                    mark(updated_fields, "value");
                }
                if self.amount_value != data.amount_value {
                    self.amount_value = data.amount_value;
                    mark(updated_fields, "amount_value");
                }
                if self.name != data.name {
                    self.name = data.name.clone();
                    mark(updated_fields, "name");
                }
                if self.translated_name != data.translated_name {
                    self.translated_name = data.translated_name.clone();
                    mark(updated_fields, "translated_name");
                }
                if self.reason != data.reason {
                    self.reason = data.reason.clone();
                    mark(updated_fields, "reason");
                }
                if self.voucher_code != data.voucher_code {
                    self.voucher_code = data.voucher_code.clone();
                    mark(updated_fields, "voucher_code");
                }
            }
        }
    };
}

impl_update_discount!(OrderDiscount);
impl_update_discount!(OrderLineDiscount);

fn voucher_reason(code: Option<&str>) -> String {
    format!("Voucher code: {}", code.unwrap_or_default())
}

// ── Order level ──────────────────────────────────────────────

/// Create, update or delete the order's VOUCHER discount for ENTIRE_ORDER and
/// SHIPPING vouchers
///
/// Also keeps `base_shipping_price` in sync: lowered by a shipping voucher,
/// restored otherwise. `order` is updated in memory and in the database.
pub async fn create_or_update_discount_object_from_order_level_voucher(
    pool: &SqlitePool,
    order: &mut Order,
    voucher_info: Option<&VoucherInfo>,
) -> DiscountResult<()> {
    let voucher = voucher_info.map(|info| &info.voucher);
    let is_manual_discount =
        order_discount::exists_of_type(pool, order.id, DiscountType::Manual).await?;
    let is_order_voucher = is_order_level_voucher(voucher);
    let is_shipping = is_shipping_voucher(voucher);
    let is_line_level = !is_order_voucher && !is_shipping;

    let should_delete = order.voucher_id.is_none()
        || voucher_info.is_none()
        || (is_order_voucher && is_manual_discount)
        || is_line_level;

    if should_delete {
        let deleted = order_discount::delete_by_type(pool, order.id, DiscountType::Voucher).await?;
        if deleted > 0 {
            tracing::debug!(order_id = order.id, "Order voucher discount removed");
        }
        if !is_shipping {
            let undiscounted = order.undiscounted_base_shipping_price;
            set_base_shipping_price(pool, order, undiscounted).await?;
        }
        return Ok(());
    }

    let Some(info) = voucher_info else {
        return Ok(());
    };
    let Some(listing) = info.listing_for(order.channel_id) else {
        return Ok(());
    };

    let currency = order.currency.clone();
    let undiscounted_shipping = to_decimal(order.undiscounted_base_shipping_price);
    let mut discount_amount = Decimal::ZERO;
    if is_order_voucher {
        discount_amount = info.discount_amount_for(to_decimal(order.subtotal_net), order.channel_id)?;
    }
    let base_shipping = if is_shipping {
        discount_amount = info.discount_amount_for(undiscounted_shipping, order.channel_id)?;
        (undiscounted_shipping - discount_amount).max(Decimal::ZERO)
    } else {
        undiscounted_shipping
    };
    set_base_shipping_price(pool, order, to_money_f64(base_shipping, &currency)).await?;

    let data = DiscountInfo {
        discount_type: DiscountType::Voucher,
        value_type: info.voucher.discount_value_type,
        value: listing.discount_value,
        amount_value: to_money_f64(discount_amount, &currency),
        currency: currency.clone(),
        name: Some(info.voucher.name.clone().unwrap_or_default()),
        translated_name: Some(String::new()),
        reason: Some(voucher_reason(order.voucher_code.as_deref())),
        voucher_id: Some(info.voucher.id),
        voucher_code: order.voucher_code.clone(),
        unique_type: None,
    };

    let existing = order_discount::find_by_type(pool, order.id, DiscountType::Voucher).await?;
    match existing.into_iter().next() {
        None => {
            let created = order_discount::create(pool, order.id, &data).await?;
            tracing::debug!(order_id = order.id, amount = created.amount_value, "Order voucher discount created");
        }
        Some(mut discount) => {
            let mut updated_fields = Vec::new();
            discount.update_from(&data, &mut updated_fields);
            if !updated_fields.is_empty() {
                order_discount::update(pool, &discount).await?;
                tracing::debug!(order_id = order.id, fields = ?updated_fields, "Order voucher discount updated");
            }
        }
    }
    Ok(())
}

async fn set_base_shipping_price(pool: &SqlitePool, order: &mut Order, price: f64) -> DiscountResult<()> {
    if order.base_shipping_price != price {
        order::update_base_shipping_price(pool, order.id, price).await?;
        order.base_shipping_price = price;
    }
    Ok(())
}

// ── Line level ───────────────────────────────────────────────

/// Line discount changes computed by [`prepare_line_discount_objects_for_voucher`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineDiscountPlan {
    /// `(line_id, payload)` of discounts to insert
    pub to_create: Vec<(i64, DiscountInfo)>,
    pub to_update: Vec<OrderLineDiscount>,
    pub to_remove: Vec<OrderLineDiscount>,
    pub updated_fields: Vec<&'static str>,
}

impl LineDiscountPlan {
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_update.is_empty() && self.to_remove.is_empty()
    }

    fn affected_line_ids(&self) -> HashSet<i64> {
        self.to_create
            .iter()
            .map(|(line_id, _)| *line_id)
            .chain(self.to_update.iter().map(|d| d.line_id))
            .chain(self.to_remove.iter().map(|d| d.line_id))
            .collect()
    }
}

/// Plan the line-level VOUCHER discounts to create, update and delete
///
/// `None` when there are no lines.
pub fn prepare_line_discount_objects_for_voucher(
    lines_info: &[EditableOrderLineInfo],
    use_denormalized_data: bool,
) -> Option<LineDiscountPlan> {
    if lines_info.is_empty() {
        return None;
    }
    let mut plan = LineDiscountPlan::default();

    for line_info in lines_info {
        let line = &line_info.line;
        let total_price = line_info.variant_discounted_price * Decimal::from(line.quantity);

        // only one voucher can be applied
        let discount_to_update = line_info.get_voucher_discounts().first().map(|d| (*d).clone());
        let has_manual_discount = line_info.get_manual_line_discount().is_some();

        let remove = |plan: &mut LineDiscountPlan| {
            if let Some(discount) = discount_to_update.clone() {
                plan.to_remove.push(discount);
            }
        };

        if (line_info.voucher.is_none() && !use_denormalized_data)
            || line.is_gift
            || has_manual_discount
        {
            remove(&mut plan);
            continue;
        }

        let (amount, name, value, value_type, voucher_id) = if use_denormalized_data {
            let Some(snapshot) = &line_info.voucher_denormalized_info else {
                remove(&mut plan);
                continue;
            };
            (
                calculate_order_line_discount_amount_from_denormalized_voucher(line_info, total_price),
                snapshot.name.clone().unwrap_or_default(),
                snapshot.discount_value,
                snapshot.discount_value_type,
                line_info.voucher.as_ref().map(|v| v.voucher.id),
            )
        } else {
            let Some(voucher_info) = &line_info.voucher else {
                remove(&mut plan);
                continue;
            };
            let listing = voucher_info.listing_for(line_info.channel_id);
            let amount = calculate_line_discount_amount_from_voucher(line_info, total_price);
            let (Some(listing), Ok(amount)) = (listing, amount) else {
                // voucher not listed in the order channel
                remove(&mut plan);
                continue;
            };
            (
                amount,
                voucher_info.voucher.name.clone().unwrap_or_default(),
                listing.discount_value,
                voucher_info.voucher.discount_value_type,
                Some(voucher_info.voucher.id),
            )
        };

        let code = line_info.voucher_code.clone();
        let data = DiscountInfo {
            discount_type: DiscountType::Voucher,
            value_type,
            value,
            amount_value: to_money_f64(amount, &line.currency),
            currency: line.currency.clone(),
            name: Some(name),
            translated_name: None,
            reason: Some(voucher_reason(code.as_deref())),
            voucher_id,
            voucher_code: code,
            unique_type: Some(DiscountType::Voucher),
        };

        match discount_to_update {
            Some(mut discount) => {
                discount.update_from(&data, &mut plan.updated_fields);
                plan.to_update.push(discount);
            }
            None => plan.to_create.push((line.id, data)),
        }
    }

    Some(plan)
}

/// Apply a plan in one transaction and refresh the in-memory discounts
///
/// Returns the ids of the lines whose discounts changed.
pub async fn create_order_line_discount_objects(
    pool: &SqlitePool,
    lines_info: &mut [EditableOrderLineInfo],
    plan: Option<LineDiscountPlan>,
) -> DiscountResult<HashSet<i64>> {
    let Some(plan) = plan else {
        return Ok(HashSet::new());
    };
    if lines_info.is_empty() || plan.is_empty() {
        return Ok(HashSet::new());
    }

    let mut tx = pool.begin().await?;
    for (line_id, data) in &plan.to_create {
        order_line_discount::create(&mut *tx, *line_id, data).await?;
    }
    if !plan.updated_fields.is_empty() {
        for discount in &plan.to_update {
            order_line_discount::update(&mut *tx, discount).await?;
        }
    }
    for discount in &plan.to_remove {
        order_line_discount::delete_by_id(&mut *tx, discount.id).await?;
    }
    tx.commit().await?;

    let affected = plan.affected_line_ids();
    for line_info in lines_info.iter_mut() {
        if affected.contains(&line_info.line.id) {
            line_info.discounts = order_line_discount::find_by_line(pool, line_info.line.id).await?;
        }
    }
    tracing::debug!(
        created = plan.to_create.len(),
        updated = plan.to_update.len(),
        removed = plan.to_remove.len(),
        "Line voucher discounts reconciled"
    );
    Ok(affected)
}

/// `base_unit_price = max(catalogue price - voucher discount per unit, 0)`
pub fn reduce_base_unit_price_for_voucher_discount<'a, I>(lines_info: I)
where
    I: IntoIterator<Item = &'a mut EditableOrderLineInfo>,
{
    for line_info in lines_info {
        let quantity = line_info.line.quantity;
        let voucher_discounts = line_info.get_voucher_discounts();
        let total: Decimal = voucher_discounts
            .iter()
            .map(|d| to_decimal(d.amount_value))
            .sum();
        let voucher_code = voucher_discounts.first().and_then(|d| d.voucher_code.clone());

        let base = (line_info.variant_discounted_price - unit_price(total, quantity)).max(Decimal::ZERO);
        line_info.line.base_unit_price = to_money_f64(base, &line_info.line.currency);
        line_info.line.voucher_code = voucher_code;
    }
}

/// Refresh the unit discount summary of a line from its discounts
///
/// One discount keeps its own type and value; several collapse into a FIXED
/// discount of the combined unit amount.
pub fn update_unit_discount_data(line: &mut OrderLine, discounts: &[OrderLineDiscount]) {
    let total: Decimal = discounts.iter().map(|d| to_decimal(d.amount_value)).sum();
    line.unit_discount_amount = to_money_f64(unit_price(total, line.quantity), &line.currency);

    let reasons: Vec<&str> = discounts
        .iter()
        .filter_map(|d| d.reason.as_deref())
        .filter(|r| !r.is_empty())
        .collect();
    line.unit_discount_reason = if reasons.is_empty() {
        None
    } else {
        Some(reasons.join("; "))
    };

    match discounts {
        [] => {
            line.unit_discount_type = None;
            line.unit_discount_value = 0.0;
        }
        [single] => {
            line.unit_discount_type = Some(single.value_type);
            line.unit_discount_value = single.value;
        }
        _ => {
            line.unit_discount_type = Some(DiscountValueType::Fixed);
            line.unit_discount_value = line.unit_discount_amount;
        }
    }
}

pub fn update_unit_discount_data_on_order_line(line_info: &mut EditableOrderLineInfo) {
    update_unit_discount_data(&mut line_info.line, &line_info.discounts);
}

pub fn update_unit_discount_data_on_order_lines_info<'a, I>(lines_info: I)
where
    I: IntoIterator<Item = &'a mut EditableOrderLineInfo>,
{
    for line_info in lines_info {
        update_unit_discount_data_on_order_line(line_info);
    }
}

/// Reconcile line-level voucher discounts and the derived line prices
pub async fn create_or_update_line_discount_objects_from_voucher(
    pool: &SqlitePool,
    lines_info: &mut [EditableOrderLineInfo],
    use_denormalized_data: bool,
) -> DiscountResult<HashSet<i64>> {
    let plan = prepare_line_discount_objects_for_voucher(lines_info, use_denormalized_data);
    let modified = create_order_line_discount_objects(pool, lines_info, plan).await?;
    if !modified.is_empty() {
        reduce_base_unit_price_for_voucher_discount(
            lines_info.iter_mut().filter(|l| modified.contains(&l.line.id)),
        );
        update_unit_discount_data_on_order_lines_info(
            lines_info.iter_mut().filter(|l| modified.contains(&l.line.id)),
        );
    }
    Ok(modified)
}

/// Full voucher reconciliation of an order: order-level discount, line
/// discounts, then the line price fields
///
/// `use_denormalized_data` recalculates line discounts from the snapshot
/// frozen at application time instead of the current voucher.
pub async fn create_or_update_voucher_discount_objects_for_order(
    pool: &SqlitePool,
    order: &mut Order,
    use_denormalized_data: bool,
) -> DiscountResult<Vec<EditableOrderLineInfo>> {
    let voucher_info = match order.voucher_id {
        Some(id) => VoucherInfo::fetch(pool, id, order.voucher_code.clone())
            .await?
            .map(Arc::new),
        None => None,
    };

    create_or_update_discount_object_from_order_level_voucher(pool, order, voucher_info.as_deref())
        .await?;

    let mut lines_info = fetch_draft_order_lines_info(pool, order, voucher_info.as_ref()).await?;
    create_or_update_line_discount_objects_from_voucher(pool, &mut lines_info, use_denormalized_data)
        .await?;

    let mut tx = pool.begin().await?;
    for line_info in &lines_info {
        order_line::update_discount_fields(&mut *tx, &line_info.line).await?;
    }
    tx.commit().await?;

    tracing::debug!(order_id = order.id, use_denormalized_data, "Order voucher discounts reconciled");
    Ok(lines_info)
}
