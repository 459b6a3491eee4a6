//! Order Model

use super::voucher::{DiscountValueType, VoucherType};
use serde::{Deserialize, Serialize};

/// Order lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum OrderStatus {
    Draft,
    Unconfirmed,
    Unfulfilled,
    PartiallyFulfilled,
    Fulfilled,
    Canceled,
}

impl OrderStatus {
    /// Draft and unconfirmed orders can still be edited (prices recalculated)
    pub fn is_editable(self) -> bool {
        matches!(self, OrderStatus::Draft | OrderStatus::Unconfirmed)
    }
}

/// Order entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Order {
    pub id: i64,
    pub channel_id: i64,
    pub status: OrderStatus,
    pub user_id: Option<i64>,
    /// Email entered on the order (guest checkout)
    pub user_email: Option<String>,
    pub voucher_id: Option<i64>,
    pub voucher_code: Option<String>,
    /// JSON snapshot of the voucher terms (see [`VoucherDenormalizedInfo`])
    pub voucher_denormalized_info: Option<String>,
    pub currency: String,
    pub subtotal_net: f64,
    pub subtotal_gross: f64,
    pub undiscounted_total_gross: f64,
    pub undiscounted_base_shipping_price: f64,
    pub base_shipping_price: f64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Order {
    /// Parse the frozen voucher snapshot, if any
    pub fn voucher_snapshot(&self) -> Option<VoucherDenormalizedInfo> {
        self.voucher_denormalized_info
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
    }
}

/// Create order payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreate {
    pub channel_id: i64,
    pub status: OrderStatus,
    pub user_id: Option<i64>,
    pub user_email: Option<String>,
    pub currency: String,
    pub subtotal_net: f64,
    pub subtotal_gross: f64,
    pub undiscounted_total_gross: f64,
    pub undiscounted_base_shipping_price: f64,
}

/// Order line entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OrderLine {
    pub id: i64,
    pub order_id: i64,
    pub product_id: Option<i64>,
    pub variant_id: Option<i64>,
    pub category_id: Option<i64>,
    pub product_name: String,
    pub quantity: i64,
    /// Free gift added by a promotion; never voucher-discounted
    pub is_gift: bool,
    pub currency: String,
    /// Catalogue price before any discount
    pub undiscounted_base_unit_price: f64,
    /// Unit price after line-level discounts
    pub base_unit_price: f64,
    pub unit_discount_amount: f64,
    pub unit_discount_reason: Option<String>,
    pub unit_discount_type: Option<DiscountValueType>,
    pub unit_discount_value: f64,
    pub voucher_code: Option<String>,
    pub created_at: i64,
}

/// Create order line payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLineCreate {
    pub product_id: Option<i64>,
    pub variant_id: Option<i64>,
    pub category_id: Option<i64>,
    pub product_name: String,
    pub quantity: i64,
    pub is_gift: bool,
    pub undiscounted_base_unit_price: f64,
}

/// Voucher terms frozen at the time the voucher was applied
///
/// Used to recalculate line discounts of draft orders without re-reading
/// (possibly edited) live voucher state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VoucherDenormalizedInfo {
    pub discount_value: f64,
    pub discount_value_type: DiscountValueType,
    pub voucher_type: VoucherType,
    pub reason: Option<String>,
    pub name: Option<String>,
    pub apply_once_per_order: bool,
    /// Lines the voucher was eligible for when it was applied
    pub origin_line_ids: Vec<i64>,
}
