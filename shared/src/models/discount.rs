//! Discount objects attached to orders and order lines

use super::voucher::DiscountValueType;
use serde::{Deserialize, Serialize};

/// Origin of a discount object
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum DiscountType {
    /// Entered by staff
    Manual,
    Voucher,
    /// Catalogue promotion (lowers the variant price)
    Promotion,
    OrderPromotion,
}

/// Discount applied to the whole order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OrderDiscount {
    pub id: i64,
    pub order_id: i64,
    pub discount_type: DiscountType,
    pub value_type: DiscountValueType,
    /// Rule value (percentage or fixed amount)
    pub value: f64,
    /// Resulting discount amount
    pub amount_value: f64,
    pub currency: String,
    pub name: Option<String>,
    pub translated_name: Option<String>,
    pub reason: Option<String>,
    pub voucher_id: Option<i64>,
    pub voucher_code: Option<String>,
    pub created_at: i64,
}

/// Discount applied to a single order line
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OrderLineDiscount {
    pub id: i64,
    pub line_id: i64,
    pub discount_type: DiscountType,
    pub value_type: DiscountValueType,
    pub value: f64,
    /// Discount amount for the whole line (all units)
    pub amount_value: f64,
    pub currency: String,
    pub name: Option<String>,
    pub translated_name: Option<String>,
    pub reason: Option<String>,
    pub voucher_id: Option<i64>,
    pub voucher_code: Option<String>,
    /// At most one discount per (line, unique_type)
    pub unique_type: Option<DiscountType>,
    pub created_at: i64,
}

/// Payload used to create or refresh a discount object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscountInfo {
    pub discount_type: DiscountType,
    pub value_type: DiscountValueType,
    pub value: f64,
    pub amount_value: f64,
    pub currency: String,
    pub name: Option<String>,
    pub translated_name: Option<String>,
    pub reason: Option<String>,
    pub voucher_id: Option<i64>,
    pub voucher_code: Option<String>,
    pub unique_type: Option<DiscountType>,
}
