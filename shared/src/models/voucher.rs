//! Voucher Model

use serde::{Deserialize, Serialize};

/// What a voucher discounts
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum VoucherType {
    EntireOrder,
    Shipping,
    SpecificProduct,
}

/// How the discount value is interpreted
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum DiscountValueType {
    /// Value is an amount in the channel currency (5.00 = 5 off)
    Fixed,
    /// Value is a percentage (30 = 30% off)
    Percentage,
}

/// Catalogue entity kind a voucher can target
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum CatalogueTargetType {
    Product,
    Variant,
    Category,
    Collection,
}

/// Voucher entity (折扣规则)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Voucher {
    pub id: i64,
    pub name: Option<String>,
    pub voucher_type: VoucherType,
    pub discount_value_type: DiscountValueType,
    /// Global usage limit across all codes (None = unlimited)
    pub usage_limit: Option<i64>,
    /// Each code is deactivated after its first use
    pub single_use: bool,
    /// Only the cheapest eligible unit is discounted
    pub apply_once_per_order: bool,
    pub apply_once_per_customer: bool,
    pub only_for_staff: bool,
    pub min_checkout_items_quantity: Option<i64>,
    /// Active from (Unix millis)
    pub start_date: i64,
    /// Active until (Unix millis, None = open ended)
    pub end_date: Option<i64>,
    pub created_at: i64,
}

/// Create voucher payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoucherCreate {
    pub name: Option<String>,
    pub voucher_type: VoucherType,
    pub discount_value_type: DiscountValueType,
    pub usage_limit: Option<i64>,
    pub single_use: Option<bool>,
    pub apply_once_per_order: Option<bool>,
    pub apply_once_per_customer: Option<bool>,
    pub only_for_staff: Option<bool>,
    pub min_checkout_items_quantity: Option<i64>,
    pub start_date: Option<i64>,
    pub end_date: Option<i64>,
}

/// Per-channel voucher terms
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct VoucherChannelListing {
    pub id: i64,
    pub voucher_id: i64,
    pub channel_id: i64,
    /// Percentage (30 = 30%) or amount depending on the voucher value type
    pub discount_value: f64,
    pub currency: String,
    pub min_spent_amount: Option<f64>,
}

/// Create channel listing payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoucherChannelListingCreate {
    pub channel_id: i64,
    pub discount_value: f64,
    pub currency: String,
    pub min_spent_amount: Option<f64>,
}

/// Catalogue ids a SPECIFIC_PRODUCT voucher is restricted to
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VoucherCatalogue {
    pub product_ids: Vec<i64>,
    pub variant_ids: Vec<i64>,
    pub category_ids: Vec<i64>,
    pub collection_ids: Vec<i64>,
}

impl VoucherCatalogue {
    /// True when no catalogue restriction is configured
    pub fn is_empty(&self) -> bool {
        self.product_ids.is_empty()
            && self.variant_ids.is_empty()
            && self.category_ids.is_empty()
            && self.collection_ids.is_empty()
    }

    pub fn push(&mut self, target_type: CatalogueTargetType, target_id: i64) {
        match target_type {
            CatalogueTargetType::Product => self.product_ids.push(target_id),
            CatalogueTargetType::Variant => self.variant_ids.push(target_id),
            CatalogueTargetType::Category => self.category_ids.push(target_id),
            CatalogueTargetType::Collection => self.collection_ids.push(target_id),
        }
    }
}

/// Redeemable code of a voucher
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct VoucherCode {
    pub id: i64,
    pub code: String,
    pub voucher_id: i64,
    pub used: i64,
    pub is_active: bool,
    pub created_at: i64,
}

/// Customer that already redeemed a code (once-per-customer vouchers)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct VoucherCustomer {
    pub id: i64,
    pub voucher_code_id: i64,
    pub customer_email: String,
}
