//! Checkout Model
//!
//! Checkouts are persisted by the storefront; the engine only reads them.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Checkout {
    pub id: i64,
    pub channel_id: i64,
    pub user_id: Option<i64>,
    pub email: Option<String>,
    pub currency: String,
    pub voucher_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckoutLine {
    pub id: i64,
    pub product_id: Option<i64>,
    pub variant_id: Option<i64>,
    pub category_id: Option<i64>,
    pub collection_ids: Vec<i64>,
    pub quantity: i64,
    pub is_gift: bool,
    /// Unit price after catalogue promotions
    pub unit_price: f64,
}
