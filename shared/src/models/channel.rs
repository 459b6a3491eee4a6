//! Channel Model

use serde::{Deserialize, Serialize};

/// Sales channel (currency and voucher usage policy)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Channel {
    pub id: i64,
    pub name: String,
    pub slug: String,
    /// ISO 4217 code, e.g. "USD"
    pub currency_code: String,
    pub is_active: bool,
    /// Count voucher usage already when a draft order gets a voucher
    pub include_draft_order_in_voucher_usage: bool,
    /// Whether catalogue prices include tax (min-spent is checked on gross then)
    pub prices_entered_with_tax: bool,
    pub created_at: i64,
}

/// Create channel payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelCreate {
    pub name: String,
    pub slug: String,
    pub currency_code: String,
    pub is_active: Option<bool>,
    pub include_draft_order_in_voucher_usage: Option<bool>,
    pub prices_entered_with_tax: Option<bool>,
}
