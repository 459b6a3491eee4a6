//! Money calculation utilities using rust_decimal for precision
//!
//! Amounts are stored as `f64` (SQLite REAL). Every calculation converts to
//! `Decimal` first and results are quantized to the minor unit of the
//! currency (ISO 4217 exponent, half-up) before they leave this module.

use rust_decimal::prelude::*;
use shared::models::DiscountValueType;

/// Decimal places used when the currency is unknown
const DEFAULT_DECIMAL_PLACES: u32 = 2;

/// Convert f64 to Decimal for calculation
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_else(|| {
        tracing::error!(value = ?value, "Non-finite f64 in monetary calculation, defaulting to zero");
        Decimal::ZERO
    })
}

/// Convert Decimal back to f64 for storage
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    value.normalize().to_f64().unwrap_or_else(|| {
        tracing::error!(value = %value, "Decimal out of f64 range, defaulting to zero");
        0.0
    })
}

/// Minor-unit exponent of the currency (USD → 2, JPY → 0, KWD → 3)
pub fn currency_decimal_places(currency: &str) -> u32 {
    rusty_money::iso::find(currency)
        .map(|c| c.exponent)
        .unwrap_or(DEFAULT_DECIMAL_PLACES)
}

/// Round half-up to the currency precision
#[inline]
pub fn quantize(value: Decimal, currency: &str) -> Decimal {
    value.round_dp_with_strategy(
        currency_decimal_places(currency),
        RoundingStrategy::MidpointAwayFromZero,
    )
}

/// Quantize then convert for storage
#[inline]
pub fn to_money_f64(value: Decimal, currency: &str) -> f64 {
    to_f64(quantize(value, currency))
}

/// `price - value`, never below zero
pub fn fixed_discount(price: Decimal, value: Decimal) -> Decimal {
    (price - value).max(Decimal::ZERO)
}

/// `price - round(price * percentage / 100)`, never below zero
pub fn percentage_discount(price: Decimal, percentage: Decimal, currency: &str) -> Decimal {
    let discount = quantize(price * percentage / Decimal::ONE_HUNDRED, currency);
    (price - discount).max(Decimal::ZERO)
}

/// Discounted price after applying a FIXED or PERCENTAGE value
pub fn apply_discount_to_value(
    value: Decimal,
    value_type: DiscountValueType,
    currency: &str,
    price: Decimal,
) -> Decimal {
    match value_type {
        DiscountValueType::Fixed => fixed_discount(price, value),
        DiscountValueType::Percentage => percentage_discount(price, value, currency),
    }
}

/// Price per unit; zero quantity yields zero
pub fn unit_price(total: Decimal, quantity: i64) -> Decimal {
    if quantity <= 0 {
        return Decimal::ZERO;
    }
    total / Decimal::from(quantity)
}

/// Render an amount with the currency precision, e.g. `"10.00 USD"`
pub fn format_amount(value: Decimal, currency: &str) -> String {
    let places = currency_decimal_places(currency) as usize;
    format!("{:.places$} {currency}", quantize(value, currency))
}
