//! Where a voucher applies: the whole order, shipping or single lines

use shared::models::{Voucher, VoucherType};

/// ENTIRE_ORDER voucher discounting the order subtotal
pub fn is_order_level_voucher(voucher: Option<&Voucher>) -> bool {
    voucher.is_some_and(|v| v.voucher_type == VoucherType::EntireOrder && !v.apply_once_per_order)
}

pub fn is_shipping_voucher(voucher: Option<&Voucher>) -> bool {
    voucher.is_some_and(|v| v.voucher_type == VoucherType::Shipping)
}

/// SPECIFIC_PRODUCT voucher, or any voucher applied once per order (cheapest line)
pub fn is_line_level_voucher(voucher: Option<&Voucher>) -> bool {
    voucher.is_some_and(|v| v.voucher_type == VoucherType::SpecificProduct || v.apply_once_per_order)
}
