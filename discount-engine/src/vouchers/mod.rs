//! Voucher logic
//!
//! - [`classify`] - where a voucher applies
//! - [`calculator`] - discount amounts
//! - [`usage`] - usage counters and their release
//! - [`lookup`] - code resolution and generation
//! - [`validation`] - eligibility rules
//! - [`lines`] / [`checkout`] - attaching vouchers to lines
//! - [`reconcile`] - syncing stored discount objects with the voucher

pub mod calculator;
pub mod checkout;
pub mod classify;
pub mod error;
pub mod lines;
pub mod lookup;
pub mod reconcile;
pub mod usage;
pub mod validation;

pub use calculator::{
    VoucherInfo, calculate_line_discount_amount_from_voucher,
    calculate_order_line_discount_amount_from_denormalized_voucher, get_discount_amount_for,
    get_products_voucher_discount,
};
pub use checkout::{CheckoutInfo, CheckoutLineInfo};
pub use classify::{is_line_level_voucher, is_order_level_voucher, is_shipping_voucher};
pub use error::{DiscountError, DiscountResult};
pub use lines::{
    DiscountableLine, attach_voucher_to_line_info, get_discounted_lines, get_the_cheapest_line,
};
pub use lookup::{
    create_voucher_codes, generate_voucher_code, get_active_voucher_code,
    get_voucher_code_instance,
};
pub use reconcile::{
    LineDiscountPlan, create_or_update_discount_object_from_order_level_voucher,
    create_or_update_line_discount_objects_from_voucher,
    create_or_update_voucher_discount_objects_for_order, prepare_line_discount_objects_for_voucher,
};
pub use usage::{
    activate_voucher_code, add_voucher_usage_by_customer, deactivate_voucher_code,
    decrease_voucher_code_usage_value, increase_voucher_code_usage_value, increase_voucher_usage,
    increase_voucher_usage_for_order, release_voucher_code_usage, release_voucher_usage_for_order,
    remove_voucher_usage_by_customer,
};
pub use validation::{
    CustomerSource, OrderContext, get_customer_email_for_voucher_usage, validate_voucher,
    validate_voucher_for_checkout, validate_voucher_in_order,
};
