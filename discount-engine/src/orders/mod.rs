//! Order discount flows
//!
//! - [`fetch`] - line infos of editable orders
//! - [`voucher_flow`] - attach / detach vouchers, recalculation
//! - [`discounts`] - manual discounts and discount totals

pub mod discounts;
pub mod fetch;
pub mod line_info;
pub mod voucher_flow;

pub use discounts::{
    ManualDiscountInput, ManualLineDiscountInput, create_manual_order_discount,
    get_order_discounts, get_total_order_discount, get_total_order_discount_excluding_shipping,
    get_voucher_discount_assigned_to_order, remove_discount_from_order_line,
    remove_order_discount_from_order, update_discount_for_order_line,
};
pub use fetch::fetch_draft_order_lines_info;
pub use line_info::EditableOrderLineInfo;
pub use voucher_flow::{
    attach_voucher_to_order, change_order_line_quantity, detach_voucher_from_order,
    recalculate_after_line_change,
};
