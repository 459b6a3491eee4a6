//! Editable order line with its discounts and voucher attachment

use crate::vouchers::{DiscountableLine, VoucherInfo};
use rust_decimal::Decimal;
use shared::models::{DiscountType, OrderLine, OrderLineDiscount, VoucherDenormalizedInfo};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct EditableOrderLineInfo {
    pub line: OrderLine,
    pub discounts: Vec<OrderLineDiscount>,
    pub collection_ids: Vec<i64>,
    pub channel_id: i64,
    /// Unit price after catalogue promotions
    pub variant_discounted_price: Decimal,
    /// Live voucher, when the line is eligible
    pub voucher: Option<Arc<VoucherInfo>>,
    pub voucher_code: Option<String>,
    /// Frozen voucher terms, when the line was eligible at application time
    pub voucher_denormalized_info: Option<VoucherDenormalizedInfo>,
}

impl EditableOrderLineInfo {
    pub fn get_voucher_discounts(&self) -> Vec<&OrderLineDiscount> {
        self.discounts_of(DiscountType::Voucher).collect()
    }

    pub fn get_promotion_discounts(&self) -> Vec<&OrderLineDiscount> {
        self.discounts_of(DiscountType::Promotion).collect()
    }

    /// Manual line discounts never stack with other line discounts
    pub fn get_manual_line_discount(&self) -> Option<&OrderLineDiscount> {
        self.discounts_of(DiscountType::Manual).next()
    }

    fn discounts_of(&self, discount_type: DiscountType) -> impl Iterator<Item = &OrderLineDiscount> {
        self.discounts
            .iter()
            .filter(move |d| d.discount_type == discount_type)
    }
}

impl DiscountableLine for EditableOrderLineInfo {
    fn line_id(&self) -> i64 {
        self.line.id
    }

    fn product_id(&self) -> Option<i64> {
        self.line.product_id
    }

    fn variant_id(&self) -> Option<i64> {
        self.line.variant_id
    }

    fn category_id(&self) -> Option<i64> {
        self.line.category_id
    }

    fn collection_ids(&self) -> &[i64] {
        &self.collection_ids
    }

    fn is_gift(&self) -> bool {
        self.line.is_gift
    }

    fn quantity(&self) -> i64 {
        self.line.quantity
    }

    fn currency(&self) -> &str {
        &self.line.currency
    }

    fn channel_id(&self) -> i64 {
        self.channel_id
    }

    fn variant_discounted_price(&self) -> Decimal {
        self.variant_discounted_price
    }

    fn voucher_info(&self) -> Option<&VoucherInfo> {
        self.voucher.as_deref()
    }

    fn set_voucher(&mut self, voucher: Arc<VoucherInfo>, voucher_code: Option<String>) {
        self.voucher = Some(voucher);
        self.voucher_code = voucher_code;
    }

    fn voucher_snapshot(&self) -> Option<&VoucherDenormalizedInfo> {
        self.voucher_denormalized_info.as_ref()
    }
}
