//! Checkout view used to validate and attach vouchers before an order exists

use super::calculator::VoucherInfo;
use super::lines::DiscountableLine;
use super::validation::CustomerSource;
use crate::money::{quantize, to_decimal};
use rust_decimal::Decimal;
use shared::models::{Channel, Checkout, CheckoutLine, User};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct CheckoutLineInfo {
    pub line: CheckoutLine,
    pub channel_id: i64,
    pub currency: String,
    pub voucher: Option<Arc<VoucherInfo>>,
    pub voucher_code: Option<String>,
}

impl CheckoutLineInfo {
    pub fn new(line: CheckoutLine, channel: &Channel) -> Self {
        Self {
            line,
            channel_id: channel.id,
            currency: channel.currency_code.clone(),
            voucher: None,
            voucher_code: None,
        }
    }
}

impl DiscountableLine for CheckoutLineInfo {
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
        &self.line.collection_ids
    }

    fn is_gift(&self) -> bool {
        self.line.is_gift
    }

    fn quantity(&self) -> i64 {
        self.line.quantity
    }

    fn currency(&self) -> &str {
        &self.currency
    }

    fn channel_id(&self) -> i64 {
        self.channel_id
    }

    fn variant_discounted_price(&self) -> Decimal {
        to_decimal(self.line.unit_price)
    }

    fn voucher_info(&self) -> Option<&VoucherInfo> {
        self.voucher.as_deref()
    }

    fn set_voucher(&mut self, voucher: Arc<VoucherInfo>, voucher_code: Option<String>) {
        self.voucher = Some(voucher);
        self.voucher_code = voucher_code;
    }
}

#[derive(Debug, Clone)]
pub struct CheckoutInfo {
    pub checkout: Checkout,
    pub channel: Channel,
    pub user: Option<User>,
    pub lines: Vec<CheckoutLineInfo>,
}

impl CheckoutInfo {
    pub fn new(checkout: Checkout, channel: Channel, user: Option<User>, lines: Vec<CheckoutLine>) -> Self {
        let lines = lines
            .into_iter()
            .map(|line| CheckoutLineInfo::new(line, &channel))
            .collect();
        Self {
            checkout,
            channel,
            user,
            lines,
        }
    }

    /// Total number of units
    pub fn quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.line.quantity).sum()
    }

    /// Σ unit price × quantity, before vouchers
    pub fn base_subtotal(&self) -> Decimal {
        let total: Decimal = self
            .lines
            .iter()
            .map(|l| l.variant_discounted_price() * Decimal::from(l.line.quantity))
            .sum();
        quantize(total, &self.checkout.currency)
    }
}

impl CustomerSource for CheckoutInfo {
    fn customer_user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    fn customer_email(&self) -> Option<&str> {
        self.checkout.email.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;
    use crate::vouchers::calculator::tests::make_info;
    use crate::vouchers::lines::attach_voucher_to_line_info;
    use crate::vouchers::validation::validate_voucher_for_checkout;
    use shared::models::{DiscountValueType, VoucherType};

    fn checkout_info(lines: Vec<(i64, i64, f64)>) -> CheckoutInfo {
        let channel = Channel {
            id: 1,
            name: "Default".to_string(),
            slug: "default".to_string(),
            currency_code: "USD".to_string(),
            is_active: true,
            include_draft_order_in_voucher_usage: false,
            prices_entered_with_tax: true,
            created_at: 0,
        };
        let checkout = Checkout {
            id: 1,
            channel_id: 1,
            user_id: None,
            email: Some("guest@example.com".to_string()),
            currency: "USD".to_string(),
            voucher_code: None,
        };
        let lines = lines
            .into_iter()
            .map(|(id, quantity, unit_price)| CheckoutLine {
                id,
                product_id: Some(id),
                variant_id: Some(id),
                category_id: None,
                collection_ids: vec![],
                quantity,
                is_gift: false,
                unit_price,
            })
            .collect();
        CheckoutInfo::new(checkout, channel, None, lines)
    }

    #[test]
    fn test_quantity_and_subtotal() {
        let info = checkout_info(vec![(1, 2, 9.99), (2, 1, 0.02)]);
        assert_eq!(info.quantity(), 3);
        assert_eq!(info.base_subtotal(), to_decimal(20.0));
    }

    #[test]
    fn test_attach_cheapest_checkout_line() {
        let mut info = checkout_info(vec![(1, 1, 10.0), (2, 3, 4.0)]);
        let voucher = make_info(VoucherType::EntireOrder, DiscountValueType::Fixed, 1.0, true);
        attach_voucher_to_line_info(&Arc::new(voucher), &mut info.lines);
        assert!(info.lines[0].voucher.is_none());
        assert_eq!(info.lines[1].voucher_code.as_deref(), Some("SAVE"));
    }

    #[tokio::test]
    async fn test_checkout_min_quantity() {
        let db = DbService::in_memory().await.unwrap();
        let info = checkout_info(vec![(1, 1, 10.0)]);
        let mut voucher = make_info(VoucherType::EntireOrder, DiscountValueType::Fixed, 1.0, false);
        voucher.voucher.min_checkout_items_quantity = Some(2);
        assert!(validate_voucher_for_checkout(&db.pool, &voucher, &info).await.is_err());

        let info = checkout_info(vec![(1, 2, 10.0)]);
        validate_voucher_for_checkout(&db.pool, &voucher, &info)
            .await
            .unwrap();
    }
}
