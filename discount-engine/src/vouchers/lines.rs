//! Attaching vouchers to order or checkout lines

use super::calculator::VoucherInfo;
use rust_decimal::Decimal;
use shared::models::{VoucherCatalogue, VoucherDenormalizedInfo, VoucherType};
use std::sync::Arc;

/// A priced line a voucher can be attached to (order line or checkout line)
pub trait DiscountableLine {
    fn line_id(&self) -> i64;
    fn product_id(&self) -> Option<i64>;
    fn variant_id(&self) -> Option<i64>;
    fn category_id(&self) -> Option<i64>;
    fn collection_ids(&self) -> &[i64];
    fn is_gift(&self) -> bool;
    fn quantity(&self) -> i64;
    fn currency(&self) -> &str;
    fn channel_id(&self) -> i64;
    /// Unit price after catalogue promotions, before vouchers
    fn variant_discounted_price(&self) -> Decimal;
    fn voucher_info(&self) -> Option<&VoucherInfo>;
    fn set_voucher(&mut self, voucher: Arc<VoucherInfo>, voucher_code: Option<String>);

    /// Frozen voucher terms, only order lines carry them
    fn voucher_snapshot(&self) -> Option<&VoucherDenormalizedInfo> {
        None
    }
}

fn matches_catalogue<L: DiscountableLine>(line: &L, catalogue: &VoucherCatalogue) -> bool {
    if line.is_gift() {
        return false;
    }
    let (Some(variant_id), Some(product_id)) = (line.variant_id(), line.product_id()) else {
        return false;
    };
    catalogue.variant_ids.contains(&variant_id)
        || catalogue.product_ids.contains(&product_id)
        || line
            .category_id()
            .is_some_and(|c| catalogue.category_ids.contains(&c))
        || line
            .collection_ids()
            .iter()
            .any(|c| catalogue.collection_ids.contains(c))
}

fn discounted_line_indices<L: DiscountableLine>(lines: &[L], voucher_info: &VoucherInfo) -> Vec<usize> {
    if voucher_info.catalogue.is_empty() {
        // no restriction: every line is discounted
        return (0..lines.len()).collect();
    }
    lines
        .iter()
        .enumerate()
        .filter(|(_, line)| matches_catalogue(*line, &voucher_info.catalogue))
        .map(|(i, _)| i)
        .collect()
}

/// Lines the voucher's catalogue restriction applies to
pub fn get_discounted_lines<'a, L: DiscountableLine>(
    lines: &'a [L],
    voucher_info: &VoucherInfo,
) -> Vec<&'a L> {
    discounted_line_indices(lines, voucher_info)
        .into_iter()
        .map(|i| &lines[i])
        .collect()
}

/// Line with the lowest catalogue-discounted unit price (first one on ties)
pub fn get_the_cheapest_line<'a, L, I>(lines: I) -> Option<&'a L>
where
    L: DiscountableLine + 'a,
    I: IntoIterator<Item = &'a L>,
{
    lines
        .into_iter()
        .min_by_key(|line| line.variant_discounted_price())
}

/// Attach a SPECIFIC_PRODUCT or once-per-order voucher to the lines it discounts
pub fn attach_voucher_to_line_info<L: DiscountableLine>(
    voucher_info: &Arc<VoucherInfo>,
    lines: &mut [L],
) {
    let voucher = &voucher_info.voucher;
    let mut candidates: Vec<usize> = (0..lines.len()).collect();
    let mut selected = Vec::new();

    if voucher.voucher_type == VoucherType::SpecificProduct {
        selected = discounted_line_indices(lines, voucher_info);
        candidates = selected.clone();
    }
    if voucher.apply_once_per_order {
        let cheapest = candidates
            .iter()
            .copied()
            .filter(|&i| !lines[i].is_gift())
            .min_by_key(|&i| lines[i].variant_discounted_price());
        if let Some(i) = cheapest {
            selected = vec![i];
        }
    }

    for i in selected {
        lines[i].set_voucher(Arc::clone(voucher_info), voucher_info.voucher_code.clone());
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::money::to_decimal;
    use crate::vouchers::calculator::tests::make_info;
    use shared::models::DiscountValueType;

    /// Minimal in-memory line for calculator tests
    #[derive(Debug, Clone)]
    pub(crate) struct TestLine {
        pub id: i64,
        pub product_id: Option<i64>,
        pub variant_id: Option<i64>,
        pub category_id: Option<i64>,
        pub collection_ids: Vec<i64>,
        pub is_gift: bool,
        pub quantity: i64,
        pub unit_price: Decimal,
        pub voucher: Option<Arc<VoucherInfo>>,
        pub voucher_code: Option<String>,
        pub snapshot: Option<VoucherDenormalizedInfo>,
    }

    impl TestLine {
        pub(crate) fn new(id: i64, quantity: i64, unit_price: f64) -> Self {
            Self {
                id,
                product_id: Some(id * 10),
                variant_id: Some(id * 100),
                category_id: None,
                collection_ids: vec![],
                is_gift: false,
                quantity,
                unit_price: to_decimal(unit_price),
                voucher: None,
                voucher_code: None,
                snapshot: None,
            }
        }
    }

    impl DiscountableLine for TestLine {
        fn line_id(&self) -> i64 {
            self.id
        }
        fn product_id(&self) -> Option<i64> {
            self.product_id
        }
        fn variant_id(&self) -> Option<i64> {
            self.variant_id
        }
        fn category_id(&self) -> Option<i64> {
            self.category_id
        }
        fn collection_ids(&self) -> &[i64] {
            &self.collection_ids
        }
        fn is_gift(&self) -> bool {
            self.is_gift
        }
        fn quantity(&self) -> i64 {
            self.quantity
        }
        fn currency(&self) -> &str {
            "USD"
        }
        fn channel_id(&self) -> i64 {
            1
        }
        fn variant_discounted_price(&self) -> Decimal {
            self.unit_price
        }
        fn voucher_info(&self) -> Option<&VoucherInfo> {
            self.voucher.as_deref()
        }
        fn set_voucher(&mut self, voucher: Arc<VoucherInfo>, voucher_code: Option<String>) {
            self.voucher = Some(voucher);
            self.voucher_code = voucher_code;
        }
        fn voucher_snapshot(&self) -> Option<&VoucherDenormalizedInfo> {
            self.snapshot.as_ref()
        }
    }

    fn specific(once: bool) -> VoucherInfo {
        make_info(VoucherType::SpecificProduct, DiscountValueType::Fixed, 1.0, once)
    }

    fn ids(lines: &[&TestLine]) -> Vec<i64> {
        lines.iter().map(|l| l.id).collect()
    }

    #[test]
    fn test_unrestricted_voucher_discounts_all_lines() {
        let lines = vec![TestLine::new(1, 1, 5.0), TestLine::new(2, 1, 3.0)];
        let info = specific(false);
        assert_eq!(ids(&get_discounted_lines(&lines, &info)), vec![1, 2]);
    }

    #[test]
    fn test_discounted_lines_match_any_target() {
        let mut lines = vec![
            TestLine::new(1, 1, 5.0),
            TestLine::new(2, 1, 3.0),
            TestLine::new(3, 1, 3.0),
            TestLine::new(4, 1, 3.0),
            TestLine::new(5, 1, 3.0),
        ];
        lines[2].category_id = Some(7);
        lines[3].collection_ids = vec![8, 9];

        let mut info = specific(false);
        info.catalogue.product_ids = vec![10];
        info.catalogue.variant_ids = vec![200];
        info.catalogue.category_ids = vec![7];
        info.catalogue.collection_ids = vec![9];

        assert_eq!(ids(&get_discounted_lines(&lines, &info)), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_gift_and_deleted_variant_lines_excluded() {
        let mut lines = vec![TestLine::new(1, 1, 5.0), TestLine::new(2, 1, 3.0)];
        lines[0].is_gift = true;
        lines[1].variant_id = None;

        let mut info = specific(false);
        info.catalogue.product_ids = vec![10, 20];
        assert!(get_discounted_lines(&lines, &info).is_empty());
    }

    #[test]
    fn test_cheapest_line_first_on_tie() {
        let lines = vec![
            TestLine::new(1, 1, 5.0),
            TestLine::new(2, 1, 3.0),
            TestLine::new(3, 1, 3.0),
        ];
        assert_eq!(get_the_cheapest_line(&lines).map(|l| l.id), Some(2));
        assert!(get_the_cheapest_line::<TestLine, _>(&[]).is_none());
    }

    #[test]
    fn test_attach_specific_product() {
        let mut lines = vec![TestLine::new(1, 1, 5.0), TestLine::new(2, 1, 3.0)];
        let mut info = specific(false);
        info.catalogue.product_ids = vec![20];
        attach_voucher_to_line_info(&Arc::new(info), &mut lines);

        assert!(lines[0].voucher.is_none());
        assert!(lines[1].voucher.is_some());
        assert_eq!(lines[1].voucher_code.as_deref(), Some("SAVE"));
    }

    #[test]
    fn test_attach_once_per_order_picks_cheapest_candidate() {
        let mut lines = vec![
            TestLine::new(1, 1, 5.0),
            TestLine::new(2, 1, 3.0),
            TestLine::new(3, 1, 1.0),
        ];
        let mut info = specific(true);
        info.catalogue.product_ids = vec![10, 20];
        attach_voucher_to_line_info(&Arc::new(info), &mut lines);

        // line 3 is cheaper but not targeted
        let attached: Vec<i64> = lines.iter().filter(|l| l.voucher.is_some()).map(|l| l.id).collect();
        assert_eq!(attached, vec![2]);
    }

    #[test]
    fn test_attach_entire_order_once_per_order() {
        let mut lines = vec![TestLine::new(1, 1, 5.0), TestLine::new(2, 1, 8.0)];
        let info = make_info(VoucherType::EntireOrder, DiscountValueType::Percentage, 10.0, true);
        attach_voucher_to_line_info(&Arc::new(info), &mut lines);

        assert!(lines[0].voucher.is_some());
        assert!(lines[1].voucher.is_none());
    }

    #[test]
    fn test_attach_once_per_order_skips_gift_lines() {
        let mut lines = vec![TestLine::new(1, 1, 5.0), TestLine::new(2, 1, 0.5)];
        lines[1].is_gift = true;
        let info = make_info(VoucherType::EntireOrder, DiscountValueType::Percentage, 10.0, true);
        attach_voucher_to_line_info(&Arc::new(info), &mut lines);

        assert!(lines[0].voucher.is_some());
        assert!(lines[1].voucher.is_none());
    }

    #[test]
    fn test_attach_entire_order_voucher_touches_nothing() {
        let mut lines = vec![TestLine::new(1, 1, 5.0)];
        let info = make_info(VoucherType::EntireOrder, DiscountValueType::Percentage, 10.0, false);
        attach_voucher_to_line_info(&Arc::new(info), &mut lines);
        assert!(lines[0].voucher.is_none());
    }
}
