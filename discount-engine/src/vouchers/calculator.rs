//! Voucher discount amount calculation
//!
//! Pure functions over `Decimal`. Amounts are quantized to the currency of
//! the channel listing.

use super::error::{DiscountError, DiscountResult};
use super::lines::DiscountableLine;
use crate::db::repository::{RepoResult, voucher};
use crate::money::{apply_discount_to_value, quantize, to_decimal, unit_price};
use rust_decimal::Decimal;
use shared::models::{
    DiscountValueType, Voucher, VoucherCatalogue, VoucherChannelListing,
};
use sqlx::SqlitePool;

/// Voucher with everything needed to price it: channel terms, catalogue
/// restriction and the code it was applied with
#[derive(Debug, Clone, PartialEq)]
pub struct VoucherInfo {
    pub voucher: Voucher,
    pub voucher_code: Option<String>,
    pub channel_listings: Vec<VoucherChannelListing>,
    pub catalogue: VoucherCatalogue,
}

impl VoucherInfo {
    /// Load a voucher with its listings and catalogue; `None` if it does not exist
    pub async fn fetch(
        pool: &SqlitePool,
        voucher_id: i64,
        voucher_code: Option<String>,
    ) -> RepoResult<Option<Self>> {
        let Some(voucher) = voucher::find_by_id(pool, voucher_id).await? else {
            return Ok(None);
        };
        let channel_listings = voucher::find_channel_listings(pool, voucher_id).await?;
        let catalogue = voucher::find_catalogue(pool, voucher_id).await?;
        Ok(Some(Self {
            voucher,
            voucher_code,
            channel_listings,
            catalogue,
        }))
    }

    pub fn listing_for(&self, channel_id: i64) -> Option<&VoucherChannelListing> {
        self.channel_listings
            .iter()
            .find(|l| l.channel_id == channel_id)
    }

    /// Discount the voucher gives on `price` in the channel
    pub fn discount_amount_for(&self, price: Decimal, channel_id: i64) -> DiscountResult<Decimal> {
        let listing = self.listing_for(channel_id).ok_or_else(|| {
            DiscountError::not_applicable("This voucher is not assigned to this channel")
        })?;
        Ok(get_discount_amount_for(&self.voucher, listing, price))
    }
}

/// Discount amount for a single price under the listing's terms
///
/// Never larger than the price itself.
pub fn get_discount_amount_for(
    voucher: &Voucher,
    listing: &VoucherChannelListing,
    price: Decimal,
) -> Decimal {
    let discounted = apply_discount_to_value(
        to_decimal(listing.discount_value),
        voucher.discount_value_type,
        &listing.currency,
        price,
    );
    if discounted < Decimal::ZERO {
        return price;
    }
    price - discounted
}

/// Discount for a SPECIFIC_PRODUCT voucher over the prices of its lines
///
/// Once-per-order vouchers only discount the cheapest price.
pub fn get_products_voucher_discount(
    voucher_info: &VoucherInfo,
    prices: &[Decimal],
    channel_id: i64,
) -> DiscountResult<Decimal> {
    if voucher_info.voucher.apply_once_per_order {
        return match prices.iter().min() {
            Some(cheapest) => voucher_info.discount_amount_for(*cheapest, channel_id),
            None => Ok(Decimal::ZERO),
        };
    }
    let mut total = Decimal::ZERO;
    for price in prices {
        total += voucher_info.discount_amount_for(*price, channel_id)?;
    }
    Ok(total)
}

/// Voucher discount for a whole line, from live voucher data
///
/// `total_price` is the line total already reduced by catalogue promotions.
pub fn calculate_line_discount_amount_from_voucher<L: DiscountableLine>(
    line: &L,
    total_price: Decimal,
) -> DiscountResult<Decimal> {
    let Some(info) = line.voucher_info() else {
        return Ok(Decimal::ZERO);
    };
    let quantity = line.quantity();
    if quantity <= 0 {
        return Ok(Decimal::ZERO);
    }
    let channel_id = line.channel_id();
    let voucher = &info.voucher;

    let amount = if !voucher.apply_once_per_order {
        if voucher.discount_value_type == DiscountValueType::Percentage {
            info.discount_amount_for(total_price, channel_id)?
                .min(total_price)
        } else {
            let unit = unit_price(total_price, quantity);
            let unit_discount = info.discount_amount_for(unit, channel_id)?;
            (unit_discount * Decimal::from(quantity)).min(total_price)
        }
    } else {
        // a single unit of the line
        let unit = unit_price(total_price, quantity);
        info.discount_amount_for(unit, channel_id)?.min(unit)
    };
    Ok(quantize(amount, line.currency()))
}

/// Voucher discount for a whole line, from the snapshot frozen on the order
pub fn calculate_order_line_discount_amount_from_denormalized_voucher<L: DiscountableLine>(
    line: &L,
    total_price: Decimal,
) -> Decimal {
    let Some(snapshot) = line.voucher_snapshot() else {
        return Decimal::ZERO;
    };
    let quantity = line.quantity();
    if quantity <= 0 {
        return Decimal::ZERO;
    }
    let currency = line.currency();
    let value = to_decimal(snapshot.discount_value);
    let value_type = snapshot.discount_value_type;

    let amount = if !snapshot.apply_once_per_order {
        if value_type == DiscountValueType::Percentage {
            let discounted = apply_discount_to_value(value, value_type, currency, total_price);
            (total_price - discounted).min(total_price)
        } else {
            let unit = unit_price(total_price, quantity);
            let discounted = apply_discount_to_value(value, value_type, currency, unit);
            let unit_discount = (unit - discounted).max(Decimal::ZERO);
            (unit_discount * Decimal::from(quantity)).min(total_price)
        }
    } else {
        let unit = unit_price(total_price, quantity);
        let discounted = apply_discount_to_value(value, value_type, currency, unit);
        let unit_discount = (unit - discounted).max(Decimal::ZERO);
        unit_discount.min(unit)
    };
    quantize(amount, currency)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::vouchers::classify::tests::make_voucher;
    use crate::vouchers::lines::tests::TestLine;
    use shared::models::{VoucherDenormalizedInfo, VoucherType};
    use std::sync::Arc;

    pub(crate) fn make_info(
        voucher_type: VoucherType,
        value_type: DiscountValueType,
        value: f64,
        apply_once_per_order: bool,
    ) -> VoucherInfo {
        let mut voucher = make_voucher(voucher_type, apply_once_per_order);
        voucher.discount_value_type = value_type;
        VoucherInfo {
            voucher,
            voucher_code: Some("SAVE".to_string()),
            channel_listings: vec![VoucherChannelListing {
                id: 1,
                voucher_id: 1,
                channel_id: 1,
                discount_value: value,
                currency: "USD".to_string(),
                min_spent_amount: None,
            }],
            catalogue: VoucherCatalogue::default(),
        }
    }

    fn dec(v: f64) -> Decimal {
        to_decimal(v)
    }

    fn line_with(info: VoucherInfo, quantity: i64, unit: f64) -> TestLine {
        let mut line = TestLine::new(1, quantity, unit);
        line.voucher = Some(Arc::new(info));
        line
    }

    #[test]
    fn test_discount_amount_fixed_and_percentage() {
        let fixed = make_info(VoucherType::EntireOrder, DiscountValueType::Fixed, 5.0, false);
        assert_eq!(fixed.discount_amount_for(dec(20.0), 1).unwrap(), dec(5.0));
        // never more than the price
        assert_eq!(fixed.discount_amount_for(dec(3.0), 1).unwrap(), dec(3.0));

        let pct = make_info(VoucherType::EntireOrder, DiscountValueType::Percentage, 10.0, false);
        assert_eq!(pct.discount_amount_for(dec(19.99), 1).unwrap(), dec(2.0));
    }

    #[test]
    fn test_discount_amount_missing_listing() {
        let info = make_info(VoucherType::EntireOrder, DiscountValueType::Fixed, 5.0, false);
        let err = info.discount_amount_for(dec(20.0), 99).unwrap_err();
        assert_eq!(err.to_string(), "This voucher is not assigned to this channel");
    }

    #[test]
    fn test_products_voucher_discount() {
        let prices = [dec(10.0), dec(4.0), dec(7.0)];
        let info = make_info(VoucherType::SpecificProduct, DiscountValueType::Fixed, 5.0, false);
        // 5 + 4 + 5
        assert_eq!(get_products_voucher_discount(&info, &prices, 1).unwrap(), dec(14.0));

        let once = make_info(VoucherType::SpecificProduct, DiscountValueType::Fixed, 5.0, true);
        assert_eq!(get_products_voucher_discount(&once, &prices, 1).unwrap(), dec(4.0));
        assert_eq!(get_products_voucher_discount(&once, &[], 1).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_line_discount_without_voucher_is_zero() {
        let line = TestLine::new(1, 2, 10.0);
        assert_eq!(
            calculate_line_discount_amount_from_voucher(&line, dec(20.0)).unwrap(),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_line_discount_percentage() {
        let info = make_info(VoucherType::SpecificProduct, DiscountValueType::Percentage, 10.0, false);
        let line = line_with(info, 3, 10.0);
        assert_eq!(
            calculate_line_discount_amount_from_voucher(&line, dec(30.0)).unwrap(),
            dec(3.0)
        );
    }

    #[test]
    fn test_line_discount_fixed_is_per_unit() {
        let info = make_info(VoucherType::SpecificProduct, DiscountValueType::Fixed, 2.0, false);
        let line = line_with(info, 3, 10.0);
        assert_eq!(
            calculate_line_discount_amount_from_voucher(&line, dec(30.0)).unwrap(),
            dec(6.0)
        );
    }

    #[test]
    fn test_line_discount_fixed_capped_at_total() {
        let info = make_info(VoucherType::SpecificProduct, DiscountValueType::Fixed, 50.0, false);
        let line = line_with(info, 2, 10.0);
        assert_eq!(
            calculate_line_discount_amount_from_voucher(&line, dec(20.0)).unwrap(),
            dec(20.0)
        );
    }

    #[test]
    fn test_line_discount_once_per_order_single_unit() {
        let info = make_info(VoucherType::EntireOrder, DiscountValueType::Percentage, 50.0, true);
        let line = line_with(info, 4, 10.0);
        assert_eq!(
            calculate_line_discount_amount_from_voucher(&line, dec(40.0)).unwrap(),
            dec(5.0)
        );
    }

    #[test]
    fn test_line_discount_zero_quantity() {
        let info = make_info(VoucherType::SpecificProduct, DiscountValueType::Fixed, 2.0, false);
        let line = line_with(info, 0, 10.0);
        assert_eq!(
            calculate_line_discount_amount_from_voucher(&line, Decimal::ZERO).unwrap(),
            Decimal::ZERO
        );
    }

    fn snapshot(value_type: DiscountValueType, value: f64, once: bool) -> VoucherDenormalizedInfo {
        VoucherDenormalizedInfo {
            discount_value: value,
            discount_value_type: value_type,
            voucher_type: VoucherType::SpecificProduct,
            reason: None,
            name: Some("Frozen".to_string()),
            apply_once_per_order: once,
            origin_line_ids: vec![1],
        }
    }

    #[test]
    fn test_denormalized_percentage() {
        let mut line = TestLine::new(1, 2, 15.0);
        line.snapshot = Some(snapshot(DiscountValueType::Percentage, 20.0, false));
        assert_eq!(
            calculate_order_line_discount_amount_from_denormalized_voucher(&line, dec(30.0)),
            dec(6.0)
        );
    }

    #[test]
    fn test_denormalized_fixed_per_unit_and_cap() {
        let mut line = TestLine::new(1, 3, 4.0);
        line.snapshot = Some(snapshot(DiscountValueType::Fixed, 1.5, false));
        assert_eq!(
            calculate_order_line_discount_amount_from_denormalized_voucher(&line, dec(12.0)),
            dec(4.5)
        );

        line.snapshot = Some(snapshot(DiscountValueType::Fixed, 10.0, false));
        assert_eq!(
            calculate_order_line_discount_amount_from_denormalized_voucher(&line, dec(12.0)),
            dec(12.0)
        );
    }

    #[test]
    fn test_denormalized_once_per_order() {
        let mut line = TestLine::new(1, 5, 8.0);
        line.snapshot = Some(snapshot(DiscountValueType::Fixed, 3.0, true));
        assert_eq!(
            calculate_order_line_discount_amount_from_denormalized_voucher(&line, dec(40.0)),
            dec(3.0)
        );
    }

    #[test]
    fn test_denormalized_without_snapshot() {
        let line = TestLine::new(1, 2, 10.0);
        assert_eq!(
            calculate_order_line_discount_amount_from_denormalized_voucher(&line, dec(20.0)),
            Decimal::ZERO
        );
    }
}
