//! Pricing for a seller-scoped set of cart lines.
//!
//! The shipping tier is an incentive curve, not a cost model: a single
//! unit ships at the line's own per-unit fee, two units pay the sum of
//! their per-line fees, and three or more units flatten to a fixed fee
//! regardless of how expensive the individual fees would have been.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::cart_item;
use crate::entities::order::ShippingFeeBasis;

/// Marketplace surcharge on the discounted subtotal.
pub const PLATFORM_FEE_RATE: Decimal = dec!(0.10);

/// Fixed shipping fee once a checkout reaches the flat tier.
pub const FLAT_SHIPPING_FEE: Decimal = dec!(100);

/// Total unit count at which shipping flattens.
pub const FLAT_SHIPPING_THRESHOLD: i32 = 3;

/// Priced view of one checkout, recomputed whenever the line set
/// changes and snapshotted onto the order at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PricingBreakdown {
    pub subtotal: Decimal,
    pub platform_fee: Decimal,
    pub shipping_fee: Decimal,
    pub shipping_fee_basis: ShippingFeeBasis,
    /// How much the flat tier saved against summed per-line fees.
    /// Display-only; never subtracted from `shipping_fee`.
    pub shipping_savings: Decimal,
    pub total: Decimal,
}

fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Effective per-unit price after the line's percent discount.
pub fn discounted_unit_price(line: &cart_item::Model) -> Decimal {
    round2(line.unit_price * (Decimal::ONE - line.discount_percent / dec!(100)))
}

/// Line subtotal: discounted unit price times quantity.
pub fn line_subtotal(line: &cart_item::Model) -> Decimal {
    discounted_unit_price(line) * Decimal::from(line.quantity)
}

/// Sum of per-line shipping fees (`fee_per_unit * quantity`).
fn summed_shipping(lines: &[cart_item::Model]) -> Decimal {
    lines
        .iter()
        .map(|line| line.shipping_fee_per_unit * Decimal::from(line.quantity))
        .sum()
}

/// Computes the full breakdown for one seller's checkout lines.
///
/// Tiering by total unit count `n = Σ quantity`:
/// - `n == 1`: the single line's own fee (basis per-item)
/// - `n == 2`: summed per-line fees (basis summed)
/// - `n >= 3`: [`FLAT_SHIPPING_FEE`] exactly (basis flat), with the
///   difference against the summed fee reported as savings
pub fn price_lines(lines: &[cart_item::Model]) -> PricingBreakdown {
    let subtotal = round2(lines.iter().map(line_subtotal).sum());
    let platform_fee = round2(subtotal * PLATFORM_FEE_RATE);

    let unit_count: i32 = lines.iter().map(|line| line.quantity).sum();
    let summed = round2(summed_shipping(lines));

    let (shipping_fee, basis, savings) = if unit_count >= FLAT_SHIPPING_THRESHOLD {
        let savings = (summed - FLAT_SHIPPING_FEE).max(Decimal::ZERO);
        (FLAT_SHIPPING_FEE, ShippingFeeBasis::Flat, savings)
    } else if unit_count == 2 {
        (summed, ShippingFeeBasis::Summed, Decimal::ZERO)
    } else {
        // Zero or one unit; with one line of quantity one this is the
        // line's own per-unit fee.
        (summed, ShippingFeeBasis::PerItem, Decimal::ZERO)
    };

    PricingBreakdown {
        subtotal,
        platform_fee,
        shipping_fee,
        shipping_fee_basis: basis,
        shipping_savings: savings,
        total: subtotal + platform_fee + shipping_fee,
    }
}
