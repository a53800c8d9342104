//! Decimal money helpers and the BUY order rounding contract.
//!
//! Every price and size on the order-construction and budget-accounting paths is a
//! [`rust_decimal::Decimal`]. `f64` only shows up in logging ratios (ROI percentages)
//! and AI-provided confidence scores, which are inherently approximate.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Minimum order size the exchange will accept, in shares.
pub const MIN_ORDER_SIZE: Decimal = dec!(5.00);

/// Minimum notional (USD) we target for a mirrored BUY before rounding.
pub const MIN_ORDER_USD: Decimal = dec!(2.00);

/// How many times we're willing to shave a cent off the limit price to fit the
/// minimum order size inside the target notional.
const MAX_PRICE_DECREMENTS: u32 = 10;

/// Floor a decimal to 2 places (cent precision), the rounding mode the exchange
/// enforces on both price and size.
#[must_use]
pub fn floor2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, rust_decimal::RoundingStrategy::ToZero)
}

/// Parameters produced by [`build_buy_order`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuyOrderPlan {
    /// Marketable limit price, floored to 2 decimals.
    pub price: Decimal,
    /// Share size, floored to 2 decimals and bumped up to [`MIN_ORDER_SIZE`] if needed.
    pub size: Decimal,
    /// `price * size`, floored to 2 decimals — what we actually spend.
    pub cost: Decimal,
}

/// Build a BUY order that targets `min_order_usd` notional at `best_ask`, but never
/// undershoots [`MIN_ORDER_SIZE`] shares.
///
/// Mirrors the rounding contract every CLOB adapter must honor:
/// 1. floor the limit price to 2 decimals.
/// 2. size = floor(floor(min_order_usd / price) ... ), bumped to `MIN_ORDER_SIZE` if smaller.
/// 3. if the floored size still prices below `min_order_usd` cost and we're below
///    `MIN_ORDER_SIZE`, shave the price down by a cent (up to 10 times) so the same
///    notional buys at least `MIN_ORDER_SIZE` shares.
/// 4. cost = floor(size * price).
///
/// Returns `None` if `best_ask` is not strictly positive (nothing sane to quote).
#[must_use]
pub fn build_buy_order(best_ask: Decimal, min_order_usd: Decimal) -> Option<BuyOrderPlan> {
    if best_ask <= Decimal::ZERO {
        return None;
    }

    let mut price = floor2(best_ask);
    if price <= Decimal::ZERO {
        return None;
    }

    let mut size = floor2(min_order_usd / price);
    if size < MIN_ORDER_SIZE {
        size = MIN_ORDER_SIZE;
    }

    // If bumping size up to the minimum means we'd spend more than intended, try
    // shaving the price down a cent at a time so the minimum size still fits inside
    // roughly the same notional; give up after MAX_PRICE_DECREMENTS and just pay it.
    let mut attempts = 0;
    while size == MIN_ORDER_SIZE
        && floor2(size * price) > min_order_usd
        && attempts < MAX_PRICE_DECREMENTS
    {
        let lower = price - dec!(0.01);
        if lower <= Decimal::ZERO {
            break;
        }
        price = lower;
        attempts += 1;
    }

    let cost = floor2(size * price);
    Some(BuyOrderPlan { price, size, cost })
}
