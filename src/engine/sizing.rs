//! Order sizing and normalization.
//!
//! All rounding here is truncation toward zero, never round-to-nearest:
//! the engine must never order more than it can pay for or deliver.
//! Quote amounts are quantized to 6 decimal places and base quantities
//! to 8 at every mutation; those scales are part of the conservation
//! invariants, not a cosmetic choice.

use rust_decimal::Decimal;

use crate::engine::error::EngineError;
use crate::models::{Amount, Lot, Market, Side};

/// Decimal places kept on quote-asset amounts.
pub const QUOTE_SCALE: u32 = 6;

/// Decimal places kept on base-asset quantities.
pub const BASE_SCALE: u32 = 8;

/// Truncate a quote amount to its wire precision.
pub fn quantize_quote(value: Decimal) -> Decimal {
    value.trunc_with_scale(QUOTE_SCALE)
}

/// Truncate a base quantity to its wire precision.
pub fn quantize_base(value: Decimal) -> Decimal {
    value.trunc_with_scale(BASE_SCALE)
}

/// Round a desired base quantity down to the market's amount step and
/// reject quantities under the market minimum. Returns zero on rejection.
pub fn normalize_base_amount(market: &Market, base_qty: Decimal) -> Decimal {
    let rounded = base_qty.trunc_with_scale(market.amount_precision);
    if rounded <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    if let Some(min) = market.min_base_amount {
        if rounded < min {
            return Decimal::ZERO;
        }
    }
    rounded
}

/// Enforce the market's minimum quote notional, if it has one.
pub fn check_min_notional(market: &Market, notional: Decimal) -> Result<(), EngineError> {
    match market.min_notional {
        Some(minimum) if notional < minimum => {
            Err(EngineError::BelowMarketMinimum { notional, minimum })
        }
        _ => Ok(()),
    }
}

/// A buy order sized in both currencies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuySizing {
    /// Desired base quantity, before normalization.
    pub base_qty: Decimal,
    /// Quote the step wants to spend (pre-fee).
    pub desired_quote: Decimal,
}

/// Size a buy from its amount descriptor at the expected fill price.
pub fn size_buy(amount: &Amount, fill_price: Decimal) -> Result<BuySizing, EngineError> {
    match amount {
        Amount::Quote { value } => Ok(BuySizing {
            base_qty: *value / fill_price,
            desired_quote: *value,
        }),
        Amount::Base { value } => Ok(BuySizing {
            base_qty: *value,
            desired_quote: *value * fill_price,
        }),
        other => Err(EngineError::Configuration {
            side: Side::Buy,
            kind: other.kind(),
        }),
    }
}

/// Base quantity a sell step takes from a specific lot.
///
/// `lot_percent` is clamped to [0, 100] of the lot's remainder; `lot_quote`
/// converts at the fill price and caps at the remainder; `base` caps at the
/// remainder. A `quote` amount is a configuration error on the sell side.
pub fn base_qty_from_sell_amount(
    amount: &Amount,
    lot: &Lot,
    fill_price: Decimal,
) -> Result<Decimal, EngineError> {
    let remaining = lot.remaining_base_qty;

    match amount {
        Amount::LotPercent { value } => {
            let pct = (*value).clamp(Decimal::ZERO, Decimal::ONE_HUNDRED);
            Ok(remaining * pct / Decimal::ONE_HUNDRED)
        }
        Amount::LotQuote { value } => {
            if *value <= Decimal::ZERO {
                return Ok(Decimal::ZERO);
            }
            Ok((*value / fill_price).min(remaining))
        }
        Amount::Base { value } => Ok((*value).min(remaining)),
        other => Err(EngineError::Configuration {
            side: Side::Sell,
            kind: other.kind(),
        }),
    }
}
