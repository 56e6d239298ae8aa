//! Trigger evaluation: pure predicates over the current price, an optional
//! lot context, and an optional recent-close series.

use rust_decimal::Decimal;

use crate::models::{Lot, Reference, Trigger};

/// Percent move of `price` relative to `reference`.
pub fn percent_from(reference: Decimal, price: Decimal) -> Decimal {
    (price - reference) / reference * Decimal::ONE_HUNDRED
}

/// Whether `trigger` is satisfied at `price`.
///
/// Lot-relative triggers without a lot context evaluate false rather than
/// erroring, as does a last-close reference with an empty series. A zero
/// reference price can never satisfy a percent trigger.
pub fn satisfied(
    trigger: &Trigger,
    price: Decimal,
    lot: Option<&Lot>,
    recent_closes: &[Decimal],
) -> bool {
    match trigger {
        Trigger::Price { op, value } => op.compare(price, *value),

        Trigger::PercentFromLotEntry { op, value } => match lot {
            Some(lot) if !lot.entry_price.is_zero() => {
                op.compare(percent_from(lot.entry_price, price), *value)
            }
            _ => false,
        },

        Trigger::PercentFromReference {
            op,
            value,
            reference,
        } => {
            let reference_price = match reference {
                Reference::Custom { value } => *value,
                Reference::LastClose => match recent_closes.last() {
                    Some(close) => *close,
                    None => return false,
                },
            };
            if reference_price.is_zero() {
                return false;
            }
            op.compare(percent_from(reference_price, price), *value)
        }
    }
}
