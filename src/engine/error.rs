//! Engine error taxonomy.
//!
//! Every variant is a per-rule outcome: a Configuration error aborts the
//! rule (never the tick), the other two skip the action without mutating
//! state or fire counters. Collaborator failures are plain `anyhow` errors
//! caught at the per-symbol boundary in the bot loop.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::Side;

#[derive(Debug, Error)]
pub enum EngineError {
    /// An amount kind that the step's side cannot use, e.g. a lot-relative
    /// amount on a buy step.
    #[error("unsupported {} amount type `{kind}`", .side.as_str())]
    Configuration { side: Side, kind: &'static str },

    /// Wallet cannot cover the action. Skip, no mutation.
    #[error("insufficient {asset} balance: need {needed}, have {available}")]
    InsufficientBalance {
        asset: String,
        needed: Decimal,
        available: Decimal,
    },

    /// Order fails the market's minimum-notional constraint. Skip.
    #[error("below market minimum: notional {notional} < {minimum}")]
    BelowMarketMinimum { notional: Decimal, minimum: Decimal },
}
