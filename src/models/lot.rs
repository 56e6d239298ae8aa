//! Lot model: one discrete position opened by a buy step.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A position lot, consumable in partial increments by later sells.
///
/// `remaining_cost_quote` carries the quote cost basis still attributable
/// to the unsold remainder (fees included), so realized PnL per sale is
/// exact regardless of how many partial sells consume the lot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lot {
    pub id: Uuid,

    /// Market symbol, e.g. "SOL/USDT".
    pub symbol: String,

    /// Id of the buy step that opened this lot. A lookup key, not an
    /// ownership edge; steps are immutable configuration.
    pub entry_step_id: String,

    /// Fill price at entry.
    pub entry_price: Decimal,

    pub entry_ts: DateTime<Utc>,

    /// Original size; immutable after creation.
    pub base_qty: Decimal,

    /// Unsold base remaining. Zero means economically closed.
    pub remaining_base_qty: Decimal,

    /// Quote cost basis attributable to the unsold remainder.
    pub remaining_cost_quote: Decimal,
}

impl Lot {
    /// Open a new lot. `cost_quote` is what was actually paid, fees included.
    pub fn open(
        symbol: &str,
        entry_step_id: &str,
        entry_price: Decimal,
        base_qty: Decimal,
        cost_quote: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            symbol: symbol.to_string(),
            entry_step_id: entry_step_id.to_string(),
            entry_price,
            entry_ts: Utc::now(),
            base_qty,
            remaining_base_qty: base_qty,
            remaining_cost_quote: cost_quote,
        }
    }

    /// Open lots are the only candidates for sell steps.
    pub fn is_open(&self) -> bool {
        self.remaining_base_qty > Decimal::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_new_lot_is_open() {
        let lot = Lot::open("SOL/USDT", "sol_buy_180", dec!(180), dec!(0.5), dec!(90.09));
        assert!(lot.is_open());
        assert_eq!(lot.base_qty, lot.remaining_base_qty);
        assert_eq!(lot.remaining_cost_quote, dec!(90.09));
    }

    #[test]
    fn test_serde_field_names() {
        let lot = Lot::open("SOL/USDT", "sol_buy_180", dec!(180), dec!(0.5), dec!(90));
        let json = serde_json::to_value(&lot).unwrap();
        assert!(json.get("entryStepId").is_some());
        assert!(json.get("remainingBaseQty").is_some());
        assert!(json.get("remainingCostQuote").is_some());
        assert!(json.get("entryTs").is_some());
    }
}
