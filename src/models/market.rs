//! Market metadata: precision and minimum-order constraints.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Trading constraints for one market, as reported by the exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    /// Unified symbol, e.g. "SOL/USDT".
    pub symbol: String,

    /// Base asset, e.g. "SOL".
    pub base: String,

    /// Quote asset, e.g. "USDT".
    pub quote: String,

    /// Decimal places of the base-quantity step. A step size of
    /// "0.00100000" means precision 3.
    pub amount_precision: u32,

    /// Minimum base quantity per order, if the market enforces one.
    #[serde(default)]
    pub min_base_amount: Option<Decimal>,

    /// Minimum quote notional per order, if the market enforces one.
    #[serde(default)]
    pub min_notional: Option<Decimal>,
}

impl Market {
    /// Split a unified "BASE/QUOTE" symbol into asset names.
    pub fn split_symbol(symbol: &str) -> (String, String) {
        match symbol.split_once('/') {
            Some((base, quote)) => (base.to_string(), quote.to_string()),
            None => (symbol.to_string(), String::new()),
        }
    }
}
