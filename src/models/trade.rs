//! Trade record model: the append-only audit log of executed actions.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direction of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Buy => "buy",
            TradeSide::Sell => "sell",
        }
    }
}

/// One executed (or simulated) fill. Never mutated after append.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRecord {
    pub timestamp: DateTime<Utc>,

    pub side: TradeSide,

    pub symbol: String,

    /// Fill price after slippage.
    pub price: Decimal,

    pub base_qty: Decimal,

    /// Gross quote notional of the fill, before fees.
    pub quote_qty: Decimal,

    /// Fee charged, always in the quote asset.
    pub fee_quote: Decimal,

    /// Id of the step that fired.
    pub step_id: String,

    /// For sells: entry step id of the lot that was consumed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lot_ref: Option<String>,
}
