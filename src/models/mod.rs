//! Data models for ladder rules, lots, trades, and market constraints.

mod lot;
mod market;
mod rule;
mod trade;

pub use lot::Lot;
pub use market::Market;
pub use rule::{Amount, LotOrder, LotSelector, Operator, Reference, Side, Step, Trigger};
pub use trade::{TradeRecord, TradeSide};
