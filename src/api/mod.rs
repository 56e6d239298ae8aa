//! Exchange connectivity: the collaborator contract and the Binance client.

mod binance;
mod types;

use anyhow::Result;
use rust_decimal::Decimal;

use crate::models::Market;

pub use binance::BinanceClient;

/// How a live buy is sized at the exchange.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BuyOrder {
    /// Spend this much quote; the exchange computes the base fill.
    Quote(Decimal),
    /// Buy this much base.
    Base(Decimal),
}

/// Reported fill from a live order. Fields are best-effort; the engine
/// falls back to its desired values when the exchange omits them.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LiveFill {
    pub filled_base: Option<Decimal>,
    pub cost: Option<Decimal>,
}

/// The engine's view of the exchange: current price, recent candles,
/// market constraints, and (live mode only) order execution.
#[allow(async_fn_in_trait)]
pub trait ExchangeApi {
    async fn current_price(&self, symbol: &str) -> Result<Decimal>;

    /// Close prices for the most recent `limit` candles, oldest first.
    async fn recent_closes(&self, symbol: &str, timeframe: &str, limit: u32)
        -> Result<Vec<Decimal>>;

    async fn market(&self, symbol: &str) -> Result<Market>;

    async fn execute_buy(&self, symbol: &str, order: BuyOrder) -> Result<LiveFill>;

    async fn execute_sell(&self, symbol: &str, base_qty: Decimal) -> Result<LiveFill>;
}
