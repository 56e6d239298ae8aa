//! Binance Spot REST client: public market data plus signed market orders.
//!
//! Market metadata is cached per process, so precision lookups after the
//! first hit are free. Order endpoints sign the query string with
//! HMAC-SHA256 using credentials from the environment.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::Value;
use sha2::Sha256;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::models::Market;

use super::types::{ExchangeInfo, Filter, OrderResponse, TickerPrice};
use super::{BuyOrder, ExchangeApi, LiveFill};

const API_BASE: &str = "https://api.binance.com";
const TESTNET_API_BASE: &str = "https://testnet.binance.vision";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Fallback base-quantity precision when a market reports no LOT_SIZE.
const DEFAULT_AMOUNT_PRECISION: u32 = 8;

type HmacSha256 = Hmac<Sha256>;

/// Binance Spot exchange client.
pub struct BinanceClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    api_secret: Option<String>,
    markets: RwLock<HashMap<String, Market>>,
}

impl BinanceClient {
    /// Create a client. Credentials (`API_KEY`/`API_SECRET`) are read from
    /// the environment and only required for live order submission.
    pub fn new(testnet: bool) -> Result<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = if testnet {
            info!("using Binance testnet");
            TESTNET_API_BASE
        } else {
            API_BASE
        };

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            api_key: std::env::var("API_KEY").ok(),
            api_secret: std::env::var("API_SECRET").ok(),
            markets: RwLock::new(HashMap::new()),
        })
    }

    /// Map a unified "BASE/QUOTE" symbol to Binance's concatenated form.
    fn exchange_symbol(symbol: &str) -> String {
        symbol.replace('/', "")
    }

    fn parse_decimal(raw: &str, what: &str) -> Result<Decimal> {
        raw.parse::<Decimal>()
            .with_context(|| format!("failed to parse {what}: {raw}"))
    }

    fn signed_query(&self, params: &str) -> Result<String> {
        let secret = self.api_secret.as_deref().context("API_SECRET not configured")?;
        let mut mac =
            HmacSha256::new_from_slice(secret.as_bytes()).context("invalid API secret")?;
        mac.update(params.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());
        Ok(format!("{params}&signature={signature}"))
    }

    async fn place_order(&self, params: String) -> Result<OrderResponse> {
        let api_key = self.api_key.as_deref().context("API_KEY not configured")?;
        let query =
            self.signed_query(&format!("{params}&timestamp={}", Utc::now().timestamp_millis()))?;
        let url = format!("{}/api/v3/order?{}", self.base_url, query);

        let response = self
            .client
            .post(&url)
            .header("X-MBX-APIKEY", api_key)
            .send()
            .await
            .context("Failed to submit order")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Order request failed: {} - {}", status, body);
        }

        response.json().await.context("Failed to parse order response")
    }

    fn fill_from(order: OrderResponse) -> LiveFill {
        let filled_base = order
            .executed_qty
            .as_deref()
            .and_then(|q| q.parse::<Decimal>().ok())
            .filter(|q| !q.is_zero());
        let cost = order
            .cummulative_quote_qty
            .as_deref()
            .and_then(|q| q.parse::<Decimal>().ok())
            .filter(|q| !q.is_zero());
        LiveFill { filled_base, cost }
    }
}

impl ExchangeApi for BinanceClient {
    async fn current_price(&self, symbol: &str) -> Result<Decimal> {
        let url = format!(
            "{}/api/v3/ticker/price?symbol={}",
            self.base_url,
            Self::exchange_symbol(symbol)
        );
        debug!(url = %url, "Fetching ticker price");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to fetch ticker price")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Ticker request failed: {} - {}", status, body);
        }

        let ticker: TickerPrice = response
            .json()
            .await
            .context("Failed to parse ticker response")?;
        Self::parse_decimal(&ticker.price, "ticker price")
    }

    async fn recent_closes(
        &self,
        symbol: &str,
        timeframe: &str,
        limit: u32,
    ) -> Result<Vec<Decimal>> {
        let url = format!(
            "{}/api/v3/klines?symbol={}&interval={}&limit={}",
            self.base_url,
            Self::exchange_symbol(symbol),
            timeframe,
            limit
        );
        debug!(url = %url, "Fetching klines");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to fetch klines")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Klines request failed: {} - {}", status, body);
        }

        // Kline rows are heterogeneous arrays; the close is index 4.
        let rows: Vec<Vec<Value>> = response
            .json()
            .await
            .context("Failed to parse klines response")?;

        rows.iter()
            .map(|row| match row.get(4) {
                Some(Value::String(close)) => Self::parse_decimal(close, "kline close"),
                other => bail!("unexpected kline close field: {:?}", other),
            })
            .collect()
    }

    async fn market(&self, symbol: &str) -> Result<Market> {
        if let Some(market) = self.markets.read().await.get(symbol) {
            return Ok(market.clone());
        }

        let url = format!(
            "{}/api/v3/exchangeInfo?symbol={}",
            self.base_url,
            Self::exchange_symbol(symbol)
        );
        debug!(url = %url, "Fetching market metadata");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to fetch exchange info")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Exchange info request failed: {} - {}", status, body);
        }

        let info: ExchangeInfo = response
            .json()
            .await
            .context("Failed to parse exchange info")?;
        let sym = info
            .symbols
            .into_iter()
            .next()
            .with_context(|| format!("no market metadata for {symbol}"))?;

        let mut amount_precision = DEFAULT_AMOUNT_PRECISION;
        let mut min_base_amount = None;
        let mut min_notional = None;
        for filter in sym.filters {
            match filter {
                Filter::LotSize { step_size, min_qty } => {
                    amount_precision = decimals_from_step(&step_size);
                    min_base_amount = Self::parse_decimal(&min_qty, "LOT_SIZE minQty")
                        .ok()
                        .filter(|q| !q.is_zero());
                }
                Filter::Notional { min_notional: raw }
                | Filter::MinNotional { min_notional: raw } => {
                    min_notional = Self::parse_decimal(&raw, "min notional")
                        .ok()
                        .filter(|q| !q.is_zero());
                }
                Filter::Other => {}
            }
        }

        let market = Market {
            symbol: symbol.to_string(),
            base: sym.base_asset,
            quote: sym.quote_asset,
            amount_precision,
            min_base_amount,
            min_notional,
        };
        self.markets
            .write()
            .await
            .insert(symbol.to_string(), market.clone());
        Ok(market)
    }

    async fn execute_buy(&self, symbol: &str, order: BuyOrder) -> Result<LiveFill> {
        let exchange_symbol = Self::exchange_symbol(symbol);
        let params = match order {
            BuyOrder::Quote(quote) => {
                format!("symbol={exchange_symbol}&side=BUY&type=MARKET&quoteOrderQty={quote}")
            }
            BuyOrder::Base(base) => {
                format!("symbol={exchange_symbol}&side=BUY&type=MARKET&quantity={base}")
            }
        };
        info!(symbol = %symbol, order = ?order, "submitting market buy");
        let response = self.place_order(params).await?;
        debug!(order_id = ?response.order_id, status = ?response.status, "buy order accepted");
        Ok(Self::fill_from(response))
    }

    async fn execute_sell(&self, symbol: &str, base_qty: Decimal) -> Result<LiveFill> {
        let params = format!(
            "symbol={}&side=SELL&type=MARKET&quantity={}",
            Self::exchange_symbol(symbol),
            base_qty
        );
        info!(symbol = %symbol, base = %base_qty, "submitting market sell");
        let response = self.place_order(params).await?;
        debug!(order_id = ?response.order_id, status = ?response.status, "sell order accepted");
        Ok(Self::fill_from(response))
    }
}

/// Count decimal places in a step string like "0.00100000" (-> 3).
fn decimals_from_step(step: &str) -> u32 {
    match step.find('.') {
        Some(dot) => step[dot + 1..].trim_end_matches('0').len() as u32,
        None => 0,
    }
}
