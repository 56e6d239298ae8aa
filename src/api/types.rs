//! Raw Binance REST response payloads.

use serde::Deserialize;

/// `/api/v3/ticker/price` response.
#[derive(Debug, Clone, Deserialize)]
pub struct TickerPrice {
    pub symbol: String,
    pub price: String,
}

/// `/api/v3/exchangeInfo` response (filtered to one symbol).
#[derive(Debug, Deserialize)]
pub struct ExchangeInfo {
    pub symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolInfo {
    pub symbol: String,
    pub base_asset: String,
    pub quote_asset: String,
    pub filters: Vec<Filter>,
}

/// Exchange filters carry the precision and minimum-order constraints.
/// Only the ones the sizing layer needs are modeled; the rest fold into
/// `Other`.
#[derive(Debug, Deserialize)]
#[serde(tag = "filterType")]
pub enum Filter {
    #[serde(rename = "LOT_SIZE", rename_all = "camelCase")]
    LotSize { step_size: String, min_qty: String },
    #[serde(rename = "NOTIONAL", rename_all = "camelCase")]
    Notional { min_notional: String },
    #[serde(rename = "MIN_NOTIONAL", rename_all = "camelCase")]
    MinNotional { min_notional: String },
    #[serde(other)]
    Other,
}

/// `/api/v3/order` response for market orders.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub symbol: String,
    #[serde(default)]
    pub order_id: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub executed_qty: Option<String>,
    #[serde(default)]
    pub cummulative_quote_qty: Option<String>,
}
