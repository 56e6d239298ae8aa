//! Paper-execution simulator: deterministic fills with slippage and fees.
//!
//! The fill model is fixed configuration, no network variance: buys fill
//! above mid, sells below, and a percentage fee is charged in the quote
//! asset on both sides. An insufficient balance rejects the whole action
//! with no partial mutation.

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::info;
use uuid::Uuid;

use crate::engine::error::EngineError;
use crate::engine::ledger;
use crate::engine::sizing::{quantize_base, quantize_quote};
use crate::models::{Lot, Market, Step, TradeRecord, TradeSide};
use crate::state::EngineState;

/// Deterministic fill parameters for paper mode.
#[derive(Debug, Clone, Copy)]
pub struct FillModel {
    /// Fee as a percentage of gross quote notional, e.g. 0.1 for 0.1%.
    pub fee_pct: Decimal,

    /// Slippage in basis points applied against the taker.
    pub slippage_bps: Decimal,
}

impl Default for FillModel {
    fn default() -> Self {
        Self {
            fee_pct: dec!(0.1),
            slippage_bps: dec!(2),
        }
    }
}

impl FillModel {
    /// Fill price for an order at `mid`: worse for the taker on both sides.
    pub fn fill_price(&self, mid: Decimal, side: TradeSide) -> Decimal {
        let m = self.slippage_bps / dec!(10000);
        match side {
            TradeSide::Buy => mid * (Decimal::ONE + m),
            TradeSide::Sell => mid * (Decimal::ONE - m),
        }
    }

    /// Fee in quote for a gross notional.
    pub fn fee_quote(&self, gross: Decimal) -> Decimal {
        quantize_quote(gross * self.fee_pct / Decimal::ONE_HUNDRED)
    }
}

/// Simulate a buy: debit quote by cost + fee, credit base, open a lot with
/// the fee folded into its cost basis, and append a trade record.
pub fn paper_buy(
    state: &mut EngineState,
    market: &Market,
    step: &Step,
    base_qty: Decimal,
    fill_price: Decimal,
    cost: Decimal,
    fill: &FillModel,
) -> Result<(), EngineError> {
    let fee = fill.fee_quote(cost);
    let net_spend = quantize_quote(cost + fee);
    let quote_balance = state.balance(&market.quote);
    if quote_balance < net_spend {
        return Err(EngineError::InsufficientBalance {
            asset: market.quote.clone(),
            needed: net_spend,
            available: quote_balance,
        });
    }

    state.set_balance(&market.quote, quantize_quote(quote_balance - net_spend));
    state.set_balance(
        &market.base,
        quantize_base(state.balance(&market.base) + base_qty),
    );

    // Slipped fill is the lot's entry; fee is part of its cost basis.
    ledger::append(
        state,
        Lot::open(&market.symbol, &step.id, fill_price, base_qty, net_spend),
    );

    state.trades.push(TradeRecord {
        timestamp: Utc::now(),
        side: TradeSide::Buy,
        symbol: market.symbol.clone(),
        price: fill_price,
        base_qty,
        quote_qty: cost,
        fee_quote: fee,
        step_id: step.id.clone(),
        lot_ref: None,
    });

    info!(
        symbol = %market.symbol,
        step = %step.id,
        price = %fill_price,
        base = %base_qty,
        cost = %cost,
        fee = %fee,
        "paper buy filled"
    );
    Ok(())
}

/// Simulate a sell against a specific lot: debit base, credit quote net of
/// fee, realize PnL, and append a trade record. Returns the PnL delta.
pub fn paper_sell(
    state: &mut EngineState,
    market: &Market,
    step: &Step,
    lot_id: Uuid,
    base_qty: Decimal,
    fill_price: Decimal,
    gross: Decimal,
    fill: &FillModel,
) -> Result<Decimal, EngineError> {
    let base_balance = state.balance(&market.base);
    if base_balance < base_qty {
        return Err(EngineError::InsufficientBalance {
            asset: market.base.clone(),
            needed: base_qty,
            available: base_balance,
        });
    }

    let fee = fill.fee_quote(gross);
    let net_proceeds = quantize_quote(gross - fee);

    let lot_ref = state
        .lots
        .iter()
        .find(|lot| lot.id == lot_id)
        .map(|lot| lot.entry_step_id.clone());

    state.set_balance(&market.base, quantize_base(base_balance - base_qty));
    state.set_balance(
        &market.quote,
        quantize_quote(state.balance(&market.quote) + net_proceeds),
    );

    let pnl = ledger::realize(state, lot_id, base_qty, net_proceeds);

    state.trades.push(TradeRecord {
        timestamp: Utc::now(),
        side: TradeSide::Sell,
        symbol: market.symbol.clone(),
        price: fill_price,
        base_qty,
        quote_qty: gross,
        fee_quote: fee,
        step_id: step.id.clone(),
        lot_ref,
    });

    info!(
        symbol = %market.symbol,
        step = %step.id,
        price = %fill_price,
        base = %base_qty,
        proceeds = %gross,
        fee = %fee,
        pnl = %pnl,
        "paper sell filled"
    );
    Ok(pnl)
}
