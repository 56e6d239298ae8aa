//! Per-symbol, per-tick evaluation: buy pass, then sell pass.
//!
//! State is loaded fresh at the start of the pass and saved after every
//! successful action, so a sell pass always sees lots opened by the buy
//! pass of the same tick, and a crash loses at most one action. Skip
//! conditions (trigger false, zero size, below minimum, insufficient
//! balance) never advance fire counters.

use anyhow::Result;
use tracing::{debug, error, info, warn};

use crate::api::{BuyOrder, ExchangeApi};
use crate::config::SymbolConfig;
use crate::engine::sim::{self, FillModel};
use crate::engine::sizing::{self, quantize_quote};
use crate::engine::{firing, ledger, triggers};
use crate::models::{Amount, Lot, Side, TradeSide};
use crate::state::StateStore;

/// Timeframe of the reference-close series.
const CANDLE_TIMEFRAME: &str = "1m";

/// How many recent candles feed `percent_from_reference` triggers.
const CANDLE_LIMIT: u32 = 50;

/// Evaluate one symbol for one tick.
///
/// Buy steps run before sell steps, each in rule-list order. A failed
/// collaborator call aborts only this symbol; the caller decides whether
/// to continue with other symbols.
pub async fn evaluate_symbol<E: ExchangeApi>(
    exchange: &E,
    store: &StateStore,
    fill: &FillModel,
    symbol: &str,
    config: &SymbolConfig,
    live: bool,
) -> Result<()> {
    let market = exchange.market(symbol).await?;
    let closes = exchange
        .recent_closes(symbol, CANDLE_TIMEFRAME, CANDLE_LIMIT)
        .await?;
    let price_mid = exchange.current_price(symbol).await?;

    let mut state = store.load()?;

    // Pass 1 - buy steps.
    for step in config.steps.iter().filter(|s| s.side == Side::Buy) {
        if !firing::can_fire(&state, step) {
            continue;
        }
        if !triggers::satisfied(&step.trigger, price_mid, None, &closes) {
            debug!(symbol = %symbol, step = %step.id, "buy trigger not satisfied");
            continue;
        }

        let fill_price = fill.fill_price(price_mid, TradeSide::Buy);
        let sized = match sizing::size_buy(&step.amount, fill_price) {
            Ok(sized) => sized,
            Err(e) => {
                warn!(symbol = %symbol, step = %step.id, error = %e, "buy step misconfigured");
                continue;
            }
        };

        let base_qty = sizing::normalize_base_amount(&market, sized.base_qty);
        if base_qty.is_zero() {
            info!(symbol = %symbol, step = %step.id, "buy skipped: zero base after normalization");
            continue;
        }
        let cost = quantize_quote(base_qty * fill_price);
        if let Err(e) = sizing::check_min_notional(&market, cost) {
            info!(symbol = %symbol, step = %step.id, error = %e, "buy skipped");
            continue;
        }

        if live {
            let order = match &step.amount {
                Amount::Quote { value } => BuyOrder::Quote(*value),
                _ => BuyOrder::Base(base_qty),
            };
            match exchange.execute_buy(symbol, order).await {
                Ok(report) => {
                    let filled_base = report.filled_base.unwrap_or(base_qty);
                    let exec_quote = report
                        .cost
                        .unwrap_or_else(|| quantize_quote(filled_base * price_mid));
                    ledger::append(
                        &mut state,
                        Lot::open(symbol, &step.id, price_mid, filled_base, exec_quote),
                    );
                    info!(
                        symbol = %symbol,
                        step = %step.id,
                        base = %filled_base,
                        cost = %exec_quote,
                        "live buy filled"
                    );
                }
                Err(e) => {
                    error!(symbol = %symbol, step = %step.id, error = %e, "live buy failed");
                    continue;
                }
            }
        } else if let Err(e) =
            sim::paper_buy(&mut state, &market, step, base_qty, fill_price, cost, fill)
        {
            info!(symbol = %symbol, step = %step.id, error = %e, "buy skipped");
            continue;
        }

        firing::record_fire(&mut state, step);
        store.save(&state)?;
    }

    // Pass 2 - sell steps.
    for step in config.steps.iter().filter(|s| s.side == Side::Sell) {
        if !firing::can_fire(&state, step) {
            continue;
        }

        let candidates = ledger::select_candidates(&state, symbol, step.lot_match.as_ref());

        for lot_id in candidates {
            // Re-check per candidate: a repeatable step may exhaust its
            // fire budget partway through the candidate list.
            if !firing::can_fire(&state, step) {
                break;
            }

            let Some(lot) = state.lots.iter().find(|l| l.id == lot_id) else {
                continue;
            };
            if !triggers::satisfied(&step.trigger, price_mid, Some(lot), &closes) {
                debug!(symbol = %symbol, step = %step.id, "sell trigger not satisfied for lot");
                continue;
            }

            let fill_price = fill.fill_price(price_mid, TradeSide::Sell);
            let base_to_sell = match sizing::base_qty_from_sell_amount(&step.amount, lot, fill_price)
            {
                Ok(qty) => qty,
                Err(e) => {
                    warn!(symbol = %symbol, step = %step.id, error = %e, "sell step misconfigured");
                    break;
                }
            };

            let base_to_sell = sizing::normalize_base_amount(&market, base_to_sell);
            if base_to_sell.is_zero() {
                debug!(symbol = %symbol, step = %step.id, "sell skipped: zero base after normalization");
                continue;
            }
            let gross = quantize_quote(base_to_sell * fill_price);
            if let Err(e) = sizing::check_min_notional(&market, gross) {
                info!(symbol = %symbol, step = %step.id, error = %e, "sell skipped");
                continue;
            }

            if live {
                match exchange.execute_sell(symbol, base_to_sell).await {
                    Ok(report) => {
                        let sold_base = report.filled_base.unwrap_or(base_to_sell);
                        let proceeds = report.cost.unwrap_or(gross);
                        let pnl = ledger::realize(&mut state, lot_id, sold_base, proceeds);
                        info!(
                            symbol = %symbol,
                            step = %step.id,
                            base = %sold_base,
                            proceeds = %proceeds,
                            pnl = %pnl,
                            "live sell filled"
                        );
                    }
                    Err(e) => {
                        error!(symbol = %symbol, step = %step.id, error = %e, "live sell failed");
                        continue;
                    }
                }
            } else if let Err(e) = sim::paper_sell(
                &mut state,
                &market,
                step,
                lot_id,
                base_to_sell,
                fill_price,
                gross,
                fill,
            ) {
                info!(symbol = %symbol, step = %step.id, error = %e, "sell skipped");
                continue;
            }

            firing::record_fire(&mut state, step);
            store.save(&state)?;

            if !step.repeatable {
                break;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::LiveFill;
    use crate::models::{LotOrder, LotSelector, Market, Operator, Step, Trigger};
    use anyhow::anyhow;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    /// Fixed-price exchange stub; orders always fail, which paper mode
    /// never reaches.
    struct FakeExchange {
        price: Decimal,
        closes: Vec<Decimal>,
        min_notional: Option<Decimal>,
    }

    impl FakeExchange {
        fn at(price: Decimal) -> Self {
            Self {
                price,
                closes: vec![],
                min_notional: None,
            }
        }
    }

    impl ExchangeApi for FakeExchange {
        async fn current_price(&self, _symbol: &str) -> Result<Decimal> {
            Ok(self.price)
        }

        async fn recent_closes(
            &self,
            _symbol: &str,
            _timeframe: &str,
            _limit: u32,
        ) -> Result<Vec<Decimal>> {
            Ok(self.closes.clone())
        }

        async fn market(&self, symbol: &str) -> Result<Market> {
            let (base, quote) = Market::split_symbol(symbol);
            Ok(Market {
                symbol: symbol.to_string(),
                base,
                quote,
                amount_precision: 8,
                min_base_amount: None,
                min_notional: self.min_notional,
            })
        }

        async fn execute_buy(&self, _symbol: &str, _order: BuyOrder) -> Result<LiveFill> {
            Err(anyhow!("live execution not available in tests"))
        }

        async fn execute_sell(&self, _symbol: &str, _base_qty: Decimal) -> Result<LiveFill> {
            Err(anyhow!("live execution not available in tests"))
        }
    }

    fn store(dir: &TempDir) -> StateStore {
        StateStore::new(dir.path().join("state.json"), "USDT", dec!(10000))
    }

    fn no_slip() -> FillModel {
        FillModel {
            fee_pct: Decimal::ZERO,
            slippage_bps: Decimal::ZERO,
        }
    }

    fn buy_step(id: &str, at_or_below: Decimal, spend: Decimal) -> Step {
        Step {
            id: id.to_string(),
            side: Side::Buy,
            repeatable: false,
            max_fires: None,
            trigger: Trigger::Price {
                op: Operator::Lte,
                value: at_or_below,
            },
            amount: Amount::Quote { value: spend },
            lot_match: None,
        }
    }

    fn sell_step(id: &str, at_or_above: Decimal, selector: Option<LotSelector>) -> Step {
        Step {
            id: id.to_string(),
            side: Side::Sell,
            repeatable: false,
            max_fires: None,
            trigger: Trigger::Price {
                op: Operator::Gte,
                value: at_or_above,
            },
            amount: Amount::LotPercent { value: dec!(100) },
            lot_match: selector,
        }
    }

    #[tokio::test]
    async fn test_buy_fires_once_and_persists() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        // 100 quote at 160 buys exactly 0.625 base.
        let exchange = FakeExchange::at(dec!(160));
        let config = SymbolConfig {
            steps: vec![buy_step("sol_buy_180", dec!(180), dec!(100))],
        };

        evaluate_symbol(&exchange, &store, &no_slip(), "SOL/USDT", &config, false)
            .await
            .unwrap();

        let state = store.load().unwrap();
        assert_eq!(state.lots.len(), 1);
        assert_eq!(state.steps_fired["sol_buy_180"], 1);
        assert_eq!(state.balance("USDT"), dec!(9900));
        assert_eq!(state.trades.len(), 1);

        // Second tick with the trigger still satisfied: non-repeatable
        // steps never fire twice.
        evaluate_symbol(&exchange, &store, &no_slip(), "SOL/USDT", &config, false)
            .await
            .unwrap();
        let state = store.load().unwrap();
        assert_eq!(state.lots.len(), 1);
        assert_eq!(state.steps_fired["sol_buy_180"], 1);
    }

    #[tokio::test]
    async fn test_unsatisfied_trigger_mutates_nothing() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let exchange = FakeExchange::at(dec!(250));
        let config = SymbolConfig {
            steps: vec![buy_step("sol_buy_180", dec!(180), dec!(100))],
        };

        evaluate_symbol(&exchange, &store, &no_slip(), "SOL/USDT", &config, false)
            .await
            .unwrap();

        let state = store.load().unwrap();
        assert!(state.lots.is_empty());
        assert!(state.steps_fired.is_empty());
        assert_eq!(state.balance("USDT"), dec!(10000));
    }

    #[tokio::test]
    async fn test_below_min_notional_mutates_nothing() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let mut exchange = FakeExchange::at(dec!(175));
        exchange.min_notional = Some(dec!(500));
        let config = SymbolConfig {
            steps: vec![buy_step("sol_buy_180", dec!(180), dec!(100))],
        };

        evaluate_symbol(&exchange, &store, &no_slip(), "SOL/USDT", &config, false)
            .await
            .unwrap();

        let state = store.load().unwrap();
        assert!(state.lots.is_empty());
        assert!(state.steps_fired.is_empty());
        assert_eq!(state.balance("USDT"), dec!(10000));
    }

    #[tokio::test]
    async fn test_same_tick_buy_is_visible_to_sell() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        // 160 satisfies both the buy (<= 180) and the sell (>= 150), and
        // 100 quote at 160 is an exact 0.625 base.
        let exchange = FakeExchange::at(dec!(160));
        let config = SymbolConfig {
            steps: vec![
                buy_step("sol_buy_180", dec!(180), dec!(100)),
                sell_step("sol_sell_150", dec!(150), None),
            ],
        };

        evaluate_symbol(&exchange, &store, &no_slip(), "SOL/USDT", &config, false)
            .await
            .unwrap();

        let state = store.load().unwrap();
        assert_eq!(state.steps_fired["sol_buy_180"], 1);
        assert_eq!(state.steps_fired["sol_sell_150"], 1);
        assert!(!state.lots[0].is_open());
        // No fees, no slippage: the round trip is PnL-neutral.
        assert_eq!(state.realized_pnl_usdt, Decimal::ZERO);
        assert_eq!(state.balance("USDT"), dec!(10000));
        assert_eq!(state.balance("SOL"), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_entry_selector_targets_specific_lot() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let exchange = FakeExchange::at(dec!(150));
        let buys = SymbolConfig {
            steps: vec![
                buy_step("sol_buy_180", dec!(180), dec!(100)),
                buy_step("sol_buy_160", dec!(160), dec!(120)),
            ],
        };
        evaluate_symbol(&exchange, &store, &no_slip(), "SOL/USDT", &buys, false)
            .await
            .unwrap();

        let exchange = FakeExchange::at(dec!(200));
        let sells = SymbolConfig {
            steps: vec![sell_step(
                "sol_sell_from_160",
                dec!(180),
                Some(LotSelector::Entry {
                    entry_id: "sol_buy_160".to_string(),
                }),
            )],
        };
        evaluate_symbol(&exchange, &store, &no_slip(), "SOL/USDT", &sells, false)
            .await
            .unwrap();

        let state = store.load().unwrap();
        let closed: Vec<_> = state.lots.iter().filter(|l| !l.is_open()).collect();
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].entry_step_id, "sol_buy_160");
    }

    #[tokio::test]
    async fn test_repeatable_cap_limits_candidates_per_tick() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        // Open three lots across three ticks.
        let exchange = FakeExchange::at(dec!(100));
        for id in ["buy_a", "buy_b", "buy_c"] {
            let config = SymbolConfig {
                steps: vec![buy_step(id, dec!(100), dec!(50))],
            };
            evaluate_symbol(&exchange, &store, &no_slip(), "SOL/USDT", &config, false)
                .await
                .unwrap();
        }
        assert_eq!(store.load().unwrap().lots.len(), 3);

        // A repeatable sell capped at 2 fires consumes exactly two lots
        // even though all three trigger.
        let exchange = FakeExchange::at(dec!(120));
        let mut sell = sell_step("take_profit", dec!(110), Some(LotSelector::Order(LotOrder::Fifo)));
        sell.repeatable = true;
        sell.max_fires = Some(2);
        let config = SymbolConfig { steps: vec![sell] };
        evaluate_symbol(&exchange, &store, &no_slip(), "SOL/USDT", &config, false)
            .await
            .unwrap();

        let state = store.load().unwrap();
        assert_eq!(state.steps_fired["take_profit"], 2);
        assert_eq!(state.lots.iter().filter(|l| !l.is_open()).count(), 2);
        assert_eq!(state.lots.iter().filter(|l| l.is_open()).count(), 1);
    }

    #[tokio::test]
    async fn test_percent_from_lot_entry_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let exchange = FakeExchange::at(dec!(100));
        let config = SymbolConfig {
            steps: vec![buy_step("buy_100", dec!(100), dec!(100))],
        };
        evaluate_symbol(&exchange, &store, &no_slip(), "SOL/USDT", &config, false)
            .await
            .unwrap();

        let sell = Step {
            id: "take_12".to_string(),
            side: Side::Sell,
            repeatable: false,
            max_fires: None,
            trigger: Trigger::PercentFromLotEntry {
                op: Operator::Gte,
                value: dec!(12),
            },
            amount: Amount::LotPercent { value: dec!(50) },
            lot_match: None,
        };
        let config = SymbolConfig { steps: vec![sell] };

        // +11% from entry: not yet.
        let exchange = FakeExchange::at(dec!(111));
        evaluate_symbol(&exchange, &store, &no_slip(), "SOL/USDT", &config, false)
            .await
            .unwrap();
        assert!(store.load().unwrap().steps_fired.get("take_12").is_none());

        // +12%: trims half the lot.
        let exchange = FakeExchange::at(dec!(112));
        evaluate_symbol(&exchange, &store, &no_slip(), "SOL/USDT", &config, false)
            .await
            .unwrap();
        let state = store.load().unwrap();
        assert_eq!(state.steps_fired["take_12"], 1);
        assert_eq!(state.lots[0].remaining_base_qty, dec!(0.5));
        // Half of 1.0 base sold at 112 against a 100-quote basis: +6.
        assert_eq!(state.realized_pnl_usdt, dec!(6));
    }

    #[tokio::test]
    async fn test_insufficient_balance_skips_without_firing() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path().join("state.json"), "USDT", dec!(10));
        let exchange = FakeExchange::at(dec!(160));
        let config = SymbolConfig {
            steps: vec![buy_step("sol_buy_180", dec!(180), dec!(100))],
        };

        evaluate_symbol(&exchange, &store, &no_slip(), "SOL/USDT", &config, false)
            .await
            .unwrap();

        let state = store.load().unwrap();
        assert!(state.lots.is_empty());
        assert!(state.steps_fired.is_empty());
        assert_eq!(state.balance("USDT"), dec!(10));
    }
}
