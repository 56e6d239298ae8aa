//! Bot runner: the periodic tick loop over all configured symbols.
//!
//! Handles:
//! - Driving one evaluation pass per symbol per tick
//! - Serializing ticks so a manual tick can never interleave with the loop
//! - Catching per-symbol failures so one bad symbol doesn't abort the tick
//! - Graceful shutdown on ctrl-c

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::Mutex;
use tokio::time::interval;
use tracing::{error, info};

use crate::api::ExchangeApi;
use crate::config::{BotSettings, LadderConfig};
use crate::engine::{self, FillModel};
use crate::state::StateStore;

/// Main bot runner.
pub struct Bot<E: ExchangeApi> {
    settings: BotSettings,
    ladder: LadderConfig,
    exchange: E,
    store: StateStore,

    // Ticks must not overlap: the engine's load-mutate-save sequence is
    // single-writer.
    tick_lock: Mutex<()>,

    shutdown: Arc<AtomicBool>,
}

impl<E: ExchangeApi> Bot<E> {
    pub fn new(settings: BotSettings, ladder: LadderConfig, exchange: E) -> Self {
        let store = StateStore::new(
            settings.state_path.clone(),
            &settings.quote_asset,
            settings.starting_quote,
        );
        Self {
            settings,
            ladder,
            exchange,
            store,
            tick_lock: Mutex::new(()),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Live when either the CLI/env switch or the ruleset file says so.
    fn live(&self) -> bool {
        self.settings.live || self.ladder.live
    }

    fn fill_model(&self) -> FillModel {
        FillModel {
            fee_pct: self.settings.fee_pct,
            slippage_bps: self.settings.slippage_bps,
        }
    }

    /// Run the periodic loop until ctrl-c.
    pub async fn run(&self) -> Result<()> {
        let loop_seconds = self.ladder.loop_seconds;
        info!(
            live = self.live(),
            testnet = self.settings.testnet,
            loop_seconds,
            symbols = ?self.ladder.symbols(),
            "starting tick loop"
        );

        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            info!("shutdown signal received");
            shutdown.store(true, Ordering::SeqCst);
        });

        let mut ticker = interval(Duration::from_secs(loop_seconds.max(1)));
        while !self.shutdown.load(Ordering::SeqCst) {
            ticker.tick().await;
            self.tick_all().await;
        }

        info!("tick loop stopped");
        Ok(())
    }

    /// Evaluate every configured symbol once. Failures are contained per
    /// symbol; the tick always runs to the end of the symbol list.
    pub async fn tick_all(&self) {
        let _guard = self.tick_lock.lock().await;

        let mode = if self.live() { "LIVE" } else { "SIM" };
        info!(mode, symbols = ?self.ladder.symbols(), "tick");

        let fill = self.fill_model();
        for (symbol, symbol_config) in &self.ladder.coins {
            if let Err(e) = engine::evaluate_symbol(
                &self.exchange,
                &self.store,
                &fill,
                symbol,
                symbol_config,
                self.live(),
            )
            .await
            {
                error!(symbol = %symbol, error = %e, "symbol evaluation failed");
            }
        }
    }
}
