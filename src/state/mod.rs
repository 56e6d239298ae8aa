//! Persisted engine state and its durable snapshot store.
//!
//! The snapshot is the durable contract: a single JSON document holding
//! `lots`, `stepsFired`, `balances`, `realizedPnlUSDT`, and `trades`.
//! Saves are atomic (write to a temp file, then rename) so a crash mid-write
//! never corrupts the snapshot. State is loaded fresh at the start of every
//! evaluation pass and saved after every state-mutating action, capping data
//! loss to at most one action per crash.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::{Lot, TradeRecord};

/// Process-wide persisted aggregate: lots, fire counts, paper wallet,
/// realized PnL, and the trade audit log.
///
/// Every top-level field defaults independently so older snapshots missing
/// a field load cleanly instead of failing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineState {
    /// Open and closed lots in creation order. Creation order is the
    /// FIFO/LIFO tie-break, so this stays append-only.
    #[serde(default)]
    pub lots: Vec<Lot>,

    /// Fire count per step id, monotonically non-decreasing.
    #[serde(default)]
    pub steps_fired: HashMap<String, u32>,

    /// Paper-mode wallet: asset symbol -> free quantity. Never negative.
    #[serde(default)]
    pub balances: HashMap<String, Decimal>,

    /// Running realized PnL, quote-denominated.
    #[serde(default, rename = "realizedPnlUSDT")]
    pub realized_pnl_usdt: Decimal,

    /// Append-only trade history.
    #[serde(default)]
    pub trades: Vec<TradeRecord>,
}

impl EngineState {
    /// Free balance of an asset, zero if unknown.
    pub fn balance(&self, asset: &str) -> Decimal {
        self.balances.get(asset).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn set_balance(&mut self, asset: &str, amount: Decimal) {
        self.balances.insert(asset.to_string(), amount);
    }
}

/// Durable snapshot store for [`EngineState`].
pub struct StateStore {
    path: PathBuf,
    quote_asset: String,
    starting_quote: Decimal,
}

impl StateStore {
    /// Create a store backed by `path`. A fresh state seeds `quote_asset`
    /// with `starting_quote`.
    pub fn new(path: impl Into<PathBuf>, quote_asset: &str, starting_quote: Decimal) -> Self {
        Self {
            path: path.into(),
            quote_asset: quote_asset.to_string(),
            starting_quote,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn initial_state(&self) -> EngineState {
        let mut state = EngineState::default();
        state.set_balance(&self.quote_asset, self.starting_quote);
        state
    }

    /// Load the snapshot, creating an initial one if none exists.
    ///
    /// A snapshot that fails to parse is replaced by a fresh initial state;
    /// missing fields in a parsable snapshot are defaulted, and an empty
    /// wallet is re-seeded with the starting quote balance.
    pub fn load(&self) -> Result<EngineState> {
        if !self.path.exists() {
            let state = self.initial_state();
            self.save(&state)?;
            return Ok(state);
        }

        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read state file {}", self.path.display()))?;

        match serde_json::from_str::<EngineState>(&raw) {
            Ok(mut state) => {
                if state.balances.is_empty() {
                    state.set_balance(&self.quote_asset, self.starting_quote);
                }
                Ok(state)
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "state file unreadable, reinitializing"
                );
                let state = self.initial_state();
                self.save(&state)?;
                Ok(state)
            }
        }
    }

    /// Persist the snapshot atomically: write a temp file, then rename it
    /// over the target.
    pub fn save(&self, state: &EngineState) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create state dir {}", dir.display()))?;
        }

        let json = serde_json::to_string_pretty(state).context("failed to serialize state")?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .with_context(|| format!("failed to write state temp file {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to swap state file {}", self.path.display()))?;

        debug!(
            lots = state.lots.len(),
            trades = state.trades.len(),
            pnl = %state.realized_pnl_usdt,
            "state saved"
        );
        Ok(())
    }

    /// Replace the snapshot with a fresh initial state and return it.
    pub fn reset(&self) -> Result<EngineState> {
        let state = self.initial_state();
        self.save(&state)?;
        Ok(state)
    }
}
