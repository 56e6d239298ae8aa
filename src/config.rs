//! Bot settings and ladder ruleset loading.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::models::Step;

fn default_loop_seconds() -> u64 {
    30
}

/// Runtime settings, assembled from CLI flags and environment variables.
#[derive(Debug, Clone)]
pub struct BotSettings {
    /// Submit real orders instead of simulating.
    pub live: bool,

    /// Point the exchange client at the testnet.
    pub testnet: bool,

    /// Paper fee as a percentage of gross notional, e.g. 0.1 for 0.1%.
    pub fee_pct: Decimal,

    /// Paper slippage in basis points.
    pub slippage_bps: Decimal,

    /// Quote balance a fresh paper wallet starts with.
    pub starting_quote: Decimal,

    /// Asset the starting balance is denominated in.
    pub quote_asset: String,

    /// Where the engine state snapshot lives.
    pub state_path: PathBuf,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            live: false,
            testnet: false,
            fee_pct: dec!(0.1),       // 0.1% taker fee
            slippage_bps: dec!(2),    // 2 bps against the taker
            starting_quote: dec!(10000),
            quote_asset: "USDT".to_string(),
            state_path: PathBuf::from("data/state.json"),
        }
    }
}

/// Per-symbol ladder: the ordered list of steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolConfig {
    pub steps: Vec<Step>,
}

/// The full ruleset file: loop cadence, live switch, and one ladder per
/// symbol. Symbols iterate in sorted order so tick logs are stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LadderConfig {
    #[serde(default = "default_loop_seconds", rename = "loopSeconds")]
    pub loop_seconds: u64,

    #[serde(default)]
    pub live: bool,

    pub coins: BTreeMap<String, SymbolConfig>,
}

impl LadderConfig {
    /// Load and validate a ruleset from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read ladder config {}", path.display()))?;
        let config: LadderConfig = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse ladder config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Step ids key the persisted fire counters, so they must be unique
    /// across the whole ruleset.
    fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for (symbol, symbol_config) in &self.coins {
            for step in &symbol_config.steps {
                if !seen.insert(step.id.as_str()) {
                    bail!("duplicate step id `{}` (symbol {})", step.id, symbol);
                }
            }
        }
        Ok(())
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.coins.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Amount, LotOrder, LotSelector, Operator, Side, Trigger};

    const LADDER_JSON: &str = r#"{
        "loopSeconds": 30,
        "live": false,
        "coins": {
            "SOL/USDT": {
                "steps": [
                    {
                        "id": "sol_buy_180",
                        "side": "buy",
                        "repeatable": false,
                        "trigger": { "type": "price", "op": "lte", "value": 180 },
                        "amount": { "type": "quote", "value": 100 }
                    },
                    {
                        "id": "sol_sell_from_180_at_200",
                        "side": "sell",
                        "match": { "entryId": "sol_buy_180" },
                        "trigger": { "type": "price", "op": "gte", "value": 200 },
                        "amount": { "type": "lot_percent", "value": 100 }
                    },
                    {
                        "id": "sol_take_12_from_any",
                        "side": "sell",
                        "match": "fifo",
                        "repeatable": true,
                        "maxFires": 10,
                        "trigger": { "type": "percent_from_lot_entry", "op": "gte", "value": 12 },
                        "amount": { "type": "lot_percent", "value": 50 }
                    }
                ]
            }
        }
    }"#;

    #[test]
    fn test_parse_ladder_config() {
        let config: LadderConfig = serde_json::from_str(LADDER_JSON).unwrap();
        config.validate().unwrap();

        assert_eq!(config.loop_seconds, 30);
        assert!(!config.live);
        assert_eq!(config.symbols(), vec!["SOL/USDT"]);

        let steps = &config.coins["SOL/USDT"].steps;
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0].side, Side::Buy);
        assert_eq!(
            steps[1].lot_match,
            Some(LotSelector::Entry {
                entry_id: "sol_buy_180".to_string()
            })
        );
        assert_eq!(steps[2].lot_match, Some(LotSelector::Order(LotOrder::Fifo)));
        assert_eq!(steps[2].max_fires, Some(10));
        assert!(matches!(
            steps[2].trigger,
            Trigger::PercentFromLotEntry {
                op: Operator::Gte,
                ..
            }
        ));
        assert!(matches!(steps[2].amount, Amount::LotPercent { .. }));
    }

    #[test]
    fn test_loop_seconds_defaults() {
        let config: LadderConfig = serde_json::from_str(r#"{"coins": {}}"#).unwrap();
        assert_eq!(config.loop_seconds, 30);
        assert!(!config.live);
    }

    #[test]
    fn test_duplicate_step_ids_rejected() {
        let json = r#"{
            "coins": {
                "SOL/USDT": {
                    "steps": [
                        {
                            "id": "dup",
                            "side": "buy",
                            "trigger": { "type": "price", "op": "lte", "value": 1 },
                            "amount": { "type": "quote", "value": 1 }
                        },
                        {
                            "id": "dup",
                            "side": "buy",
                            "trigger": { "type": "price", "op": "lte", "value": 2 },
                            "amount": { "type": "quote", "value": 2 }
                        }
                    ]
                }
            }
        }"#;
        let config: LadderConfig = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }
}
