//! Ladder rule (step) model: trigger, amount, and lot-matching descriptors.
//!
//! These are closed sum types deserialized from the ruleset file, so an
//! unknown trigger kind, operator, or amount kind is a load-time error
//! instead of a silently dead rule.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Which side of the market a step acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

/// Comparison operator used by triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Gte,
    Lte,
    Gt,
    Lt,
    Eq,
}

impl Operator {
    /// Apply the operator to `left <op> right`.
    pub fn compare(self, left: Decimal, right: Decimal) -> bool {
        match self {
            Operator::Gte => left >= right,
            Operator::Lte => left <= right,
            Operator::Gt => left > right,
            Operator::Lt => left < right,
            Operator::Eq => left == right,
        }
    }
}

/// Reference price source for `percent_from_reference` triggers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reference {
    /// A fixed, configured price.
    Custom { value: Decimal },
    /// The latest close of the recent candle series supplied at evaluation time.
    LastClose,
}

/// Predicate gating whether a step may act on a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trigger {
    /// Compare the current price against an absolute value.
    Price { op: Operator, value: Decimal },

    /// Compare the percent move from a specific lot's entry price.
    /// Evaluates per lot; without a lot context it never fires.
    PercentFromLotEntry { op: Operator, value: Decimal },

    /// Compare the percent deviation of the current price from a reference.
    PercentFromReference {
        op: Operator,
        value: Decimal,
        reference: Reference,
    },
}

/// How much a step buys or sells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Amount {
    /// Spend a fixed amount of the quote asset (buy only).
    Quote { value: Decimal },
    /// Trade a fixed amount of the base asset.
    Base { value: Decimal },
    /// Consume a percentage of a lot's remaining base (sell only).
    LotPercent { value: Decimal },
    /// Consume up to a quote-equivalent amount of a lot (sell only).
    LotQuote { value: Decimal },
}

impl Amount {
    pub fn kind(&self) -> &'static str {
        match self {
            Amount::Quote { .. } => "quote",
            Amount::Base { .. } => "base",
            Amount::LotPercent { .. } => "lot_percent",
            Amount::LotQuote { .. } => "lot_quote",
        }
    }
}

/// Ordering applied when a sell step scans open lots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LotOrder {
    Fifo,
    Lifo,
}

/// Candidate-lot selector for sell steps.
///
/// Serialized either as the plain strings `"fifo"` / `"lifo"` or as
/// `{"entryId": "..."}` to target lots opened by a specific buy step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LotSelector {
    Order(LotOrder),
    Entry {
        #[serde(rename = "entryId")]
        entry_id: String,
    },
}

/// One configured rung of the ladder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Unique identity, stable across runs; keys the fire counter.
    pub id: String,

    /// Buy steps open lots, sell steps consume them.
    pub side: Side,

    /// A non-repeatable step fires at most once, ever.
    #[serde(default)]
    pub repeatable: bool,

    /// Optional fire cap for repeatable steps.
    #[serde(default, rename = "maxFires", skip_serializing_if = "Option::is_none")]
    pub max_fires: Option<u32>,

    pub trigger: Trigger,

    pub amount: Amount,

    /// Sell steps only; absent means FIFO.
    #[serde(default, rename = "match", skip_serializing_if = "Option::is_none")]
    pub lot_match: Option<LotSelector>,
}
