//! Step firing tracker: one-shot vs repeatable-with-cap enforcement.
//!
//! Counts are keyed by step id globally, not per lot, and only advance
//! after a successful action. A skipped or rejected evaluation never
//! increments a counter.

use crate::models::Step;
use crate::state::EngineState;

/// Whether the step still has fire budget.
pub fn can_fire(state: &EngineState, step: &Step) -> bool {
    let fired = state.steps_fired.get(&step.id).copied().unwrap_or(0);
    if step.repeatable {
        match step.max_fires {
            Some(cap) => fired < cap,
            None => true,
        }
    } else {
        fired == 0
    }
}

/// Record one successful fire.
pub fn record_fire(state: &mut EngineState, step: &Step) {
    *state.steps_fired.entry(step.id.clone()).or_insert(0) += 1;
}
