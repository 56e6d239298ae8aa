//! Lot ledger: candidate selection and per-lot PnL realization.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use crate::engine::sizing::{quantize_base, quantize_quote};
use crate::models::{Lot, LotOrder, LotSelector};
use crate::state::EngineState;

/// Remainders under this many base units snap the lot to fully closed,
/// so rounding residue can't keep a lot perpetually open.
pub const DUST_BASE: Decimal = dec!(0.00000001);

/// Append a newly opened lot. Lots are only ever appended; creation order
/// is the FIFO/LIFO tie-break.
pub fn append(state: &mut EngineState, lot: Lot) {
    state.lots.push(lot);
}

/// Ids of open lots for `symbol`, ordered per the selector.
///
/// `entryId` filters to lots opened by that buy step, in creation order.
/// An absent selector defaults to FIFO. Closed lots are never candidates;
/// they are retained in the ledger for history.
pub fn select_candidates(
    state: &EngineState,
    symbol: &str,
    selector: Option<&LotSelector>,
) -> Vec<Uuid> {
    let mut open: Vec<&Lot> = state
        .lots
        .iter()
        .filter(|lot| lot.symbol == symbol && lot.is_open())
        .collect();

    match selector {
        Some(LotSelector::Entry { entry_id }) => {
            open.retain(|lot| lot.entry_step_id == *entry_id);
        }
        Some(LotSelector::Order(LotOrder::Lifo)) => {
            open.sort_by(|a, b| b.entry_ts.cmp(&a.entry_ts));
        }
        Some(LotSelector::Order(LotOrder::Fifo)) | None => {
            open.sort_by(|a, b| a.entry_ts.cmp(&b.entry_ts));
        }
    }

    open.iter().map(|lot| lot.id).collect()
}

/// Realize PnL for selling `sold_base` out of a lot at `net_proceeds`
/// (fees already deducted). Returns the realized PnL delta.
///
/// The consumed fraction of the lot's remaining cost basis is attributed
/// to this sale; the remainder shrinks proportionally. A dust remainder
/// snaps to fully closed.
pub fn realize(
    state: &mut EngineState,
    lot_id: Uuid,
    sold_base: Decimal,
    net_proceeds: Decimal,
) -> Decimal {
    let Some(lot) = state.lots.iter_mut().find(|lot| lot.id == lot_id) else {
        return Decimal::ZERO;
    };

    let remaining = lot.remaining_base_qty;
    if remaining <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    let fraction = (sold_base / remaining).min(Decimal::ONE);
    let attributed_cost = lot.remaining_cost_quote * fraction;
    let pnl = quantize_quote(net_proceeds - attributed_cost);

    state.realized_pnl_usdt = quantize_quote(state.realized_pnl_usdt + pnl);

    lot.remaining_cost_quote = quantize_quote(lot.remaining_cost_quote - attributed_cost);
    lot.remaining_base_qty = quantize_base(lot.remaining_base_qty - sold_base);
    if lot.remaining_base_qty < DUST_BASE {
        lot.remaining_base_qty = Decimal::ZERO;
        lot.remaining_cost_quote = Decimal::ZERO;
    }

    pnl
}
