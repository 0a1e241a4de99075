use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use super::rules::NoLimitRules;
use super::state::BettingState;
use super::types::{Chips, PlayerStatus, SeatId};

/// Menu of legal actions for the seat currently to act, shaped for the
/// private `yourTurn` prompt.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegalActions {
    pub may_fold: bool,
    pub may_check: bool,
    /// Actual chips a call would move (capped at the stack).
    pub call_amount: Option<Chips>,
    pub bet_range: Option<RangeInclusive<Chips>>,
    pub raise_range: Option<RangeInclusive<Chips>>,
}

pub fn legal_actions_for(state: &BettingState, seat: SeatId) -> LegalActions {
    let mut legals = LegalActions::default();
    if state.to_act != Some(seat) {
        return legals;
    }
    let Some(p) = state.player(seat) else {
        return legals;
    };
    if p.status != PlayerStatus::Active {
        return legals;
    }

    legals.may_fold = true;
    let price = state.price_to_call(seat);
    legals.may_check = price == 0;
    if price > 0 {
        legals.call_amount = Some(price.min(p.stack));
    }
    legals.bet_range = state.bet_bounds(seat);
    // A seat that already matched and acted is only re-opened by a full raise.
    if !p.has_acted_this_round {
        legals.raise_range = state.raise_bounds(seat);
    }
    legals
}
