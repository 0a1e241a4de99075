use std::ops::RangeInclusive;

use super::state::BettingState;
use super::types::{Chips, PlayerStatus, SeatId};

/// No-limit pricing rules, computed off the current street state.
pub trait NoLimitRules {
    /// Chips the seat must add to match the current bet (uncapped by stack).
    fn price_to_call(&self, seat: SeatId) -> Chips;
    /// Street totals a seat may open for when no bet is in front of it.
    fn bet_bounds(&self, seat: SeatId) -> Option<RangeInclusive<Chips>>;
    /// Street totals a seat may raise to. The lower bound is the full minimum
    /// raise; an all-in short of it is still accepted by the engine but does
    /// not re-open action.
    fn raise_bounds(&self, seat: SeatId) -> Option<RangeInclusive<Chips>>;
    /// A raise delta of at least the last full bet/raise re-opens action.
    fn is_full_raise(&self, raise_amount: Chips) -> bool;
}

impl NoLimitRules for BettingState {
    fn price_to_call(&self, seat: SeatId) -> Chips {
        let Some(p) = self.player(seat) else { return 0 };
        if p.status != PlayerStatus::Active {
            return 0;
        }
        self.current_bet.saturating_sub(p.committed_this_round)
    }

    fn bet_bounds(&self, seat: SeatId) -> Option<RangeInclusive<Chips>> {
        if self.current_bet != 0 {
            return None;
        }
        let p = self.player(seat)?;
        if p.status != PlayerStatus::Active {
            return None;
        }
        let min = self.cfg.stakes.big_blind;
        let max = p.committed_this_round + p.stack;
        if max < min {
            return None;
        }
        Some(min..=max)
    }

    fn raise_bounds(&self, seat: SeatId) -> Option<RangeInclusive<Chips>> {
        if self.current_bet == 0 {
            return None;
        }
        let p = self.player(seat)?;
        if p.status != PlayerStatus::Active {
            return None;
        }
        let max = p.committed_this_round + p.stack;
        if max <= self.current_bet {
            return None;
        }
        let min = (self.current_bet + self.min_raise).min(max);
        Some(min..=max)
    }

    fn is_full_raise(&self, raise_amount: Chips) -> bool {
        raise_amount >= self.min_raise
    }
}
