use crate::config::MAX_SEATS;

use super::state::BettingState;
use super::types::{PlayerStatus, SeatId, Street};

pub trait Seating {
    /// Next active seat clockwise from `from`, exclusive.
    fn next_active_after(&self, from: SeatId) -> Option<SeatId>;
    /// Next active seat clockwise from `from` that still owes action.
    fn next_owing_after(&self, from: SeatId) -> Option<SeatId>;
    /// First seat to act when a street opens: left of the big blind preflop,
    /// left of the button postflop.
    fn first_to_act(&self, street: Street) -> Option<SeatId>;
}

impl Seating for BettingState {
    fn next_active_after(&self, from: SeatId) -> Option<SeatId> {
        for step in 1..=MAX_SEATS {
            let seat = (from + step) % MAX_SEATS;
            if let Some(p) = self.player(seat) {
                if p.status == PlayerStatus::Active {
                    return Some(seat);
                }
            }
        }
        None
    }

    fn next_owing_after(&self, from: SeatId) -> Option<SeatId> {
        for step in 1..=MAX_SEATS {
            let seat = (from + step) % MAX_SEATS;
            if let Some(p) = self.player(seat) {
                if p.status == PlayerStatus::Active
                    && (!p.has_acted_this_round || p.committed_this_round < self.current_bet)
                {
                    return Some(seat);
                }
            }
        }
        None
    }

    fn first_to_act(&self, street: Street) -> Option<SeatId> {
        match street {
            Street::Preflop => self.next_active_after(self.cfg.big_blind_seat),
            _ => self.next_active_after(self.cfg.button),
        }
    }
}
