use serde::{Deserialize, Serialize};

use super::errors::{InvariantCheck, StateError};
use super::seating::Seating;
use super::types::{Chips, HandConfig, PlayerState, PlayerStatus, SeatId, Street};

/// Betting state for one hand. Created after blinds are posted, reset per
/// street, discarded when the hand completes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BettingState {
    // Street and turn order:
    pub street: Street,
    pub button: SeatId,
    pub to_act: Option<SeatId>,

    // Open/raise accounting:
    pub current_bet: Chips, // highest committed_this_round owed by active seats
    pub min_raise: Chips,   // size of the last full bet/raise delta

    // Players and rules:
    pub players: Vec<PlayerState>,
    pub cfg: HandConfig,
}

impl BettingState {
    /// Build preflop state from seats whose blinds have already been posted
    /// into `committed_this_round`. The big blind sets the price to match even
    /// when the blind itself went in short.
    pub fn new_after_blinds(cfg: HandConfig, players: Vec<PlayerState>) -> Self {
        let mut state = Self {
            street: Street::Preflop,
            button: cfg.button,
            to_act: None,
            current_bet: cfg.stakes.big_blind,
            min_raise: cfg.stakes.big_blind,
            players,
            cfg,
        };
        state.to_act = if state.active_count() >= 1 && state.owes_anyone() {
            state.next_owing_after(state.cfg.big_blind_seat)
        } else {
            None
        };
        state
    }

    pub fn player(&self, seat: SeatId) -> Option<&PlayerState> {
        self.players.iter().find(|p| p.seat == seat)
    }

    pub fn player_mut(&mut self, seat: SeatId) -> Option<&mut PlayerState> {
        self.players.iter_mut().find(|p| p.seat == seat)
    }

    pub fn active_count(&self) -> usize {
        self.players
            .iter()
            .filter(|p| p.status == PlayerStatus::Active)
            .count()
    }

    pub fn seats_still_in(&self) -> Vec<SeatId> {
        self.players
            .iter()
            .filter(|p| p.status != PlayerStatus::Folded)
            .map(|p| p.seat)
            .collect()
    }

    pub fn total_committed(&self) -> Chips {
        self.players.iter().map(|p| p.committed_total).sum()
    }

    /// The street's betting is settled when every seat that can still act has
    /// acted and matched the current bet.
    pub fn round_settled(&self) -> bool {
        self.players
            .iter()
            .filter(|p| p.status == PlayerStatus::Active)
            .all(|p| p.has_acted_this_round && p.committed_this_round == self.current_bet)
    }

    fn owes_anyone(&self) -> bool {
        self.players.iter().any(|p| {
            p.status == PlayerStatus::Active
                && (!p.has_acted_this_round || p.committed_this_round < self.current_bet)
        })
    }

    /// No further actions can be taken this hand (run the board out).
    pub fn betting_locked(&self) -> bool {
        self.to_act.is_none()
    }

    /// Re-open action for every other active seat after a full bet or raise.
    pub fn reopen_action_except(&mut self, seat: SeatId) {
        for p in self.players.iter_mut() {
            if p.seat != seat && p.status == PlayerStatus::Active {
                p.has_acted_this_round = false;
            }
        }
    }

    /// Street rollover: zero per-street counters and hand the action to the
    /// first active seat past the button. With fewer than two seats able to
    /// act there is no actor and the board runs out.
    pub fn reset_for_street(&mut self, street: Street) {
        for p in &mut self.players {
            p.committed_this_round = 0;
            if p.status == PlayerStatus::Active {
                p.has_acted_this_round = false;
            }
        }
        self.street = street;
        self.current_bet = 0;
        self.min_raise = self.cfg.stakes.big_blind;
        self.to_act = if self.active_count() >= 2 {
            self.first_to_act(street)
        } else {
            None
        };
    }
}

impl InvariantCheck for BettingState {
    fn validate_invariants(&self) -> Result<(), StateError> {
        for p in &self.players {
            if p.committed_this_round > self.current_bet {
                return Err(StateError::InvariantViolation(
                    "seat committed above the current bet",
                ));
            }
            if p.status == PlayerStatus::AllIn && p.stack != 0 {
                return Err(StateError::InvariantViolation("all-in seat with chips behind"));
            }
            if p.committed_this_round > p.committed_total {
                return Err(StateError::InvariantViolation(
                    "street commitment exceeds hand commitment",
                ));
            }
        }
        Ok(())
    }
}
