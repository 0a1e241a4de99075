use serde::{Deserialize, Serialize};

pub type Chips = u64;
pub type SeatId = u8; // 0..=7

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Street {
    Preflop,
    Flop,
    Turn,
    River,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerStatus {
    Active, // can act this round
    Folded, // out of hand
    AllIn,  // cannot act; still eligible for pots
}

/// Per-seat betting view for the current hand. Durable seat data (identity,
/// sit-out flags) lives on the table; this struct only exists while a hand is
/// running.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    pub seat: SeatId,

    pub stack: Chips,                // uncommitted chips behind
    pub committed_this_round: Chips, // on the current street
    pub committed_total: Chips,      // across the whole hand, current street included

    pub status: PlayerStatus,
    pub has_acted_this_round: bool,
}

impl PlayerState {
    pub fn new(seat: SeatId, stack: Chips) -> Self {
        Self {
            seat,
            stack,
            committed_this_round: 0,
            committed_total: 0,
            status: PlayerStatus::Active,
            has_acted_this_round: false,
        }
    }

    /// Move chips from the stack into the pot, flipping to all-in when the
    /// stack empties.
    pub fn commit(&mut self, amount: Chips) {
        debug_assert!(amount <= self.stack);
        self.stack -= amount;
        self.committed_this_round += amount;
        self.committed_total += amount;
        if self.stack == 0 {
            self.status = PlayerStatus::AllIn;
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableStakes {
    pub small_blind: Chips,
    pub big_blind: Chips,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandConfig {
    pub stakes: TableStakes,
    pub button: SeatId,
    pub small_blind_seat: SeatId,
    pub big_blind_seat: SeatId,
}
