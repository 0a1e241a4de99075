use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cards::{Card, Deck};
use crate::config::{ACTION_LOG_CAPACITY, HAND_RESULT_CAPACITY, MAX_BROKE_HANDS, TableConfig};
use crate::engine::{
    BettingState, Chips, HandConfig, LayerAward, NormalizedAction, PlayerState, SeatId,
    SeatWinnings, Street,
};

use super::{PlayerId, TableError, TableId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TablePhase {
    Waiting,
    Preflop,
    Flop,
    Turn,
    River,
    Showdown,
    HandComplete,
    Closed,
}

impl TablePhase {
    pub fn is_street(self) -> bool {
        matches!(
            self,
            TablePhase::Preflop | TablePhase::Flop | TablePhase::Turn | TablePhase::River
        )
    }

    pub fn from_street(street: Street) -> Self {
        match street {
            Street::Preflop => TablePhase::Preflop,
            Street::Flop => TablePhase::Flop,
            Street::Turn => TablePhase::Turn,
            Street::River => TablePhase::River,
        }
    }
}

/// Durable per-seat data. Betting-round state lives on the engine while a
/// hand runs and is synced back when it completes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Seat {
    pub player_id: PlayerId,
    pub display_name: String,
    pub stack: Chips,
    pub sitting_out: bool,
    /// Consecutive hands this seat has started with no chips.
    pub broke_hands: u8,
}

/// Per-hand artifacts, created at hand start and dropped when the next hand
/// is prepared.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HandState {
    pub hand_no: u64,
    pub cfg: HandConfig,
    pub deck: Deck,
    pub community: Vec<Card>,
    pub holes: BTreeMap<SeatId, [Card; 2]>,
    pub betting: BettingState,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionLogEntry {
    pub hand_no: u64,
    pub street: Street,
    pub seat: SeatId,
    pub action: NormalizedAction,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealedHand {
    pub seat: SeatId,
    pub hole: [Card; 2],
    pub category: String,
    pub best_five: [Card; 5],
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandResult {
    pub hand_no: u64,
    pub community: Vec<Card>,
    pub pots: Vec<LayerAward>,
    pub revealed: Vec<RevealedHand>,
    pub refund: Option<SeatWinnings>,
    pub aborted: bool,
    pub completed_at: DateTime<Utc>,
}

/// A single table's full authoritative state. All mutation happens on the
/// owning worker task; everything here is synchronous state manipulation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Table {
    pub id: TableId,
    pub creator: PlayerId,
    pub config: TableConfig,
    pub phase: TablePhase,
    pub seats: Vec<Option<Seat>>,
    pub button: SeatId,
    pub hand_no: u64,
    pub hand: Option<HandState>,
    pub seq: u64,
    pub action_log: VecDeque<ActionLogEntry>,
    pub recent_results: VecDeque<HandResult>,
}

impl Table {
    pub fn new(id: TableId, creator: PlayerId, config: TableConfig) -> Self {
        let seats = vec![None; config.max_seats as usize];
        Self {
            id,
            creator,
            config,
            phase: TablePhase::Waiting,
            seats,
            button: 0,
            hand_no: 0,
            hand: None,
            seq: 0,
            action_log: VecDeque::new(),
            recent_results: VecDeque::new(),
        }
    }

    pub fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    pub fn seat_of(&self, player_id: &str) -> Option<SeatId> {
        self.seats.iter().position(|s| {
            s.as_ref()
                .map(|seat| seat.player_id == player_id)
                .unwrap_or(false)
        }).map(|i| i as SeatId)
    }

    pub fn seat(&self, seat: SeatId) -> Option<&Seat> {
        self.seats.get(seat as usize).and_then(|s| s.as_ref())
    }

    pub fn seat_mut(&mut self, seat: SeatId) -> Option<&mut Seat> {
        self.seats.get_mut(seat as usize).and_then(|s| s.as_mut())
    }

    pub fn occupied_seats(&self) -> impl Iterator<Item = (SeatId, &Seat)> {
        self.seats
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|seat| (i as SeatId, seat)))
    }

    pub fn occupied_count(&self) -> usize {
        self.seats.iter().filter(|s| s.is_some()).count()
    }

    /// A seat that can be dealt into the next hand.
    pub fn is_fundable(&self, seat: SeatId) -> bool {
        self.seat(seat)
            .map(|s| !s.sitting_out && s.stack > 0)
            .unwrap_or(false)
    }

    pub fn fundable_seats(&self) -> Vec<SeatId> {
        (0..self.config.max_seats)
            .filter(|&s| self.is_fundable(s))
            .collect()
    }

    /// Next fundable seat clockwise, `from` excluded.
    pub fn next_fundable_after(&self, from: SeatId) -> Option<SeatId> {
        let n = self.config.max_seats;
        (1..=n)
            .map(|step| (from + step) % n)
            .find(|&s| self.is_fundable(s))
    }

    /// Whether the seat is dealt into the running hand.
    pub fn seat_in_hand(&self, seat: SeatId) -> bool {
        self.hand
            .as_ref()
            .map(|h| h.betting.player(seat).is_some())
            .unwrap_or(false)
    }

    /// Current actor, defined only while a street is being bet.
    pub fn current_actor(&self) -> Option<SeatId> {
        if !self.phase.is_street() {
            return None;
        }
        self.hand.as_ref().and_then(|h| h.betting.to_act)
    }

    /// Aggregate pot for display: everything committed this hand.
    pub fn pot_total(&self) -> Chips {
        self.hand
            .as_ref()
            .map(|h| h.betting.total_committed())
            .unwrap_or(0)
    }

    /// A seat's chips behind, reading through to the engine mid-hand.
    pub fn stack_of(&self, seat: SeatId) -> Chips {
        if let Some(hand) = &self.hand {
            if let Some(p) = hand.betting.player(seat) {
                return p.stack;
            }
        }
        self.seat(seat).map(|s| s.stack).unwrap_or(0)
    }

    pub fn join(&mut self, player_id: &str, display_name: &str) -> Result<SeatId, TableError> {
        if !matches!(self.phase, TablePhase::Waiting | TablePhase::HandComplete) {
            return Err(TableError::JoinNotAllowed);
        }
        if self.seat_of(player_id).is_some() {
            return Err(TableError::AlreadySeated);
        }
        let free = self
            .seats
            .iter()
            .position(|s| s.is_none())
            .ok_or(TableError::TableFull)?;
        self.seats[free] = Some(Seat {
            player_id: player_id.to_string(),
            display_name: display_name.to_string(),
            stack: self.config.buy_in,
            sitting_out: false,
            broke_hands: 0,
        });
        Ok(free as SeatId)
    }

    /// Remove a seat and report the stack to return to the player's balance.
    /// Mid-hand consequences (folding, turn handoff) are the worker's job.
    pub fn remove_seat(&mut self, seat: SeatId) -> Option<(PlayerId, Chips)> {
        let removed = self.seats.get_mut(seat as usize)?.take()?;
        let stack = self.stack_of_removed(seat, &removed);
        Some((removed.player_id, stack))
    }

    fn stack_of_removed(&self, seat: SeatId, removed: &Seat) -> Chips {
        if let Some(hand) = &self.hand {
            if let Some(p) = hand.betting.player(seat) {
                return p.stack;
            }
        }
        removed.stack
    }

    pub fn start(&mut self, player_id: &str) -> Result<(), TableError> {
        if self.phase != TablePhase::Waiting {
            return Err(TableError::AlreadyStarted);
        }
        if self.creator != player_id {
            return Err(TableError::NotCreator);
        }
        if self.fundable_seats().len() < 2 {
            return Err(TableError::NotEnoughPlayers);
        }
        Ok(())
    }

    pub fn log_action(&mut self, seat: SeatId, street: Street, action: NormalizedAction) {
        if self.action_log.len() == ACTION_LOG_CAPACITY {
            self.action_log.pop_front();
        }
        self.action_log.push_back(ActionLogEntry {
            hand_no: self.hand_no,
            street,
            seat,
            action,
        });
    }

    pub fn record_result(&mut self, result: HandResult) {
        if self.recent_results.len() == HAND_RESULT_CAPACITY {
            self.recent_results.pop_front();
        }
        self.recent_results.push_back(result);
    }

    /// Copy engine stacks back onto the seats and update broke-hand counters.
    pub fn sync_seats_after_hand(&mut self) {
        let players: Vec<PlayerState> = self
            .hand
            .as_ref()
            .map(|h| h.betting.players.clone())
            .unwrap_or_default();
        for p in players {
            if let Some(seat) = self.seat_mut(p.seat) {
                seat.stack = p.stack;
            }
        }
        for seat in self.seats.iter_mut().flatten() {
            if seat.stack == 0 {
                seat.broke_hands = seat.broke_hands.saturating_add(1);
            } else {
                seat.broke_hands = 0;
            }
        }
    }

    /// Seats that have sat broke long enough to be removed at the next hand.
    pub fn broke_seats_to_remove(&self) -> Vec<SeatId> {
        self.occupied_seats()
            .filter(|(_, s)| s.stack == 0 && s.broke_hands >= MAX_BROKE_HANDS)
            .map(|(id, _)| id)
            .collect()
    }

    /// Clockwise seat order starting left of the button, for odd-chip awards.
    pub fn order_from_button(&self) -> Vec<SeatId> {
        let n = self.config.max_seats;
        (1..=n).map(|step| (self.button + step) % n).collect()
    }
}
