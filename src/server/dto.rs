//! JSON wire protocol for the persistent client connection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cards::Card;
use crate::engine::{Chips, LegalActions, NormalizedAction, PlayerBetAction, SeatId, Street};
use crate::table::{HandResult, PublicTableState, TableId, TablePhase};

/// Inbound messages. Everything except `register` requires a bound session.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    Register {
        player_id: String,
        auth_token: String,
    },
    CreateTable {
        small_blind: Option<Chips>,
        big_blind: Option<Chips>,
        buy_in: Option<Chips>,
    },
    JoinTable {
        table_id: TableId,
    },
    StartTable {
        table_id: TableId,
    },
    Action {
        table_id: TableId,
        kind: ActionKind,
        amount: Option<Chips>,
    },
    LeaveTable {
        table_id: TableId,
    },
    RequestState {
        table_id: TableId,
    },
    Reconnect {
        table_id: TableId,
    },
    Chat {
        table_id: TableId,
        text: String,
    },
    ListTables,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionKind {
    Fold,
    Check,
    Call,
    Bet,
    Raise,
    AllIn,
}

impl ActionKind {
    /// Normalize the wire shape into the engine's tagged action. `bet` and
    /// `raise` carry street totals in `amount`.
    pub fn into_action(self, amount: Option<Chips>) -> Result<PlayerBetAction, &'static str> {
        match self {
            ActionKind::Fold => Ok(PlayerBetAction::Fold),
            ActionKind::Check => Ok(PlayerBetAction::Check),
            ActionKind::Call => Ok(PlayerBetAction::Call),
            ActionKind::Bet => amount
                .map(|to| PlayerBetAction::BetTo { to })
                .ok_or("bet requires an amount"),
            ActionKind::Raise => amount
                .map(|to| PlayerBetAction::RaiseTo { to })
                .ok_or("raise requires an amount"),
            ActionKind::AllIn => Ok(PlayerBetAction::AllIn),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSummary {
    pub table_id: TableId,
    pub phase: TablePhase,
    pub occupied: usize,
    pub max_seats: u8,
    pub small_blind: Chips,
    pub big_blind: Chips,
    pub buy_in: Chips,
}

/// Outbound messages. Public events carry the table's monotonically
/// increasing `seq` so clients can detect gaps and request a full resend.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    Registered {
        player_id: String,
    },
    TableCreated {
        table_id: TableId,
    },
    Tables {
        tables: Vec<TableSummary>,
    },
    TableState {
        table_id: TableId,
        seq: u64,
        state: PublicTableState,
    },
    HandStarted {
        table_id: TableId,
        seq: u64,
        hand_number: u64,
        button: SeatId,
        small_blind_seat: SeatId,
        big_blind_seat: SeatId,
    },
    StreetDealt {
        table_id: TableId,
        seq: u64,
        street: Street,
        cards: Vec<Card>,
        community: Vec<Card>,
        pot_total: Chips,
    },
    TurnChanged {
        table_id: TableId,
        seq: u64,
        seat: SeatId,
        deadline: DateTime<Utc>,
    },
    ActionTaken {
        table_id: TableId,
        seq: u64,
        seat: SeatId,
        action: NormalizedAction,
        pot_total: Chips,
        current_bet: Chips,
    },
    HandResult {
        table_id: TableId,
        seq: u64,
        result: HandResult,
    },
    Chat {
        table_id: TableId,
        seq: u64,
        from: String,
        text: String,
    },
    TableEnded {
        table_id: TableId,
        seq: u64,
    },
    HoleCards {
        table_id: TableId,
        seat: SeatId,
        cards: [Card; 2],
    },
    YourTurn {
        table_id: TableId,
        seat: SeatId,
        legal_actions: LegalActions,
        deadline: DateTime<Utc>,
    },
    Error {
        kind: String,
        code: String,
        message: String,
    },
}

impl ServerMessage {
    pub fn error(kind: &str, code: &str, message: impl Into<String>) -> Self {
        ServerMessage::Error {
            kind: kind.to_string(),
            code: code.to_string(),
            message: message.into(),
        }
    }
}
