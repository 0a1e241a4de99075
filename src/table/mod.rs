//! Table core: one state machine per table, driven by a serial worker task.

use thiserror::Error;

use crate::engine::ActionError;

pub mod commands;
pub mod hand;
pub mod registry;
pub mod snapshot;
pub mod state;
pub mod view;
pub mod worker;


pub use commands::{PlayerHandle, TableCommand};
pub use registry::{RegistryError, TableDirectory, TableHandle};
pub use snapshot::TableSnapshot;
pub use state::{HandResult, RevealedHand, Seat, Table, TablePhase};
pub use view::{AdminTableView, PublicTableState, SeatPublic};

/// Opaque player identity, normalized on ingress.
pub type PlayerId = String;

/// 6-hex table identity.
pub type TableId = String;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("table is full")]
    TableFull,
    #[error("player is already seated at this table")]
    AlreadySeated,
    #[error("player is not seated at this table")]
    NotSeated,
    #[error("joining is only possible between hands")]
    JoinNotAllowed,
    #[error("only the table creator may start the game")]
    NotCreator,
    #[error("at least two funded seats are required to start")]
    NotEnoughPlayers,
    #[error("the table has already started")]
    AlreadyStarted,
    #[error("no hand is currently running")]
    HandNotRunning,
    #[error("hand could not be dealt: {0}")]
    DealFailed(&'static str),
    #[error(transparent)]
    Action(#[from] ActionError),
}

impl TableError {
    /// Stable error kind per the input/state/resource/protocol taxonomy.
    pub fn kind(&self) -> &'static str {
        match self {
            TableError::NotCreator => "protocol",
            TableError::DealFailed(_) => "state",
            _ => "input",
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            TableError::TableFull => "table_full",
            TableError::AlreadySeated => "already_seated",
            TableError::NotSeated => "not_seated",
            TableError::JoinNotAllowed => "join_not_allowed",
            TableError::NotCreator => "not_creator",
            TableError::NotEnoughPlayers => "not_enough_players",
            TableError::AlreadyStarted => "already_started",
            TableError::HandNotRunning => "hand_not_running",
            TableError::DealFailed(_) => "deal_failed",
            TableError::Action(_) => "illegal_action",
        }
    }
}
