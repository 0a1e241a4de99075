use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::engine::{PlayerBetAction, SeatId};
use crate::server::dto::ServerMessage;

use super::view::AdminTableView;
use super::{PlayerId, TableError};

/// The sender side of a connection, as the table sees it.
#[derive(Clone)]
pub struct PlayerHandle {
    pub player_id: PlayerId,
    pub display_name: String,
    pub session_id: Uuid,
    pub outbound: mpsc::Sender<ServerMessage>,
}

/// Everything a table can be asked to do. All commands for one table are
/// drained by its single worker task, which is what serializes player actions
/// against timer fires.
pub enum TableCommand {
    Join {
        player: PlayerHandle,
        reply: oneshot::Sender<Result<SeatId, TableError>>,
    },
    Leave {
        player_id: PlayerId,
    },
    Start {
        player_id: PlayerId,
    },
    Action {
        player_id: PlayerId,
        action: PlayerBetAction,
    },
    Chat {
        player_id: PlayerId,
        text: String,
    },
    RequestState {
        player_id: PlayerId,
    },
    Reconnect {
        player: PlayerHandle,
    },
    Disconnected {
        player_id: PlayerId,
        session_id: Uuid,
    },
    Inspect {
        reply: oneshot::Sender<AdminTableView>,
    },
}
