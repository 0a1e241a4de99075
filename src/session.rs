//! Session registry: maps a player identity to its single live connection.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::sync::Notify;
use tracing::{debug, info};
use uuid::Uuid;

use crate::server::dto::ServerMessage;
use crate::table::PlayerId;

const LOG_TARGET: &str = "holdem_server::session";

/// Handle to one live connection. `shutdown` is signalled when a newer
/// session replaces this one; the socket task closes itself in response.
#[derive(Clone)]
pub struct SessionHandle {
    pub session_id: Uuid,
    pub player_id: PlayerId,
    pub outbound: mpsc::Sender<ServerMessage>,
    pub shutdown: Arc<Notify>,
}

#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<PlayerId, SessionHandle>,
}

impl SessionRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Bind a player to a new session, replacing and signalling any previous
    /// one. Registering the same player again is idempotent from the player's
    /// point of view: the latest connection wins.
    pub fn register(&self, handle: SessionHandle) {
        let player_id = handle.player_id.clone();
        let prior = self.sessions.insert(player_id.clone(), handle);
        if let Some(prior) = prior {
            info!(
                target: LOG_TARGET,
                player_id = %player_id,
                replaced_session = %prior.session_id,
                "session replaced by a newer connection"
            );
            let _ = prior.outbound.try_send(ServerMessage::error(
                "protocol",
                "session_replaced",
                "another connection registered for this player",
            ));
            prior.shutdown.notify_waiters();
        } else {
            debug!(target: LOG_TARGET, player_id = %player_id, "session registered");
        }
    }

    /// Remove the mapping only if it still belongs to this session.
    pub fn deregister(&self, player_id: &str, session_id: Uuid) -> bool {
        let removed = self
            .sessions
            .remove_if(player_id, |_, handle| handle.session_id == session_id)
            .is_some();
        if removed {
            debug!(target: LOG_TARGET, player_id, %session_id, "session deregistered");
        }
        removed
    }

    pub fn lookup(&self, player_id: &str) -> Option<SessionHandle> {
        self.sessions.get(player_id).map(|h| h.clone())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OUTBOUND_BUFFER_CAPACITY;

    fn handle(player: &str) -> (SessionHandle, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(OUTBOUND_BUFFER_CAPACITY);
        (
            SessionHandle {
                session_id: Uuid::new_v4(),
                player_id: player.to_string(),
                outbound: tx,
                shutdown: Arc::new(Notify::new()),
            },
            rx,
        )
    }

    #[tokio::test]
    async fn register_replaces_and_signals_the_prior_session() {
        let registry = SessionRegistry::new();
        let (first, mut first_rx) = handle("alice");
        let first_id = first.session_id;
        registry.register(first);

        let (second, _second_rx) = handle("alice");
        let second_id = second.session_id;
        registry.register(second);

        let current = registry.lookup("alice").unwrap();
        assert_eq!(current.session_id, second_id);

        // prior session received the replacement notice
        let msg = first_rx.recv().await.unwrap();
        assert!(matches!(msg, ServerMessage::Error { code, .. } if code == "session_replaced"));

        // a stale deregister must not remove the new session
        assert!(!registry.deregister("alice", first_id));
        assert!(registry.lookup("alice").is_some());
        assert!(registry.deregister("alice", second_id));
        assert!(registry.lookup("alice").is_none());
    }
}
