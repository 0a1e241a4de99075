//! The persistent duplex client connection. Each socket gets a bounded
//! outbound buffer drained by a writer task; the reader loop parses JSON
//! messages and routes them to the registries and table inboxes.

use std::collections::HashSet;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::Extension;
use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot, Notify};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::OUTBOUND_BUFFER_CAPACITY;
use crate::session::SessionHandle;
use crate::store::{credit_with_retry, DebitOutcome};
use crate::table::{PlayerHandle, PlayerId, TableCommand, TableId};

use super::dto::{ClientMessage, ServerMessage};
use super::routes::ServerContext;

const LOG_TARGET: &str = "holdem_server::server::ws";

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Extension(ctx): Extension<Arc<ServerContext>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, ctx))
}

async fn handle_socket(socket: WebSocket, ctx: Arc<ServerContext>) {
    let session_id = Uuid::new_v4();
    let (outbound, mut outbound_rx) = mpsc::channel::<ServerMessage>(OUTBOUND_BUFFER_CAPACITY);
    let shutdown = Arc::new(Notify::new());
    let (mut sink, mut stream) = socket.split();

    let writer = tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            let json = match serde_json::to_string(&msg) {
                Ok(json) => json,
                Err(_) => continue,
            };
            if sink.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    let mut conn = Connection {
        ctx,
        session_id,
        outbound,
        shutdown: Arc::clone(&shutdown),
        player_id: None,
        joined: HashSet::new(),
    };
    debug!(target: LOG_TARGET, %session_id, "connection opened");

    // pinned once so a replacement signal arriving mid-message is not lost
    let shutdown_signal = shutdown.notified();
    tokio::pin!(shutdown_signal);

    loop {
        tokio::select! {
            _ = &mut shutdown_signal => break,
            msg = stream.next() => match msg {
                Some(Ok(Message::Text(text))) => conn.handle_text(&text).await,
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    debug!(target: LOG_TARGET, %session_id, error = %err, "socket error");
                    break;
                }
            }
        }
    }

    conn.cleanup().await;
    writer.abort();
    debug!(target: LOG_TARGET, %session_id, "connection closed");
}

struct Connection {
    ctx: Arc<ServerContext>,
    session_id: Uuid,
    outbound: mpsc::Sender<ServerMessage>,
    shutdown: Arc<Notify>,
    player_id: Option<PlayerId>,
    joined: HashSet<TableId>,
}

impl Connection {
    fn send(&self, msg: ServerMessage) {
        let _ = self.outbound.try_send(msg);
    }

    fn send_error(&self, kind: &str, code: &str, message: impl Into<String>) {
        self.send(ServerMessage::error(kind, code, message));
    }

    fn player_handle(&self, player_id: &str) -> PlayerHandle {
        PlayerHandle {
            player_id: player_id.to_string(),
            display_name: player_id.to_string(),
            session_id: self.session_id,
            outbound: self.outbound.clone(),
        }
    }

    async fn handle_text(&mut self, text: &str) {
        let msg: ClientMessage = match serde_json::from_str(text) {
            Ok(msg) => msg,
            Err(err) => {
                self.send_error("input", "malformed_message", err.to_string());
                return;
            }
        };

        let msg = match msg {
            ClientMessage::Register {
                player_id,
                auth_token,
            } => {
                self.handle_register(player_id, auth_token).await;
                return;
            }
            other => other,
        };
        let Some(player_id) = self.player_id.clone() else {
            self.send_error("protocol", "not_registered", "register before anything else");
            return;
        };

        match msg {
            ClientMessage::Register { .. } => unreachable!("handled above"),
            ClientMessage::CreateTable {
                small_blind,
                big_blind,
                buy_in,
            } => {
                let options = crate::table::registry::CreateTableOptions {
                    small_blind,
                    big_blind,
                    buy_in,
                };
                match self.ctx.directory.create_table(&player_id, options) {
                    Ok(table_id) => self.send(ServerMessage::TableCreated { table_id }),
                    Err(err) => self.send_error("input", "invalid_table_config", err.to_string()),
                }
            }
            ClientMessage::JoinTable { table_id } => self.handle_join(&player_id, table_id).await,
            ClientMessage::StartTable { table_id } => {
                self.route(&table_id, TableCommand::Start { player_id }).await;
            }
            ClientMessage::Action {
                table_id,
                kind,
                amount,
            } => match kind.into_action(amount) {
                Ok(action) => {
                    self.route(&table_id, TableCommand::Action { player_id, action })
                        .await;
                }
                Err(message) => self.send_error("input", "malformed_action", message),
            },
            ClientMessage::LeaveTable { table_id } => {
                self.route(&table_id, TableCommand::Leave { player_id }).await;
                self.joined.remove(&table_id);
            }
            ClientMessage::RequestState { table_id } => {
                self.route(&table_id, TableCommand::RequestState { player_id })
                    .await;
            }
            ClientMessage::Reconnect { table_id } => {
                let player = self.player_handle(&player_id);
                self.route(&table_id, TableCommand::Reconnect { player }).await;
                self.joined.insert(table_id);
            }
            ClientMessage::Chat { table_id, text } => {
                self.route(&table_id, TableCommand::Chat { player_id, text })
                    .await;
            }
            ClientMessage::ListTables => {
                let tables = self.ctx.directory.list_summaries().await;
                self.send(ServerMessage::Tables { tables });
            }
        }
    }

    async fn handle_register(&mut self, claimed: String, auth_token: String) {
        let verified = match self.ctx.identity.verify(&auth_token).await {
            Ok(player_id) => player_id,
            Err(err) => {
                self.send_error("protocol", "auth_failed", err.to_string());
                return;
            }
        };
        if verified != claimed {
            self.send_error(
                "protocol",
                "auth_mismatch",
                "token does not match the claimed player id",
            );
            return;
        }
        if let Some(prior) = self.player_id.take() {
            self.ctx.sessions.deregister(&prior, self.session_id);
        }
        self.ctx.sessions.register(SessionHandle {
            session_id: self.session_id,
            player_id: verified.clone(),
            outbound: self.outbound.clone(),
            shutdown: Arc::clone(&self.shutdown),
        });
        info!(
            target: LOG_TARGET,
            session_id = %self.session_id,
            player_id = %verified,
            "session bound"
        );
        self.player_id = Some(verified.clone());
        self.send(ServerMessage::Registered {
            player_id: verified,
        });
    }

    /// Join debits the buy-in first, then asks the table for a seat; a
    /// rejected join refunds through the retry path.
    async fn handle_join(&mut self, player_id: &str, table_id: TableId) {
        let Some(handle) = self.ctx.directory.find(&table_id) else {
            self.send_error("input", "unknown_table", "no such table");
            return;
        };
        let Some(config) = self.ctx.directory.config_of(&table_id) else {
            self.send_error("input", "unknown_table", "no such table");
            return;
        };
        let buy_in = config.buy_in;
        match self.ctx.balances.debit(player_id, buy_in).await {
            Ok(DebitOutcome::Ok) => {}
            Ok(DebitOutcome::Insufficient) => {
                self.send_error("input", "insufficient_balance", "buy-in exceeds balance");
                return;
            }
            Err(err) => {
                self.send_error("resource", "balance_unavailable", err.to_string());
                return;
            }
        }

        let (reply, rx) = oneshot::channel();
        let player = self.player_handle(player_id);
        let sent = handle
            .sender
            .send(TableCommand::Join { player, reply })
            .await;
        let joined = match sent {
            Ok(()) => match rx.await {
                Ok(Ok(_seat)) => true,
                Ok(Err(err)) => {
                    self.send_error(err.kind(), err.code(), err.to_string());
                    false
                }
                Err(_) => {
                    self.send_error("input", "unknown_table", "table closed");
                    false
                }
            },
            Err(_) => {
                self.send_error("input", "unknown_table", "table closed");
                false
            }
        };

        if joined {
            self.joined.insert(table_id);
        } else {
            // seat was refused after the debit went through
            warn!(
                target: LOG_TARGET,
                player_id,
                table_id = %table_id,
                buy_in,
                "refunding refused join"
            );
            tokio::spawn(credit_with_retry(
                Arc::clone(&self.ctx.balances),
                Arc::clone(&self.ctx.snapshots),
                player_id.to_string(),
                buy_in,
                "join refund".to_string(),
            ));
        }
    }

    async fn route(&self, table_id: &str, cmd: TableCommand) {
        let Some(handle) = self.ctx.directory.find(table_id) else {
            self.send_error("input", "unknown_table", "no such table");
            return;
        };
        if handle.sender.send(cmd).await.is_err() {
            self.send_error("input", "unknown_table", "table closed");
        }
    }

    /// Socket went away: sit the player out everywhere, never fold for them.
    async fn cleanup(&mut self) {
        let Some(player_id) = self.player_id.clone() else {
            return;
        };
        for table_id in self.joined.iter() {
            if let Some(handle) = self.ctx.directory.find(table_id) {
                let _ = handle
                    .sender
                    .send(TableCommand::Disconnected {
                        player_id: player_id.clone(),
                        session_id: self.session_id,
                    })
                    .await;
            }
        }
        self.ctx.sessions.deregister(&player_id, self.session_id);
    }
}
