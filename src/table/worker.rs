//! The per-table serial executor. One tokio task owns the table state and
//! drains its command inbox; the turn deadline and the post-hand delay are
//! `select!`ed against the inbox so timer fires and player actions are
//! linearized through the same loop.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::engine::{
    legal_actions_for, BettingEngine, NoLimitEngine, NormalizedAction, PlayerBetAction, SeatId,
    StateError, Street,
};
use crate::server::dto::ServerMessage;
use crate::store::{credit_with_retry, BalanceStore, SnapshotStore};

use super::commands::{PlayerHandle, TableCommand};
use super::hand::FoldAdvance;
use super::registry::TableDirectory;
use super::snapshot::TableSnapshot;
use super::state::{Table, TablePhase};
use super::view::public_state;
use super::{PlayerId, TableError};

const LOG_TARGET: &str = "holdem_server::table::worker";

const MAX_CHAT_LEN: usize = 500;

pub struct WorkerDeps {
    pub snapshots: Arc<dyn SnapshotStore>,
    pub balances: Arc<dyn BalanceStore>,
    pub persistence_budget: Duration,
}

struct Subscriber {
    player_id: PlayerId,
    session_id: Uuid,
    outbound: mpsc::Sender<ServerMessage>,
}

struct TurnDeadline {
    seat: SeatId,
    fires_at: Instant,
    wall: DateTime<Utc>,
}

pub struct TableWorker {
    table: Table,
    inbox: mpsc::Receiver<TableCommand>,
    directory: Arc<TableDirectory>,
    deps: WorkerDeps,
    subscribers: Vec<Subscriber>,
    turn_deadline: Option<TurnDeadline>,
    resume_at: Option<Instant>,
    closed: bool,
}

impl TableWorker {
    pub fn new(
        table: Table,
        inbox: mpsc::Receiver<TableCommand>,
        directory: Arc<TableDirectory>,
        deps: WorkerDeps,
    ) -> Self {
        Self {
            table,
            inbox,
            directory,
            deps,
            subscribers: Vec::new(),
            turn_deadline: None,
            resume_at: None,
            closed: false,
        }
    }

    pub async fn run(mut self) {
        info!(
            target: LOG_TARGET,
            table_id = %self.table.id,
            phase = ?self.table.phase,
            "table worker started"
        );
        self.restore_flow().await;

        while !self.closed {
            let turn_at = self.turn_deadline.as_ref().map(|d| d.fires_at);
            let resume = self.resume_at;
            tokio::select! {
                cmd = self.inbox.recv() => {
                    match cmd {
                        Some(cmd) => self.handle_command(cmd).await,
                        None => break,
                    }
                }
                _ = async { sleep_until(turn_at.unwrap()).await }, if turn_at.is_some() => {
                    self.handle_turn_timeout().await;
                }
                _ = async { sleep_until(resume.unwrap()).await }, if resume.is_some() => {
                    self.resume_at = None;
                    self.advance_between_hands().await;
                }
            }
        }

        info!(target: LOG_TARGET, table_id = %self.table.id, "table worker exiting");
    }

    /// A restored table picks up where the snapshot left off: a fresh full
    /// deadline for the pending actor, the post-hand clock if the hand was
    /// already over, or the rest of an all-in runout.
    async fn restore_flow(&mut self) {
        if let Some(seat) = self.table.current_actor() {
            self.turn_deadline = Some(self.fresh_deadline(seat));
        } else if matches!(
            self.table.phase,
            TablePhase::HandComplete | TablePhase::Showdown
        ) {
            self.table.phase = TablePhase::HandComplete;
            self.resume_at = Some(Instant::now() + self.table.config.post_hand_delay);
        } else if self.table.phase.is_street() && self.table.hand.is_some() {
            self.advance_streets().await;
        }
    }

    async fn handle_command(&mut self, cmd: TableCommand) {
        match cmd {
            TableCommand::Join { player, reply } => {
                let result = self.table.join(&player.player_id, &player.display_name);
                match result {
                    Ok(seat) => {
                        info!(
                            target: LOG_TARGET,
                            table_id = %self.table.id,
                            player_id = %player.player_id,
                            seat,
                            "player joined"
                        );
                        self.subscribe(player);
                        let _ = reply.send(Ok(seat));
                        self.broadcast_state();
                        self.persist();
                    }
                    Err(err) => {
                        let _ = reply.send(Err(err));
                    }
                }
            }
            TableCommand::Leave { player_id } => self.handle_leave(&player_id).await,
            TableCommand::Start { player_id } => match self.table.start(&player_id) {
                Ok(()) => self.start_hand().await,
                Err(err) => self.send_error_to(&player_id, &err),
            },
            TableCommand::Action { player_id, action } => {
                self.handle_action(&player_id, action).await;
            }
            TableCommand::Chat { player_id, text } => self.handle_chat(&player_id, text),
            TableCommand::RequestState { player_id } => self.resend_state(&player_id),
            TableCommand::Reconnect { player } => self.handle_reconnect(player),
            TableCommand::Disconnected {
                player_id,
                session_id,
            } => self.handle_disconnected(&player_id, session_id),
            TableCommand::Inspect { reply } => {
                let deadline = self.turn_deadline.as_ref().map(|d| d.wall);
                let _ = reply.send(super::view::admin_view(&self.table, deadline));
            }
        }
    }

    // ---- fan-out ----------------------------------------------------------

    fn subscribe(&mut self, player: PlayerHandle) {
        self.subscribers.retain(|s| s.player_id != player.player_id);
        self.subscribers.push(Subscriber {
            player_id: player.player_id,
            session_id: player.session_id,
            outbound: player.outbound,
        });
    }

    /// Send a public event to every subscriber. A subscriber whose buffer is
    /// full has fallen too far behind and is dropped rather than allowed to
    /// block the table.
    fn publish(&mut self, build: impl FnOnce(u64) -> ServerMessage) {
        let seq = self.table.next_seq();
        let msg = build(seq);
        let mut dropped = Vec::new();
        for (i, sub) in self.subscribers.iter().enumerate() {
            if sub.outbound.try_send(msg.clone()).is_err() {
                dropped.push(i);
            }
        }
        for i in dropped.into_iter().rev() {
            let sub = self.subscribers.remove(i);
            warn!(
                target: LOG_TARGET,
                table_id = %self.table.id,
                player_id = %sub.player_id,
                "dropping slow or closed subscriber"
            );
            if let Some(seat) = self.table.seat_of(&sub.player_id) {
                if let Some(seat) = self.table.seat_mut(seat) {
                    seat.sitting_out = true;
                }
            }
        }
    }

    fn send_private(&mut self, player_id: &str, msg: ServerMessage) {
        let Some(idx) = self
            .subscribers
            .iter()
            .position(|s| s.player_id == player_id)
        else {
            return;
        };
        if self.subscribers[idx].outbound.try_send(msg).is_err() {
            let sub = self.subscribers.remove(idx);
            warn!(
                target: LOG_TARGET,
                table_id = %self.table.id,
                player_id = %sub.player_id,
                "dropping slow or closed subscriber"
            );
            if let Some(seat) = self.table.seat_of(&sub.player_id) {
                if let Some(seat) = self.table.seat_mut(seat) {
                    seat.sitting_out = true;
                }
            }
        }
    }

    fn send_error_to(&mut self, player_id: &str, err: &TableError) {
        let msg = ServerMessage::error(err.kind(), err.code(), err.to_string());
        self.send_private(player_id, msg);
    }

    fn current_state(&self) -> super::view::PublicTableState {
        let deadline = self.turn_deadline.as_ref().map(|d| d.wall);
        public_state(&self.table, deadline)
    }

    fn broadcast_state(&mut self) {
        let state = self.current_state();
        let table_id = self.table.id.clone();
        self.publish(|seq| ServerMessage::TableState {
            table_id,
            seq,
            state,
        });
    }

    fn resend_state(&mut self, player_id: &str) {
        let state = self.current_state();
        let msg = ServerMessage::TableState {
            table_id: self.table.id.clone(),
            seq: self.table.seq,
            state,
        };
        self.send_private(player_id, msg);
        self.resend_private_cards(player_id);
    }

    fn resend_private_cards(&mut self, player_id: &str) {
        let Some(seat) = self.table.seat_of(player_id) else {
            return;
        };
        let hole = self
            .table
            .hand
            .as_ref()
            .and_then(|h| h.holes.get(&seat).copied());
        if let Some(cards) = hole {
            let msg = ServerMessage::HoleCards {
                table_id: self.table.id.clone(),
                seat,
                cards,
            };
            self.send_private(player_id, msg);
        }
        if self.table.current_actor() == Some(seat) {
            if let Some(deadline) = self.turn_deadline.as_ref().map(|d| d.wall) {
                let legal = self
                    .table
                    .hand
                    .as_ref()
                    .map(|h| legal_actions_for(&h.betting, seat))
                    .unwrap_or_default();
                let msg = ServerMessage::YourTurn {
                    table_id: self.table.id.clone(),
                    seat,
                    legal_actions: legal,
                    deadline,
                };
                self.send_private(player_id, msg);
            }
        }
    }

    // ---- gameplay ---------------------------------------------------------

    async fn start_hand(&mut self) {
        match self.table.begin_hand() {
            Ok(start) => {
                info!(
                    target: LOG_TARGET,
                    table_id = %self.table.id,
                    hand_no = start.hand_no,
                    button = start.button,
                    "hand started"
                );
                let table_id = self.table.id.clone();
                self.publish(|seq| ServerMessage::HandStarted {
                    table_id,
                    seq,
                    hand_number: start.hand_no,
                    button: start.button,
                    small_blind_seat: start.small_blind_seat,
                    big_blind_seat: start.big_blind_seat,
                });
                for (seat, cards) in &start.holes {
                    let Some(player_id) = self.table.seat(*seat).map(|s| s.player_id.clone())
                    else {
                        continue;
                    };
                    let msg = ServerMessage::HoleCards {
                        table_id: self.table.id.clone(),
                        seat: *seat,
                        cards: *cards,
                    };
                    self.send_private(&player_id, msg);
                }
                self.persist();
                if let Some(actor) = self.table.current_actor() {
                    self.prompt_actor(actor);
                } else {
                    // blinds alone can put every seat all-in
                    self.advance_streets().await;
                }
            }
            Err(err) => {
                error!(
                    target: LOG_TARGET,
                    table_id = %self.table.id,
                    error = %err,
                    "failed to start a hand"
                );
                self.table.phase = TablePhase::Waiting;
                self.broadcast_state();
            }
        }
    }

    async fn handle_action(&mut self, player_id: &str, action: PlayerBetAction) {
        let Some(seat) = self.table.seat_of(player_id) else {
            self.send_error_to(player_id, &TableError::NotSeated);
            return;
        };
        if !self.table.phase.is_street() || !self.table.seat_in_hand(seat) {
            self.send_error_to(player_id, &TableError::HandNotRunning);
            return;
        }
        self.apply_seat_action(seat, action).await;
    }

    async fn apply_seat_action(&mut self, seat: SeatId, action: PlayerBetAction) {
        let street = match self.table.hand.as_ref() {
            Some(hand) => hand.betting.street,
            None => return,
        };
        let outcome = {
            let hand = self.table.hand.as_mut().expect("hand checked above");
            NoLimitEngine::apply_action(&mut hand.betting, seat, action)
        };
        match outcome {
            Ok(outcome) => {
                self.clear_deadline();
                self.table.log_action(seat, street, outcome.action);
                self.emit_action_taken(seat, outcome.action);
                self.handle_transition(outcome.transition).await;
            }
            Err(err) => {
                let player = self
                    .table
                    .seat(seat)
                    .map(|s| s.player_id.clone())
                    .unwrap_or_default();
                self.send_error_to(&player, &TableError::Action(err));
            }
        }
    }

    fn emit_action_taken(&mut self, seat: SeatId, action: NormalizedAction) {
        let table_id = self.table.id.clone();
        let pot_total = self.table.pot_total();
        let current_bet = self
            .table
            .hand
            .as_ref()
            .map(|h| h.betting.current_bet)
            .unwrap_or(0);
        self.publish(|seq| ServerMessage::ActionTaken {
            table_id,
            seq,
            seat,
            action,
            pot_total,
            current_bet,
        });
    }

    async fn handle_transition(&mut self, transition: crate::engine::Transition) {
        use crate::engine::Transition;
        match transition {
            Transition::Continued { next_to_act } => self.prompt_actor(next_to_act),
            Transition::StreetEnd { .. } => self.advance_streets().await,
            Transition::HandEndByFold { winner } => self.finish_by_fold(winner).await,
        }
    }

    /// Deal forward from the current street. When betting is locked (all-in
    /// run-out) this keeps dealing to the river and straight into showdown.
    async fn advance_streets(&mut self) {
        loop {
            let street = match self.table.hand.as_ref() {
                Some(hand) => hand.betting.street,
                None => return,
            };
            if street == Street::River {
                self.finish_with_showdown().await;
                return;
            }
            match self.table.deal_next_street() {
                Ok((street, cards)) => {
                    let table_id = self.table.id.clone();
                    let community = self
                        .table
                        .hand
                        .as_ref()
                        .map(|h| h.community.clone())
                        .unwrap_or_default();
                    let pot_total = self.table.pot_total();
                    self.publish(|seq| ServerMessage::StreetDealt {
                        table_id,
                        seq,
                        street,
                        cards,
                        community,
                        pot_total,
                    });
                    self.persist();
                    if let Some(actor) = self.table.current_actor() {
                        self.prompt_actor(actor);
                        return;
                    }
                }
                Err(err) => {
                    self.fatal_hand_error(err).await;
                    return;
                }
            }
        }
    }

    async fn finish_with_showdown(&mut self) {
        match self.table.resolve_showdown() {
            Ok(result) => self.emit_hand_result(result).await,
            Err(err) => self.fatal_hand_error(err).await,
        }
    }

    async fn finish_by_fold(&mut self, winner: SeatId) {
        match self.table.finish_by_fold(winner) {
            Ok(result) => self.emit_hand_result(result).await,
            Err(err) => self.fatal_hand_error(err).await,
        }
    }

    async fn emit_hand_result(&mut self, result: super::state::HandResult) {
        self.clear_deadline();
        let table_id = self.table.id.clone();
        self.publish(|seq| ServerMessage::HandResult {
            table_id,
            seq,
            result,
        });
        self.persist();
        self.resume_at = Some(Instant::now() + self.table.config.post_hand_delay);
    }

    /// Invariant violation mid-hand: fatal at hand scope. The hand is voided,
    /// committed chips are returned, and the table carries on.
    async fn fatal_hand_error(&mut self, err: StateError) {
        let snapshot = serde_json::to_string(&self.table).unwrap_or_default();
        error!(
            target: LOG_TARGET,
            table_id = %self.table.id,
            error = %err,
            state = %snapshot,
            "hand aborted on invariant violation"
        );
        self.clear_deadline();
        let result = self.table.abort_hand();
        let table_id = self.table.id.clone();
        self.publish(|seq| ServerMessage::HandResult {
            table_id,
            seq,
            result,
        });
        self.broadcast_state();
        self.persist();
        self.resume_at = Some(Instant::now() + self.table.config.post_hand_delay);
    }

    fn fresh_deadline(&self, seat: SeatId) -> TurnDeadline {
        let timeout = self.table.config.turn_timeout;
        let wall = Utc::now()
            + chrono::Duration::from_std(timeout).unwrap_or_else(|_| chrono::Duration::seconds(30));
        TurnDeadline {
            seat,
            fires_at: Instant::now() + timeout,
            wall,
        }
    }

    fn prompt_actor(&mut self, seat: SeatId) {
        let deadline = self.fresh_deadline(seat);
        let wall = deadline.wall;
        self.turn_deadline = Some(deadline);

        let table_id = self.table.id.clone();
        self.publish(|seq| ServerMessage::TurnChanged {
            table_id,
            seq,
            seat,
            deadline: wall,
        });

        let Some(player_id) = self.table.seat(seat).map(|s| s.player_id.clone()) else {
            return;
        };
        let legal = self
            .table
            .hand
            .as_ref()
            .map(|h| legal_actions_for(&h.betting, seat))
            .unwrap_or_default();
        let msg = ServerMessage::YourTurn {
            table_id: self.table.id.clone(),
            seat,
            legal_actions: legal,
            deadline: wall,
        };
        self.send_private(&player_id, msg);
    }

    fn clear_deadline(&mut self) {
        self.turn_deadline = None;
    }

    /// The per-turn deadline fired: apply the default action, check when it
    /// is free, fold otherwise. The deadline is taken first so it resolves
    /// exactly once even if the default action itself fails.
    async fn handle_turn_timeout(&mut self) {
        let Some(deadline) = self.turn_deadline.take() else {
            return;
        };
        if self.table.current_actor() != Some(deadline.seat) {
            return;
        }
        let seat = deadline.seat;
        let check_is_free = self
            .table
            .hand
            .as_ref()
            .and_then(|h| {
                h.betting
                    .player(seat)
                    .map(|p| h.betting.current_bet == p.committed_this_round)
            })
            .unwrap_or(false);
        let action = if check_is_free {
            PlayerBetAction::Check
        } else {
            PlayerBetAction::Fold
        };
        info!(
            target: LOG_TARGET,
            table_id = %self.table.id,
            seat,
            action = ?action,
            "turn deadline fired, applying default action"
        );
        self.apply_seat_action(seat, action).await;
    }

    // ---- seating & lifecycle ---------------------------------------------

    async fn handle_leave(&mut self, player_id: &str) {
        let Some(seat) = self.table.seat_of(player_id) else {
            self.send_error_to(player_id, &TableError::NotSeated);
            return;
        };

        let advance = self.table.fold_seat(seat);
        if advance != FoldAdvance::NoChange {
            let street = self
                .table
                .hand
                .as_ref()
                .map(|h| h.betting.street)
                .unwrap_or(Street::Preflop);
            self.table.log_action(seat, street, NormalizedAction::Fold);
            self.emit_action_taken(seat, NormalizedAction::Fold);
        }

        let removed = self.table.remove_seat(seat);
        self.subscribers.retain(|s| s.player_id != player_id);
        if let Some((player, stack)) = removed {
            info!(
                target: LOG_TARGET,
                table_id = %self.table.id,
                player_id = %player,
                stack,
                "player left"
            );
            if stack > 0 {
                self.settle(player, stack, "leave settlement");
            }
        }
        self.broadcast_state();

        match advance {
            FoldAdvance::HandWon { winner } => self.finish_by_fold(winner).await,
            FoldAdvance::StreetEnd => self.advance_streets().await,
            FoldAdvance::TurnPassed { next } => {
                self.clear_deadline();
                self.prompt_actor(next);
            }
            FoldAdvance::Folded | FoldAdvance::NoChange => {}
        }

        if self.table.occupied_count() == 0 {
            self.close_table();
        } else {
            self.persist();
        }
    }

    fn handle_chat(&mut self, player_id: &str, text: String) {
        let Some(seat) = self.table.seat_of(player_id) else {
            self.send_error_to(player_id, &TableError::NotSeated);
            return;
        };
        let from = self
            .table
            .seat(seat)
            .map(|s| s.display_name.clone())
            .unwrap_or_default();
        let mut text = text;
        text.truncate(MAX_CHAT_LEN);
        let table_id = self.table.id.clone();
        self.publish(|seq| ServerMessage::Chat {
            table_id,
            seq,
            from,
            text,
        });
    }

    fn handle_reconnect(&mut self, player: PlayerHandle) {
        let Some(seat) = self.table.seat_of(&player.player_id) else {
            let _ = player.outbound.try_send(ServerMessage::error(
                TableError::NotSeated.kind(),
                TableError::NotSeated.code(),
                TableError::NotSeated.to_string(),
            ));
            return;
        };
        let player_id = player.player_id.clone();
        self.subscribe(player);
        if let Some(seat) = self.table.seat_mut(seat) {
            seat.sitting_out = false;
        }
        info!(
            target: LOG_TARGET,
            table_id = %self.table.id,
            player_id = %player_id,
            "player reconnected"
        );
        self.broadcast_state();
        self.resend_private_cards(&player_id);
    }

    /// A dropped connection sits the seat out; it never folds the hand and
    /// never touches the seat's cards or chips.
    fn handle_disconnected(&mut self, player_id: &str, session_id: Uuid) {
        let before = self.subscribers.len();
        self.subscribers
            .retain(|s| !(s.player_id == player_id && s.session_id == session_id));
        if self.subscribers.len() == before {
            // a newer session already replaced this subscription
            return;
        }
        if let Some(seat) = self.table.seat_of(player_id) {
            if let Some(seat) = self.table.seat_mut(seat) {
                seat.sitting_out = true;
            }
            self.broadcast_state();
        }
    }

    /// Post-hand delay elapsed: clean up and either deal again or fall back
    /// to waiting.
    async fn advance_between_hands(&mut self) {
        if self.table.phase != TablePhase::HandComplete {
            return;
        }
        let removed = self.table.prepare_next_hand();
        for (player, stack) in removed {
            info!(
                target: LOG_TARGET,
                table_id = %self.table.id,
                player_id = %player,
                "removing seat that sat broke"
            );
            if stack > 0 {
                self.settle(player, stack, "bust-out settlement");
            }
        }

        if self.table.occupied_count() == 0 {
            self.close_table();
            return;
        }
        if self.table.fundable_seats().len() >= 2 {
            self.start_hand().await;
        } else {
            self.table.phase = TablePhase::Waiting;
            self.broadcast_state();
            self.persist();
        }
    }

    fn close_table(&mut self) {
        info!(target: LOG_TARGET, table_id = %self.table.id, "closing table");
        self.table.phase = TablePhase::Closed;
        let table_id = self.table.id.clone();
        self.publish(|seq| ServerMessage::TableEnded { table_id, seq });
        self.directory.remove(&self.table.id);

        let store = Arc::clone(&self.deps.snapshots);
        let table_id = self.table.id.clone();
        tokio::spawn(async move {
            if let Err(err) = store.delete(&table_id).await {
                warn!(
                    target: LOG_TARGET,
                    table_id = %table_id,
                    error = %err,
                    "failed to delete snapshot for closed table"
                );
            }
        });
        self.closed = true;
    }

    // ---- persistence & settlement ----------------------------------------

    /// Fire-and-forget snapshot write with a bounded budget. A failed or slow
    /// write is logged and retried at the next stable point; it never blocks
    /// event processing.
    fn persist(&self) {
        let snapshot = TableSnapshot::capture(&self.table);
        let store = Arc::clone(&self.deps.snapshots);
        let budget = self.deps.persistence_budget;
        let table_id = self.table.id.clone();
        tokio::spawn(async move {
            match tokio::time::timeout(budget, store.save(&snapshot)).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!(
                    target: LOG_TARGET,
                    table_id = %table_id,
                    error = %err,
                    "snapshot write failed"
                ),
                Err(_) => warn!(
                    target: LOG_TARGET,
                    table_id = %table_id,
                    "snapshot write exceeded its budget"
                ),
            }
        });
    }

    fn settle(&self, player_id: PlayerId, amount: u64, reason: &str) {
        let balances = Arc::clone(&self.deps.balances);
        let snapshots = Arc::clone(&self.deps.snapshots);
        let reason = reason.to_string();
        tokio::spawn(credit_with_retry(
            balances, snapshots, player_id, amount, reason,
        ));
    }
}
