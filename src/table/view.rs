//! Sanitized views of table state. Nothing here exposes the deck, another
//! seat's hole cards, or server-internal timers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cards::Card;
use crate::engine::{build_pots, Chips, PlayerStatus, PotContribution, PotLayer, SeatId};

use super::state::{ActionLogEntry, HandResult, Table, TablePhase};
use super::TableId;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatPublic {
    pub seat: SeatId,
    pub player_id: String,
    pub name: String,
    pub stack: Chips,
    pub committed: Chips,
    pub round_bet: Chips,
    pub folded: bool,
    pub all_in: bool,
    pub sitting_out: bool,
    pub has_cards: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicTableState {
    pub table_id: TableId,
    pub phase: TablePhase,
    pub hand_number: u64,
    pub small_blind: Chips,
    pub big_blind: Chips,
    pub button: SeatId,
    pub seats: Vec<Option<SeatPublic>>,
    pub community: Vec<Card>,
    pub pot_total: Chips,
    /// Layered pots, present once the hand reaches showdown.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pot_layers: Option<Vec<PotLayer>>,
    pub current_actor: Option<SeatId>,
    pub current_bet: Chips,
    pub min_raise: Chips,
    /// Wall-clock expiry of the acting seat's deadline.
    pub deadline: Option<DateTime<Utc>>,
}

/// Everything the admin surface may see about one table: the same sanitized
/// state clients get, plus the bounded hand-result and action-log rings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminTableView {
    pub state: PublicTableState,
    pub recent_results: Vec<HandResult>,
    pub action_log: Vec<ActionLogEntry>,
}

pub fn admin_view(table: &Table, deadline: Option<DateTime<Utc>>) -> AdminTableView {
    AdminTableView {
        state: public_state(table, deadline),
        recent_results: table.recent_results.iter().cloned().collect(),
        action_log: table.action_log.iter().cloned().collect(),
    }
}

/// Build the public view every subscriber receives.
pub fn public_state(table: &Table, deadline: Option<DateTime<Utc>>) -> PublicTableState {
    let hand = table.hand.as_ref();

    let seats = table
        .seats
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            entry.as_ref().map(|seat| {
                let seat_id = i as SeatId;
                let player = hand.and_then(|h| h.betting.player(seat_id));
                SeatPublic {
                    seat: seat_id,
                    player_id: seat.player_id.clone(),
                    name: seat.display_name.clone(),
                    stack: player.map(|p| p.stack).unwrap_or(seat.stack),
                    committed: player.map(|p| p.committed_total).unwrap_or(0),
                    round_bet: player.map(|p| p.committed_this_round).unwrap_or(0),
                    folded: player.map(|p| p.status == PlayerStatus::Folded).unwrap_or(false),
                    all_in: player.map(|p| p.status == PlayerStatus::AllIn).unwrap_or(false),
                    sitting_out: seat.sitting_out,
                    has_cards: hand
                        .map(|h| {
                            h.holes.contains_key(&seat_id)
                                && player.map(|p| p.status != PlayerStatus::Folded).unwrap_or(false)
                        })
                        .unwrap_or(false),
                }
            })
        })
        .collect();

    let pot_layers = match table.phase {
        TablePhase::Showdown | TablePhase::HandComplete => hand.map(|h| {
            let contribs: Vec<PotContribution> = h
                .betting
                .players
                .iter()
                .map(|p| PotContribution {
                    seat: p.seat,
                    committed: p.committed_total,
                    folded: p.status == PlayerStatus::Folded,
                })
                .collect();
            build_pots(&contribs).layers
        }),
        _ => None,
    };

    PublicTableState {
        table_id: table.id.clone(),
        phase: table.phase,
        hand_number: table.hand_no,
        small_blind: table.config.stakes.small_blind,
        big_blind: table.config.stakes.big_blind,
        button: table.button,
        seats,
        community: hand.map(|h| h.community.clone()).unwrap_or_default(),
        pot_total: table.pot_total(),
        pot_layers,
        current_actor: table.current_actor(),
        current_bet: hand.map(|h| h.betting.current_bet).unwrap_or(0),
        min_raise: hand.map(|h| h.betting.min_raise).unwrap_or(0),
        deadline,
    }
}
