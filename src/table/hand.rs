//! Hand lifecycle on a table: dealing, street rollover, showdown, aborts.

use std::collections::{BTreeMap, HashSet};

use chrono::Utc;

use crate::cards::{Card, Deck};
use crate::engine::{
    build_pots, award_layers, BettingState, Chips, HandConfig, InvariantCheck, PlayerState,
    PlayerStatus, PotContribution, SeatId, SeatWinnings, StateError, Street,
};
use crate::showdown::{evaluate_seven, HandRank};

use super::state::{HandResult, HandState, RevealedHand, Table, TablePhase};
use super::TableError;

/// What the worker needs to announce a freshly dealt hand.
#[derive(Clone, Debug)]
pub struct HandStart {
    pub hand_no: u64,
    pub button: SeatId,
    pub small_blind_seat: SeatId,
    pub big_blind_seat: SeatId,
    pub holes: Vec<(SeatId, [Card; 2])>,
}

/// How a leave-triggered fold moved the hand forward. `Folded` means the fold
/// was applied but play continues unchanged; `NoChange` means there was
/// nothing to fold.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FoldAdvance {
    HandWon { winner: SeatId },
    StreetEnd,
    TurnPassed { next: SeatId },
    Folded,
    NoChange,
}

impl Table {
    /// Deal the next hand with a fresh shuffled deck.
    pub fn begin_hand(&mut self) -> Result<HandStart, TableError> {
        self.begin_hand_with_deck(Deck::new_shuffled())
    }

    /// Deal the next hand from an explicit deck. Blind rotation, posting, and
    /// the two-round one-card-at-a-time deal all happen here; nothing is
    /// committed to the table if the deck fails its integrity check.
    pub fn begin_hand_with_deck(&mut self, mut deck: Deck) -> Result<HandStart, TableError> {
        let fundable = self.fundable_seats();
        if fundable.len() < 2 {
            return Err(TableError::NotEnoughPlayers);
        }

        let button = if self.hand_no == 0 {
            let creator_seat = self.seat_of(&self.creator.clone());
            match creator_seat.filter(|&s| self.is_fundable(s)) {
                Some(s) => s,
                None => self
                    .next_fundable_after(creator_seat.unwrap_or(0))
                    .expect("two fundable seats exist"),
            }
        } else {
            self.next_fundable_after(self.button)
                .expect("two fundable seats exist")
        };

        // Heads-up: the button posts the small blind and acts first preflop.
        let (small_blind_seat, big_blind_seat) = if fundable.len() == 2 {
            let other = self
                .next_fundable_after(button)
                .expect("two fundable seats exist");
            (button, other)
        } else {
            let sb = self
                .next_fundable_after(button)
                .expect("fundable seat after button");
            let bb = self
                .next_fundable_after(sb)
                .expect("fundable seat after small blind");
            (sb, bb)
        };

        let stakes = self.config.stakes;
        let mut players: Vec<PlayerState> = fundable
            .iter()
            .map(|&seat| {
                let stack = self.seat(seat).expect("fundable seat occupied").stack;
                let mut p = PlayerState::new(seat, stack);
                if seat == small_blind_seat {
                    p.commit(stakes.small_blind.min(p.stack));
                } else if seat == big_blind_seat {
                    p.commit(stakes.big_blind.min(p.stack));
                }
                p
            })
            .collect();
        players.sort_by_key(|p| p.seat);

        // One card at a time, starting left of the button, around twice.
        let mut deal_order: Vec<SeatId> = Vec::with_capacity(fundable.len());
        let mut seat = button;
        for _ in 0..fundable.len() {
            seat = self
                .next_fundable_after(seat)
                .expect("fundable ring is non-empty");
            deal_order.push(seat);
        }
        let mut first_cards: BTreeMap<SeatId, Card> = BTreeMap::new();
        let mut holes: Vec<(SeatId, [Card; 2])> = Vec::with_capacity(fundable.len());
        for round in 0..2 {
            for &seat in &deal_order {
                let card = deck.draw().map_err(|_| TableError::DealFailed("deck exhausted"))?;
                if round == 0 {
                    first_cards.insert(seat, card);
                } else {
                    let first = first_cards[&seat];
                    holes.push((seat, [first, card]));
                }
            }
        }

        verify_no_duplicates(holes.iter().flat_map(|(_, h)| h.iter().copied()), &deck, &[])
            .map_err(|_| TableError::DealFailed("duplicate card in the deck"))?;

        let cfg = HandConfig {
            stakes,
            button,
            small_blind_seat,
            big_blind_seat,
        };
        let betting = BettingState::new_after_blinds(cfg.clone(), players);

        self.hand_no += 1;
        self.button = button;
        self.phase = TablePhase::Preflop;
        self.hand = Some(HandState {
            hand_no: self.hand_no,
            cfg,
            deck,
            community: Vec::new(),
            holes: holes.iter().copied().collect(),
            betting,
        });

        Ok(HandStart {
            hand_no: self.hand_no,
            button,
            small_blind_seat,
            big_blind_seat,
            holes,
        })
    }

    /// Burn one card and deal the next street. Returns the street and the
    /// cards that just hit the board.
    pub fn deal_next_street(&mut self) -> Result<(Street, Vec<Card>), StateError> {
        let hand = self.hand.as_mut().ok_or(StateError::InvalidTransition)?;
        let next = match hand.betting.street {
            Street::Preflop => Street::Flop,
            Street::Flop => Street::Turn,
            Street::Turn => Street::River,
            Street::River => return Err(StateError::InvalidTransition),
        };
        let count = if next == Street::Flop { 3 } else { 1 };

        hand.deck
            .burn()
            .map_err(|_| StateError::InvariantViolation("deck exhausted at street deal"))?;
        let mut dealt = Vec::with_capacity(count);
        for _ in 0..count {
            let card = hand
                .deck
                .draw()
                .map_err(|_| StateError::InvariantViolation("deck exhausted at street deal"))?;
            dealt.push(card);
        }
        hand.community.extend(dealt.iter().copied());

        let expected = match next {
            Street::Flop => 3,
            Street::Turn => 4,
            Street::River => 5,
            Street::Preflop => 0,
        };
        if hand.community.len() != expected {
            return Err(StateError::InvariantViolation("community card count"));
        }
        verify_no_duplicates(
            hand.holes.values().flat_map(|h| h.iter().copied()),
            &hand.deck,
            &hand.community,
        )?;

        hand.betting.reset_for_street(next);
        hand.betting.validate_invariants()?;
        self.phase = TablePhase::from_street(next);
        Ok((next, dealt))
    }

    /// Compare the remaining hands, build and award the pots, and complete
    /// the hand.
    pub fn resolve_showdown(&mut self) -> Result<HandResult, StateError> {
        {
            let hand = self.hand.as_ref().ok_or(StateError::InvalidTransition)?;
            if hand.community.len() != 5 {
                return Err(StateError::InvariantViolation("showdown before the river"));
            }
        }
        self.phase = TablePhase::Showdown;
        let hand = self.hand.as_ref().expect("hand checked above");

        let board: [Card; 5] = hand.community.clone().try_into().expect("five cards");
        let mut ranks: BTreeMap<SeatId, HandRank> = BTreeMap::new();
        let mut revealed = Vec::new();
        for p in &hand.betting.players {
            if p.status == PlayerStatus::Folded {
                continue;
            }
            let hole = hand.holes[&p.seat];
            let rank = evaluate_seven([
                board[0], board[1], board[2], board[3], board[4], hole[0], hole[1],
            ]);
            revealed.push(RevealedHand {
                seat: p.seat,
                hole,
                category: rank.category.name().to_string(),
                best_five: rank.best_five,
            });
            ranks.insert(p.seat, rank);
        }

        self.complete_hand(Some(ranks), revealed)
    }

    /// Everyone else folded: the last seat takes the whole pot, no reveal.
    pub fn finish_by_fold(&mut self, winner: SeatId) -> Result<HandResult, StateError> {
        let mut ranks = BTreeMap::new();
        // A single eligible seat wins every layer regardless of rank; any
        // rank value works as the comparison key.
        let placeholder = evaluate_seven([
            Card::new(2, crate::cards::Suit::Clubs),
            Card::new(3, crate::cards::Suit::Clubs),
            Card::new(4, crate::cards::Suit::Clubs),
            Card::new(5, crate::cards::Suit::Clubs),
            Card::new(7, crate::cards::Suit::Diamonds),
            Card::new(8, crate::cards::Suit::Hearts),
            Card::new(9, crate::cards::Suit::Spades),
        ]);
        ranks.insert(winner, placeholder);
        self.complete_hand(Some(ranks), Vec::new())
    }

    fn complete_hand(
        &mut self,
        ranks: Option<BTreeMap<SeatId, HandRank>>,
        revealed: Vec<RevealedHand>,
    ) -> Result<HandResult, StateError> {
        let order = self.order_from_button();
        let hand = self.hand.as_mut().ok_or(StateError::InvalidTransition)?;

        let contribs: Vec<PotContribution> = hand
            .betting
            .players
            .iter()
            .map(|p| PotContribution {
                seat: p.seat,
                committed: p.committed_total,
                folded: p.status == PlayerStatus::Folded,
            })
            .collect();
        let build = build_pots(&contribs);
        let committed_total: Chips = contribs.iter().map(|c| c.committed).sum();
        let refunded = build.refund.map(|(_, amount)| amount).unwrap_or(0);
        if build.total() + refunded != committed_total {
            return Err(StateError::InvariantViolation(
                "pot layers do not add up to the committed chips",
            ));
        }

        let ranks = ranks.unwrap_or_default();
        let awards = award_layers(&build.layers, &ranks, &order);
        if let Some((seat, amount)) = build.refund {
            if let Some(p) = hand.betting.player_mut(seat) {
                p.stack += amount;
            }
        }
        for award in &awards {
            for w in &award.winners {
                if let Some(p) = hand.betting.player_mut(w.seat) {
                    p.stack += w.amount;
                }
            }
        }

        let result = HandResult {
            hand_no: hand.hand_no,
            community: hand.community.clone(),
            pots: awards,
            revealed,
            refund: build.refund.map(|(seat, amount)| SeatWinnings { seat, amount }),
            aborted: false,
            completed_at: Utc::now(),
        };

        self.sync_seats_after_hand();
        self.phase = TablePhase::HandComplete;
        self.record_result(result.clone());
        Ok(result)
    }

    /// Fatal hand-scope failure: void the hand and give every seat its
    /// committed chips back.
    pub fn abort_hand(&mut self) -> HandResult {
        let hand_no = self.hand_no;
        let community = self
            .hand
            .as_ref()
            .map(|h| h.community.clone())
            .unwrap_or_default();
        if let Some(hand) = self.hand.as_mut() {
            for p in hand.betting.players.iter_mut() {
                p.stack += p.committed_total;
                p.committed_total = 0;
                p.committed_this_round = 0;
            }
            hand.betting.to_act = None;
        }
        let result = HandResult {
            hand_no,
            community,
            pots: Vec::new(),
            revealed: Vec::new(),
            refund: None,
            aborted: true,
            completed_at: Utc::now(),
        };
        self.sync_seats_after_hand();
        self.phase = TablePhase::HandComplete;
        self.record_result(result.clone());
        result
    }

    /// Fold a seat outside the normal action flow (leave or disconnect
    /// default). Reports how the hand moved so the worker can emit events.
    pub fn fold_seat(&mut self, seat: SeatId) -> FoldAdvance {
        if !self.phase.is_street() {
            return FoldAdvance::NoChange;
        }
        let Some(hand) = self.hand.as_mut() else {
            return FoldAdvance::NoChange;
        };
        let Some(p) = hand.betting.player_mut(seat) else {
            return FoldAdvance::NoChange;
        };
        if p.status == PlayerStatus::Folded {
            return FoldAdvance::NoChange;
        }
        p.status = PlayerStatus::Folded;
        p.has_acted_this_round = true;

        let mut remaining = hand
            .betting
            .players
            .iter()
            .filter(|p| p.status != PlayerStatus::Folded)
            .map(|p| p.seat);
        let first = remaining.next();
        match (first, remaining.next()) {
            (Some(winner), None) => {
                hand.betting.to_act = None;
                return FoldAdvance::HandWon { winner };
            }
            (None, _) => {
                hand.betting.to_act = None;
                return FoldAdvance::NoChange;
            }
            _ => {}
        }

        if hand.betting.to_act == Some(seat) {
            if hand.betting.round_settled() {
                hand.betting.to_act = None;
                FoldAdvance::StreetEnd
            } else {
                use crate::engine::Seating;
                let next = hand
                    .betting
                    .next_owing_after(seat)
                    .expect("unsettled round has a seat owing action");
                hand.betting.to_act = Some(next);
                FoldAdvance::TurnPassed { next }
            }
        } else if hand.betting.round_settled() {
            hand.betting.to_act = None;
            FoldAdvance::StreetEnd
        } else {
            FoldAdvance::Folded
        }
    }

    /// Drop hand artifacts and remove seats that have sat broke too long.
    /// Returns (player, refund) pairs for the removed seats.
    pub fn prepare_next_hand(&mut self) -> Vec<(super::PlayerId, Chips)> {
        self.hand = None;
        let mut removed = Vec::new();
        for seat in self.broke_seats_to_remove() {
            if let Some(entry) = self.remove_seat(seat) {
                removed.push(entry);
            }
        }
        removed
    }
}

/// P1: no card may appear twice across the deck, the board, and every hole
/// hand, and together they must account for the full 52.
fn verify_no_duplicates(
    holes: impl Iterator<Item = Card>,
    deck: &Deck,
    community: &[Card],
) -> Result<(), StateError> {
    let mut seen: HashSet<Card> = HashSet::new();
    let mut total = 0usize;
    for card in holes
        .chain(deck.cards().iter().copied())
        .chain(community.iter().copied())
    {
        total += 1;
        if !seen.insert(card) {
            return Err(StateError::InvariantViolation("duplicate card detected"));
        }
    }
    if total + deck.burned() != 52 {
        return Err(StateError::InvariantViolation("card count is not 52"));
    }
    Ok(())
}
