//! Card primitives shared by the deck, the engine, and the evaluator.

use core::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

pub mod deck;

pub use deck::{Deck, DeckError};

/// Rank value, 2..=14 with Ace high. The wheel straight treats the Ace as 1
/// inside the evaluator only.
pub type Rank = u8;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Suit {
    #[serde(rename = "C")]
    Clubs,
    #[serde(rename = "D")]
    Diamonds,
    #[serde(rename = "H")]
    Hearts,
    #[serde(rename = "S")]
    Spades,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Clubs, Suit::Diamonds, Suit::Hearts, Suit::Spades];
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Suit::Clubs => write!(f, "♣"),
            Suit::Diamonds => write!(f, "♦"),
            Suit::Hearts => write!(f, "♥"),
            Suit::Spades => write!(f, "♠"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub rank: Rank, // 2..=14
    pub suit: Suit,
}

impl Card {
    pub fn new(rank: Rank, suit: Suit) -> Self {
        debug_assert!((2..=14).contains(&rank), "rank out of range: {rank}");
        Self { rank, suit }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.rank {
            11 => write!(f, "J{}", self.suit),
            12 => write!(f, "Q{}", self.suit),
            13 => write!(f, "K{}", self.suit),
            14 => write!(f, "A{}", self.suit),
            r => write!(f, "{r}{}", self.suit),
        }
    }
}

/// Deterministic sort-by-rank-desc, then suit-desc.
pub fn sort_desc(cards: &mut [Card]) {
    cards.sort_by(|a, b| match b.rank.cmp(&a.rank) {
        Ordering::Equal => b.suit.cmp(&a.suit),
        o => o,
    });
}

#[inline]
pub fn is_wheel_ranks(r: &[Rank; 5]) -> bool {
    r[0] == 5 && r[1] == 4 && r[2] == 3 && r[3] == 2 && r[4] == 14
}

#[inline]
pub fn is_run_desc_ranks(r: &[Rank; 5]) -> bool {
    r[0] == r[1] + 1 && r[1] == r[2] + 1 && r[2] == r[3] + 1 && r[3] == r[4] + 1
}
