use rand::rngs::OsRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Card, Suit};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeckError {
    #[error("deck is empty")]
    Empty,
}

/// An ordered run of unique cards. Cards are drawn from the tail; the shuffle
/// source is the OS RNG and a deck is never reseeded mid-hand.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Deck {
    cards: Vec<Card>,
    burned: usize,
}

impl Deck {
    /// Full 52-card deck, Fisher-Yates shuffled.
    pub fn new_shuffled() -> Self {
        let mut cards = Self::ordered();
        cards.shuffle(&mut OsRng);
        Self { cards, burned: 0 }
    }

    /// Rebuild a deck from an explicit card order, tail dealt first. Used to
    /// restore a snapshotted hand and to script hands in tests.
    pub fn from_cards(cards: Vec<Card>) -> Self {
        Self { cards, burned: 0 }
    }

    fn ordered() -> Vec<Card> {
        let mut cards = Vec::with_capacity(52);
        for suit in Suit::ALL {
            for rank in 2..=14 {
                cards.push(Card::new(rank, suit));
            }
        }
        cards
    }

    pub fn draw(&mut self) -> Result<Card, DeckError> {
        self.cards.pop().ok_or(DeckError::Empty)
    }

    pub fn burn(&mut self) -> Result<(), DeckError> {
        self.cards.pop().ok_or(DeckError::Empty)?;
        self.burned += 1;
        Ok(())
    }

    pub fn remaining(&self) -> usize {
        self.cards.len()
    }

    pub fn burned(&self) -> usize {
        self.burned
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }
}
