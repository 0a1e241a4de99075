use serde::{Deserialize, Serialize};

use super::types::Chips;

/// A player's declared action, before the engine normalizes it. `BetTo` and
/// `RaiseTo` name the total committed on this street after the action, not the
/// increment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerBetAction {
    Fold,
    Check,                 // only when price_to_call == 0
    Call,                  // match the current price (or go short all-in)
    BetTo { to: Chips },   // first bet this street (unopened)
    RaiseTo { to: Chips }, // raise to a street total
    AllIn,                 // engine normalizes to bet/raise/call
}
