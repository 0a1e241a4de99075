use thiserror::Error;

/// Rejections for a player action. These never mutate state; the table turns
/// them into outbound `error` events for the acting session.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error("not this seat's turn")]
    NotPlayersTurn,
    #[error("seat cannot act")]
    ActorCannotAct,
    #[error("cannot check while facing a bet")]
    CannotCheckFacingBet,
    #[error("nothing to call")]
    NothingToCall,
    #[error("cannot bet once the street is opened")]
    CannotBetWhenOpened,
    #[error("cannot raise before a bet")]
    CannotRaiseUnopened,
    #[error("bet is below the table minimum")]
    BetBelowMinimum,
    #[error("raise is below the minimum raise")]
    RaiseBelowMinimum,
    #[error("action is not re-opened for this seat")]
    RaiseNotAvailable,
    #[error("not enough chips")]
    InsufficientChips,
}

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("invalid phase transition")]
    InvalidTransition,
    #[error("invariant violation: {0}")]
    InvariantViolation(&'static str),
}

pub trait InvariantCheck {
    fn validate_invariants(&self) -> Result<(), StateError>;
}
