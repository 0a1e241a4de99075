use super::actions::PlayerBetAction;
use super::errors::ActionError;
use super::events::NormalizedAction;
use super::rules::NoLimitRules;
use super::seating::Seating;
use super::state::BettingState;
use super::types::{PlayerStatus, SeatId, Street};

/// Where the hand stands after an applied action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    Continued { next_to_act: SeatId },
    StreetEnd { street: Street },
    HandEndByFold { winner: SeatId },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActionOutcome {
    pub seat: SeatId,
    pub action: NormalizedAction,
    pub transition: Transition,
}

pub trait BettingEngine {
    fn apply_action(
        state: &mut BettingState,
        seat: SeatId,
        action: PlayerBetAction,
    ) -> Result<ActionOutcome, ActionError>;
}

pub struct NoLimitEngine;

impl BettingEngine for NoLimitEngine {
    fn apply_action(
        state: &mut BettingState,
        seat: SeatId,
        action: PlayerBetAction,
    ) -> Result<ActionOutcome, ActionError> {
        if state.to_act != Some(seat) {
            return Err(ActionError::NotPlayersTurn);
        }
        let price = state.price_to_call(seat);
        let min_bet = state.cfg.stakes.big_blind;
        let actor = state.player(seat).ok_or(ActionError::ActorCannotAct)?;
        if actor.status != PlayerStatus::Active {
            return Err(ActionError::ActorCannotAct);
        }
        let stack = actor.stack;
        let committed = actor.committed_this_round;
        let has_acted = actor.has_acted_this_round;

        let normalized = match action {
            PlayerBetAction::Fold => {
                let p = state.player_mut(seat).expect("actor present");
                p.status = PlayerStatus::Folded;
                NormalizedAction::Fold
            }
            PlayerBetAction::Check => {
                if price > 0 {
                    return Err(ActionError::CannotCheckFacingBet);
                }
                NormalizedAction::Check
            }
            PlayerBetAction::Call => {
                if price == 0 {
                    return Err(ActionError::NothingToCall);
                }
                let call_amount = price.min(stack);
                let full_call = call_amount == price;
                let p = state.player_mut(seat).expect("actor present");
                p.commit(call_amount);
                NormalizedAction::Call {
                    call_amount,
                    full_call,
                }
            }
            PlayerBetAction::BetTo { to } => {
                if state.current_bet != 0 {
                    return Err(ActionError::CannotBetWhenOpened);
                }
                if to < min_bet {
                    return Err(ActionError::BetBelowMinimum);
                }
                let needed = to - committed;
                if needed > stack {
                    return Err(ActionError::InsufficientChips);
                }
                let p = state.player_mut(seat).expect("actor present");
                p.commit(needed);
                state.current_bet = to;
                state.min_raise = to;
                state.reopen_action_except(seat);
                NormalizedAction::Bet { to }
            }
            PlayerBetAction::RaiseTo { to } => {
                Self::apply_raise(state, seat, to, has_acted, committed, stack, false)?
            }
            PlayerBetAction::AllIn => {
                let total_to = committed + stack;
                if state.current_bet == 0 {
                    if total_to < min_bet {
                        return Err(ActionError::BetBelowMinimum);
                    }
                    let p = state.player_mut(seat).expect("actor present");
                    p.commit(stack);
                    state.current_bet = total_to;
                    state.min_raise = total_to;
                    state.reopen_action_except(seat);
                    NormalizedAction::AllInAsBet { to: total_to }
                } else if total_to <= state.current_bet {
                    let call_amount = stack;
                    let full_call = total_to == state.current_bet;
                    let p = state.player_mut(seat).expect("actor present");
                    p.commit(stack);
                    NormalizedAction::AllInAsCall {
                        call_amount,
                        full_call,
                    }
                } else {
                    Self::apply_raise(state, seat, total_to, has_acted, committed, stack, true)?
                }
            }
        };

        let p = state.player_mut(seat).expect("actor present");
        p.has_acted_this_round = true;

        let mut remaining = state
            .players
            .iter()
            .filter(|p| p.status != PlayerStatus::Folded)
            .map(|p| p.seat);
        let first_remaining = remaining.next().expect("at least one seat remains");
        let transition = if remaining.next().is_none() {
            state.to_act = None;
            Transition::HandEndByFold {
                winner: first_remaining,
            }
        } else if state.round_settled() {
            state.to_act = None;
            Transition::StreetEnd {
                street: state.street,
            }
        } else {
            let next = state
                .next_owing_after(seat)
                .expect("unsettled round has a seat owing action");
            state.to_act = Some(next);
            Transition::Continued { next_to_act: next }
        };

        Ok(ActionOutcome {
            seat,
            action: normalized,
            transition,
        })
    }
}

impl NoLimitEngine {
    /// Shared raise path for `RaiseTo` and an all-in that exceeds the current
    /// bet. A short all-in raise is accepted but leaves `min_raise` and the
    /// other seats' acted flags untouched.
    #[allow(clippy::too_many_arguments)]
    fn apply_raise(
        state: &mut BettingState,
        seat: SeatId,
        to: u64,
        has_acted: bool,
        committed: u64,
        stack: u64,
        is_all_in_shorthand: bool,
    ) -> Result<NormalizedAction, ActionError> {
        if state.current_bet == 0 {
            return Err(ActionError::CannotRaiseUnopened);
        }
        if to <= state.current_bet {
            return Err(ActionError::RaiseBelowMinimum);
        }
        if has_acted {
            return Err(ActionError::RaiseNotAvailable);
        }
        let needed = to - committed;
        if needed > stack {
            return Err(ActionError::InsufficientChips);
        }
        let raise_amount = to - state.current_bet;
        let full_raise = state.is_full_raise(raise_amount);
        if !full_raise && needed < stack {
            // only an all-in may fall short of the minimum raise
            return Err(ActionError::RaiseBelowMinimum);
        }
        let p = state.player_mut(seat).expect("actor present");
        p.commit(needed);
        state.current_bet = to;
        if full_raise {
            state.min_raise = raise_amount;
            state.reopen_action_except(seat);
        }
        let went_all_in = needed == stack;
        Ok(if is_all_in_shorthand || went_all_in {
            NormalizedAction::AllInAsRaise {
                to,
                raise_amount,
                full_raise,
            }
        } else {
            NormalizedAction::Raise {
                to,
                raise_amount,
                full_raise,
            }
        })
    }
}
