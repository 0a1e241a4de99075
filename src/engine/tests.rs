#![cfg(test)]

use super::engine::{ActionOutcome, BettingEngine, NoLimitEngine, Transition};
use super::legals::legal_actions_for;
use super::state::BettingState;
use super::types::*;
use super::{ActionError, InvariantCheck, NormalizedAction, PlayerBetAction, Seating};

fn stakes(sb: Chips, bb: Chips) -> TableStakes {
    TableStakes {
        small_blind: sb,
        big_blind: bb,
    }
}

fn cfg_6max(sb: Chips, bb: Chips) -> HandConfig {
    HandConfig {
        stakes: stakes(sb, bb),
        button: 0,
        small_blind_seat: 1,
        big_blind_seat: 2,
    }
}

fn player(seat: SeatId, stack: Chips, posted: Chips) -> PlayerState {
    let mut p = PlayerState::new(seat, stack);
    if posted > 0 {
        p.commit(posted);
    }
    p
}

fn setup_preflop_6max(default_stack: Chips, sb: Chips, bb: Chips) -> BettingState {
    // seats: BTN=0, SB=1, BB=2, UTG=3, HJ=4, CO=5
    let cfg = cfg_6max(sb, bb);
    let players = vec![
        player(0, default_stack, 0),  // BTN
        player(1, default_stack, sb), // SB posted
        player(2, default_stack, bb), // BB posted
        player(3, default_stack, 0),  // UTG
        player(4, default_stack, 0),  // HJ
        player(5, default_stack, 0),  // CO
    ];
    BettingState::new_after_blinds(cfg, players)
}

fn apply(state: &mut BettingState, seat: SeatId, action: PlayerBetAction) -> ActionOutcome {
    NoLimitEngine::apply_action(state, seat, action).unwrap()
}

#[test]
fn preflop_action_starts_left_of_bb_and_bb_may_check_unraised() {
    let mut st = setup_preflop_6max(300, 1, 3);
    assert_eq!(st.to_act, Some(3)); // UTG

    let t = apply(&mut st, 3, PlayerBetAction::Call);
    match t.transition {
        Transition::Continued { next_to_act } => assert_eq!(next_to_act, 4),
        other => panic!("expected continued, got {other:?}"),
    }
    apply(&mut st, 4, PlayerBetAction::Fold);
    apply(&mut st, 5, PlayerBetAction::Call);
    apply(&mut st, 0, PlayerBetAction::Call);
    apply(&mut st, 1, PlayerBetAction::Call);

    // BB has the option: check or raise, never an opening bet.
    let legals = legal_actions_for(&st, 2);
    assert!(legals.may_check);
    assert!(legals.bet_range.is_none());
    assert!(legals.raise_range.is_some());

    let t = apply(&mut st, 2, PlayerBetAction::Check);
    assert_eq!(
        t.transition,
        Transition::StreetEnd {
            street: Street::Preflop
        }
    );
    assert!(st.betting_locked() || st.round_settled());
}

#[test]
fn postflop_action_starts_left_of_button() {
    let mut st = setup_preflop_6max(300, 1, 3);
    apply(&mut st, 3, PlayerBetAction::Call);
    apply(&mut st, 4, PlayerBetAction::Fold);
    apply(&mut st, 5, PlayerBetAction::Call);
    apply(&mut st, 0, PlayerBetAction::Call);
    apply(&mut st, 1, PlayerBetAction::Call);
    apply(&mut st, 2, PlayerBetAction::Check);

    st.reset_for_street(Street::Flop);
    assert_eq!(st.street, Street::Flop);
    assert_eq!(st.to_act, Some(1)); // left of BTN=0
    assert_eq!(st.current_bet, 0);
}

#[test]
fn unopened_min_bet_equals_big_blind() {
    let mut st = setup_preflop_6max(300, 1, 3);
    apply(&mut st, 3, PlayerBetAction::Call);
    apply(&mut st, 4, PlayerBetAction::Call);
    apply(&mut st, 5, PlayerBetAction::Call);
    apply(&mut st, 0, PlayerBetAction::Call);
    apply(&mut st, 1, PlayerBetAction::Call);
    apply(&mut st, 2, PlayerBetAction::Check);
    st.reset_for_street(Street::Flop);

    let legals = legal_actions_for(&st, 1);
    let range = legals.bet_range.expect("unopened bet range");
    assert_eq!(*range.start(), 3);

    let err = NoLimitEngine::apply_action(&mut st, 1, PlayerBetAction::BetTo { to: 2 }).unwrap_err();
    assert_eq!(err, ActionError::BetBelowMinimum);
}

#[test]
fn check_is_illegal_facing_a_bet() {
    let mut st = setup_preflop_6max(300, 1, 3);
    let err = NoLimitEngine::apply_action(&mut st, 3, PlayerBetAction::Check).unwrap_err();
    assert_eq!(err, ActionError::CannotCheckFacingBet);
}

#[test]
fn action_from_non_current_actor_is_rejected_without_state_change() {
    let mut st = setup_preflop_6max(300, 1, 3);
    let before = st.clone();
    let err = NoLimitEngine::apply_action(&mut st, 4, PlayerBetAction::Call).unwrap_err();
    assert_eq!(err, ActionError::NotPlayersTurn);
    assert_eq!(st.players, before.players);
    assert_eq!(st.to_act, before.to_act);
}

#[test]
fn fold_to_one_seat_ends_the_hand() {
    let cfg = HandConfig {
        stakes: stakes(5, 10),
        button: 0,
        small_blind_seat: 0, // heads-up: button posts the small blind
        big_blind_seat: 1,
    };
    let players = vec![player(0, 1000, 5), player(1, 1000, 10)];
    let mut st = BettingState::new_after_blinds(cfg, players);
    assert_eq!(st.to_act, Some(0)); // button acts first preflop heads-up

    let t = apply(&mut st, 0, PlayerBetAction::Fold);
    assert_eq!(t.transition, Transition::HandEndByFold { winner: 1 });
    assert!(st.betting_locked());
}

#[test]
fn full_raise_reopens_action() {
    let mut st = setup_preflop_6max(300, 1, 3);
    apply(&mut st, 3, PlayerBetAction::Call);
    apply(&mut st, 4, PlayerBetAction::Fold);
    apply(&mut st, 5, PlayerBetAction::RaiseTo { to: 9 });
    assert_eq!(st.current_bet, 9);
    assert_eq!(st.min_raise, 6);

    // seat 3 already called but a full raise re-opened its action
    apply(&mut st, 0, PlayerBetAction::Fold);
    apply(&mut st, 1, PlayerBetAction::Fold);
    apply(&mut st, 2, PlayerBetAction::Fold);
    let legals = legal_actions_for(&st, 3);
    assert!(legals.raise_range.is_some());
    assert_eq!(*legals.raise_range.unwrap().start(), 15); // 9 + 6
}

#[test]
fn incomplete_all_in_raise_does_not_reopen_action() {
    let cfg = cfg_6max(1, 3);
    let players = vec![
        player(0, 300, 0),
        player(1, 300, 1),
        player(2, 300, 3),
        player(3, 300, 0), // opener
        player(4, 10, 0),  // short stack
    ];
    let mut st = BettingState::new_after_blinds(cfg, players);
    assert_eq!(st.to_act, Some(3));

    apply(&mut st, 3, PlayerBetAction::RaiseTo { to: 8 });
    assert_eq!(st.current_bet, 8);
    assert_eq!(st.min_raise, 5);

    // Short all-in to 10 is a raise of 2 < 5: current bet moves, the minimum
    // raise does not, and the opener's action is not re-opened.
    let t = apply(&mut st, 4, PlayerBetAction::AllIn);
    match t.action {
        NormalizedAction::AllInAsRaise {
            to,
            raise_amount,
            full_raise,
        } => {
            assert_eq!(to, 10);
            assert_eq!(raise_amount, 2);
            assert!(!full_raise);
        }
        other => panic!("expected all-in raise, got {other:?}"),
    }
    assert_eq!(st.current_bet, 10);
    assert_eq!(st.min_raise, 5);

    apply(&mut st, 0, PlayerBetAction::Fold);
    apply(&mut st, 1, PlayerBetAction::Fold);
    apply(&mut st, 2, PlayerBetAction::Fold);

    // Back on the opener: call or fold only.
    assert_eq!(st.to_act, Some(3));
    let legals = legal_actions_for(&st, 3);
    assert_eq!(legals.call_amount, Some(2));
    assert!(legals.raise_range.is_none());
    let err =
        NoLimitEngine::apply_action(&mut st, 3, PlayerBetAction::RaiseTo { to: 18 }).unwrap_err();
    assert_eq!(err, ActionError::RaiseNotAvailable);

    let t = apply(&mut st, 3, PlayerBetAction::Call);
    assert_eq!(
        t.transition,
        Transition::StreetEnd {
            street: Street::Preflop
        }
    );
}

#[test]
fn short_all_in_call_is_accepted() {
    let cfg = cfg_6max(1, 3);
    let players = vec![
        player(0, 300, 0),
        player(1, 300, 1),
        player(2, 300, 3),
        player(3, 2, 0), // cannot cover the blind
    ];
    let mut st = BettingState::new_after_blinds(cfg, players);
    let t = apply(&mut st, 3, PlayerBetAction::Call);
    match t.action {
        NormalizedAction::Call {
            call_amount,
            full_call,
        } => {
            assert_eq!(call_amount, 2);
            assert!(!full_call);
        }
        other => panic!("expected short call, got {other:?}"),
    }
    let p = st.player(3).unwrap();
    assert_eq!(p.status, PlayerStatus::AllIn);
    assert_eq!(p.stack, 0);
}

#[test]
fn raise_below_minimum_with_chips_behind_is_rejected() {
    let mut st = setup_preflop_6max(300, 1, 3);
    let err =
        NoLimitEngine::apply_action(&mut st, 3, PlayerBetAction::RaiseTo { to: 5 }).unwrap_err();
    assert_eq!(err, ActionError::RaiseBelowMinimum);
}

#[test]
fn street_settles_when_all_active_matched_and_acted() {
    let mut st = setup_preflop_6max(300, 1, 3);
    apply(&mut st, 3, PlayerBetAction::RaiseTo { to: 9 });
    apply(&mut st, 4, PlayerBetAction::Fold);
    apply(&mut st, 5, PlayerBetAction::Call);
    apply(&mut st, 0, PlayerBetAction::Fold);
    apply(&mut st, 1, PlayerBetAction::Fold);
    let t = apply(&mut st, 2, PlayerBetAction::Call);
    assert_eq!(
        t.transition,
        Transition::StreetEnd {
            street: Street::Preflop
        }
    );
    assert_eq!(st.total_committed(), 9 + 9 + 9 + 1);
}

#[test]
fn all_in_everywhere_locks_betting_for_the_runout() {
    let cfg = cfg_6max(1, 3);
    let players = vec![player(0, 50, 0), player(1, 50, 1), player(2, 50, 3)];
    let mut st = BettingState::new_after_blinds(cfg, players);

    apply(&mut st, 0, PlayerBetAction::AllIn);
    apply(&mut st, 1, PlayerBetAction::AllIn);
    let t = apply(&mut st, 2, PlayerBetAction::AllIn);
    assert_eq!(
        t.transition,
        Transition::StreetEnd {
            street: Street::Preflop
        }
    );
    st.reset_for_street(Street::Flop);
    assert!(st.betting_locked());
}

#[test]
fn chips_are_conserved_across_actions() {
    let mut st = setup_preflop_6max(200, 1, 3);
    let total_before: Chips = st
        .players
        .iter()
        .map(|p| p.stack + p.committed_total)
        .sum();
    apply(&mut st, 3, PlayerBetAction::RaiseTo { to: 20 });
    apply(&mut st, 4, PlayerBetAction::Call);
    apply(&mut st, 5, PlayerBetAction::AllIn);
    apply(&mut st, 0, PlayerBetAction::Fold);
    apply(&mut st, 1, PlayerBetAction::Fold);
    apply(&mut st, 2, PlayerBetAction::Fold);
    let total_after: Chips = st
        .players
        .iter()
        .map(|p| p.stack + p.committed_total)
        .sum();
    assert_eq!(total_before, total_after);
    st.validate_invariants().unwrap();
}

#[test]
fn next_owing_skips_matched_and_all_in_seats() {
    let mut st = setup_preflop_6max(300, 1, 3);
    apply(&mut st, 3, PlayerBetAction::Call);
    apply(&mut st, 4, PlayerBetAction::Call);
    apply(&mut st, 5, PlayerBetAction::AllIn);
    // everyone after the all-in still owes the difference
    assert_eq!(st.next_owing_after(5), Some(0));
}
