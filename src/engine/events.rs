use serde::{Deserialize, Serialize};

use super::types::Chips;

/// What an action resolved to once legality and all-in classification are
/// applied. `full_raise: false` marks an incomplete all-in raise, which does
/// not re-open action for seats that already matched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum NormalizedAction {
    Fold,
    Check,
    Call {
        call_amount: Chips,
        full_call: bool, // false => short all-in call
    },
    Bet {
        to: Chips,
    },
    Raise {
        to: Chips,
        raise_amount: Chips,
        full_raise: bool,
    },
    AllInAsCall {
        call_amount: Chips,
        full_call: bool,
    },
    AllInAsBet {
        to: Chips,
    },
    AllInAsRaise {
        to: Chips,
        raise_amount: Chips,
        full_raise: bool,
    },
}

impl NormalizedAction {
    pub fn is_fold(&self) -> bool {
        matches!(self, NormalizedAction::Fold)
    }
}
