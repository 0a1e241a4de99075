use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::showdown::HandRank;

use super::types::{Chips, SeatId};

/// One pot layer: an amount and the non-folded seats eligible to win it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PotLayer {
    pub amount: Chips,
    pub eligible: Vec<SeatId>,
}

/// A seat's contribution to the hand at pot-build time.
#[derive(Clone, Copy, Debug)]
pub struct PotContribution {
    pub seat: SeatId,
    pub committed: Chips,
    pub folded: bool,
}

/// Layered pots plus the uncalled excess returned to a lone over-bettor.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PotBuild {
    pub layers: Vec<PotLayer>,
    pub refund: Option<(SeatId, Chips)>,
}

impl PotBuild {
    pub fn total(&self) -> Chips {
        self.layers.iter().map(|l| l.amount).sum()
    }
}

/// Build main and side pots from per-seat contributions.
///
/// Caps are the distinct contribution totals of non-folded seats, ascending.
/// Each layer collects `min(committed, cap) - previous cap` from every seat
/// (folded chips included) and is winnable by non-folded seats at or above the
/// cap. The portion of the highest contribution no other live seat matched is
/// refunded, never pooled.
pub fn build_pots(contribs: &[PotContribution]) -> PotBuild {
    let mut live: Vec<(SeatId, Chips)> = contribs
        .iter()
        .filter(|c| !c.folded)
        .map(|c| (c.seat, c.committed))
        .collect();
    if live.is_empty() {
        return PotBuild::default();
    }
    live.sort_by_key(|&(_, committed)| committed);

    // Uncalled excess of the top live contributor goes back to that seat. The
    // matched amount counts every other contribution, folded dead money
    // included.
    let mut refund = None;
    let (top_seat, top) = *live.last().expect("non-empty");
    let matched = contribs
        .iter()
        .filter(|c| c.seat != top_seat)
        .map(|c| c.committed)
        .max()
        .unwrap_or(0);
    let mut effective: BTreeMap<SeatId, Chips> =
        contribs.iter().map(|c| (c.seat, c.committed)).collect();
    if top > matched {
        refund = Some((top_seat, top - matched));
        effective.insert(top_seat, matched);
    }

    let mut caps: Vec<Chips> = live
        .iter()
        .map(|&(seat, _)| effective[&seat])
        .filter(|&c| c > 0)
        .collect();
    caps.sort_unstable();
    caps.dedup();

    let mut layers = Vec::new();
    let mut prev_cap: Chips = 0;
    for cap in caps {
        let mut amount: Chips = 0;
        for c in contribs {
            let contributed = effective[&c.seat].min(cap).saturating_sub(prev_cap);
            amount += contributed;
        }
        if amount == 0 {
            continue;
        }
        let mut eligible: Vec<SeatId> = live
            .iter()
            .filter(|&&(seat, _)| effective[&seat] >= cap)
            .map(|&(seat, _)| seat)
            .collect();
        eligible.sort_unstable();
        layers.push(PotLayer { amount, eligible });
        prev_cap = cap;
    }

    // Folded chips above the top live cap cannot occur in a legal action
    // sequence; any residue still lands in the last layer rather than vanish.
    let committed_total: Chips = contribs.iter().map(|c| c.committed).sum();
    let refunded = refund.map(|(_, amount)| amount).unwrap_or(0);
    let layered: Chips = layers.iter().map(|l| l.amount).sum();
    if let Some(last) = layers.last_mut() {
        last.amount += committed_total - refunded - layered;
    }

    PotBuild { layers, refund }
}

/// Per-seat winnings inside one awarded layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatWinnings {
    pub seat: SeatId,
    pub amount: Chips,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerAward {
    pub amount: Chips,
    pub eligible: Vec<SeatId>,
    pub winners: Vec<SeatWinnings>,
}

/// Award each layer to its best-ranked eligible seats, splitting ties evenly.
/// Residual chips go one at a time to tied winners in clockwise order starting
/// left of the button (`order_from_button`).
pub fn award_layers(
    layers: &[PotLayer],
    ranks: &BTreeMap<SeatId, HandRank>,
    order_from_button: &[SeatId],
) -> Vec<LayerAward> {
    let mut awards = Vec::with_capacity(layers.len());
    for layer in layers {
        let best = layer
            .eligible
            .iter()
            .filter_map(|seat| ranks.get(seat).map(|rank| (*seat, *rank)))
            .max_by_key(|&(_, rank)| rank.score);
        let Some((_, best_rank)) = best else {
            continue;
        };
        let mut winners: Vec<SeatId> = layer
            .eligible
            .iter()
            .filter(|&seat| ranks.get(seat).map(|r| r.score) == Some(best_rank.score))
            .copied()
            .collect();
        // clockwise from the seat left of the button
        winners.sort_by_key(|seat| {
            order_from_button
                .iter()
                .position(|s| s == seat)
                .unwrap_or(usize::MAX)
        });

        let share = layer.amount / winners.len() as Chips;
        let mut remainder = layer.amount - share * winners.len() as Chips;
        let winnings = winners
            .iter()
            .map(|&seat| {
                let mut amount = share;
                if remainder > 0 {
                    amount += 1;
                    remainder -= 1;
                }
                SeatWinnings { seat, amount }
            })
            .collect();
        awards.push(LayerAward {
            amount: layer.amount,
            eligible: layer.eligible.clone(),
            winners: winnings,
        });
    }
    awards
}
