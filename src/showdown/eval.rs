use crate::cards::{is_run_desc_ranks, is_wheel_ranks, sort_desc, Card, Rank, Suit};

use super::{pack_score_u32, HandCategory, HandRank};

/// Category-specific tie-break vector from a canonical 5-card hand. The vector
/// length matches the category; unused digits stay zero so lexicographic
/// comparison works on the fixed array.
pub fn tiebreak_vector(cat: HandCategory, h: &[Card; 5]) -> [u8; 5] {
    let r = [h[0].rank, h[1].rank, h[2].rank, h[3].rank, h[4].rank];
    match cat {
        HandCategory::RoyalFlush => [14, 0, 0, 0, 0],
        HandCategory::StraightFlush | HandCategory::Straight => {
            let high = if is_wheel_ranks(&r) { 5 } else { r[0] };
            [high, 0, 0, 0, 0]
        }
        HandCategory::FourOfAKind => [r[0], r[4], 0, 0, 0],
        HandCategory::FullHouse => [r[0], r[3], 0, 0, 0],
        HandCategory::Flush => [r[0], r[1], r[2], r[3], r[4]],
        HandCategory::ThreeOfAKind => [r[0], r[3], r[4], 0, 0],
        HandCategory::TwoPair => [r[0], r[2], r[4], 0, 0],
        HandCategory::OnePair => [r[0], r[2], r[3], r[4], 0],
        HandCategory::HighCard => [r[0], r[1], r[2], r[3], r[4]],
    }
}

/// Classify any 5 cards and return (category, canonical 5). Canonical layout:
/// groups first (quads, trips, pairs) then kickers, all rank-descending;
/// straights high-to-low with the wheel as 5-4-3-2-A.
pub fn classify_five_and_canonicalize(h5: [Card; 5]) -> (HandCategory, [Card; 5]) {
    let mut s = h5;
    sort_desc(&mut s);

    let mut cnt = [0u8; 15]; // rank histogram, 0..14
    for c in s.iter() {
        cnt[c.rank as usize] += 1;
    }

    let same_suit = s.iter().all(|c| c.suit == s[0].suit);

    let mut uniq: Vec<Rank> = s.iter().map(|c| c.rank).collect();
    uniq.dedup();

    // Straight detection (only if 5 distinct ranks)
    let (has_straight, straight_ranks): (bool, [Rank; 5]) = if uniq.len() == 5 {
        let r = [uniq[0], uniq[1], uniq[2], uniq[3], uniq[4]];
        if is_run_desc_ranks(&r) {
            (true, r)
        } else {
            let mut set = r;
            set.sort_unstable(); // asc
            if set == [2, 3, 4, 5, 14] {
                (true, [5, 4, 3, 2, 14])
            } else {
                (false, [0; 5])
            }
        }
    } else {
        (false, [0; 5])
    };

    // Straight flush, royal when ace-high
    if has_straight && same_suit {
        let suit = s[0].suit;
        let k: [Card; 5] = std::array::from_fn(|i| {
            *s.iter()
                .find(|c| c.rank == straight_ranks[i] && c.suit == suit)
                .unwrap()
        });
        let cat = if straight_ranks[0] == 14 {
            HandCategory::RoyalFlush
        } else {
            HandCategory::StraightFlush
        };
        return (cat, k);
    }
    // Four of a kind
    if let Some((x_rank, _)) = (2..=14)
        .rev()
        .map(|r| (r, cnt[r as usize]))
        .find(|&(_r, c)| c == 4)
    {
        let quads: Vec<Card> = s.iter().filter(|c| c.rank == x_rank).cloned().collect();
        let kicker = s.iter().cloned().find(|c| c.rank != x_rank).unwrap();
        return (
            HandCategory::FourOfAKind,
            [quads[0], quads[1], quads[2], quads[3], kicker],
        );
    }
    // Full house
    let trips_ranks: Vec<Rank> = (2..=14).rev().filter(|&r| cnt[r as usize] >= 3).collect();
    if !trips_ranks.is_empty() {
        let t = trips_ranks[0];
        let pair_cands: Vec<Rank> = (2..=14)
            .rev()
            .filter(|&r| r != t && cnt[r as usize] >= 2)
            .collect();
        if !pair_cands.is_empty() {
            let p = pair_cands[0];
            let trips: Vec<Card> = s.iter().filter(|c| c.rank == t).take(3).cloned().collect();
            let pair: Vec<Card> = s.iter().filter(|c| c.rank == p).take(2).cloned().collect();
            return (
                HandCategory::FullHouse,
                [trips[0], trips[1], trips[2], pair[0], pair[1]],
            );
        }
    }
    // Flush (not straight flush)
    if same_suit {
        return (HandCategory::Flush, s);
    }
    // Straight (not flush)
    if has_straight {
        // choose any suit per rank, deterministically prefer higher suit id
        let k: [Card; 5] = std::array::from_fn(|i| {
            s.iter()
                .filter(|c| c.rank == straight_ranks[i])
                .max_by_key(|c| c.suit)
                .cloned()
                .unwrap()
        });
        return (HandCategory::Straight, k);
    }
    // Trips
    if let Some((t, _)) = (2..=14)
        .rev()
        .map(|r| (r, cnt[r as usize]))
        .find(|&(_r, c)| c >= 3)
    {
        let trips: Vec<Card> = s.iter().filter(|c| c.rank == t).take(3).cloned().collect();
        let mut kickers: Vec<Card> = s.iter().filter(|c| c.rank != t).cloned().collect();
        sort_desc(&mut kickers);
        return (
            HandCategory::ThreeOfAKind,
            [trips[0], trips[1], trips[2], kickers[0], kickers[1]],
        );
    }
    // Two pair
    let pairs: Vec<Rank> = (2..=14).rev().filter(|&r| cnt[r as usize] >= 2).collect();
    if pairs.len() >= 2 {
        let hi = pairs[0];
        let lo = pairs[1];
        let hi_pair: Vec<Card> = s.iter().filter(|c| c.rank == hi).take(2).cloned().collect();
        let lo_pair: Vec<Card> = s.iter().filter(|c| c.rank == lo).take(2).cloned().collect();
        let kicker = s
            .iter()
            .cloned()
            .find(|c| c.rank != hi && c.rank != lo)
            .unwrap();
        return (
            HandCategory::TwoPair,
            [hi_pair[0], hi_pair[1], lo_pair[0], lo_pair[1], kicker],
        );
    }
    // One pair
    if let Some((p, _)) = (2..=14)
        .rev()
        .map(|r| (r, cnt[r as usize]))
        .find(|&(_r, c)| c >= 2)
    {
        let pair: Vec<Card> = s.iter().filter(|c| c.rank == p).take(2).cloned().collect();
        let mut kickers: Vec<Card> = s.iter().filter(|c| c.rank != p).cloned().collect();
        sort_desc(&mut kickers);
        return (
            HandCategory::OnePair,
            [pair[0], pair[1], kickers[0], kickers[1], kickers[2]],
        );
    }
    // High card
    (HandCategory::HighCard, s)
}

/// Enumerate all 21 subsets of 7 cards and pick the maximum by packed score.
pub fn choose_best5_from7(c7: [Card; 7]) -> HandRank {
    let mut best: Option<HandRank> = None;

    for a in 0..=2 {
        for b in (a + 1)..=3 {
            for c in (b + 1)..=4 {
                for d in (c + 1)..=5 {
                    for e in (d + 1)..=6 {
                        let hand5 = [c7[a], c7[b], c7[c], c7[d], c7[e]];
                        let (cat, k5) = classify_five_and_canonicalize(hand5);
                        let cvec = tiebreak_vector(cat, &k5);
                        let score = pack_score_u32(cat, cvec);
                        if best.map_or(true, |prev| score > prev.score) {
                            best = Some(HandRank {
                                category: cat,
                                tiebreak: cvec,
                                best_five: k5,
                                score,
                            });
                        }
                    }
                }
            }
        }
    }
    best.expect("21 subsets evaluated")
}

/// Rank a seat's hand: 2 hole cards plus the 5 community cards.
pub fn evaluate_seven(cards: [Card; 7]) -> HandRank {
    choose_best5_from7(cards)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(rank: Rank, suit: Suit) -> Card {
        Card::new(rank, suit)
    }

    fn score5(h: [Card; 5]) -> u32 {
        let (cat, k5) = classify_five_and_canonicalize(h);
        pack_score_u32(cat, tiebreak_vector(cat, &k5))
    }

    #[test]
    fn ordering_intra_category() {
        // SF: 9-high > wheel
        let sf_9 = [
            card(9, Suit::Hearts),
            card(8, Suit::Hearts),
            card(7, Suit::Hearts),
            card(6, Suit::Hearts),
            card(5, Suit::Hearts),
        ];
        let sf_wheel = [
            card(5, Suit::Diamonds),
            card(4, Suit::Diamonds),
            card(3, Suit::Diamonds),
            card(2, Suit::Diamonds),
            card(14, Suit::Diamonds),
        ];
        assert!(score5(sf_9) > score5(sf_wheel));

        // 4K: Aces+K > Aces+2 > Queens+Ace
        let fk_ak = [
            card(14, Suit::Clubs),
            card(14, Suit::Diamonds),
            card(14, Suit::Hearts),
            card(14, Suit::Spades),
            card(13, Suit::Clubs),
        ];
        let fk_a2 = [
            card(14, Suit::Clubs),
            card(14, Suit::Diamonds),
            card(14, Suit::Hearts),
            card(14, Suit::Spades),
            card(2, Suit::Clubs),
        ];
        let fk_qa = [
            card(12, Suit::Clubs),
            card(12, Suit::Diamonds),
            card(12, Suit::Hearts),
            card(12, Suit::Spades),
            card(14, Suit::Clubs),
        ];
        assert!(score5(fk_ak) > score5(fk_a2));
        assert!(score5(fk_a2) > score5(fk_qa));

        // FH: AAA-KK > KKK-AA
        let fh1 = [
            card(14, Suit::Clubs),
            card(14, Suit::Diamonds),
            card(14, Suit::Hearts),
            card(13, Suit::Clubs),
            card(13, Suit::Diamonds),
        ];
        let fh2 = [
            card(13, Suit::Clubs),
            card(13, Suit::Diamonds),
            card(13, Suit::Hearts),
            card(14, Suit::Clubs),
            card(14, Suit::Diamonds),
        ];
        assert!(score5(fh1) > score5(fh2));

        // Flush lex order
        let fl_aq972 = [
            card(14, Suit::Spades),
            card(12, Suit::Spades),
            card(9, Suit::Spades),
            card(7, Suit::Spades),
            card(2, Suit::Spades),
        ];
        let fl_aq965 = [
            card(14, Suit::Hearts),
            card(12, Suit::Hearts),
            card(9, Suit::Hearts),
            card(6, Suit::Hearts),
            card(5, Suit::Hearts),
        ];
        assert!(score5(fl_aq972) > score5(fl_aq965));

        // Straight: A-high > 9-high > wheel
        let st_a = [
            card(14, Suit::Clubs),
            card(13, Suit::Diamonds),
            card(12, Suit::Hearts),
            card(11, Suit::Spades),
            card(10, Suit::Clubs),
        ];
        let st_9 = [
            card(9, Suit::Clubs),
            card(8, Suit::Diamonds),
            card(7, Suit::Hearts),
            card(6, Suit::Spades),
            card(5, Suit::Clubs),
        ];
        let st_w = [
            card(5, Suit::Clubs),
            card(4, Suit::Diamonds),
            card(3, Suit::Hearts),
            card(2, Suit::Spades),
            card(14, Suit::Clubs),
        ];
        assert!(score5(st_a) > score5(st_9));
        assert!(score5(st_9) > score5(st_w));

        // Two pair: kicker decides
        let tp_hi = [
            card(14, Suit::Clubs),
            card(14, Suit::Diamonds),
            card(13, Suit::Clubs),
            card(13, Suit::Diamonds),
            card(12, Suit::Clubs),
        ];
        let tp_lo = [
            card(14, Suit::Clubs),
            card(14, Suit::Diamonds),
            card(13, Suit::Clubs),
            card(13, Suit::Diamonds),
            card(2, Suit::Clubs),
        ];
        assert!(score5(tp_hi) > score5(tp_lo));

        // High card: last kicker decides
        let hc1 = [
            card(14, Suit::Clubs),
            card(12, Suit::Diamonds),
            card(9, Suit::Spades),
            card(7, Suit::Hearts),
            card(3, Suit::Clubs),
        ];
        let hc2 = [
            card(14, Suit::Clubs),
            card(12, Suit::Diamonds),
            card(9, Suit::Spades),
            card(7, Suit::Hearts),
            card(2, Suit::Clubs),
        ];
        assert!(score5(hc1) > score5(hc2));
    }

    #[test]
    fn royal_flush_outranks_straight_flush() {
        let royal = [
            card(14, Suit::Spades),
            card(13, Suit::Spades),
            card(12, Suit::Spades),
            card(11, Suit::Spades),
            card(10, Suit::Spades),
        ];
        let (cat, _) = classify_five_and_canonicalize(royal);
        assert_eq!(cat, HandCategory::RoyalFlush);

        let sf_k = [
            card(13, Suit::Hearts),
            card(12, Suit::Hearts),
            card(11, Suit::Hearts),
            card(10, Suit::Hearts),
            card(9, Suit::Hearts),
        ];
        assert!(score5(royal) > score5(sf_k));
    }

    #[test]
    fn tie_equality_across_suits() {
        let fl_s = [
            card(14, Suit::Spades),
            card(12, Suit::Spades),
            card(9, Suit::Spades),
            card(7, Suit::Spades),
            card(2, Suit::Spades),
        ];
        let fl_h = [
            card(14, Suit::Hearts),
            card(12, Suit::Hearts),
            card(9, Suit::Hearts),
            card(7, Suit::Hearts),
            card(2, Suit::Hearts),
        ];
        assert_eq!(score5(fl_s), score5(fl_h));

        let st1 = [
            card(9, Suit::Clubs),
            card(8, Suit::Diamonds),
            card(7, Suit::Hearts),
            card(6, Suit::Spades),
            card(5, Suit::Clubs),
        ];
        let st2 = [
            card(9, Suit::Diamonds),
            card(8, Suit::Hearts),
            card(7, Suit::Spades),
            card(6, Suit::Clubs),
            card(5, Suit::Diamonds),
        ];
        assert_eq!(score5(st1), score5(st2));
    }

    #[test]
    fn cross_category_precedence() {
        let hands = [
            [
                card(14, Suit::Clubs),
                card(12, Suit::Diamonds),
                card(9, Suit::Spades),
                card(7, Suit::Hearts),
                card(3, Suit::Clubs),
            ], // high card
            [
                card(14, Suit::Clubs),
                card(14, Suit::Diamonds),
                card(13, Suit::Clubs),
                card(12, Suit::Clubs),
                card(11, Suit::Clubs),
            ], // pair
            [
                card(14, Suit::Clubs),
                card(14, Suit::Diamonds),
                card(13, Suit::Clubs),
                card(13, Suit::Diamonds),
                card(12, Suit::Clubs),
            ], // two pair
            [
                card(12, Suit::Spades),
                card(12, Suit::Hearts),
                card(12, Suit::Diamonds),
                card(14, Suit::Clubs),
                card(13, Suit::Clubs),
            ], // trips
            [
                card(14, Suit::Clubs),
                card(13, Suit::Diamonds),
                card(12, Suit::Hearts),
                card(11, Suit::Spades),
                card(10, Suit::Clubs),
            ], // straight
            [
                card(14, Suit::Spades),
                card(12, Suit::Spades),
                card(9, Suit::Spades),
                card(7, Suit::Spades),
                card(2, Suit::Spades),
            ], // flush
            [
                card(14, Suit::Clubs),
                card(14, Suit::Diamonds),
                card(14, Suit::Hearts),
                card(13, Suit::Clubs),
                card(13, Suit::Diamonds),
            ], // full house
            [
                card(14, Suit::Clubs),
                card(14, Suit::Diamonds),
                card(14, Suit::Hearts),
                card(14, Suit::Spades),
                card(13, Suit::Clubs),
            ], // quads
            [
                card(13, Suit::Spades),
                card(12, Suit::Spades),
                card(11, Suit::Spades),
                card(10, Suit::Spades),
                card(9, Suit::Spades),
            ], // straight flush
            [
                card(14, Suit::Spades),
                card(13, Suit::Spades),
                card(12, Suit::Spades),
                card(11, Suit::Spades),
                card(10, Suit::Spades),
            ], // royal flush
        ];
        let scores: Vec<u32> = hands.iter().map(|h| score5(*h)).collect();
        for pair in scores.windows(2) {
            assert!(pair[0] < pair[1], "expected strictly increasing: {scores:?}");
        }
    }

    #[test]
    fn best_of_seven_prefers_flush_over_straight() {
        // Board ♠7 ♠8 ♦9 ♠T ♣2; ♠6♠A makes an ace-high flush, not the straight.
        let seven = [
            card(7, Suit::Spades),
            card(8, Suit::Spades),
            card(9, Suit::Diamonds),
            card(10, Suit::Spades),
            card(2, Suit::Clubs),
            card(6, Suit::Spades),
            card(14, Suit::Spades),
        ];
        let rank = evaluate_seven(seven);
        assert_eq!(rank.category, HandCategory::Flush);
        assert_eq!(rank.tiebreak[0], 14);
    }

    #[test]
    fn best_of_seven_finds_the_wheel() {
        let seven = [
            card(2, Suit::Diamonds),
            card(3, Suit::Clubs),
            card(4, Suit::Spades),
            card(9, Suit::Hearts),
            card(13, Suit::Diamonds),
            card(14, Suit::Hearts),
            card(5, Suit::Clubs),
        ];
        let rank = evaluate_seven(seven);
        assert_eq!(rank.category, HandCategory::Straight);
        assert_eq!(rank.tiebreak[0], 5);
    }

    #[test]
    fn best_of_seven_matches_exhaustive_max() {
        // P4 spot check: the reported score must equal the max over all 21
        // five-card subsets computed independently.
        let seven = [
            card(14, Suit::Clubs),
            card(14, Suit::Diamonds),
            card(9, Suit::Spades),
            card(9, Suit::Hearts),
            card(13, Suit::Diamonds),
            card(4, Suit::Hearts),
            card(2, Suit::Clubs),
        ];
        let rank = evaluate_seven(seven);

        let mut max_score = 0;
        for a in 0..7 {
            for b in (a + 1)..7 {
                // the 5 cards left after removing positions a and b
                let five: Vec<Card> = seven
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != a && *i != b)
                    .map(|(_, c)| *c)
                    .collect();
                max_score = max_score.max(score5([five[0], five[1], five[2], five[3], five[4]]));
            }
        }
        assert_eq!(rank.score, max_score);
        assert_eq!(rank.category, HandCategory::TwoPair);
    }

    #[test]
    fn total_order_is_transitive_on_samples() {
        use rand::rngs::StdRng;
        use rand::seq::SliceRandom;
        use rand::SeedableRng;

        let mut rng = StdRng::seed_from_u64(7);
        let mut deck: Vec<Card> = Suit::ALL
            .iter()
            .flat_map(|&s| (2..=14).map(move |r| card(r, s)))
            .collect();

        for _ in 0..200 {
            deck.shuffle(&mut rng);
            let a = evaluate_seven(deck[0..7].try_into().unwrap());
            let b = evaluate_seven(deck[7..14].try_into().unwrap());
            let c = evaluate_seven(deck[14..21].try_into().unwrap());
            if a <= b && b <= c {
                assert!(a <= c);
            }
            if a >= b && b >= c {
                assert!(a >= c);
            }
            assert_eq!(a.cmp(&a), core::cmp::Ordering::Equal);
        }
    }
}
