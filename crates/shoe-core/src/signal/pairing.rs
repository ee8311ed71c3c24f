use crate::engine::harvest::{CandidateFilter, HarvestParams, harvest};
use crate::engine::segment::residual_last;
use crate::model::card::Card;
use crate::model::round::{Outcome, Round, is_two_pair};
use rand::Rng;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PairingReport {
    pub removed_two_pair_ties: usize,
    pub removed_excess_ties: usize,
    pub recycled_rounds: usize,
    /// Cards that stayed residual after recycling.
    pub leftover_cards: usize,
    pub two_pair_rounds: usize,
    pub tie_rounds: usize,
    /// Set when the two counts still differ after recycling; no rounds were moved.
    pub count_mismatch: bool,
    pub already_paired: usize,
    pub swaps: usize,
    /// Two-pair indices left without a Tie successor.
    pub unsatisfied: Vec<usize>,
}

/// Pairs every two-pair round with a Tie directly after it.
///
/// Two-pair Ties and surplus Ties are broken up, their cards are recycled with
/// the residual cards into fresh non-Tie rounds, and whole rounds are then
/// swapped until each two-pair round is followed by a Tie.
pub fn apply_t_pairing<R: Rng + ?Sized>(
    rounds: Vec<Round>,
    params: &HarvestParams,
    rng: &mut R,
) -> (Vec<Round>, PairingReport) {
    let mut report = PairingReport::default();

    let mut played = Vec::with_capacity(rounds.len());
    let mut residual: Vec<Card> = Vec::new();
    for mut round in rounds {
        round.is_t = false;
        if round.is_residual() {
            residual.extend(round.cards);
        } else {
            played.push(round);
        }
    }

    let mut removed: Vec<Round> = Vec::new();
    let mut idx = played.len();
    while idx > 0 {
        idx -= 1;
        if is_two_pair(&played[idx]) && played[idx].outcome.is_tie() {
            removed.push(played.remove(idx));
            report.removed_two_pair_ties += 1;
        }
    }

    let two_pairs = played.iter().filter(|round| is_two_pair(round)).count();
    let ties = played.iter().filter(|round| round.outcome.is_tie()).count();
    if ties > two_pairs {
        let mut excess = ties - two_pairs;
        let mut idx = played.len();
        while idx > 0 && excess > 0 {
            idx -= 1;
            if played[idx].outcome.is_tie() {
                removed.push(played.remove(idx));
                report.removed_excess_ties += 1;
                excess -= 1;
            }
        }
    }

    let pool = recycling_pool(&removed, residual);
    let recycled = harvest(&pool, params, CandidateFilter::ExcludeTie, rng);
    report.recycled_rounds = recycled.rounds.len();
    report.leftover_cards = recycled.remainder.len();
    if recycled.remainder.len() > params.min_viable {
        tracing::warn!(
            target: "shoe_core::t_pairing",
            leftover = recycled.remainder.len(),
            reason = "recycle_leftover",
            message = "recycled cards could not all form sensitive rounds"
        );
    }
    played.extend(recycled.rounds);
    if !recycled.remainder.is_empty() {
        played.push(Round::residual(recycled.remainder));
    }
    let mut rounds = residual_last(played);

    let (two_pair_indices, tie_indices) = index_sets(&rounds);
    report.two_pair_rounds = two_pair_indices.len();
    report.tie_rounds = tie_indices.len();
    if two_pair_indices.len() != tie_indices.len() {
        tracing::warn!(
            target: "shoe_core::t_pairing",
            two_pair = two_pair_indices.len(),
            ties = tie_indices.len(),
            reason = "count_mismatch",
            message = "two-pair and tie counts differ; rounds left in place"
        );
        report.count_mismatch = true;
        rederive_t_flags(&mut rounds);
        return (rounds, report);
    }

    place_ties(&mut rounds, &two_pair_indices, tie_indices, &mut report);
    rederive_t_flags(&mut rounds);
    (rounds, report)
}

fn recycling_pool(removed: &[Round], residual: Vec<Card>) -> Vec<Card> {
    let mut seen = HashSet::new();
    removed
        .iter()
        .flat_map(|round| round.cards.iter().copied())
        .chain(residual)
        .filter(|card| seen.insert(card.position))
        .collect()
}

fn index_sets(rounds: &[Round]) -> (Vec<usize>, BTreeSet<usize>) {
    let two_pairs = rounds
        .iter()
        .enumerate()
        .filter(|(_, round)| is_two_pair(round))
        .map(|(idx, _)| idx)
        .collect();
    let ties = rounds
        .iter()
        .enumerate()
        .filter(|(_, round)| round.outcome == Outcome::Tie)
        .map(|(idx, _)| idx)
        .collect();
    (two_pairs, ties)
}

fn place_ties(
    rounds: &mut [Round],
    two_pair_indices: &[usize],
    mut available: BTreeSet<usize>,
    report: &mut PairingReport,
) {
    let len = rounds.len();
    for &pair_idx in two_pair_indices {
        let next = (pair_idx + 1) % len;
        if rounds[next].outcome.is_tie() {
            available.remove(&next);
            report.already_paired += 1;
            continue;
        }

        let candidate = available
            .range(pair_idx + 1..)
            .next()
            .or_else(|| available.iter().next())
            .copied();
        let Some(tie_idx) = candidate else {
            tracing::warn!(
                target: "shoe_core::t_pairing",
                round = pair_idx,
                reason = "no_tie_available",
                message = "no tie round left to follow a two-pair round"
            );
            report.unsatisfied.push(pair_idx);
            continue;
        };

        if tie_idx != next {
            rounds.swap(next, tie_idx);
            report.swaps += 1;
        }
        available.remove(&tie_idx);
    }
}

/// A round is a T-round exactly when it is two-pair and its cyclic successor ties.
pub fn rederive_t_flags(rounds: &mut [Round]) {
    let len = rounds.len();
    if len == 0 {
        return;
    }
    let flags: Vec<bool> = (0..len)
        .map(|idx| is_two_pair(&rounds[idx]) && rounds[(idx + 1) % len].outcome.is_tie())
        .collect();
    for (round, flag) in rounds.iter_mut().zip(flags) {
        round.is_t = flag;
    }
}

/// Two-pair rounds whose cyclic successor is not a Tie.
pub fn unpaired(rounds: &[Round]) -> Vec<usize> {
    let len = rounds.len();
    (0..len)
        .filter(|&idx| is_two_pair(&rounds[idx]) && !rounds[(idx + 1) % len].outcome.is_tie())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::segment::verify_partition;
    use crate::model::rank::Rank;
    use crate::model::suit::Suit;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn round_of(start: usize, ranks: &[Rank], outcome: Outcome) -> Round {
        let cards = ranks
            .iter()
            .enumerate()
            .map(|(offset, rank)| Card::new(*rank, Suit::ALL[offset % 4], start + offset))
            .collect();
        Round::new(start, cards, outcome, true)
    }

    fn plain(start: usize, outcome: Outcome) -> Round {
        round_of(start, &[Rank::Ace, Rank::Two, Rank::Three, Rank::Four], outcome)
    }

    fn two_pair(start: usize, outcome: Outcome) -> Round {
        round_of(start, &[Rank::Seven, Rank::Seven, Rank::Two, Rank::Two], outcome)
    }

    fn no_recycle() -> HarvestParams {
        HarvestParams {
            max_attempts: 0,
            min_viable: 0,
            natural_scan: false,
        }
    }

    #[test]
    fn tie_is_moved_behind_two_pair() {
        let rounds = vec![
            two_pair(0, Outcome::Player),
            plain(4, Outcome::Banker),
            plain(8, Outcome::Player),
            plain(12, Outcome::Tie),
        ];
        let mut rng = StdRng::seed_from_u64(1);
        let (rounds, report) = apply_t_pairing(rounds, &no_recycle(), &mut rng);
        assert_eq!(report.swaps, 1);
        assert!(report.unsatisfied.is_empty());
        assert_eq!(rounds[1].outcome, Outcome::Tie);
        assert!(rounds[0].is_t);
        assert!(unpaired(&rounds).is_empty());
    }

    #[test]
    fn existing_pair_is_left_alone() {
        let rounds = vec![
            plain(0, Outcome::Banker),
            two_pair(4, Outcome::Player),
            plain(8, Outcome::Tie),
        ];
        let mut rng = StdRng::seed_from_u64(2);
        let (rounds, report) = apply_t_pairing(rounds, &no_recycle(), &mut rng);
        assert_eq!(report.already_paired, 1);
        assert_eq!(report.swaps, 0);
        assert!(rounds[1].is_t);
        assert_eq!(rounds[0].start, 0);
    }

    #[test]
    fn two_pair_ties_and_surplus_ties_are_removed() {
        let rounds = vec![
            two_pair(0, Outcome::Tie),
            plain(4, Outcome::Tie),
            plain(8, Outcome::Banker),
            plain(12, Outcome::Tie),
        ];
        let all_cards: Vec<Card> = rounds.iter().flat_map(|r| r.cards.clone()).collect();
        let mut rng = StdRng::seed_from_u64(3);
        let (rounds, report) = apply_t_pairing(rounds, &no_recycle(), &mut rng);
        assert_eq!(report.removed_two_pair_ties, 1);
        assert_eq!(report.removed_excess_ties, 2);
        assert_eq!(report.tie_rounds, 0);
        assert!(rounds.iter().all(|r| r.outcome != Outcome::Tie));
        assert!(rounds.last().is_some_and(Round::is_residual));
        assert!(verify_partition(&all_cards, &rounds).is_exact());
    }

    #[test]
    fn count_mismatch_leaves_order() {
        let rounds = vec![
            two_pair(0, Outcome::Player),
            two_pair(4, Outcome::Banker),
            plain(8, Outcome::Tie),
        ];
        let mut rng = StdRng::seed_from_u64(4);
        let (rounds, report) = apply_t_pairing(rounds, &no_recycle(), &mut rng);
        assert!(report.count_mismatch);
        assert_eq!(
            rounds.iter().map(|r| r.start).collect::<Vec<_>>(),
            vec![0, 4, 8]
        );
        assert!(rounds[1].is_t);
        assert!(!rounds[0].is_t);
    }

    #[test]
    fn wraps_to_lowest_tie_when_none_follows() {
        let rounds = vec![
            plain(0, Outcome::Tie),
            plain(4, Outcome::Banker),
            two_pair(8, Outcome::Player),
            plain(12, Outcome::Player),
        ];
        let mut rng = StdRng::seed_from_u64(5);
        let (rounds, report) = apply_t_pairing(rounds, &no_recycle(), &mut rng);
        assert_eq!(report.swaps, 1);
        assert_eq!(rounds[3].outcome, Outcome::Tie);
        assert!(rounds[2].is_t);
    }

    #[test]
    fn rederive_uses_cyclic_successor() {
        let mut rounds = vec![plain(0, Outcome::Tie), two_pair(4, Outcome::Banker)];
        rederive_t_flags(&mut rounds);
        assert!(rounds[1].is_t);
        assert!(!rounds[0].is_t);
    }
}
