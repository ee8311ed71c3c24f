use crate::model::card::Card;
use crate::model::round::{Round, Segment};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Orders accepted rounds by start and closes the list with one residual round
/// holding every unclaimed card.
pub fn segment(mut accepted: Vec<Round>, leftover: Vec<Card>) -> Vec<Round> {
    for round in &mut accepted {
        round.segment = Segment::A;
    }
    accepted.sort_by_key(|round| round.start);
    if !leftover.is_empty() {
        accepted.push(Round::residual(leftover));
    }
    accepted
}

/// Moves residual rounds behind segment A, keeping relative order otherwise.
pub fn residual_last(rounds: Vec<Round>) -> Vec<Round> {
    let (mut played, residual): (Vec<_>, Vec<_>) =
        rounds.into_iter().partition(|round| !round.is_residual());
    played.extend(residual);
    played
}

/// Every residual card, in position order.
pub fn residual_cards(rounds: &[Round]) -> Vec<Card> {
    let mut cards: Vec<Card> = rounds
        .iter()
        .filter(|round| round.is_residual())
        .flat_map(|round| round.cards.iter().copied())
        .collect();
    cards.sort_by_key(|card| card.position);
    cards
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionReport {
    pub missing: Vec<usize>,
    pub duplicated: Vec<usize>,
    pub foreign: Vec<usize>,
}

impl PartitionReport {
    pub fn is_exact(&self) -> bool {
        self.missing.is_empty() && self.duplicated.is_empty() && self.foreign.is_empty()
    }
}

impl fmt::Display for PartitionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "missing={:?} duplicated={:?} foreign={:?}",
            self.missing, self.duplicated, self.foreign
        )
    }
}

/// Checks that `rounds` use every card of `deck` exactly once.
pub fn verify_partition(deck: &[Card], rounds: &[Round]) -> PartitionReport {
    let expected: BTreeSet<usize> = deck.iter().map(|card| card.position).collect();
    let mut seen: BTreeMap<usize, usize> = BTreeMap::new();
    for position in rounds.iter().flat_map(Round::positions) {
        *seen.entry(position).or_insert(0) += 1;
    }

    PartitionReport {
        missing: expected
            .iter()
            .filter(|pos| !seen.contains_key(*pos))
            .copied()
            .collect(),
        duplicated: seen
            .iter()
            .filter(|(_, count)| **count > 1)
            .map(|(pos, _)| *pos)
            .collect(),
        foreign: seen
            .keys()
            .filter(|pos| !expected.contains(*pos))
            .copied()
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::rank::Rank;
    use crate::model::round::Outcome;
    use crate::model::suit::Suit;

    fn deck(len: usize) -> Vec<Card> {
        (0..len)
            .map(|pos| Card::new(Rank::ORDERED[pos % 13], Suit::ALL[pos % 4], pos))
            .collect()
    }

    #[test]
    fn rounds_sorted_and_residual_appended() {
        let cards = deck(12);
        let late = Round::new(6, cards[6..10].to_vec(), Outcome::Banker, true);
        let early = Round::new(0, cards[0..4].to_vec(), Outcome::Player, true);
        let leftover = vec![cards[11], cards[4], cards[10], cards[5]];
        let rounds = segment(vec![late, early], leftover);
        assert_eq!(rounds.len(), 3);
        assert_eq!(rounds[0].start, 0);
        assert_eq!(rounds[1].start, 6);
        let tail = &rounds[2];
        assert_eq!(tail.segment, Segment::C);
        assert_eq!(tail.start, 4);
        assert_eq!(tail.positions().collect::<Vec<_>>(), vec![4, 5, 10, 11]);
        assert!(verify_partition(&cards, &rounds).is_exact());
    }

    #[test]
    fn no_leftover_means_no_residual_round() {
        let cards = deck(4);
        let round = Round::new(0, cards.clone(), Outcome::Tie, true);
        let rounds = segment(vec![round], Vec::new());
        assert_eq!(rounds.len(), 1);
        assert!(residual_cards(&rounds).is_empty());
    }

    #[test]
    fn partition_report_flags_problems() {
        let cards = deck(6);
        let a = Round::new(0, cards[0..4].to_vec(), Outcome::Player, true);
        let b = Round::new(3, cards[3..5].to_vec(), Outcome::Banker, true);
        let report = verify_partition(&cards, &[a, b]);
        assert_eq!(report.missing, vec![5]);
        assert_eq!(report.duplicated, vec![3]);
        assert!(report.foreign.is_empty());
        assert!(!report.is_exact());
    }

    #[test]
    fn residual_rounds_move_to_the_end() {
        let cards = deck(10);
        let residual = Round::residual(cards[4..6].to_vec());
        let played = Round::new(6, cards[6..10].to_vec(), Outcome::Player, true);
        let first = Round::new(0, cards[0..4].to_vec(), Outcome::Banker, true);
        let ordered = residual_last(vec![residual, played, first]);
        assert_eq!(ordered[0].start, 6);
        assert_eq!(ordered[1].start, 0);
        assert!(ordered[2].is_residual());
    }
}
