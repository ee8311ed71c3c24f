use crate::engine::permutations::{MAX_EXHAUSTIVE, Orderings};
use crate::engine::simulator::{MIN_ROUND_CARDS, SwapProbe, simulate};
use crate::model::card::Card;
use crate::model::round::{Outcome, Round};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{Level, event};

/// Bounds for the multi-pass harvester.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestParams {
    /// Consecutive passes that may find nothing before the harvester gives up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    /// Remainders at or below this size stop the random passes.
    #[serde(default = "default_min_viable")]
    pub min_viable: usize,
    /// Keep sensitive rounds already present in the dealt order before permuting.
    #[serde(default = "default_natural_scan")]
    pub natural_scan: bool,
}

impl Default for HarvestParams {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            min_viable: default_min_viable(),
            natural_scan: default_natural_scan(),
        }
    }
}

fn default_max_attempts() -> usize {
    200
}

fn default_min_viable() -> usize {
    6
}

fn default_natural_scan() -> bool {
    true
}

/// Which sensitive rounds a pass may keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateFilter {
    #[default]
    AnyOutcome,
    ExcludeTie,
}

impl CandidateFilter {
    pub fn accepts(self, outcome: Outcome) -> bool {
        match self {
            CandidateFilter::AnyOutcome => true,
            CandidateFilter::ExcludeTie => outcome != Outcome::Tie,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Harvest {
    pub rounds: Vec<Round>,
    /// Unclaimed cards in their pool order.
    pub remainder: Vec<Card>,
    pub passes: usize,
    pub exhaustive_hit: bool,
}

impl Harvest {
    pub fn claimed(&self) -> usize {
        self.rounds.iter().map(Round::card_count).sum()
    }
}

/// Mines non-overlapping sensitive rounds out of `pool`.
pub fn harvest<R: Rng + ?Sized>(
    pool: &[Card],
    params: &HarvestParams,
    filter: CandidateFilter,
    rng: &mut R,
) -> Harvest {
    let mut outcome = Harvest {
        remainder: pool.to_vec(),
        ..Harvest::default()
    };
    if pool.len() < MIN_ROUND_CARDS {
        return outcome;
    }

    if params.natural_scan {
        let found = natural_scan(pool, filter);
        absorb(&mut outcome, found);
    }

    let mut idle = 0usize;
    while outcome.remainder.len() > params.min_viable && idle < params.max_attempts {
        outcome.passes += 1;
        let found = mine_pass(&outcome.remainder, filter, rng);
        if found.is_empty() {
            idle += 1;
            continue;
        }
        idle = 0;
        absorb(&mut outcome, found);
    }

    let fallback_limit = params.min_viable.min(MAX_EXHAUSTIVE);
    let left = outcome.remainder.len();
    if (MIN_ROUND_CARDS..=fallback_limit).contains(&left) {
        if let Some(round) = exhaustive_first_round(&outcome.remainder, filter) {
            outcome.exhaustive_hit = true;
            absorb(&mut outcome, vec![round]);
        }
    }

    if tracing::enabled!(Level::INFO) {
        event!(
            target: "shoe_core::harvest",
            Level::INFO,
            pool = pool.len(),
            rounds = outcome.rounds.len(),
            remainder = outcome.remainder.len(),
            passes = outcome.passes,
            exhaustive_hit = outcome.exhaustive_hit,
            filter = ?filter
        );
    }

    outcome
}

/// Greedy scan of `cards` in their given order, keeping every sensitive round
/// that shares no card with one kept earlier.
pub fn natural_scan(cards: &[Card], filter: CandidateFilter) -> Vec<Round> {
    let mut claimed = HashSet::new();
    let mut rounds = Vec::new();
    for start in 0..cards.len() {
        let Some(round) = simulate(cards, start, SwapProbe::Evaluate) else {
            continue;
        };
        if !round.sensitive || !filter.accepts(round.outcome) {
            continue;
        }
        if round.cards.iter().any(|card| claimed.contains(&card.position)) {
            continue;
        }
        claimed.extend(round.positions());
        rounds.push(anchored(round));
    }
    rounds
}

/// One random pass: permute `pool`, then scan left to right.
pub fn mine_pass<R: Rng + ?Sized>(
    pool: &[Card],
    filter: CandidateFilter,
    rng: &mut R,
) -> Vec<Round> {
    let mut order = pool.to_vec();
    order.shuffle(rng);

    let mut claimed: HashSet<usize> = HashSet::new();
    let mut rounds = Vec::new();
    let mut index = 0usize;
    while index + MIN_ROUND_CARDS <= order.len() {
        let Some(round) = simulate(&order, index, SwapProbe::Evaluate) else {
            index += 1;
            continue;
        };
        let len = round.card_count();
        if round.sensitive && filter.accepts(round.outcome) && is_fresh(&round, &claimed) {
            claimed.extend(round.positions());
            rounds.push(anchored(round));
        }
        index += len;
    }
    rounds
}

/// Tries every ordering of a small pool and returns the first one whose opening
/// round is sensitive.
pub fn exhaustive_first_round(cards: &[Card], filter: CandidateFilter) -> Option<Round> {
    let orderings = Orderings::new(cards.len());
    for ordering in orderings.as_slice() {
        let arranged: Vec<Card> = ordering.iter().map(|&idx| cards[idx]).collect();
        let Some(round) = simulate(&arranged, 0, SwapProbe::Evaluate) else {
            continue;
        };
        if round.sensitive && filter.accepts(round.outcome) {
            return Some(anchored(round));
        }
    }
    None
}

fn is_fresh(round: &Round, claimed: &HashSet<usize>) -> bool {
    let mut seen = HashSet::with_capacity(round.cards.len());
    round
        .cards
        .iter()
        .all(|card| !claimed.contains(&card.position) && seen.insert(card.position))
}

/// Rounds found in a permuted pool are keyed by the position of their first card.
fn anchored(mut round: Round) -> Round {
    if let Some(first) = round.cards.first() {
        round.start = first.position;
    }
    round
}

fn absorb(outcome: &mut Harvest, found: Vec<Round>) {
    if found.is_empty() {
        return;
    }
    let taken: HashSet<usize> = found.iter().flat_map(Round::positions).collect();
    outcome
        .remainder
        .retain(|card| !taken.contains(&card.position));
    outcome.rounds.extend(found);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::deck::{Composition, Deck};
    use crate::model::rank::Rank;
    use crate::model::suit::Suit;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn cards_from_points(points: &[u8]) -> Vec<Card> {
        points
            .iter()
            .enumerate()
            .map(|(idx, point)| {
                let rank = if *point == 0 {
                    Rank::Queen
                } else {
                    Rank::from_value(*point).expect("point in range")
                };
                Card::new(rank, Suit::Hearts, idx)
            })
            .collect()
    }

    fn assert_disjoint(harvest: &Harvest, pool_len: usize) {
        let mut seen = HashSet::new();
        for card in harvest.rounds.iter().flat_map(|r| r.cards.iter()) {
            assert!(seen.insert(card.position), "card claimed twice");
        }
        for card in &harvest.remainder {
            assert!(seen.insert(card.position), "remainder overlaps a round");
        }
        assert_eq!(seen.len(), pool_len);
    }

    #[test]
    fn empty_pool_claims_nothing() {
        let mut rng = StdRng::seed_from_u64(1);
        let harvest = harvest(&[], &HarvestParams::default(), CandidateFilter::AnyOutcome, &mut rng);
        assert!(harvest.rounds.is_empty());
        assert!(harvest.remainder.is_empty());
        assert_eq!(harvest.passes, 0);
    }

    #[test]
    fn full_shoe_harvest_is_disjoint_and_sensitive() {
        let deck = Deck::shuffled_with_seed(Composition::EightDecks, 7);
        let mut rng = StdRng::seed_from_u64(7);
        let harvest = harvest(
            deck.cards(),
            &HarvestParams::default(),
            CandidateFilter::AnyOutcome,
            &mut rng,
        );
        assert!(!harvest.rounds.is_empty());
        assert_disjoint(&harvest, deck.len());
        for round in &harvest.rounds {
            assert!(round.sensitive);
            assert!((4..=6).contains(&round.card_count()));
            assert_eq!(round.start, round.cards[0].position);
        }
    }

    #[test]
    fn exclude_tie_filter_never_keeps_ties() {
        let deck = Deck::shuffled_with_seed(Composition::FourDecksTwoBacks, 11);
        let mut rng = StdRng::seed_from_u64(11);
        let harvest = harvest(
            deck.cards(),
            &HarvestParams::default(),
            CandidateFilter::ExcludeTie,
            &mut rng,
        );
        assert!(harvest.rounds.iter().all(|r| r.outcome != Outcome::Tie));
        assert_disjoint(&harvest, deck.len());
    }

    #[test]
    fn same_seed_same_harvest() {
        let deck = Deck::shuffled_with_seed(Composition::EightDecks, 3);
        let run = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            harvest(
                deck.cards(),
                &HarvestParams::default(),
                CandidateFilter::AnyOutcome,
                &mut rng,
            )
            .rounds
            .iter()
            .map(|r| r.positions().collect::<Vec<_>>())
            .collect::<Vec<_>>()
        };
        assert_eq!(run(5), run(5));
    }

    #[test]
    fn natural_scan_keeps_dealt_order_rounds() {
        // 9,Q,Q,Q is a Player natural that flips to Banker when swapped.
        let cards = cards_from_points(&[9, 0, 0, 0, 9, 0, 0, 0]);
        let rounds = natural_scan(&cards, CandidateFilter::AnyOutcome);
        assert_eq!(rounds.len(), 2);
        assert_eq!(rounds[0].start, 0);
        assert_eq!(rounds[1].start, 4);
    }

    #[test]
    fn exhaustive_fallback_finds_an_order() {
        // Dealt as-is both hands tie at zero; some ordering leads with the nine.
        let cards = cards_from_points(&[0, 0, 0, 9]);
        let round = exhaustive_first_round(&cards, CandidateFilter::AnyOutcome)
            .expect("some ordering is sensitive");
        assert!(round.sensitive);
        assert_eq!(round.card_count(), 4);
    }

    #[test]
    fn small_pool_uses_fallback() {
        let cards = cards_from_points(&[0, 0, 0, 9]);
        let mut rng = StdRng::seed_from_u64(9);
        let params = HarvestParams {
            natural_scan: false,
            ..HarvestParams::default()
        };
        let harvest = harvest(&cards, &params, CandidateFilter::AnyOutcome, &mut rng);
        assert_eq!(harvest.passes, 0);
        assert!(harvest.exhaustive_hit);
        assert_eq!(harvest.rounds.len(), 1);
        assert!(harvest.remainder.is_empty());
    }
}
