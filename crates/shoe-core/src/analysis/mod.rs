use crate::model::card::Card;
use crate::model::round::{Outcome, Round, Segment, is_two_pair};
use crate::signal::config::SignalPredicate;
use crate::signal::forcing::compute_s_indices;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Outcome and signal counters over a finished round list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ShoeStats {
    pub total_rounds: usize,
    pub banker: usize,
    pub player: usize,
    pub tie: usize,
    pub two_pair: usize,
    pub sensitive: usize,
    pub swapped: usize,
    pub s_rounds: usize,
    pub t_rounds: usize,
    pub signal_in_s: usize,
    pub signal_outside_s: usize,
    pub signal_in_t: usize,
    pub residual_cards: usize,
}

pub fn shoe_stats<P: SignalPredicate + ?Sized>(
    rounds: &[Round],
    predicate: &P,
    wrap: bool,
) -> ShoeStats {
    let s_indices: BTreeSet<usize> = compute_s_indices(rounds, Segment::A, wrap)
        .into_iter()
        .collect();
    let mut stats = ShoeStats {
        s_rounds: s_indices.len(),
        ..ShoeStats::default()
    };

    for (idx, round) in rounds.iter().enumerate() {
        let signals = predicate.count_signals(&round.cards);
        if s_indices.contains(&idx) {
            stats.signal_in_s += signals;
        } else {
            stats.signal_outside_s += signals;
        }
        if round.is_residual() {
            stats.residual_cards += round.card_count();
            continue;
        }

        stats.total_rounds += 1;
        match round.outcome {
            Outcome::Banker => stats.banker += 1,
            Outcome::Player => stats.player += 1,
            Outcome::Tie => stats.tie += 1,
            Outcome::Residual => {}
        }
        if is_two_pair(round) {
            stats.two_pair += 1;
        }
        if round.sensitive {
            stats.sensitive += 1;
        }
        if round.swapped {
            stats.swapped += 1;
        }
        if round.is_t {
            stats.t_rounds += 1;
            stats.signal_in_t += signals;
        }
    }
    stats
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundSignals {
    pub round_index: usize,
    pub zero_count: usize,
    pub signal_count: usize,
}

/// Per-round breakdown of S-rounds and T-rounds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SignalAnalysis {
    pub s_rounds: Vec<RoundSignals>,
    pub t_rounds: Vec<RoundSignals>,
    pub total_zero_in_s: usize,
    pub total_signal_in_s: usize,
    pub total_signal_in_t: usize,
    pub banker_count: usize,
}

pub fn signal_analysis<P: SignalPredicate + ?Sized>(
    rounds: &[Round],
    predicate: &P,
    wrap: bool,
) -> SignalAnalysis {
    let describe = |idx: usize| {
        let round = &rounds[idx];
        RoundSignals {
            round_index: idx,
            zero_count: round.cards.iter().filter(|card| card.is_zero()).count(),
            signal_count: predicate.count_signals(&round.cards),
        }
    };

    let s_rounds: Vec<RoundSignals> = compute_s_indices(rounds, Segment::A, wrap)
        .into_iter()
        .map(describe)
        .collect();
    let t_rounds: Vec<RoundSignals> = rounds
        .iter()
        .enumerate()
        .filter(|(_, round)| round.is_t)
        .map(|(idx, _)| describe(idx))
        .collect();

    SignalAnalysis {
        total_zero_in_s: s_rounds.iter().map(|r| r.zero_count).sum(),
        total_signal_in_s: s_rounds.iter().map(|r| r.signal_count).sum(),
        total_signal_in_t: t_rounds.iter().map(|r| r.signal_count).sum(),
        banker_count: rounds.iter().filter(|r| r.outcome.is_banker()).count(),
        s_rounds,
        t_rounds,
    }
}

/// Card inventory of a round list, each physical card counted once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeckSummary {
    /// Keyed `"{suit letter}_{rank label}"`, e.g. `"H_10"`.
    pub by_rank_suit: BTreeMap<String, usize>,
    pub suit_totals: BTreeMap<char, usize>,
    pub back_totals: BTreeMap<char, usize>,
    pub total_cards: usize,
}

pub fn deck_summary(rounds: &[Round]) -> DeckSummary {
    let cards = rounds.iter().flat_map(|round| round.cards.iter());
    summarise_cards(cards)
}

pub fn summarise_cards<'a>(cards: impl IntoIterator<Item = &'a Card>) -> DeckSummary {
    let mut summary = DeckSummary::default();
    let mut seen = HashSet::new();
    for card in cards {
        if !seen.insert(card.position) {
            continue;
        }
        let key = format!("{}_{}", card.suit.letter(), card.rank.label());
        *summary.by_rank_suit.entry(key).or_insert(0) += 1;
        *summary.suit_totals.entry(card.suit.letter()).or_insert(0) += 1;
        if let Some(back) = card.back {
            *summary.back_totals.entry(back.code()).or_insert(0) += 1;
        }
        summary.total_cards += 1;
    }
    summary
}
