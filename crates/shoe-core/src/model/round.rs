use crate::model::card::Card;
use crate::model::rank::Rank;
use crate::model::suit::Suit;
use core::fmt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Player,
    Banker,
    Tie,
    /// Dead cards that never formed a played round.
    Residual,
}

impl Outcome {
    pub const fn is_tie(self) -> bool {
        matches!(self, Outcome::Tie)
    }

    pub const fn is_banker(self) -> bool {
        matches!(self, Outcome::Banker)
    }

    pub const fn short(self) -> &'static str {
        match self {
            Outcome::Player => "P",
            Outcome::Banker => "B",
            Outcome::Tie => "T",
            Outcome::Residual => "-",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Outcome::Player => "Player",
            Outcome::Banker => "Banker",
            Outcome::Tie => "Tie",
            Outcome::Residual => "Residual",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Segment {
    /// Mined sensitive rounds.
    #[default]
    A,
    /// Residual dead cards.
    C,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    #[serde(rename = "start_index")]
    pub start: usize,
    pub cards: Vec<Card>,
    #[serde(rename = "result")]
    pub outcome: Outcome,
    pub sensitive: bool,
    pub segment: Segment,
    #[serde(rename = "is_T", default)]
    pub is_t: bool,
    #[serde(default)]
    pub swapped: bool,
}

impl Round {
    pub fn new(start: usize, cards: Vec<Card>, outcome: Outcome, sensitive: bool) -> Self {
        Self {
            start,
            cards,
            outcome,
            sensitive,
            segment: Segment::A,
            is_t: false,
            swapped: false,
        }
    }

    /// Builds the segment C block; cards are kept in position order.
    pub fn residual(mut cards: Vec<Card>) -> Self {
        cards.sort_by_key(|card| card.position);
        let start = cards.first().map(|card| card.position).unwrap_or(0);
        Self {
            start,
            cards,
            outcome: Outcome::Residual,
            sensitive: false,
            segment: Segment::C,
            is_t: false,
            swapped: false,
        }
    }

    pub fn is_residual(&self) -> bool {
        self.segment == Segment::C || self.outcome == Outcome::Residual
    }

    pub fn card_count(&self) -> usize {
        self.cards.len()
    }

    pub fn positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.cards.iter().map(|card| card.position)
    }

    pub fn label(&self) -> String {
        self.cards
            .iter()
            .map(Card::label)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

pub fn suit_counts(round: &Round) -> BTreeMap<Suit, usize> {
    let mut counts = BTreeMap::new();
    for card in &round.cards {
        *counts.entry(card.suit).or_insert(0) += 1;
    }
    counts
}

pub fn rank_counts(round: &Round) -> BTreeMap<Rank, usize> {
    let mut counts = BTreeMap::new();
    for card in &round.cards {
        *counts.entry(card.rank).or_insert(0) += 1;
    }
    counts
}

/// Exactly two ranks appear exactly twice. Triples never count as a pair.
pub fn is_two_pair(round: &Round) -> bool {
    if round.is_residual() || round.cards.len() < 4 {
        return false;
    }
    rank_counts(round)
        .values()
        .filter(|&&count| count == 2)
        .count()
        == 2
}
