use crate::engine::arrange::Arrangement;
use crate::engine::simulator::replay;
use crate::model::card::Card;
use crate::model::rank::Rank;
use crate::model::round::{Outcome, Round, Segment};
use crate::model::suit::{BackColor, Suit};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CardRecord {
    pub rank: Rank,
    pub suit: Suit,
    pub position: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub back_color: Option<BackColor>,
}

impl From<&Card> for CardRecord {
    fn from(card: &Card) -> Self {
        Self {
            rank: card.rank,
            suit: card.suit,
            position: card.position,
            back_color: card.back,
        }
    }
}

impl From<CardRecord> for Card {
    fn from(record: CardRecord) -> Self {
        let card = Card::new(record.rank, record.suit, record.position);
        match record.back_color {
            Some(color) => card.with_back(color),
            None => card,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoundRecord {
    pub start_index: usize,
    pub cards: Vec<CardRecord>,
    pub result: Outcome,
    pub sensitive: bool,
    pub segment: Segment,
    #[serde(rename = "is_T", default)]
    pub is_t: bool,
    #[serde(default)]
    pub swapped: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_total: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banker_total: Option<u8>,
}

impl RoundRecord {
    pub fn capture(round: &Round) -> Self {
        let coup = if round.is_residual() {
            None
        } else {
            replay(&round.cards)
        };
        Self {
            start_index: round.start,
            cards: round.cards.iter().map(CardRecord::from).collect(),
            result: round.outcome,
            sensitive: round.sensitive,
            segment: round.segment,
            is_t: round.is_t,
            swapped: round.swapped,
            player_total: coup.as_ref().map(|c| c.player_total),
            banker_total: coup.as_ref().map(|c| c.banker_total),
        }
    }

    pub fn restore(self) -> Round {
        Round {
            start: self.start_index,
            cards: self.cards.into_iter().map(Card::from).collect(),
            outcome: self.result,
            sensitive: self.sensitive,
            segment: self.segment,
            is_t: self.is_t,
            swapped: self.swapped,
        }
    }
}

/// Record handed to collaborators: played rounds plus the residual cards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShoeSnapshot {
    pub rounds: Vec<RoundRecord>,
    #[serde(default)]
    pub residual: Vec<CardRecord>,
}

impl ShoeSnapshot {
    pub fn capture(arrangement: &Arrangement) -> Self {
        Self {
            rounds: arrangement.a_rounds.iter().map(RoundRecord::capture).collect(),
            residual: arrangement.residual_cards.iter().map(CardRecord::from).collect(),
        }
    }

    /// Played rounds in order, then one residual round when cards are left over.
    pub fn restore(self) -> Vec<Round> {
        let mut rounds: Vec<Round> = self.rounds.into_iter().map(RoundRecord::restore).collect();
        if !self.residual.is_empty() {
            rounds.push(Round::residual(
                self.residual.into_iter().map(Card::from).collect(),
            ));
        }
        rounds
    }

    pub fn to_json(arrangement: &Arrangement) -> serde_json::Result<String> {
        let snapshot = Self::capture(arrangement);
        serde_json::to_string_pretty(&snapshot)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
