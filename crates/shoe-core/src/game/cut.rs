use crate::engine::simulator::{MIN_ROUND_CARDS, SwapProbe, simulate};
use crate::model::card::Card;
use crate::model::deck::Deck;
use crate::model::round::Round;
use serde::Serialize;

/// Cuts the flattened shoe at `cut mod n` and renumbers positions from zero.
pub fn rotate(cards: &[Card], cut: usize) -> Deck {
    if cards.is_empty() {
        return Deck::from_cards(Vec::new());
    }
    let cut = cut % cards.len();
    let mut rotated = Vec::with_capacity(cards.len());
    rotated.extend_from_slice(&cards[cut..]);
    rotated.extend_from_slice(&cards[..cut]);
    Deck::from_cards(rotated)
}

/// Rounds dealt straight through `deck` from the top, plus the undealt tail.
#[derive(Debug, Clone)]
pub struct Rebuilt {
    pub rounds: Vec<Round>,
    pub tail: Vec<Card>,
}

/// Deals rounds back to back from position 0 until fewer than four cards are
/// left or a round fails to form.
pub fn rebuild(deck: &Deck) -> Rebuilt {
    let cards = deck.cards();
    let mut rounds = Vec::new();
    let mut cursor = 0usize;
    while cursor + MIN_ROUND_CARDS <= cards.len() {
        let Some(round) = simulate(cards, cursor, SwapProbe::Evaluate) else {
            break;
        };
        cursor += round.card_count();
        rounds.push(round);
    }
    Rebuilt {
        rounds,
        tail: cards[cursor..].to_vec(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CutSummary {
    pub cut_position: usize,
    pub deck_size: usize,
    pub remaining: usize,
}

/// Cut then redeal.
pub fn cut_and_rebuild(cards: &[Card], cut: usize) -> (CutSummary, Rebuilt) {
    let deck = rotate(cards, cut);
    let deck_size = deck.len();
    let cut_position = if deck_size == 0 { 0 } else { cut % deck_size };
    let summary = CutSummary {
        cut_position,
        deck_size,
        remaining: deck_size - cut_position,
    };
    (summary, rebuild(&deck))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CutPoint {
    pub cut: usize,
    /// Rounds fully dealt before the cut card.
    pub rounds: usize,
    /// Sensitive rounds among them.
    pub hits: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CutSweep {
    pub points: Vec<CutPoint>,
}

impl CutSweep {
    pub fn avg_rounds(&self) -> f64 {
        average(self.points.iter().map(|p| p.rounds))
    }

    pub fn avg_hits(&self) -> f64 {
        average(self.points.iter().map(|p| p.hits))
    }

    /// `(avg_rounds, avg_hits)`.
    pub fn averages(&self) -> (f64, f64) {
        (self.avg_rounds(), self.avg_hits())
    }
}

fn average(values: impl Iterator<Item = usize>) -> f64 {
    let (sum, count) = values.fold((0usize, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum as f64 / count as f64
    }
}

/// For every cut card position 1..=n over the played rounds, counts the rounds
/// completed before it.
pub fn sweep(rounds: &[Round]) -> CutSweep {
    let total: usize = rounds.iter().map(Round::card_count).sum();

    let mut ends = Vec::with_capacity(rounds.len());
    let mut offset = 0usize;
    for round in rounds {
        offset += round.card_count();
        if !round.is_residual() {
            ends.push((offset, round.sensitive));
        }
    }

    let mut points = Vec::with_capacity(total);
    let mut done = 0usize;
    let mut hits = 0usize;
    for cut in 1..=total {
        while done < ends.len() && ends[done].0 <= cut {
            if ends[done].1 {
                hits += 1;
            }
            done += 1;
        }
        points.push(CutPoint {
            cut,
            rounds: done,
            hits,
        });
    }
    CutSweep { points }
}
