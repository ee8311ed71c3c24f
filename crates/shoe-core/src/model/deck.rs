use crate::model::card::Card;
use crate::model::rank::Rank;
use crate::model::suit::{BackColor, Suit};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

pub const SHOE_SIZE: usize = 416;
const PACK_SIZE: usize = 52;

/// How the 416-card shoe is assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Composition {
    /// Eight plain packs.
    EightDecks,
    /// Four packs with red backs followed by four with blue backs.
    #[default]
    FourDecksTwoBacks,
}

#[derive(Debug, Clone)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    pub fn standard(composition: Composition) -> Self {
        let mut cards = Vec::with_capacity(SHOE_SIZE);
        match composition {
            Composition::EightDecks => {
                for _ in 0..8 {
                    push_pack(&mut cards, None);
                }
            }
            Composition::FourDecksTwoBacks => {
                for _ in 0..4 {
                    push_pack(&mut cards, Some(BackColor::Red));
                    push_pack(&mut cards, Some(BackColor::Blue));
                }
            }
        }
        Self::from_cards(cards)
    }

    pub fn shuffled<R: rand::Rng + ?Sized>(composition: Composition, rng: &mut R) -> Self {
        let mut deck = Self::standard(composition);
        deck.shuffle_in_place(rng);
        deck
    }

    pub fn shuffled_with_seed(composition: Composition, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::shuffled(composition, &mut rng)
    }

    /// Takes ownership of `cards` in their given order and renumbers positions from zero.
    pub fn from_cards(cards: Vec<Card>) -> Self {
        let mut deck = Self { cards };
        deck.reindex();
        deck
    }

    pub fn shuffle_in_place<R: rand::Rng + ?Sized>(&mut self, rng: &mut R) {
        self.cards.shuffle(rng);
        self.reindex();
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    fn reindex(&mut self) {
        for (index, card) in self.cards.iter_mut().enumerate() {
            card.position = index;
        }
    }
}

fn push_pack(cards: &mut Vec<Card>, back: Option<BackColor>) {
    for suit in Suit::ALL {
        for rank in Rank::ORDERED {
            let card = Card::new(rank, suit, cards.len());
            cards.push(match back {
                Some(color) => card.with_back(color),
                None => card,
            });
        }
    }
    debug_assert_eq!(cards.len() % PACK_SIZE, 0);
}

#[cfg(test)]
mod tests {
    use super::{Composition, Deck, SHOE_SIZE};
    use crate::model::suit::BackColor;
    use std::collections::HashSet;

    #[test]
    fn both_compositions_have_416_unique_positions() {
        for composition in [Composition::EightDecks, Composition::FourDecksTwoBacks] {
            let deck = Deck::standard(composition);
            assert_eq!(deck.len(), SHOE_SIZE);
            let positions: HashSet<_> = deck.cards().iter().map(|c| c.position).collect();
            assert_eq!(positions.len(), SHOE_SIZE);
        }
    }

    #[test]
    fn two_back_shoe_splits_colors_evenly() {
        let deck = Deck::standard(Composition::FourDecksTwoBacks);
        let red = deck
            .cards()
            .iter()
            .filter(|c| c.back == Some(BackColor::Red))
            .count();
        assert_eq!(red, SHOE_SIZE / 2);
    }

    #[test]
    fn shuffle_with_seed_is_deterministic_and_reindexed() {
        let deck_a = Deck::shuffled_with_seed(Composition::EightDecks, 42);
        let deck_b = Deck::shuffled_with_seed(Composition::EightDecks, 42);
        let labels_a: Vec<_> = deck_a.cards().iter().map(|c| c.label()).collect();
        let labels_b: Vec<_> = deck_b.cards().iter().map(|c| c.label()).collect();
        assert_eq!(labels_a, labels_b);
        for (index, card) in deck_a.cards().iter().enumerate() {
            assert_eq!(card.position, index);
        }
    }

    #[test]
    fn shuffle_with_different_seeds_differs() {
        let deck_a = Deck::shuffled_with_seed(Composition::EightDecks, 1);
        let deck_b = Deck::shuffled_with_seed(Composition::EightDecks, 2);
        let labels_a: Vec<_> = deck_a.cards().iter().map(|c| c.label()).collect();
        let labels_b: Vec<_> = deck_b.cards().iter().map(|c| c.label()).collect();
        assert_ne!(labels_a, labels_b);
    }
}
