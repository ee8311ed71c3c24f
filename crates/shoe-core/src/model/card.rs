use crate::model::rank::Rank;
use crate::model::suit::{BackColor, Suit};
use core::fmt;
use core::hash::{Hash, Hasher};
use serde::{Deserialize, Serialize};

/// A physical card in the shoe.
///
/// Two cards are the same card only when they share a position; equal rank and
/// suit at different positions are distinct entities.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
    pub position: usize,
    #[serde(rename = "back_color", default, skip_serializing_if = "Option::is_none")]
    pub back: Option<BackColor>,
}

impl Card {
    pub const fn new(rank: Rank, suit: Suit, position: usize) -> Self {
        Self {
            rank,
            suit,
            position,
            back: None,
        }
    }

    pub const fn with_back(self, back: BackColor) -> Self {
        Self {
            back: Some(back),
            ..self
        }
    }

    pub const fn at(self, position: usize) -> Self {
        Self { position, ..self }
    }

    pub const fn point(self) -> u8 {
        self.rank.point()
    }

    pub const fn is_zero(self) -> bool {
        self.rank.is_zero()
    }

    pub const fn is_red_zero(self) -> bool {
        self.is_zero() && self.suit.is_red()
    }

    pub fn label(&self) -> String {
        format!("{}{}", self.rank, self.suit)
    }
}

impl PartialEq for Card {
    fn eq(&self, other: &Self) -> bool {
        self.position == other.position
    }
}

impl Eq for Card {}

impl Hash for Card {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.position.hash(state);
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank, self.suit)
    }
}

#[cfg(test)]
mod tests {
    use super::{Card, Rank, Suit};
    use crate::model::suit::BackColor;

    #[test]
    fn identity_is_positional() {
        let a = Card::new(Rank::Queen, Suit::Hearts, 3);
        let b = Card::new(Rank::Queen, Suit::Hearts, 4);
        let c = Card::new(Rank::Two, Suit::Clubs, 3);
        assert_ne!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn red_zero_requires_red_suit_and_zero_point() {
        assert!(Card::new(Rank::King, Suit::Diamonds, 0).is_red_zero());
        assert!(!Card::new(Rank::King, Suit::Spades, 0).is_red_zero());
        assert!(!Card::new(Rank::Nine, Suit::Hearts, 0).is_red_zero());
    }

    #[test]
    fn label_and_back_color() {
        let card = Card::new(Rank::Ten, Suit::Hearts, 7).with_back(BackColor::Red);
        assert_eq!(card.label(), "10♥");
        assert_eq!(card.back, Some(BackColor::Red));
        assert_eq!(card.at(9).position, 9);
        assert_eq!(card.at(9).back, Some(BackColor::Red));
    }
}
