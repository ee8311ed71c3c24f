use core::fmt;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Suit {
    #[serde(rename = "S", alias = "♠", alias = "s")]
    Spades = 0,
    #[serde(rename = "H", alias = "♥", alias = "h")]
    Hearts = 1,
    #[serde(rename = "D", alias = "♦", alias = "d")]
    Diamonds = 2,
    #[serde(rename = "C", alias = "♣", alias = "c")]
    Clubs = 3,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Spades, Suit::Hearts, Suit::Diamonds, Suit::Clubs];

    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Suit::Spades),
            1 => Some(Suit::Hearts),
            2 => Some(Suit::Diamonds),
            3 => Some(Suit::Clubs),
            _ => None,
        }
    }

    /// Accepts either the single-letter code or the card symbol.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "♠" => Some(Suit::Spades),
            "♥" => Some(Suit::Hearts),
            "♦" => Some(Suit::Diamonds),
            "♣" => Some(Suit::Clubs),
            other => match other.to_ascii_uppercase().as_str() {
                "S" => Some(Suit::Spades),
                "H" => Some(Suit::Hearts),
                "D" => Some(Suit::Diamonds),
                "C" => Some(Suit::Clubs),
                _ => None,
            },
        }
    }

    pub const fn is_red(self) -> bool {
        matches!(self, Suit::Hearts | Suit::Diamonds)
    }

    pub const fn letter(self) -> char {
        match self {
            Suit::Spades => 'S',
            Suit::Hearts => 'H',
            Suit::Diamonds => 'D',
            Suit::Clubs => 'C',
        }
    }

    pub const fn symbol(self) -> char {
        match self {
            Suit::Spades => '♠',
            Suit::Hearts => '♥',
            Suit::Diamonds => '♦',
            Suit::Clubs => '♣',
        }
    }
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Back colour printed on the card, independent of the face suit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BackColor {
    #[serde(rename = "R")]
    Red,
    #[serde(rename = "B")]
    Blue,
}

impl BackColor {
    pub const ALL: [BackColor; 2] = [BackColor::Red, BackColor::Blue];

    pub const fn code(self) -> char {
        match self {
            BackColor::Red => 'R',
            BackColor::Blue => 'B',
        }
    }
}
