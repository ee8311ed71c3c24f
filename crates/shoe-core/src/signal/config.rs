use crate::model::card::Card;
use crate::model::rank::Rank;
use crate::model::round::Round;
use crate::model::suit::Suit;
use serde_json::{Value, json};
use std::collections::BTreeSet;

/// Decides which cards count as signal cards.
pub trait SignalPredicate {
    fn is_signal(&self, card: &Card) -> bool;

    fn has_signal(&self, round: &Round) -> bool {
        round.cards.iter().any(|card| self.is_signal(card))
    }

    fn count_signals(&self, cards: &[Card]) -> usize {
        cards.iter().filter(|card| self.is_signal(card)).count()
    }
}

/// User-selected suits and ranks. A card qualifies only when both its suit and
/// its rank are selected, so the empty default marks nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignalConfig {
    pub suits: BTreeSet<Suit>,
    pub ranks: BTreeSet<Rank>,
}

impl SignalConfig {
    pub fn new(
        suits: impl IntoIterator<Item = Suit>,
        ranks: impl IntoIterator<Item = Rank>,
    ) -> Self {
        Self {
            suits: suits.into_iter().collect(),
            ranks: ranks.into_iter().collect(),
        }
    }

    /// Hearts and diamonds with every zero-point rank.
    pub fn red_zero() -> Self {
        Self::new(
            Suit::ALL.into_iter().filter(|suit| suit.is_red()),
            Rank::ORDERED.into_iter().filter(|rank| rank.is_zero()),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.suits.is_empty() || self.ranks.is_empty()
    }

    /// Loads a persisted blob. Unknown labels are dropped; anything that is not a
    /// JSON object yields the empty default.
    pub fn from_blob(blob: &str) -> Self {
        let parsed: Value = match serde_json::from_str(blob) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(
                    target: "shoe_core::signal_config",
                    reason = "malformed_blob",
                    error = %err,
                    message = "signal config blob is not valid JSON; using empty default"
                );
                return Self::default();
            }
        };
        let Some(object) = parsed.as_object() else {
            tracing::warn!(
                target: "shoe_core::signal_config",
                reason = "not_an_object",
                message = "signal config blob is not an object; using empty default"
            );
            return Self::default();
        };

        let suits = labels(object.get("suits"))
            .filter_map(Suit::from_label)
            .collect();
        let ranks = labels(object.get("ranks"))
            .filter_map(Rank::from_label)
            .collect();
        Self { suits, ranks }
    }

    /// Blob in the persisted shape: suit symbols and rank labels.
    pub fn to_blob(&self) -> String {
        let suits: Vec<String> = self.suits.iter().map(|s| s.symbol().to_string()).collect();
        let ranks: Vec<&str> = self.ranks.iter().map(|r| r.label()).collect();
        json!({ "suits": suits, "ranks": ranks }).to_string()
    }
}

fn labels(value: Option<&Value>) -> impl Iterator<Item = &str> {
    value
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
}

impl SignalPredicate for SignalConfig {
    fn is_signal(&self, card: &Card) -> bool {
        self.suits.contains(&card.suit) && self.ranks.contains(&card.rank)
    }
}

/// The active signal rule.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SignalRule {
    Configured(SignalConfig),
    /// Zero-point card in a red suit.
    #[default]
    RedZero,
}

impl SignalPredicate for SignalRule {
    fn is_signal(&self, card: &Card) -> bool {
        match self {
            SignalRule::Configured(config) => config.is_signal(card),
            SignalRule::RedZero => card.is_red_zero(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_marks_nothing() {
        let config = SignalConfig::default();
        assert!(config.is_empty());
        assert!(!config.is_signal(&Card::new(Rank::King, Suit::Hearts, 0)));
    }

    #[test]
    fn both_suit_and_rank_must_match() {
        let config = SignalConfig::new([Suit::Spades], [Rank::Ace]);
        assert!(config.is_signal(&Card::new(Rank::Ace, Suit::Spades, 0)));
        assert!(!config.is_signal(&Card::new(Rank::Ace, Suit::Clubs, 1)));
        assert!(!config.is_signal(&Card::new(Rank::Two, Suit::Spades, 2)));
    }

    #[test]
    fn red_zero_preset_matches_red_zero_rule() {
        let configured = SignalRule::Configured(SignalConfig::red_zero());
        for suit in Suit::ALL {
            for rank in Rank::ORDERED {
                let card = Card::new(rank, suit, 0);
                assert_eq!(
                    configured.is_signal(&card),
                    SignalRule::RedZero.is_signal(&card),
                    "{card}"
                );
            }
        }
    }

    #[test]
    fn blob_sanitises_unknown_labels() {
        let config = SignalConfig::from_blob(r#"{"suits":["♥","X","D"],"ranks":["10","Z","K",3]}"#);
        assert_eq!(config.suits, BTreeSet::from([Suit::Hearts, Suit::Diamonds]));
        assert_eq!(config.ranks, BTreeSet::from([Rank::Ten, Rank::King]));
    }

    #[test]
    fn malformed_blob_falls_back_to_default() {
        assert_eq!(SignalConfig::from_blob("not json"), SignalConfig::default());
        assert_eq!(SignalConfig::from_blob("[1,2]"), SignalConfig::default());
        assert_eq!(
            SignalConfig::from_blob(r#"{"suits":"♥"}"#),
            SignalConfig::default()
        );
    }

    #[test]
    fn blob_round_trips() {
        let config = SignalConfig::red_zero();
        assert_eq!(SignalConfig::from_blob(&config.to_blob()), config);
    }

    #[test]
    fn round_signal_helpers() {
        let cards = vec![
            Card::new(Rank::Queen, Suit::Diamonds, 0),
            Card::new(Rank::Five, Suit::Hearts, 1),
            Card::new(Rank::Ten, Suit::Hearts, 2),
            Card::new(Rank::King, Suit::Spades, 3),
        ];
        let round = Round::new(0, cards.clone(), crate::model::round::Outcome::Player, true);
        assert!(SignalRule::RedZero.has_signal(&round));
        assert_eq!(SignalRule::RedZero.count_signals(&cards), 2);
    }
}
