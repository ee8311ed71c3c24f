use crate::model::card::Card;
use crate::model::round::{Outcome, Round};

/// A round never consumes more than six cards.
pub const MAX_ROUND_CARDS: usize = 6;
pub const MIN_ROUND_CARDS: usize = 4;

/// Whether `simulate` also classifies the round's sensitivity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapProbe {
    Evaluate,
    Skip,
}

/// Full breakdown of one dealt round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coup {
    pub player: Vec<Card>,
    pub banker: Vec<Card>,
    pub player_total: u8,
    pub banker_total: u8,
    pub natural: bool,
    pub outcome: Outcome,
    pub consumed: usize,
}

/// Plays one round from the front of `cards` (P, B, P, B, then draws).
///
/// Returns `None` when fewer than four cards are available or a required draw
/// runs past the end of the slice.
pub fn deal(cards: &[Card]) -> Option<Coup> {
    if cards.len() < MIN_ROUND_CARDS {
        return None;
    }

    let mut player = vec![cards[0], cards[2]];
    let mut banker = vec![cards[1], cards[3]];
    let mut player_total = (cards[0].point() + cards[2].point()) % 10;
    let mut banker_total = (cards[1].point() + cards[3].point()) % 10;
    let natural = player_total >= 8 || banker_total >= 8;
    let mut next = MIN_ROUND_CARDS;

    if !natural {
        let mut player_third = None;
        if player_total <= 5 {
            let card = *cards.get(next)?;
            next += 1;
            player.push(card);
            player_total = (player_total + card.point()) % 10;
            player_third = Some(card.point());
        }

        let banker_draws = match player_third {
            None => banker_total <= 5,
            Some(third) => banker_draws_against(banker_total, third),
        };
        if banker_draws {
            let card = *cards.get(next)?;
            next += 1;
            banker.push(card);
            banker_total = (banker_total + card.point()) % 10;
        }
    }

    let outcome = if player_total == banker_total {
        Outcome::Tie
    } else if player_total > banker_total {
        Outcome::Player
    } else {
        Outcome::Banker
    };

    Some(Coup {
        player,
        banker,
        player_total,
        banker_total,
        natural,
        outcome,
        consumed: next,
    })
}

/// Banker's tableau once the player has drawn a third card worth `third`.
pub const fn banker_draws_against(banker_total: u8, third: u8) -> bool {
    match banker_total {
        0..=2 => true,
        3 => third != 8,
        4 => third >= 2 && third <= 7,
        5 => third >= 4 && third <= 7,
        6 => third == 6 || third == 7,
        _ => false,
    }
}

/// Plays the round starting at `start` in `deck`.
pub fn simulate(deck: &[Card], start: usize, probe: SwapProbe) -> Option<Round> {
    let window = deck.get(start..)?;
    let coup = deal(window)?;
    let cards = window[..coup.consumed].to_vec();
    let sensitive = match probe {
        SwapProbe::Skip => false,
        SwapProbe::Evaluate => {
            let end = window.len().min(MAX_ROUND_CARDS);
            let mut alternate = window[..end].to_vec();
            alternate.swap(0, 1);
            let swapped = deal(&alternate).map(|alt| (alt.outcome, alt.consumed));
            classify(coup.outcome, coup.consumed, swapped)
        }
    };
    Some(Round::new(start, cards, coup.outcome, sensitive))
}

/// Sensitivity rule for a round and the replay with its first two cards exchanged.
///
/// A Tie that would become a Banker win is never sensitive, while a Banker win
/// that would become a Tie is already rejected by the non-Tie clause.
pub fn classify(original: Outcome, consumed: usize, swapped: Option<(Outcome, usize)>) -> bool {
    let Some((alternate, alternate_consumed)) = swapped else {
        return false;
    };
    alternate != original
        && alternate != Outcome::Tie
        && alternate_consumed == consumed
        && !(original == Outcome::Tie && alternate == Outcome::Banker)
}

/// Re-simulates a concrete card order without the sensitivity probe.
pub fn replay(cards: &[Card]) -> Option<Coup> {
    deal(cards)
}

/// Outcome the round would have with its first two cards exchanged.
pub fn swapped_outcome(round: &Round) -> Option<Coup> {
    if round.cards.len() < 2 {
        return None;
    }
    let mut alternate = round.cards.clone();
    alternate.swap(0, 1);
    deal(&alternate)
}
