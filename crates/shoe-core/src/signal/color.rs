use crate::engine::simulator::MIN_ROUND_CARDS;
use crate::model::card::Card;
use crate::model::round::{Round, is_two_pair};
use crate::model::suit::BackColor;
use crate::signal::config::SignalPredicate;
use core::fmt;
use serde::Serialize;

/// Back-colour sequence wanted on the first four cards of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ColorPattern {
    #[serde(rename = "BBBR")]
    Bbbr,
    #[serde(rename = "RRRB")]
    Rrrb,
}

impl ColorPattern {
    pub const ALL: [ColorPattern; 2] = [ColorPattern::Bbbr, ColorPattern::Rrrb];

    pub const fn colors(self) -> [BackColor; 4] {
        match self {
            ColorPattern::Bbbr => [
                BackColor::Blue,
                BackColor::Blue,
                BackColor::Blue,
                BackColor::Red,
            ],
            ColorPattern::Rrrb => [
                BackColor::Red,
                BackColor::Red,
                BackColor::Red,
                BackColor::Blue,
            ],
        }
    }

    /// Head cards whose back already matches.
    pub fn score(self, cards: &[Card]) -> usize {
        cards
            .iter()
            .zip(self.colors())
            .filter(|(card, wanted)| card.back == Some(*wanted))
            .count()
    }

    pub fn matches(self, cards: &[Card]) -> bool {
        let head = cards.len().min(MIN_ROUND_CARDS);
        head > 0 && self.score(cards) == head
    }

    /// Higher score first; BBBR wins a tie.
    fn preference(cards: &[Card]) -> [ColorPattern; 2] {
        if ColorPattern::Rrrb.score(cards) > ColorPattern::Bbbr.score(cards) {
            [ColorPattern::Rrrb, ColorPattern::Bbbr]
        } else {
            ColorPattern::ALL
        }
    }
}

impl fmt::Display for ColorPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let codes: String = self.colors().iter().map(|color| color.code()).collect();
        f.write_str(&codes)
    }
}

/// The pattern a round's head already shows, if any.
pub fn pattern_of(cards: &[Card]) -> Option<ColorPattern> {
    ColorPattern::ALL
        .into_iter()
        .find(|pattern| pattern.matches(cards))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColorReport {
    /// Set when some card has no back colour; nothing was touched.
    pub skipped: bool,
    /// Played rounds showing a pattern after the pass.
    pub patterned: usize,
    pub already: usize,
    pub swaps: usize,
    pub failed: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lock {
    Open,
    /// Head is patterned; only cards past the fourth may leave.
    Head,
    /// T-round; never a donor.
    Full,
}

type Slot = (usize, usize);

/// Gives every played round a BBBR or RRRB back-colour head by exchanging cards
/// of equal point between rounds.
///
/// T-rounds go first and accept exact-rank donors only; other rounds also accept
/// any zero-point card for a zero-point card. An exchange is refused when it
/// would change either round's signal or two-pair status, so outcomes, card
/// counts and both signal relations survive the pass.
pub fn apply_color_pattern<P: SignalPredicate + ?Sized>(
    rounds: &mut [Round],
    predicate: &P,
) -> ColorReport {
    let mut report = ColorReport::default();
    if rounds
        .iter()
        .flat_map(|round| &round.cards)
        .any(|card| card.back.is_none())
    {
        tracing::info!(
            target: "shoe_core::color",
            reason = "no_back_colors",
            message = "shoe has cards without a back colour; pattern pass skipped"
        );
        report.skipped = true;
        return report;
    }

    let played: Vec<usize> = (0..rounds.len())
        .filter(|&idx| !rounds[idx].is_residual())
        .collect();
    let order: Vec<usize> = played
        .iter()
        .copied()
        .filter(|&idx| rounds[idx].is_t)
        .chain(played.iter().copied().filter(|&idx| !rounds[idx].is_t))
        .collect();
    let mut locks = vec![Lock::Open; rounds.len()];

    for target in order {
        let is_t = rounds[target].is_t;
        if pattern_of(&rounds[target].cards).is_some() {
            report.already += 1;
        } else if let Some(swaps) = solve(rounds, target, is_t, &locks, predicate) {
            report.swaps += swaps;
        } else {
            tracing::warn!(
                target: "shoe_core::color",
                round = target,
                is_t,
                reason = "color_pattern_unsatisfied",
                message = "no donor cards complete a back-colour pattern"
            );
            report.failed.push(target);
            if is_t {
                locks[target] = Lock::Full;
            }
            continue;
        }
        locks[target] = if is_t { Lock::Full } else { Lock::Head };
    }

    report.patterned = played
        .iter()
        .filter(|&&idx| pattern_of(&rounds[idx].cards).is_some())
        .count();
    report
}

/// Tries both patterns on `target`; a failed attempt is rolled back.
fn solve<P: SignalPredicate + ?Sized>(
    rounds: &mut [Round],
    target: usize,
    strict: bool,
    locks: &[Lock],
    predicate: &P,
) -> Option<usize> {
    let head = rounds[target].cards.len().min(MIN_ROUND_CARDS);
    for pattern in ColorPattern::preference(&rounds[target].cards[..head]) {
        let mut log: Vec<(Slot, Slot)> = Vec::new();
        if fill(rounds, target, pattern, strict, locks, predicate, &mut log) {
            return Some(log.len());
        }
        for (a, b) in log.into_iter().rev() {
            exchange(rounds, a, b);
        }
    }
    None
}

fn fill<P: SignalPredicate + ?Sized>(
    rounds: &mut [Round],
    target: usize,
    pattern: ColorPattern,
    strict: bool,
    locks: &[Lock],
    predicate: &P,
    log: &mut Vec<(Slot, Slot)>,
) -> bool {
    let head = rounds[target].cards.len().min(MIN_ROUND_CARDS);
    for (index, wanted) in pattern.colors().into_iter().enumerate().take(head) {
        if rounds[target].cards[index].back == Some(wanted) {
            continue;
        }
        let slot = (target, index);
        let Some(donor) = find_donor(rounds, slot, wanted, strict, locks, predicate) else {
            return false;
        };
        exchange(rounds, slot, donor);
        log.push((slot, donor));
    }
    true
}

fn find_donor<P: SignalPredicate + ?Sized>(
    rounds: &mut [Round],
    slot: Slot,
    wanted: BackColor,
    strict: bool,
    locks: &[Lock],
    predicate: &P,
) -> Option<Slot> {
    let card = rounds[slot.0].cards[slot.1];
    for donor in donor_slots(rounds, slot.0, locks) {
        let candidate = rounds[donor.0].cards[donor.1];
        if candidate.back != Some(wanted) || !interchangeable(card, candidate, strict) {
            continue;
        }
        if donor.0 == slot.0 {
            return Some(donor);
        }
        let before = (
            traits(&rounds[slot.0], predicate),
            traits(&rounds[donor.0], predicate),
        );
        exchange(rounds, slot, donor);
        let after = (
            traits(&rounds[slot.0], predicate),
            traits(&rounds[donor.0], predicate),
        );
        exchange(rounds, slot, donor);
        if before == after {
            return Some(donor);
        }
    }
    None
}

/// Candidate donor positions in search order: the target's own tail, then the
/// following rounds, then the earlier ones (cyclic).
fn donor_slots(rounds: &[Round], target: usize, locks: &[Lock]) -> Vec<Slot> {
    let len = rounds.len();
    let mut slots: Vec<Slot> = (MIN_ROUND_CARDS..rounds[target].cards.len())
        .map(|index| (target, index))
        .collect();
    for step in 1..len {
        let other = (target + step) % len;
        let from = match locks[other] {
            Lock::Full => continue,
            _ if rounds[other].is_residual() => 0,
            Lock::Head => MIN_ROUND_CARDS,
            Lock::Open if other > target => 0,
            Lock::Open => MIN_ROUND_CARDS,
        };
        slots.extend((from..rounds[other].cards.len()).map(|index| (other, index)));
    }
    slots
}

fn interchangeable(a: Card, b: Card, strict: bool) -> bool {
    a.rank == b.rank || (!strict && a.is_zero() && b.is_zero())
}

fn traits<P: SignalPredicate + ?Sized>(round: &Round, predicate: &P) -> (bool, bool) {
    (predicate.has_signal(round), is_two_pair(round))
}

fn exchange(rounds: &mut [Round], a: Slot, b: Slot) {
    if a.0 == b.0 {
        rounds[a.0].cards.swap(a.1, b.1);
        return;
    }
    let card = rounds[a.0].cards[a.1];
    rounds[a.0].cards[a.1] = rounds[b.0].cards[b.1];
    rounds[b.0].cards[b.1] = card;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::simulator::replay;
    use crate::model::rank::Rank;
    use crate::model::round::Outcome;
    use crate::model::suit::Suit;
    use crate::signal::config::{SignalConfig, SignalRule};

    const B: BackColor = BackColor::Blue;
    const R: BackColor = BackColor::Red;

    fn round_from(start: usize, layout: &[(Rank, Suit, BackColor)]) -> Round {
        let cards: Vec<Card> = layout
            .iter()
            .enumerate()
            .map(|(offset, (rank, suit, back))| {
                Card::new(*rank, *suit, start + offset).with_back(*back)
            })
            .collect();
        let coup = replay(&cards).expect("round forms");
        Round::new(start, cards, coup.outcome, true)
    }

    fn no_signals() -> SignalRule {
        SignalRule::Configured(SignalConfig::default())
    }

    fn positions(rounds: &[Round]) -> Vec<usize> {
        let mut all: Vec<usize> = rounds.iter().flat_map(Round::positions).collect();
        all.sort_unstable();
        all
    }

    fn pair_of_rounds() -> Vec<Round> {
        // 9 2 K 3: Player natural. Backs B B R R want a blue zero at index 2.
        let first = round_from(
            0,
            &[
                (Rank::Nine, Suit::Clubs, B),
                (Rank::Two, Suit::Clubs, B),
                (Rank::King, Suit::Hearts, R),
                (Rank::Three, Suit::Clubs, R),
            ],
        );
        // 8 Q K 2: Player natural, all blue.
        let second = round_from(
            4,
            &[
                (Rank::Eight, Suit::Spades, B),
                (Rank::Queen, Suit::Spades, B),
                (Rank::King, Suit::Clubs, B),
                (Rank::Two, Suit::Spades, B),
            ],
        );
        vec![first, second]
    }

    #[test]
    fn patterns_read_first_four_backs() {
        let round = round_from(
            0,
            &[
                (Rank::Nine, Suit::Clubs, B),
                (Rank::Two, Suit::Clubs, B),
                (Rank::King, Suit::Hearts, B),
                (Rank::Three, Suit::Clubs, R),
            ],
        );
        assert_eq!(pattern_of(&round.cards), Some(ColorPattern::Bbbr));
        assert_eq!(ColorPattern::Rrrb.score(&round.cards), 0);
        assert_eq!(ColorPattern::Bbbr.to_string(), "BBBR");
    }

    #[test]
    fn zero_family_donor_completes_pattern() {
        let mut rounds = pair_of_rounds();
        let outcomes: Vec<Outcome> = rounds.iter().map(|r| r.outcome).collect();
        let before = positions(&rounds);

        let report = apply_color_pattern(&mut rounds, &no_signals());
        assert!(!report.skipped);
        assert_eq!(pattern_of(&rounds[0].cards), Some(ColorPattern::Bbbr));
        assert_eq!(rounds[0].cards[2].rank, Rank::Queen);
        assert_eq!(report.swaps, 1);
        assert_eq!(report.patterned, 1);
        assert_eq!(report.failed, vec![1]);
        assert_eq!(positions(&rounds), before);
        for (round, outcome) in rounds.iter().zip(outcomes) {
            let coup = replay(&round.cards).expect("round still forms");
            assert_eq!(coup.outcome, outcome);
            assert_eq!(coup.consumed, round.cards.len());
        }
    }

    #[test]
    fn exchange_that_moves_a_signal_is_refused() {
        // The red king is the first round's only signal; every donor would take it away.
        let mut rounds = pair_of_rounds();
        let before = rounds.clone();
        let report = apply_color_pattern(&mut rounds, &SignalRule::RedZero);
        assert_eq!(rounds, before);
        assert_eq!(report.swaps, 0);
        assert_eq!(report.failed, vec![0, 1]);
    }

    #[test]
    fn t_round_takes_exact_rank_only() {
        let mut rounds = pair_of_rounds();
        rounds[0].is_t = true;
        let before = rounds.clone();
        let report = apply_color_pattern(&mut rounds, &no_signals());
        // The blue king sits behind the blue queen but is the only exact-rank match.
        assert_eq!(rounds[0].cards[2].rank, Rank::King);
        assert_eq!(rounds[0].cards[2].suit, Suit::Clubs);
        assert_eq!(pattern_of(&rounds[0].cards), Some(ColorPattern::Bbbr));
        assert_eq!(report.swaps, 1);
        assert_eq!(positions(&rounds), positions(&before));
    }

    #[test]
    fn two_pair_status_is_kept() {
        // Q♠ would turn 9 9 K K into a one-pair round.
        let mut rounds = vec![
            round_from(
                0,
                &[
                    (Rank::Nine, Suit::Clubs, B),
                    (Rank::Nine, Suit::Spades, B),
                    (Rank::King, Suit::Hearts, R),
                    (Rank::King, Suit::Diamonds, R),
                ],
            ),
            round_from(
                4,
                &[
                    (Rank::Eight, Suit::Spades, R),
                    (Rank::Queen, Suit::Spades, B),
                    (Rank::Ace, Suit::Clubs, R),
                    (Rank::Two, Suit::Spades, R),
                ],
            ),
        ];
        assert!(is_two_pair(&rounds[0]));
        let report = apply_color_pattern(&mut rounds, &no_signals());
        assert!(is_two_pair(&rounds[0]));
        assert!(report.failed.contains(&0));
    }

    #[test]
    fn residual_round_is_a_donor_not_a_target() {
        let mut rounds = pair_of_rounds();
        rounds.truncate(1);
        rounds.push(Round::residual(vec![
            Card::new(Rank::Jack, Suit::Spades, 8).with_back(B),
            Card::new(Rank::Four, Suit::Clubs, 9).with_back(R),
        ]));
        let report = apply_color_pattern(&mut rounds, &no_signals());
        assert_eq!(report.failed, Vec::<usize>::new());
        assert_eq!(report.patterned, 1);
        assert_eq!(rounds[0].cards[2].rank, Rank::Jack);
        assert_eq!(rounds[1].cards.len(), 2);
    }

    #[test]
    fn missing_back_colors_skip_the_pass() {
        let mut rounds = pair_of_rounds();
        rounds[1].cards[0].back = None;
        let before = rounds.clone();
        let report = apply_color_pattern(&mut rounds, &no_signals());
        assert!(report.skipped);
        assert_eq!(rounds, before);
    }
}
