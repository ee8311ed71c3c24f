use crate::engine::simulator::swapped_outcome;
use crate::model::round::{Outcome, Round, Segment};
use crate::signal::config::SignalPredicate;
use serde::Serialize;

/// A successor that could not be pushed to the outcome its predecessor demands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ForcingMiss {
    pub source: usize,
    pub target: usize,
    pub wanted_banker: bool,
    pub actual: Outcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ForcingReport {
    /// Source rounds holding at least one signal card.
    pub signal_rounds: usize,
    pub adjustments: usize,
    pub misses: Vec<ForcingMiss>,
    /// Signal-bearing T-rounds whose Tie successor was left in place.
    pub t_sources: Vec<usize>,
}

/// Indices of S-rounds: a round of `segment` whose successor is a Banker win.
pub fn compute_s_indices(rounds: &[Round], segment: Segment, wrap: bool) -> Vec<usize> {
    let mut indices: Vec<usize> = rounds
        .windows(2)
        .enumerate()
        .filter(|(_, pair)| pair[0].segment == segment && pair[1].outcome.is_banker())
        .map(|(idx, _)| idx)
        .collect();
    if wrap && rounds.len() > 1 {
        let last = rounds.len() - 1;
        if rounds[last].segment == segment && rounds[0].outcome.is_banker() {
            indices.push(last);
        }
    }
    indices
}

/// Pushes each successor towards Banker when its predecessor holds a signal card
/// and away from Banker otherwise, by exchanging the successor's first two cards.
pub fn enforce_s_signals<P: SignalPredicate + ?Sized>(
    rounds: &mut [Round],
    predicate: &P,
    wrap: bool,
) -> ForcingReport {
    let mut report = ForcingReport::default();
    let len = rounds.len();
    if len < 2 {
        return report;
    }

    let mut pairs: Vec<(usize, usize)> = (0..len - 1).map(|idx| (idx, idx + 1)).collect();
    if wrap {
        pairs.push((len - 1, 0));
    }

    for (source, target) in pairs {
        let from = &rounds[source];
        if from.is_residual() || rounds[target].is_residual() {
            continue;
        }
        if from.is_t {
            if predicate.has_signal(from) {
                tracing::warn!(
                    target: "shoe_core::s_forcing",
                    source,
                    target_round = target,
                    reason = "t_round_source",
                    message = "signal-bearing T-round keeps its Tie successor"
                );
                report.t_sources.push(source);
            }
            continue;
        }
        let wanted_banker = predicate.has_signal(from);
        if wanted_banker {
            report.signal_rounds += 1;
        }
        let successor = &mut rounds[target];
        if successor.outcome.is_banker() == wanted_banker {
            continue;
        }
        if force_successor(successor, wanted_banker) {
            report.adjustments += 1;
            continue;
        }

        tracing::warn!(
            target: "shoe_core::s_forcing",
            source,
            target_round = target,
            wanted_banker,
            actual = %successor.outcome,
            reason = "swap_cannot_force",
            message = "successor outcome cannot be forced by a first-two-card swap"
        );
        report.misses.push(ForcingMiss {
            source,
            target,
            wanted_banker,
            actual: successor.outcome,
        });
    }

    report
}

/// Exchanges the round's first two cards when that yields the wanted class with
/// the same card count. Leaving Banker must land on Player; a new Tie is refused.
pub fn force_successor(round: &mut Round, wanted_banker: bool) -> bool {
    let Some(alternate) = swapped_outcome(round) else {
        return false;
    };
    if alternate.consumed != round.cards.len() {
        return false;
    }
    let acceptable = if wanted_banker {
        alternate.outcome == Outcome::Banker
    } else {
        alternate.outcome == Outcome::Player
    };
    if !acceptable {
        return false;
    }
    round.cards.swap(0, 1);
    round.outcome = alternate.outcome;
    round.swapped = true;
    true
}

/// Source/target pairs that still break the rule. Signal-bearing T-rounds are
/// listed by [`t_round_sources`] instead.
pub fn violations<P: SignalPredicate + ?Sized>(
    rounds: &[Round],
    predicate: &P,
    wrap: bool,
) -> Vec<(usize, usize)> {
    let len = rounds.len();
    if len < 2 {
        return Vec::new();
    }
    let mut pairs: Vec<(usize, usize)> = (0..len - 1).map(|idx| (idx, idx + 1)).collect();
    if wrap {
        pairs.push((len - 1, 0));
    }
    pairs
        .into_iter()
        .filter(|&(source, target)| {
            let from = &rounds[source];
            let to = &rounds[target];
            !from.is_residual()
                && !to.is_residual()
                && !from.is_t
                && predicate.has_signal(from) != to.outcome.is_banker()
        })
        .collect()
}

/// Signal-bearing T-rounds with a played successor. Their Tie successor wins
/// over the signal, so they never appear in [`violations`].
pub fn t_round_sources<P: SignalPredicate + ?Sized>(
    rounds: &[Round],
    predicate: &P,
    wrap: bool,
) -> Vec<usize> {
    let len = rounds.len();
    (0..len)
        .filter(|&source| wrap || source + 1 < len)
        .filter(|&source| {
            let from = &rounds[source];
            len > 1
                && from.is_t
                && !from.is_residual()
                && !rounds[(source + 1) % len].is_residual()
                && predicate.has_signal(from)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::simulator::replay;
    use crate::model::card::Card;
    use crate::model::rank::Rank;
    use crate::model::suit::Suit;
    use crate::signal::config::SignalRule;

    fn round_from(start: usize, layout: &[(u8, Suit)]) -> Round {
        let cards: Vec<Card> = layout
            .iter()
            .enumerate()
            .map(|(offset, (point, suit))| {
                let rank = if *point == 0 {
                    Rank::King
                } else {
                    Rank::from_value(*point).expect("point in range")
                };
                Card::new(rank, *suit, start + offset)
            })
            .collect();
        let coup = replay(&cards).expect("round forms");
        Round::new(start, cards, coup.outcome, true)
    }

    #[test]
    fn signal_source_forces_banker_successor() {
        // Source holds a red king; successor 9,K,K,K is Player and flips to Banker.
        let source = round_from(0, &[(0, Suit::Hearts), (9, Suit::Spades), (0, Suit::Spades), (9, Suit::Clubs)]);
        let successor = round_from(4, &[(9, Suit::Spades), (0, Suit::Spades), (0, Suit::Clubs), (0, Suit::Clubs)]);
        assert_eq!(successor.outcome, Outcome::Player);
        let mut rounds = vec![source, successor];

        let report = enforce_s_signals(&mut rounds, &SignalRule::RedZero, false);
        assert_eq!(report.signal_rounds, 1);
        assert_eq!(report.adjustments, 1);
        assert!(report.misses.is_empty());
        assert_eq!(rounds[1].outcome, Outcome::Banker);
        assert!(rounds[1].swapped);
        assert_eq!(rounds[1].cards[0].position, 5);
        assert_eq!(compute_s_indices(&rounds, Segment::A, false), vec![0]);
        assert!(violations(&rounds, &SignalRule::RedZero, false).is_empty());
    }

    #[test]
    fn plain_source_pushes_successor_off_banker() {
        let source = round_from(0, &[(9, Suit::Spades), (0, Suit::Spades), (0, Suit::Clubs), (0, Suit::Clubs)]);
        let successor = round_from(4, &[(0, Suit::Spades), (9, Suit::Spades), (0, Suit::Clubs), (0, Suit::Clubs)]);
        assert_eq!(successor.outcome, Outcome::Banker);
        let mut rounds = vec![source, successor];

        let report = enforce_s_signals(&mut rounds, &SignalRule::RedZero, false);
        assert_eq!(report.signal_rounds, 0);
        assert_eq!(report.adjustments, 1);
        assert_eq!(rounds[1].outcome, Outcome::Player);
    }

    #[test]
    fn unforceable_successor_is_reported() {
        // K,K,K,9 stays Banker either way.
        let source = round_from(0, &[(9, Suit::Spades), (0, Suit::Spades), (0, Suit::Clubs), (0, Suit::Clubs)]);
        let successor = round_from(4, &[(0, Suit::Spades), (0, Suit::Clubs), (0, Suit::Clubs), (9, Suit::Spades)]);
        let mut rounds = vec![source, successor];

        let report = enforce_s_signals(&mut rounds, &SignalRule::RedZero, false);
        assert_eq!(report.adjustments, 0);
        assert_eq!(report.misses.len(), 1);
        assert_eq!(report.misses[0].target, 1);
        assert!(!rounds[1].swapped);
        assert_eq!(violations(&rounds, &SignalRule::RedZero, false), vec![(0, 1)]);
    }

    #[test]
    fn tie_is_never_manufactured() {
        // K,9,K,9 is a Banker natural; swapped 9,K,K,9 would tie at nine.
        let mut round = round_from(0, &[(0, Suit::Spades), (9, Suit::Spades), (0, Suit::Clubs), (9, Suit::Clubs)]);
        assert_eq!(round.outcome, Outcome::Banker);
        let before = round.clone();
        assert!(!force_successor(&mut round, false));
        assert_eq!(round, before);
        assert!(!round.swapped);
    }

    #[test]
    fn t_rounds_and_residual_are_skipped() {
        let mut source = round_from(0, &[(0, Suit::Hearts), (9, Suit::Spades), (0, Suit::Spades), (9, Suit::Clubs)]);
        source.is_t = true;
        let successor = round_from(4, &[(9, Suit::Spades), (0, Suit::Spades), (0, Suit::Clubs), (0, Suit::Clubs)]);
        let residual = Round::residual(vec![Card::new(Rank::Queen, Suit::Hearts, 8)]);
        let mut rounds = vec![source, successor, residual];

        let report = enforce_s_signals(&mut rounds, &SignalRule::RedZero, true);
        assert_eq!(report.adjustments, 0);
        assert!(report.misses.is_empty());
        assert_eq!(report.t_sources, vec![0]);
        assert_eq!(rounds[1].outcome, Outcome::Player);
    }

    #[test]
    fn signal_bearing_t_round_is_reported_not_forced() {
        // K♥ K♠ 7♣ 7♦ is two-pair and holds a red king; its Tie successor stays.
        let mut source = round_from(0, &[(0, Suit::Hearts), (0, Suit::Spades), (7, Suit::Clubs), (7, Suit::Diamonds)]);
        source.is_t = true;
        let tie = round_from(4, &[(7, Suit::Spades), (7, Suit::Clubs), (0, Suit::Clubs), (0, Suit::Spades)]);
        assert_eq!(tie.outcome, Outcome::Tie);
        let mut rounds = vec![source, tie.clone()];

        let report = enforce_s_signals(&mut rounds, &SignalRule::RedZero, false);
        assert_eq!(report.t_sources, vec![0]);
        assert_eq!(report.signal_rounds, 0);
        assert!(report.misses.is_empty());
        assert_eq!(rounds[1], tie);
        assert!(violations(&rounds, &SignalRule::RedZero, false).is_empty());
        assert_eq!(t_round_sources(&rounds, &SignalRule::RedZero, false), vec![0]);
    }

    #[test]
    fn plain_t_round_is_not_reported() {
        let mut source = round_from(0, &[(0, Suit::Clubs), (0, Suit::Spades), (7, Suit::Clubs), (7, Suit::Diamonds)]);
        source.is_t = true;
        let tie = round_from(4, &[(7, Suit::Spades), (7, Suit::Clubs), (0, Suit::Clubs), (0, Suit::Spades)]);
        let mut rounds = vec![source, tie];

        let report = enforce_s_signals(&mut rounds, &SignalRule::RedZero, false);
        assert!(report.t_sources.is_empty());
        assert!(t_round_sources(&rounds, &SignalRule::RedZero, false).is_empty());
    }

    #[test]
    fn wrap_checks_last_against_first() {
        let first = round_from(0, &[(9, Suit::Spades), (0, Suit::Spades), (0, Suit::Clubs), (0, Suit::Clubs)]);
        let last = round_from(4, &[(0, Suit::Diamonds), (9, Suit::Spades), (0, Suit::Spades), (9, Suit::Clubs)]);
        let mut rounds = vec![first, last];
        // last -> first wants Banker; 9,K,K,K flips to Banker.
        let report = enforce_s_signals(&mut rounds, &SignalRule::RedZero, true);
        assert_eq!(rounds[0].outcome, Outcome::Banker);
        assert!(report.adjustments >= 1);
        assert!(compute_s_indices(&rounds, Segment::A, true).contains(&1));
    }
}
