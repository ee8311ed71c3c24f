use crate::engine::harvest::{CandidateFilter, HarvestParams, harvest};
use crate::engine::segment::{PartitionReport, residual_cards, segment, verify_partition};
use crate::engine::simulator::MIN_ROUND_CARDS;
use crate::model::card::Card;
use crate::model::round::Round;
use crate::signal::color::{ColorReport, apply_color_pattern};
use crate::signal::config::SignalRule;
use crate::signal::forcing::{ForcingReport, enforce_s_signals};
use crate::signal::pairing::{PairingReport, apply_t_pairing, rederive_t_flags, unpaired};
use rand::Rng;
use serde::Serialize;
use tracing::{Level, event};

/// Immutable knobs for one arrangement run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrangeConfig {
    pub signal: SignalRule,
    pub harvest: HarvestParams,
    /// Also check the last round against the first.
    pub wrap: bool,
    pub s_forcing: bool,
    pub t_pairing: bool,
    /// BBBR/RRRB back colours on each round's first four cards.
    pub color_pattern: bool,
}

impl Default for ArrangeConfig {
    fn default() -> Self {
        Self {
            signal: SignalRule::default(),
            harvest: HarvestParams::default(),
            wrap: false,
            s_forcing: true,
            t_pairing: true,
            color_pattern: true,
        }
    }
}

/// Soft failures collected during a run. None of them abort the arrangement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArrangeWarning {
    ShortDeck {
        cards: usize,
    },
    ForcingUnsatisfied {
        source: usize,
        target: usize,
        wanted_banker: bool,
    },
    /// A signal-bearing T-round: its Tie successor is kept over the Banker the signal asks for.
    ForcingSkippedTRound {
        source: usize,
    },
    PairingCountMismatch {
        two_pair: usize,
        ties: usize,
    },
    PairingUnsatisfied {
        round: usize,
    },
    ColorPatternUnsatisfied {
        round: usize,
    },
    PartitionBroken {
        missing: Vec<usize>,
        duplicated: Vec<usize>,
        foreign: Vec<usize>,
    },
}

#[derive(Debug, Clone)]
pub struct Arrangement {
    /// Played rounds in final order.
    pub a_rounds: Vec<Round>,
    pub residual_cards: Vec<Card>,
    /// Played rounds followed by the residual round, if any.
    pub final_rounds: Vec<Round>,
    pub warnings: Vec<ArrangeWarning>,
    pub harvest_passes: usize,
    pub forcing: Option<ForcingReport>,
    pub pairing: Option<PairingReport>,
    pub color: Option<ColorReport>,
    pub partition: PartitionReport,
}

impl Arrangement {
    fn from_rounds(
        final_rounds: Vec<Round>,
        warnings: Vec<ArrangeWarning>,
        partition: PartitionReport,
    ) -> Self {
        Self {
            a_rounds: final_rounds
                .iter()
                .filter(|round| !round.is_residual())
                .cloned()
                .collect(),
            residual_cards: residual_cards(&final_rounds),
            final_rounds,
            warnings,
            harvest_passes: 0,
            forcing: None,
            pairing: None,
            color: None,
            partition,
        }
    }

    /// The rearranged shoe: every round's cards in final dealing order.
    pub fn card_order(&self) -> Vec<Card> {
        self.final_rounds
            .iter()
            .flat_map(|round| round.cards.iter().copied())
            .collect()
    }
}

/// Mines sensitive rounds out of `deck` and adjusts them for both signals.
///
/// Order: harvest, segment, T pairing, S forcing, back-colour pattern, final T
/// re-derivation, partition check.
pub fn arrange<R: Rng + ?Sized>(deck: &[Card], config: &ArrangeConfig, rng: &mut R) -> Arrangement {
    if deck.len() < MIN_ROUND_CARDS {
        let rounds = segment(Vec::new(), deck.to_vec());
        let partition = verify_partition(deck, &rounds);
        let warnings = vec![ArrangeWarning::ShortDeck { cards: deck.len() }];
        return Arrangement::from_rounds(rounds, warnings, partition);
    }

    let mined = harvest(deck, &config.harvest, CandidateFilter::AnyOutcome, rng);
    let harvest_passes = mined.passes;
    let mut rounds = segment(mined.rounds, mined.remainder);
    let mut warnings = Vec::new();

    let mut pairing = None;
    if config.t_pairing {
        let (paired, report) = apply_t_pairing(rounds, &config.harvest, rng);
        rounds = paired;
        if report.count_mismatch {
            warnings.push(ArrangeWarning::PairingCountMismatch {
                two_pair: report.two_pair_rounds,
                ties: report.tie_rounds,
            });
        }
        pairing = Some(report);
    }

    let mut forcing = None;
    if config.s_forcing {
        let report = enforce_s_signals(&mut rounds, &config.signal, config.wrap);
        warnings.extend(report.misses.iter().map(|miss| ArrangeWarning::ForcingUnsatisfied {
            source: miss.source,
            target: miss.target,
            wanted_banker: miss.wanted_banker,
        }));
        warnings.extend(
            report
                .t_sources
                .iter()
                .map(|&source| ArrangeWarning::ForcingSkippedTRound { source }),
        );
        forcing = Some(report);
    }

    let mut color = None;
    if config.color_pattern {
        let report = apply_color_pattern(&mut rounds, &config.signal);
        warnings.extend(
            report
                .failed
                .iter()
                .map(|&round| ArrangeWarning::ColorPatternUnsatisfied { round }),
        );
        color = Some(report);
    }

    rederive_t_flags(&mut rounds);
    let mismatch = pairing.as_ref().is_some_and(|report| report.count_mismatch);
    if config.t_pairing && !mismatch {
        warnings.extend(
            unpaired(&rounds)
                .into_iter()
                .map(|round| ArrangeWarning::PairingUnsatisfied { round }),
        );
    }

    let partition = verify_partition(deck, &rounds);
    if !partition.is_exact() {
        tracing::error!(
            target: "shoe_core::arrange",
            reason = "partition_broken",
            detail = %partition,
            message = "final rounds do not cover the deck exactly once"
        );
        warnings.push(ArrangeWarning::PartitionBroken {
            missing: partition.missing.clone(),
            duplicated: partition.duplicated.clone(),
            foreign: partition.foreign.clone(),
        });
    }

    let mut arrangement = Arrangement::from_rounds(rounds, warnings, partition);
    arrangement.harvest_passes = harvest_passes;
    arrangement.forcing = forcing;
    arrangement.pairing = pairing;
    arrangement.color = color;

    if tracing::enabled!(Level::DEBUG) {
        event!(
            target: "shoe_core::arrange",
            Level::DEBUG,
            deck = deck.len(),
            rounds = arrangement.a_rounds.len(),
            residual = arrangement.residual_cards.len(),
            warnings = arrangement.warnings.len(),
            passes = harvest_passes
        );
    }

    arrangement
}
