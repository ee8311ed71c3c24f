use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use rand::{RngCore, SeedableRng, rngs::StdRng};
use serde::Serialize;
use shoe_core::analysis::shoe_stats;
use shoe_core::engine::simulator::replay;
use shoe_core::engine::{ArrangeConfig, ArrangeWarning, Arrangement, arrange};
use shoe_core::game::cut::sweep;
use shoe_core::game::serialization::ShoeSnapshot;
use shoe_core::model::deck::Deck;
use shoe_core::model::round::{Outcome, Segment};
use shoe_core::signal::SignalPredicate;
use thiserror::Error;
use tracing::{Level, event};

use crate::analytics::{AnalyticsCollector, AnalyticsError, AnalyticsSummary, ShoeReport};
use crate::config::{ResolvedOutputs, RunConfig};
use crate::logging::telemetry_dir;
use crate::telemetry::{
    TelemetryError, TelemetryOutputs, append_highlights_to_markdown, write_summary_outputs,
};

/// Deals, arranges and logs every shoe of a run.
pub struct ShoeRunner {
    config: RunConfig,
    outputs: ResolvedOutputs,
    arrange: ArrangeConfig,
    logging_enabled: bool,
}

/// Summary details returned after a run.
pub struct RunSummary {
    pub shoes: usize,
    pub rows_written: usize,
    pub jsonl_path: PathBuf,
    pub summary_path: PathBuf,
    pub snapshots_written: usize,
    pub analytics: AnalyticsSummary,
    pub telemetry_path: Option<PathBuf>,
    pub telemetry_outputs: Option<TelemetryOutputs>,
}

impl ShoeRunner {
    /// Build a runner from a validated configuration.
    pub fn new(config: RunConfig, outputs: ResolvedOutputs) -> Self {
        Self {
            arrange: config.arrange_config(),
            logging_enabled: config.logging.enable_structured,
            config,
            outputs,
        }
    }

    /// Execute the run, streaming JSONL rows to disk.
    pub fn run(&self) -> Result<RunSummary, RunnerError> {
        ensure_parent(self.outputs.jsonl.parent())?;
        ensure_parent(self.outputs.summary_md.parent())?;
        if let Some(dir) = self.outputs.snapshots_dir.as_ref() {
            fs::create_dir_all(dir)?;
        }

        let mut writer = BufWriter::new(File::create(&self.outputs.jsonl)?);
        let mut rng = StdRng::seed_from_u64(self.config.shoes.seed.unwrap_or(0));
        let mut rows_written = 0usize;
        let mut snapshots_written = 0usize;
        let mut analytics = AnalyticsCollector::new();

        for shoe_index in 0..self.config.shoes.count {
            let shoe_seed = rng.next_u64();
            let deck = Deck::shuffled_with_seed(self.config.shoes.composition, shoe_seed);
            let mut arrange_rng = StdRng::seed_from_u64(shoe_seed);
            let arrangement = arrange(deck.cards(), &self.arrange, &mut arrange_rng);

            let stats = shoe_stats(
                &arrangement.final_rounds,
                &self.arrange.signal,
                self.arrange.wrap,
            );
            let cut_sweep = sweep(&arrangement.final_rounds);
            let report = ShoeReport::new(shoe_index, shoe_seed, &arrangement, &stats, &cut_sweep);

            if self.logging_enabled && tracing::enabled!(Level::INFO) {
                event!(
                    target: "shoe_bench::shoe",
                    Level::INFO,
                    run_id = %self.config.run_id,
                    shoe_index = shoe_index as u32,
                    shoe_seed,
                    rounds = report.rounds as u32,
                    residual = report.residual_cards as u32,
                    warnings = arrangement.warnings.len() as u32,
                    passes = report.harvest_passes as u32
                );
            }

            rows_written += write_shoe_rows(
                &mut writer,
                &self.config.run_id,
                shoe_index,
                shoe_seed,
                &arrangement,
                &self.arrange.signal,
            )?;

            if let Some(dir) = self.outputs.snapshots_dir.as_ref() {
                write_snapshot(dir, shoe_index, &arrangement)?;
                snapshots_written += 1;
            }

            analytics.record_shoe(report);
        }

        writer.flush()?;

        let summary = analytics.finalize()?;
        summary.write_markdown(&self.outputs.summary_md)?;

        let telemetry_dir = telemetry_dir(&self.outputs);
        let telemetry_path = if self.logging_enabled {
            Some(telemetry_dir.join("telemetry.jsonl"))
        } else {
            None
        };

        let telemetry_outputs = if let Some(path) = telemetry_path.as_ref() {
            write_summary_outputs(path, &telemetry_dir)?
        } else {
            None
        };

        if let Some(outputs) = telemetry_outputs.as_ref() {
            append_highlights_to_markdown(&self.outputs.summary_md, outputs)?;
        }

        Ok(RunSummary {
            shoes: self.config.shoes.count,
            rows_written,
            jsonl_path: self.outputs.jsonl.clone(),
            summary_path: self.outputs.summary_md.clone(),
            snapshots_written,
            analytics: summary,
            telemetry_path,
            telemetry_outputs,
        })
    }
}

fn ensure_parent(path: Option<&Path>) -> Result<(), RunnerError> {
    if let Some(dir) = path.filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

fn write_shoe_rows<P: SignalPredicate + ?Sized>(
    writer: &mut BufWriter<File>,
    run_id: &str,
    shoe_index: usize,
    shoe_seed: u64,
    arrangement: &Arrangement,
    predicate: &P,
) -> Result<usize, RunnerError> {
    let mut rows_written = 0usize;
    for (round_index, round) in arrangement.final_rounds.iter().enumerate() {
        let coup = if round.is_residual() {
            None
        } else {
            replay(&round.cards)
        };
        let row = LogRow::Round(RoundLogRow {
            run_id: run_id.to_string(),
            shoe_index,
            shoe_seed,
            round_index,
            start_index: round.start,
            result: round.outcome,
            sensitive: round.sensitive,
            segment: round.segment,
            is_t: round.is_t,
            swapped: round.swapped,
            player_total: coup.as_ref().map(|c| c.player_total),
            banker_total: coup.as_ref().map(|c| c.banker_total),
            signals: predicate.count_signals(&round.cards),
            cards: round.cards.iter().map(|card| card.label()).collect(),
        });

        serde_json::to_writer(&mut *writer, &row)?;
        writer.write_all(b"\n")?;
        rows_written += 1;
    }

    for warning in &arrangement.warnings {
        let row = LogRow::Warning(WarningLogRow {
            run_id: run_id.to_string(),
            shoe_index,
            shoe_seed,
            warning,
        });
        serde_json::to_writer(&mut *writer, &row)?;
        writer.write_all(b"\n")?;
        rows_written += 1;
    }

    Ok(rows_written)
}

fn write_snapshot(dir: &Path, shoe_index: usize, arrangement: &Arrangement) -> Result<(), RunnerError> {
    let json = ShoeSnapshot::to_json(arrangement)?;
    fs::write(dir.join(format!("shoe_{shoe_index:05}.json")), json)?;
    Ok(())
}

#[derive(Serialize)]
#[serde(tag = "row", rename_all = "snake_case")]
enum LogRow<'a> {
    Round(RoundLogRow),
    Warning(WarningLogRow<'a>),
}

#[derive(Serialize)]
struct RoundLogRow {
    run_id: String,
    shoe_index: usize,
    shoe_seed: u64,
    round_index: usize,
    start_index: usize,
    result: Outcome,
    sensitive: bool,
    segment: Segment,
    #[serde(rename = "is_T")]
    is_t: bool,
    swapped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    player_total: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    banker_total: Option<u8>,
    signals: usize,
    cards: Vec<String>,
}

#[derive(Serialize)]
struct WarningLogRow<'a> {
    run_id: String,
    shoe_index: usize,
    shoe_seed: u64,
    warning: &'a ArrangeWarning,
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("failed to serialize log row: {source}")]
    Serialize {
        #[from]
        source: serde_json::Error,
    },
    #[error("analytics error: {0}")]
    Analytics(#[from] AnalyticsError),
    #[error("telemetry summarisation failed: {0}")]
    Telemetry(#[from] TelemetryError),
}
