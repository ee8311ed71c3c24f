use std::fs;
use std::path::Path;

use serde::Serialize;
use shoe_core::analysis::ShoeStats;
use shoe_core::engine::{ArrangeWarning, Arrangement};
use shoe_core::game::cut::CutSweep;
use statrs::distribution::{ContinuousCDF, StudentsT};
use thiserror::Error;

const CONFIDENCE_Z: f64 = 1.96; // 95% CI, large-sample fallback

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("no shoes were recorded")]
    Empty,
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Per-shoe figures that feed the run summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShoeReport {
    pub shoe_index: usize,
    pub shoe_seed: u64,
    pub rounds: usize,
    pub residual_cards: usize,
    pub sensitive: usize,
    pub banker: usize,
    pub player: usize,
    pub tie: usize,
    pub two_pair: usize,
    pub t_rounds: usize,
    pub s_rounds: usize,
    pub swaps: usize,
    pub forcing_misses: usize,
    /// Signal-bearing T-rounds left on their Tie successor.
    pub t_sources: usize,
    pub pairing_unsatisfied: usize,
    pub color_unsatisfied: usize,
    pub pairing_mismatch: bool,
    pub harvest_passes: usize,
    pub cut_avg_rounds: f64,
    pub cut_avg_hits: f64,
}

impl ShoeReport {
    pub fn new(
        shoe_index: usize,
        shoe_seed: u64,
        arrangement: &Arrangement,
        stats: &ShoeStats,
        sweep: &CutSweep,
    ) -> Self {
        let count = |pred: fn(&ArrangeWarning) -> bool| {
            arrangement.warnings.iter().filter(|w| pred(w)).count()
        };
        Self {
            shoe_index,
            shoe_seed,
            rounds: stats.total_rounds,
            residual_cards: stats.residual_cards,
            sensitive: stats.sensitive,
            banker: stats.banker,
            player: stats.player,
            tie: stats.tie,
            two_pair: stats.two_pair,
            t_rounds: stats.t_rounds,
            s_rounds: stats.s_rounds,
            swaps: stats.swapped,
            forcing_misses: count(|w| matches!(w, ArrangeWarning::ForcingUnsatisfied { .. })),
            t_sources: count(|w| matches!(w, ArrangeWarning::ForcingSkippedTRound { .. })),
            pairing_unsatisfied: count(|w| matches!(w, ArrangeWarning::PairingUnsatisfied { .. })),
            color_unsatisfied: count(|w| {
                matches!(w, ArrangeWarning::ColorPatternUnsatisfied { .. })
            }),
            pairing_mismatch: count(|w| {
                matches!(w, ArrangeWarning::PairingCountMismatch { .. })
            }) > 0,
            harvest_passes: arrangement.harvest_passes,
            cut_avg_rounds: sweep.avg_rounds(),
            cut_avg_hits: sweep.avg_hits(),
        }
    }
}

#[derive(Default)]
pub struct AnalyticsCollector {
    shoes: Vec<ShoeReport>,
}

impl AnalyticsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_shoe(&mut self, report: ShoeReport) {
        self.shoes.push(report);
    }

    pub fn finalize(self) -> Result<AnalyticsSummary, AnalyticsError> {
        if self.shoes.is_empty() {
            return Err(AnalyticsError::Empty);
        }

        let metric = |name: &'static str, pick: fn(&ShoeReport) -> f64| {
            let values: Vec<f64> = self.shoes.iter().map(pick).collect();
            MetricReport::from_values(name, &values)
        };

        let metrics = vec![
            metric("rounds", |s| s.rounds as f64),
            metric("residual_cards", |s| s.residual_cards as f64),
            metric("banker", |s| s.banker as f64),
            metric("player", |s| s.player as f64),
            metric("tie", |s| s.tie as f64),
            metric("two_pair", |s| s.two_pair as f64),
            metric("t_rounds", |s| s.t_rounds as f64),
            metric("s_rounds", |s| s.s_rounds as f64),
            metric("swaps", |s| s.swaps as f64),
            metric("forcing_misses", |s| s.forcing_misses as f64),
            metric("t_sources", |s| s.t_sources as f64),
            metric("pairing_unsatisfied", |s| s.pairing_unsatisfied as f64),
            metric("color_unsatisfied", |s| s.color_unsatisfied as f64),
            metric("harvest_passes", |s| s.harvest_passes as f64),
            metric("cut_avg_rounds", |s| s.cut_avg_rounds),
            metric("cut_avg_hits", |s| s.cut_avg_hits),
        ];

        let pairing_mismatches = self.shoes.iter().filter(|s| s.pairing_mismatch).count();
        let clean_shoes = self
            .shoes
            .iter()
            .filter(|s| s.forcing_misses == 0 && s.pairing_unsatisfied == 0 && !s.pairing_mismatch)
            .count();

        Ok(AnalyticsSummary {
            shoes: self.shoes.len(),
            clean_shoes,
            pairing_mismatches,
            metrics,
            per_shoe: self.shoes,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricReport {
    pub name: &'static str,
    pub mean: f64,
    pub ci95: (f64, f64),
    pub min: f64,
    pub max: f64,
}

impl MetricReport {
    fn from_values(name: &'static str, values: &[f64]) -> Self {
        let (ci_low, ci_high) = confidence_interval(values);
        let mean = if values.is_empty() {
            0.0
        } else {
            values.iter().sum::<f64>() / values.len() as f64
        };
        Self {
            name,
            mean,
            ci95: (ci_low, ci_high),
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AnalyticsSummary {
    pub shoes: usize,
    /// Shoes whose adjustments met both signal invariants without a warning.
    pub clean_shoes: usize,
    pub pairing_mismatches: usize,
    pub metrics: Vec<MetricReport>,
    #[serde(skip)]
    pub per_shoe: Vec<ShoeReport>,
}

impl AnalyticsSummary {
    pub fn metric(&self, name: &str) -> Option<&MetricReport> {
        self.metrics.iter().find(|m| m.name == name)
    }

    pub fn write_markdown(&self, path: impl AsRef<Path>) -> Result<(), AnalyticsError> {
        let mut rows = String::new();
        rows.push_str("# Shoe Summary\n\n");
        rows.push_str(&format!(
            "Shoes: {} ({} clean, {} with a two-pair/tie count mismatch)\n\n",
            self.shoes, self.clean_shoes, self.pairing_mismatches
        ));
        rows.push_str("| Metric | Mean | 95% CI | Min | Max |\n");
        rows.push_str("|--------|------|--------|-----|-----|\n");

        for metric in &self.metrics {
            rows.push_str(&format!(
                "| {name} | {mean:.3} | [{low:.3}, {high:.3}] | {min:.3} | {max:.3} |\n",
                name = metric.name,
                mean = metric.mean,
                low = metric.ci95.0,
                high = metric.ci95.1,
                min = metric.min,
                max = metric.max,
            ));
        }

        rows.push_str("\n## Per Shoe\n\n");
        rows.push_str("| Shoe | Seed | Rounds | B/P/T | Residual | S | T | Misses | Passes |\n");
        rows.push_str("|------|------|--------|-------|----------|---|---|--------|--------|\n");
        for shoe in &self.per_shoe {
            rows.push_str(&format!(
                "| {idx} | {seed} | {rounds} | {b}/{p}/{t} | {residual} | {s} | {t_rounds} | {misses} | {passes} |\n",
                idx = shoe.shoe_index,
                seed = shoe.shoe_seed,
                rounds = shoe.rounds,
                b = shoe.banker,
                p = shoe.player,
                t = shoe.tie,
                residual = shoe.residual_cards,
                s = shoe.s_rounds,
                t_rounds = shoe.t_rounds,
                misses = shoe.forcing_misses + shoe.pairing_unsatisfied,
                passes = shoe.harvest_passes,
            ));
        }

        fs::write(path.as_ref(), rows).map_err(|e| AnalyticsError::Io {
            context: "writing summary markdown",
            source: e,
        })?;
        Ok(())
    }
}

fn confidence_interval(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    if values.len() == 1 {
        return (mean, mean);
    }
    let variance = values
        .iter()
        .map(|value| (value - mean).powi(2))
        .sum::<f64>()
        / (values.len() as f64 - 1.0);
    let std_error = (variance / values.len() as f64).sqrt();
    let margin = critical_value(values.len() - 1) * std_error;
    (mean - margin, mean + margin)
}

/// Two-sided 95% Student-t quantile for `dof` degrees of freedom.
fn critical_value(dof: usize) -> f64 {
    StudentsT::new(0.0, 1.0, dof as f64)
        .map(|dist| dist.inverse_cdf(0.975))
        .ok()
        .filter(|value| value.is_finite())
        .unwrap_or(CONFIDENCE_Z)
}
