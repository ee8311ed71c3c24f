use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse telemetry JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Default, Serialize)]
pub struct TelemetrySummary {
    pub events: usize,
    pub by_level: BTreeMap<String, usize>,
    pub by_target: BTreeMap<String, usize>,
    /// Keyed `"{target}/{reason}"` for events that carry a `reason` field.
    pub by_reason: BTreeMap<String, usize>,
    pub harvest: HarvestTelemetrySummary,
}

#[derive(Debug, Default, Serialize)]
pub struct HarvestTelemetrySummary {
    pub runs: usize,
    pub avg_passes: Option<f64>,
    pub avg_rounds: Option<f64>,
    pub avg_remainder: Option<f64>,
}

#[derive(Debug)]
struct Average {
    sum: f64,
    count: usize,
}

impl Average {
    fn new() -> Self {
        Self { sum: 0.0, count: 0 }
    }

    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }
}

/// Aggregate the JSON events the engine emitted during a run.
pub fn summarise_telemetry(path: &Path) -> Result<TelemetrySummary, TelemetryError> {
    if !path.exists() {
        return Ok(TelemetrySummary::default());
    }

    let file = File::open(path).map_err(|source| TelemetryError::Io {
        context: "opening telemetry log",
        source,
    })?;
    let reader = BufReader::new(file);

    let mut summary = TelemetrySummary::default();
    let mut passes = Average::new();
    let mut rounds = Average::new();
    let mut remainder = Average::new();

    for line in reader.lines() {
        let line = line.map_err(|source| TelemetryError::Io {
            context: "reading telemetry line",
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }

        let payload: Value = serde_json::from_str(&line)?;
        let target = payload
            .get("target")
            .and_then(Value::as_str)
            .unwrap_or("<unset>");
        let level = payload
            .get("level")
            .and_then(Value::as_str)
            .unwrap_or("<unset>");
        let fields = payload
            .get("fields")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        summary.events += 1;
        *summary.by_level.entry(level.to_string()).or_insert(0) += 1;
        *summary.by_target.entry(target.to_string()).or_insert(0) += 1;

        if let Some(reason) = fields
            .get("reason")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            *summary
                .by_reason
                .entry(format!("{target}/{reason}"))
                .or_insert(0) += 1;
        }

        if target == "shoe_core::harvest" {
            let Some(count) = fields.get("passes").and_then(Value::as_f64) else {
                continue;
            };
            summary.harvest.runs += 1;
            passes.add(count);
            if let Some(value) = fields.get("rounds").and_then(Value::as_f64) {
                rounds.add(value);
            }
            if let Some(value) = fields.get("remainder").and_then(Value::as_f64) {
                remainder.add(value);
            }
        }
    }

    summary.harvest.avg_passes = passes.mean();
    summary.harvest.avg_rounds = rounds.mean();
    summary.harvest.avg_remainder = remainder.mean();
    Ok(summary)
}

pub fn write_summary_outputs(
    telemetry_path: &Path,
    output_dir: &Path,
) -> Result<Option<TelemetryOutputs>, TelemetryError> {
    if !telemetry_path.exists() {
        return Ok(None);
    }

    let summary = summarise_telemetry(telemetry_path)?;
    let json_path = output_dir.join("telemetry_summary.json");
    let md_path = output_dir.join("telemetry_summary.md");

    std::fs::write(
        &json_path,
        serde_json::to_vec_pretty(&summary).map_err(TelemetryError::from)?,
    )
    .map_err(|source| TelemetryError::Io {
        context: "writing telemetry summary json",
        source,
    })?;

    let markdown = render_markdown(&summary, telemetry_path);
    std::fs::write(&md_path, markdown).map_err(|source| TelemetryError::Io {
        context: "writing telemetry summary markdown",
        source,
    })?;

    Ok(Some(TelemetryOutputs {
        summary,
        json_path,
        markdown_path: md_path,
    }))
}

pub fn append_highlights_to_markdown(
    summary_path: &Path,
    outputs: &TelemetryOutputs,
) -> Result<(), TelemetryError> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(summary_path)
        .map_err(|source| TelemetryError::Io {
            context: "opening summary markdown for telemetry append",
            source,
        })?;

    let summary = &outputs.summary;
    let mut section = String::new();
    section.push_str("\n## Telemetry Highlights\n");
    section.push_str(&format!("- Events captured: {}\n", summary.events));
    if let Some(value) = summary.harvest.avg_passes {
        section.push_str(&format!("- Avg harvest passes: {:.2}\n", value));
    }

    section.push_str("\n### Warnings by Reason\n");
    if summary.by_reason.is_empty() {
        section.push_str("- <none>\n");
    } else {
        for (label, count) in &summary.by_reason {
            section.push_str(&format!("- {}: {}\n", label, count));
        }
    }

    write!(file, "{section}").map_err(|source| TelemetryError::Io {
        context: "writing telemetry highlights",
        source,
    })?;

    Ok(())
}

fn render_markdown(summary: &TelemetrySummary, telemetry_path: &Path) -> String {
    let mut output = String::new();
    output.push_str("# Telemetry Summary\n\n");
    output.push_str(&format!("- Source: `{}`\n", telemetry_path.display()));
    output.push_str(&format!("- Events: {}\n", summary.events));
    output.push('\n');

    output.push_str("## Levels\n");
    for (label, count) in &summary.by_level {
        output.push_str(&format!("- {}: {}\n", label, count));
    }
    output.push('\n');

    output.push_str("## Targets\n");
    for (label, count) in &summary.by_target {
        output.push_str(&format!("- {}: {}\n", label, count));
    }
    output.push('\n');

    output.push_str("## Harvest\n");
    output.push_str(&format!("- Runs: {}\n", summary.harvest.runs));
    if let Some(value) = summary.harvest.avg_passes {
        output.push_str(&format!("- Avg passes: {:.2}\n", value));
    }
    if let Some(value) = summary.harvest.avg_rounds {
        output.push_str(&format!("- Avg rounds: {:.2}\n", value));
    }
    if let Some(value) = summary.harvest.avg_remainder {
        output.push_str(&format!("- Avg remainder: {:.2}\n", value));
    }
    output.push('\n');

    output.push_str("## Reasons\n");
    if summary.by_reason.is_empty() {
        output.push_str("- <none>\n");
    } else {
        for (label, count) in &summary.by_reason {
            output.push_str(&format!("- {}: {}\n", label, count));
        }
    }
    output
}

#[derive(Debug)]
pub struct TelemetryOutputs {
    pub summary: TelemetrySummary,
    pub json_path: PathBuf,
    pub markdown_path: PathBuf,
}
