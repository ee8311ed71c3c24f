use std::path::PathBuf;

use clap::Parser;

use shoe_bench::config::{ResolvedOutputs, RunConfig};
use shoe_bench::logging::init_logging;
use shoe_bench::runner::ShoeRunner;

/// Batch harness for the shoe arrangement engine.
#[derive(Debug, Parser)]
#[command(
    name = "shoe-bench",
    author,
    version,
    about = "Deterministic shoe arrangement harness"
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "bench/shoe.yaml")]
    config: PathBuf,

    /// Override the run identifier (substitutes {run_id} templates).
    #[arg(long, value_name = "RUN_ID")]
    run_id: Option<String>,

    /// Override the number of shoes to arrange.
    #[arg(long, value_name = "SHOES")]
    shoes: Option<usize>,

    /// Override the RNG seed for shoe generation.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Check the last round against the first when enforcing signals.
    #[arg(long)]
    wrap: bool,

    /// Exit after validating the configuration (no shoes are arranged).
    #[arg(long)]
    validate_only: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = RunConfig::from_path(&cli.config)?;

    if let Some(run_id) = cli.run_id {
        config.run_id = run_id;
    }

    if let Some(shoes) = cli.shoes {
        config.shoes.count = shoes;
    }

    if let Some(seed) = cli.seed {
        config.shoes.seed = Some(seed);
    }

    if cli.wrap {
        config.signal.wrap = true;
    }

    config.validate()?;

    let outputs: ResolvedOutputs = config.resolved_outputs();
    let run_id = config.run_id.clone();
    let shoes = config.shoes.count;

    println!(
        "Loaded configuration '{run_id}' ({shoes} shoe{}, {:?} signal rule, wrap {})",
        if shoes == 1 { "" } else { "s" },
        config.signal.rule,
        config.signal.wrap
    );

    let _logging_guard = init_logging(&config.logging, &outputs)?;
    let runner = ShoeRunner::new(config, outputs);

    if cli.validate_only {
        println!("Validation-only mode: arrangement skipped.");
        return Ok(());
    }

    let summary = runner.run()?;
    println!(
        "Run complete for '{run_id}': {} shoes → {} rows at {}",
        summary.shoes,
        summary.rows_written,
        summary.jsonl_path.display()
    );
    println!(
        "Clean shoes: {}/{} ({} count mismatches)",
        summary.analytics.clean_shoes, summary.analytics.shoes, summary.analytics.pairing_mismatches
    );
    if let Some(rounds) = summary.analytics.metric("rounds") {
        println!(
            "  Rounds per shoe: {:.2} [{:.2}, {:.2}]",
            rounds.mean, rounds.ci95.0, rounds.ci95.1
        );
    }
    println!("Summary table: {}", summary.summary_path.display());
    if summary.snapshots_written > 0 {
        println!("Snapshots written: {}", summary.snapshots_written);
    }
    if let Some(telemetry_path) = summary.telemetry_path.as_ref() {
        println!("Telemetry log: {}", telemetry_path.display());
    }
    if let Some(outputs) = summary.telemetry_outputs.as_ref() {
        println!("Telemetry summary (JSON): {}", outputs.json_path.display());
        println!(
            "Telemetry summary (Markdown): {}",
            outputs.markdown_path.display()
        );
        if !outputs.summary.by_reason.is_empty() {
            println!("  Warnings by reason: {:?}", outputs.summary.by_reason);
        }
    }

    Ok(())
}
