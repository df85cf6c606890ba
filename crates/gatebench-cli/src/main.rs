use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use gatebench_eval::runner::EvaluationRunner;
use gatebench_eval::types::Mode;
use gatebench_eval::workload::load_workload;
use gatebench_eval::{EvalConfig, metrics};
use serde_json::json;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(
    name = "gatebench",
    about = "A/B evaluation of gated vs ungated renderer execution"
)]
struct Cli {
    /// Execution mode: "ungated" (always render) or "gated" (consult the gate first)
    #[arg(long)]
    mode: String,

    /// Path to the JSONL workload file
    #[arg(long)]
    workload: PathBuf,

    /// Output path for the results JSON document
    #[arg(long)]
    out: PathBuf,

    /// TOML configuration file; defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Validate configuration and workload without running the evaluation
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays a clean summary channel
    fmt()
        .with_env_filter(EnvFilter::from_env("GATEBENCH_LOG"))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Invalid mode is rejected before anything is constructed.
    let mode = Mode::from_str(&cli.mode)?;

    let config = match &cli.config {
        Some(path) => EvalConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EvalConfig::default(),
    };

    let workload = load_workload(&cli.workload)
        .with_context(|| format!("loading workload {}", cli.workload.display()))?;

    let mut modalities: BTreeMap<&str, usize> = BTreeMap::new();
    for request in &workload {
        *modalities.entry(request.modality.as_str()).or_insert(0) += 1;
    }
    println!("Loaded {} requests", workload.len());
    for (modality, count) in &modalities {
        let percentage = *count as f64 / workload.len() as f64 * 100.0;
        println!("  {modality}: {count} requests ({percentage:.1}%)");
    }

    if cli.dry_run {
        println!("Dry run complete: configuration and workload are valid");
        return Ok(());
    }

    let runner = EvaluationRunner::from_config(&config).await?;
    let gate_info = runner.gate_info().await;
    tracing::info!(gate = %gate_info, "Gate initialized");

    let started_at = Utc::now();
    println!("Running evaluation in {mode} mode...");

    let results = runner.run(&workload, mode).await?;
    let finished_at = Utc::now();

    let metrics = metrics::calculate(&results, &runner.model_info(), &config.measurement);

    let document = json!({
        "metadata": {
            "mode": mode,
            "workload_path": cli.workload,
            "config_path": cli.config,
            "started_at": started_at,
            "finished_at": finished_at,
            "total_requests": workload.len(),
            "renderer_config": runner.renderer_config(),
            "version": env!("CARGO_PKG_VERSION"),
        },
        "results": results,
        "metrics": metrics,
    });

    std::fs::write(&cli.out, serde_json::to_string_pretty(&document)?)
        .with_context(|| format!("writing results to {}", cli.out.display()))?;

    println!("Results saved to {}", cli.out.display());
    println!("  requests processed: {}", results.len());
    if let Some(metrics) = &metrics {
        println!("  mean latency: {:.2} ms", metrics.latency.mean);
        println!(
            "  renderer invocation rate: {:.1}%",
            metrics.invocation.transformer_rate * 100.0
        );
    }

    Ok(())
}
