//! Batch command - process a list of submissions sequentially.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, warn};

use marksheet_core::{DocumentRef, SupabaseStore};

use super::{build_pipeline, error_json, extracted_json, load_config};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// JSON file holding an array of {"submission_id", "file_url"}
    #[arg(required = true)]
    input: PathBuf,

    /// Write per-submission outcomes to this file as JSON
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Extract only; do not update the record store
    #[arg(long)]
    dry_run: bool,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

/// Outcome of one submission.
#[derive(Serialize)]
struct Outcome {
    submission_id: String,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    extracted: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<Value>,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let content = fs::read_to_string(&args.input)?;
    let requests: Vec<DocumentRef> = serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Invalid request list {}: {}", args.input.display(), e))?;

    if requests.is_empty() {
        anyhow::bail!("No submissions found in {}", args.input.display());
    }

    let config = load_config(config_path)?;
    let store = if args.dry_run {
        None
    } else {
        Some(SupabaseStore::from_config(&config.store)?)
    };
    let pipeline = build_pipeline(&config)?;

    println!(
        "{} Found {} submissions to process",
        style("ℹ").blue(),
        requests.len()
    );

    let pb = ProgressBar::new(requests.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} submissions")?
            .progress_chars("=>-"),
    );

    let mut outcomes = Vec::with_capacity(requests.len());

    for request in &requests {
        let item_start = Instant::now();

        let result = match &store {
            Some(store) => pipeline
                .run_and_store(request, store, &config.store.verified_status)
                .await
                .map(|(report, _)| report),
            None => pipeline.run(request).await,
        };

        let processing_time_ms = item_start.elapsed().as_millis() as u64;

        match result {
            Ok(report) => outcomes.push(Outcome {
                submission_id: request.submission_id.clone(),
                ok: true,
                extracted: Some(extracted_json(&report.fields)),
                error: None,
                processing_time_ms,
            }),
            Err(err) => {
                if !args.continue_on_error {
                    error!("Failed to process {}: {}", request.submission_id, err);
                    pb.abandon();
                    anyhow::bail!("Processing failed for {}: {}", request.submission_id, err);
                }
                warn!("Failed to process {}: {}", request.submission_id, err);
                outcomes.push(Outcome {
                    submission_id: request.submission_id.clone(),
                    ok: false,
                    extracted: None,
                    error: Some(error_json(&err)),
                    processing_time_ms,
                });
            }
        }

        pb.inc(1);
    }

    pb.finish_with_message("Complete");

    if let Some(output) = &args.output {
        fs::write(output, serde_json::to_string_pretty(&outcomes)?)?;
        println!(
            "{} Outcomes written to {}",
            style("✓").green(),
            output.display()
        );
    }

    let failed: Vec<_> = outcomes.iter().filter(|o| !o.ok).collect();

    println!();
    println!(
        "{} Processed {} submissions in {:?}",
        style("✓").green(),
        outcomes.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(outcomes.len() - failed.len()).green(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed submissions:").red());
        for outcome in &failed {
            let reason = outcome
                .error
                .as_ref()
                .and_then(|e| e.get("error"))
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            println!("  - {}: {}", outcome.submission_id, reason);
        }
    }

    Ok(())
}
