//! Process command - run one submission through the pipeline.

use std::time::Instant;

use clap::Args;
use console::style;
use serde_json::{Value, json};
use tracing::{debug, info};

use marksheet_core::{DocumentRef, SupabaseStore};

use super::{OutputFormat, build_pipeline, error_json, extracted_json, format_fields, load_config, spinner};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Submission record to update
    #[arg(long)]
    submission_id: String,

    /// URL of the uploaded marksheet
    #[arg(long)]
    file_url: String,

    /// Extract only; do not update the record store
    #[arg(long)]
    dry_run: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    // Fail on missing store credentials before any download.
    let store = if args.dry_run {
        None
    } else {
        Some(SupabaseStore::from_config(&config.store)?)
    };

    let pipeline = build_pipeline(&config)?;
    let request = DocumentRef::new(args.submission_id, args.file_url);

    info!("Processing submission {}", request.submission_id);
    let pb = spinner("Extracting marksheet...")?;

    let outcome = match &store {
        Some(store) => pipeline
            .run_and_store(&request, store, &config.store.verified_status)
            .await,
        None => pipeline.run(&request).await.map(|report| (report, Value::Null)),
    };

    pb.finish_and_clear();

    match outcome {
        Ok((report, updated)) => {
            match args.format {
                OutputFormat::Json => {
                    let body = json!({
                        "ok": true,
                        "extracted": extracted_json(&report.fields),
                        "updated": updated,
                    });
                    println!("{}", serde_json::to_string(&body)?);
                }
                OutputFormat::Text => {
                    print!("{}", format_fields(&report.fields));
                    println!();
                    if report.attempt.is_degraded() {
                        println!(
                            "{} Defaults used for: {}",
                            style("ℹ").blue(),
                            report.attempt.defaulted_fields.join(", ")
                        );
                    }
                    if store.is_some() {
                        println!(
                            "{} Submission {} updated",
                            style("✓").green(),
                            report.submission_id
                        );
                    }
                }
            }
            debug!("Total processing time: {:?}", start.elapsed());
            Ok(())
        }
        Err(err) => {
            match args.format {
                OutputFormat::Json => println!("{}", serde_json::to_string(&error_json(&err))?),
                OutputFormat::Text => eprintln!("{} {}", style("✗").red(), err),
            }
            Err(err.into())
        }
    }
}
