//! Extract command - run a local file through extraction and inference.

use std::fs;
use std::path::PathBuf;

use clap::Args;
use console::style;
use serde_json::json;
use tracing::info;

use marksheet_core::{FormatHint, RawDocument};

use super::{OutputFormat, build_pipeline, error_json, extracted_json, format_fields, load_config, spinner};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Input file (PDF or image)
    #[arg(required = true)]
    input: PathBuf,

    /// Declared content type (default: inferred from the file name)
    #[arg(long)]
    content_type: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let config = load_config(config_path)?;
    let pipeline = build_pipeline(&config)?;

    let data = fs::read(&args.input)?;
    let file_name = args
        .input
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string);
    let document = RawDocument::new(data, FormatHint::new(args.content_type, file_name));

    info!("Extracting {} ({} bytes)", args.input.display(), document.len());
    let pb = spinner("Extracting marksheet...")?;
    let outcome = pipeline.extract_fields(&document).await;
    pb.finish_and_clear();

    let (fields, attempt) = match outcome {
        Ok(result) => result,
        Err(err) => {
            match args.format {
                OutputFormat::Json => println!("{}", serde_json::to_string(&error_json(&err))?),
                OutputFormat::Text => eprintln!("{} {}", style("✗").red(), err),
            }
            return Err(err.into());
        }
    };

    match args.format {
        OutputFormat::Json => {
            let body = json!({
                "extracted": extracted_json(&fields),
                "attempt": attempt,
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        OutputFormat::Text => {
            print!("{}", format_fields(&fields));
            println!();
            println!(
                "{} Text source: {:?}, strategy: {}, {}ms",
                style("ℹ").blue(),
                attempt.text_source,
                attempt.strategy,
                attempt.processing_time_ms
            );
            if !attempt.missing_fields.is_empty() {
                println!(
                    "{} Not found: {}",
                    style("ℹ").blue(),
                    attempt.missing_fields.join(", ")
                );
            }
        }
    }

    Ok(())
}
