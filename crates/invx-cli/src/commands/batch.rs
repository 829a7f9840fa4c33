//! Batch processing command for multiple invoice files.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, warn};

use invx_core::{CallContext, Extraction, ExtractionFailure, Pipeline};

use super::process::{OutputFormat, format_invoice};
use super::{build_pipeline, load_config, mime_for_path};

const EXTENSIONS: &[&str] = &["xml", "pdf", "png", "jpg", "jpeg", "tif", "tiff"];

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input files or glob pattern
    #[arg(required = true)]
    input: String,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Per-file time limit in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

/// Result of processing a single file.
struct FileResult {
    path: PathBuf,
    extraction: Option<Extraction>,
    error: Option<String>,
    error_kind: &'static str,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            let ext = p.extension().and_then(|e| e.to_str()).unwrap_or("");
            EXTENSIONS.contains(&ext.to_lowercase().as_str())
        })
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!("{} Found {} files to process", style("ℹ").blue(), files.len());

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let timeout = args.timeout;
    let continue_on_error = args.continue_on_error;
    let worker_pb = pb.clone();
    let results = tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<FileResult>> {
        let pipeline = build_pipeline(config)?;
        let mut results = Vec::with_capacity(files.len());

        for path in files {
            let file_start = Instant::now();
            let outcome = process_single_file(&pipeline, &path, timeout);
            let processing_time_ms = file_start.elapsed().as_millis() as u64;

            match outcome {
                Ok(extraction) => results.push(FileResult {
                    path,
                    extraction: Some(extraction),
                    error: None,
                    error_kind: "",
                    processing_time_ms,
                }),
                Err(e) if continue_on_error => {
                    warn!("Failed to process {}: {}", path.display(), e);
                    results.push(FileResult {
                        path,
                        extraction: None,
                        error: Some(e.to_string()),
                        error_kind: e
                            .downcast_ref::<ExtractionFailure>()
                            .map_or("io_failure", |failure| failure.error.kind()),
                        processing_time_ms,
                    });
                }
                Err(e) => {
                    error!("Failed to process {}: {}", path.display(), e);
                    anyhow::bail!("Processing failed for {}: {}", path.display(), e);
                }
            }

            worker_pb.inc(1);
        }

        Ok(results)
    })
    .await??;

    pb.finish_with_message("Complete");

    let successful: Vec<_> = results.iter().filter(|r| r.extraction.is_some()).collect();
    let failed: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();

    if let Some(output_dir) = &args.output_dir {
        for result in &successful {
            if let Some(extraction) = &result.extraction {
                let output_path = output_dir.join(output_file_name(&result.path, args.format));
                fs::write(&output_path, format_invoice(&extraction.invoice, args.format)?)?;
                debug!("Wrote output to {}", output_path.display());
            }
        }
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &results)?;
        println!("{} Summary written to {}", style("✓").green(), summary_path.display());
    }

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(successful.len()).green(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for result in &failed {
            println!(
                "  - {}: {}",
                result.path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

/// Output name for one input: the full input file name plus the format
/// extension, so `a.pdf` and `a.xml` never share an output file.
fn output_file_name(path: &Path, format: OutputFormat) -> String {
    let name = path.file_name().and_then(|s| s.to_str()).unwrap_or("invoice");
    format!("{}.{}", name, format.extension())
}

fn process_single_file(pipeline: &Pipeline, path: &Path, timeout: Option<u64>) -> anyhow::Result<Extraction> {
    let data = fs::read(path)?;
    let ctx = match timeout {
        Some(secs) => CallContext::with_timeout(Duration::from_secs(secs)),
        None => CallContext::background(),
    };

    let mut extraction = pipeline.process(&ctx, &data, mime_for_path(path)).map_err(|failure| {
        for warning in &failure.warnings {
            debug!("{}: {}", path.display(), warning);
        }
        anyhow::Error::new(failure)
    })?;

    extraction.invoice.source_file = path.display().to_string();
    Ok(extraction)
}

fn write_summary(path: &Path, results: &[FileResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "method",
        "confidence",
        "invoice_number",
        "date",
        "seller_name",
        "seller_tax_id",
        "total",
        "currency",
        "warnings",
        "processing_time_ms",
        "error_kind",
        "error",
    ])?;

    for result in results {
        let filename = result.path.file_name().and_then(|s| s.to_str()).unwrap_or("");
        let time = result.processing_time_ms.to_string();

        if let Some(extraction) = &result.extraction {
            let invoice = &extraction.invoice;
            wtr.write_record([
                filename,
                "success",
                extraction.method.as_str(),
                &format!("{:.2}", extraction.confidence),
                &invoice.header.number,
                &invoice.header.date.map(|d| d.to_string()).unwrap_or_default(),
                &invoice.seller.name,
                &invoice.seller.tax_id,
                &invoice.summary.total.to_string(),
                &invoice.header.currency,
                &extraction.warnings.join("; "),
                &time,
                "",
                "",
            ])?;
        } else {
            wtr.write_record([
                filename,
                "error",
                "",
                "",
                "",
                "",
                "",
                "",
                "",
                "",
                "",
                &time,
                result.error_kind,
                result.error.as_deref().unwrap_or(""),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}
