//! Calc command - recompute an invoice's line items and totals.

use std::fs;
use std::path::PathBuf;

use clap::Args;
use console::style;

use invx_core::Invoice;

use super::process::{OutputFormat, format_invoice};

/// Arguments for the calc command.
#[derive(Args)]
pub struct CalcArgs {
    /// Invoice JSON in the canonical model
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,
}

pub async fn run(args: CalcArgs) -> anyhow::Result<()> {
    let content = fs::read_to_string(&args.input)?;
    let mut invoice: Invoice = serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Invalid invoice JSON in {}: {}", args.input.display(), e))?;

    let stated = invoice.summary.total;
    invoice.calculate_totals()?;
    if stated != invoice.summary.total {
        eprintln!(
            "{} Stated total {} differs from computed total {}",
            style("!").yellow(),
            stated,
            invoice.summary.total
        );
    }

    let output = format_invoice(&invoice, args.format)?;
    match &args.output {
        Some(path) => fs::write(path, output)?,
        None => println!("{}", output),
    }

    Ok(())
}
