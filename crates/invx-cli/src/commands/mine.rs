//! Mine command - show the text embedded in a PDF.

use std::fs;
use std::path::PathBuf;

use clap::Args;
use console::style;
use tracing::info;

use invx_core::{PdfMiner, TextMiner};

use super::load_config;

/// Arguments for the mine command.
#[derive(Args)]
pub struct MineArgs {
    /// Input PDF
    #[arg(required = true)]
    input: PathBuf,

    /// Print the value next to this label instead of the text (repeatable)
    #[arg(long = "find", value_name = "LABEL")]
    labels: Vec<String>,

    /// Print every match of this regular expression
    #[arg(long, value_name = "REGEX")]
    pattern: Option<String>,

    /// Print non-blank lines with their page numbers
    #[arg(long)]
    pages: bool,
}

pub async fn run(args: MineArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let data = fs::read(&args.input)?;

    let mined = PdfMiner::from_config(&config.pdf).mine(&data)?;
    info!(
        "Mined {} chars from {} pages via {:?}",
        mined.raw_text.len(),
        mined.page_count,
        mined.path
    );

    if mined.is_empty() {
        anyhow::bail!("PDF contains no extractable text: {}", args.input.display());
    }

    if !args.labels.is_empty() {
        for label in &args.labels {
            match mined.find_near(label, config.pdf.near_label_distance) {
                Some(value) => println!("{}: {}", label, value),
                None => eprintln!("{} {}: not found", style("!").yellow(), label),
            }
        }
        return Ok(());
    }

    if let Some(pattern) = &args.pattern {
        for found in mined.find_pattern(pattern)? {
            println!("{}", found);
        }
        return Ok(());
    }

    if args.pages {
        for page in &mined.pages {
            for line in &page.lines {
                println!("{:>3}  {}", page.number, line);
            }
        }
    } else {
        print!("{}", mined.raw_text);
    }

    Ok(())
}
