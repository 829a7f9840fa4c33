//! Process command - extract data from a single invoice file.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use invx_core::{CallContext, Extraction, Invoice};

use super::{build_pipeline, load_config, mime_for_path};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (XML, PDF or image)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Give up after this many seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Show extraction method and confidence
    #[arg(long)]
    show_confidence: bool,

    /// Validate extracted data
    #[arg(long)]
    validate: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());
    let data = fs::read(&args.input)?;
    let mime = mime_for_path(&args.input);
    let ctx = match args.timeout {
        Some(secs) => CallContext::with_timeout(Duration::from_secs(secs)),
        None => CallContext::background(),
    };

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.set_message("Extracting...");
    pb.enable_steady_tick(Duration::from_millis(120));

    let source = args.input.display().to_string();
    let result = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
        let pipeline = build_pipeline(config)?;
        Ok(pipeline.process(&ctx, &data, mime))
    })
    .await??;

    pb.finish_and_clear();

    let mut extraction = match result {
        Ok(extraction) => extraction,
        Err(failure) => {
            print_warnings(&failure.warnings);
            anyhow::bail!("Extraction failed for {}: {}", source, failure.error);
        }
    };
    extraction.invoice.source_file = source;
    print_warnings(&extraction.warnings);

    if args.validate {
        let issues = extraction.invoice.validate();
        if !issues.is_empty() {
            eprintln!("{}", style("Validation issues:").yellow());
            for issue in &issues {
                eprintln!("  - {}", issue);
            }
        }
    }

    let output = format_invoice(&extraction.invoice, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!("{} Output written to {}", style("✓").green(), output_path.display());
    } else {
        println!("{}", output);
    }

    if args.show_confidence {
        print_confidence(&extraction);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

fn print_warnings(warnings: &[String]) {
    for warning in warnings {
        eprintln!("{} {}", style("!").yellow(), warning);
    }
}

fn print_confidence(extraction: &Extraction) {
    println!();
    println!("{} Extraction method: {}", style("ℹ").blue(), extraction.method.as_str());
    println!(
        "{} Extraction confidence: {:.1}%",
        style("ℹ").blue(),
        extraction.confidence * 100.0
    );
}

pub fn format_invoice(invoice: &Invoice, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(invoice)?),
        OutputFormat::Csv => format_csv(invoice),
        OutputFormat::Text => Ok(format_text(invoice)),
    }
}

fn format_csv(invoice: &Invoice) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "invoice_number",
        "series",
        "date",
        "seller_name",
        "seller_tax_id",
        "buyer_name",
        "buyer_tax_id",
        "subtotal",
        "tax",
        "total",
        "currency",
    ])?;

    wtr.write_record([
        invoice.header.number.as_str(),
        invoice.header.series.as_str(),
        &invoice.header.date.map(|d| d.to_string()).unwrap_or_default(),
        invoice.seller.name.as_str(),
        invoice.seller.tax_id.as_str(),
        invoice.buyer.name.as_str(),
        invoice.buyer.tax_id.as_str(),
        &invoice.summary.subtotal.to_string(),
        &invoice.summary.tax.to_string(),
        &invoice.summary.total.to_string(),
        invoice.header.currency.as_str(),
    ])?;

    Ok(String::from_utf8(wtr.into_inner()?)?)
}

fn format_text(invoice: &Invoice) -> String {
    let mut output = String::new();
    let currency = &invoice.header.currency;

    output.push_str(&format!("Invoice: {}", invoice.header.number));
    if !invoice.header.series.is_empty() {
        output.push_str(&format!(" (series {})", invoice.header.series));
    }
    output.push('\n');
    match invoice.header.date {
        Some(date) => output.push_str(&format!("Date: {}\n", date.format("%d/%m/%Y"))),
        None => output.push_str("Date: unknown\n"),
    }
    output.push('\n');

    for (title, party) in [("Seller", &invoice.seller), ("Buyer", &invoice.buyer)] {
        if party.is_empty() {
            continue;
        }
        output.push_str(&format!("{}:\n", title));
        output.push_str(&format!("  {}\n", party.name));
        if !party.tax_id.is_empty() {
            output.push_str(&format!("  MST: {}\n", party.tax_id));
        }
        if !party.address.is_empty() {
            output.push_str(&format!("  {}\n", party.address));
        }
        output.push('\n');
    }

    if !invoice.items.is_empty() {
        output.push_str("Items:\n");
        for item in &invoice.items {
            output.push_str(&format!(
                "  {}. {} - {} {} x {} = {} (VAT {})\n",
                item.number,
                item.name,
                item.quantity,
                item.unit,
                item.unit_price,
                item.total,
                item.vat_rate.display()
            ));
        }
        output.push('\n');
    }

    output.push_str("Summary:\n");
    output.push_str(&format!("  Subtotal: {} {}\n", invoice.summary.subtotal, currency));
    output.push_str(&format!("  VAT:      {} {}\n", invoice.summary.tax, currency));
    output.push_str(&format!("  Total:    {} {}\n", invoice.summary.total, currency));

    if let Some(method) = &invoice.summary.payment_method {
        output.push_str(&format!("\nPayment: {}\n", method));
    }

    output
}
