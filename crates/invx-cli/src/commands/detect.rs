//! Detect command - report what kind of document a file is.

use std::fs;
use std::path::PathBuf;

use clap::Args;
use serde_json::json;

use invx_core::{Format, detect_format, image_dimensions};

/// Arguments for the detect command.
#[derive(Args)]
pub struct DetectArgs {
    /// Files to inspect
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Print one JSON object per file
    #[arg(long)]
    json: bool,
}

pub async fn run(args: DetectArgs) -> anyhow::Result<()> {
    for input in &args.inputs {
        let data = fs::read(input)
            .map_err(|e| anyhow::anyhow!("Cannot read {}: {}", input.display(), e))?;
        let format = detect_format(&data);
        let dimensions = match format {
            Format::Image => image_dimensions(&data),
            _ => None,
        };

        if args.json {
            let report = json!({
                "path": input.display().to_string(),
                "format": format,
                "bytes": data.len(),
                "width": dimensions.map(|(w, _)| w),
                "height": dimensions.map(|(_, h)| h),
            });
            println!("{}", serde_json::to_string(&report)?);
        } else {
            let mut line = format!("{}: {} ({} bytes)", input.display(), format, data.len());
            if let Some((width, height)) = dimensions {
                line.push_str(&format!(", {}x{}", width, height));
            }
            println!("{}", line);
        }
    }

    Ok(())
}
