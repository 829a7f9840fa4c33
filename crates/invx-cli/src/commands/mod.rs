//! Subcommands and the helpers they share.

pub mod batch;
pub mod calc;
pub mod config;
pub mod detect;
pub mod mine;
pub mod process;

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use invx_core::{PDF_MIME, Pipeline, PipelineConfig};

use crate::llm::HttpModelClient;

/// Load the configuration named on the command line, or the default file if
/// it exists, or the built-in defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<PipelineConfig> {
    if let Some(path) = config_path {
        return Ok(PipelineConfig::from_file(Path::new(path))?);
    }

    let default_path = config::default_config_path();
    if default_path.exists() {
        debug!("Loading configuration from {}", default_path.display());
        Ok(PipelineConfig::from_file(&default_path)?)
    } else {
        Ok(PipelineConfig::default())
    }
}

/// Build a pipeline, attaching the HTTP model client when an API key is set.
///
/// Must run off the async runtime: the model client blocks.
pub fn build_pipeline(config: PipelineConfig) -> anyhow::Result<Pipeline> {
    let client = HttpModelClient::from_env(&config.llm)?;
    let pipeline = Pipeline::new(config);

    Ok(match client {
        Some(client) => pipeline.with_model_client(Arc::new(client)),
        None => {
            warn!("{}", missing_key_warning(&pipeline.config().llm.api_key_env));
            pipeline
        }
    })
}

fn missing_key_warning(api_key_env: &str) -> String {
    format!(
        "{} is not set; model-based extraction of PDF and image input is disabled",
        api_key_env
    )
}

/// MIME type implied by a file extension, empty when unknown.
pub fn mime_for_path(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "pdf" => PDF_MIME,
        "xml" => "application/xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "tif" | "tiff" => "image/tiff",
        _ => "",
    }
}
