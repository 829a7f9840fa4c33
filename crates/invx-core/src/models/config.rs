//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};

/// Main configuration for the invx pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Model selection and HTTP client settings.
    pub llm: LlmConfig,

    /// PDF mining and rasterization configuration.
    pub pdf: PdfConfig,

    /// Normalization configuration.
    pub extraction: ExtractionConfig,
}

/// Which prompt the vision stage sends with the page image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisionPrompt {
    /// Formal tax invoice.
    #[default]
    Invoice,
    /// Retail POS receipt.
    Receipt,
    /// Let the model decide between invoice and receipt.
    AutoDetect,
}

/// Model configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Model used for text-stage extraction.
    pub text_model: String,

    /// Model used for vision-stage extraction.
    pub vision_model: String,

    /// Prompt variant for the vision stage.
    pub vision_prompt: VisionPrompt,

    /// Base URL of an OpenAI-compatible API.
    pub base_url: String,

    /// Environment variable holding the API key.
    pub api_key_env: String,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Sampling temperature.
    pub temperature: f32,

    /// Maximum tokens in the model answer.
    pub max_tokens: u32,
}

/// Default model for both stages.
pub const DEFAULT_MODEL: &str = "anthropic/claude-3.5-sonnet";

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            text_model: DEFAULT_MODEL.to_string(),
            vision_model: DEFAULT_MODEL.to_string(),
            vision_prompt: VisionPrompt::Invoice,
            base_url: "https://openrouter.ai/api/v1".to_string(),
            api_key_env: "INVX_API_KEY".to_string(),
            timeout_secs: 120,
            temperature: 0.0,
            max_tokens: 4096,
        }
    }
}

/// PDF processing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// DPI for rendering PDF pages to images.
    pub render_dpi: u32,

    /// JPEG quality for rendered pages.
    pub jpeg_quality: u8,

    /// First-choice rendering tool.
    pub primary_renderer: String,

    /// Tool tried when the first one is missing or fails.
    pub fallback_renderer: String,

    /// Minimum share of allow-listed characters for a decoded string to be kept.
    pub printable_ratio: f64,

    /// How many following lines `find_near` inspects.
    pub near_label_distance: usize,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            render_dpi: 100,
            jpeg_quality: 80,
            primary_renderer: "pdftoppm".to_string(),
            fallback_renderer: "convert".to_string(),
            printable_ratio: 0.5,
            near_label_distance: 3,
        }
    }
}

/// Normalization configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Currency used when the model does not report one.
    pub default_currency: String,

    /// Replace the model's stated invoice totals with totals recomputed from line items.
    pub recompute_totals: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            default_currency: crate::models::invoice::DEFAULT_CURRENCY.to_string(),
            recompute_totals: false,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}
