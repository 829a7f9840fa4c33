//! Extraction orchestrator.
//!
//! XML goes straight to the XML registry. PDFs try the text stage (mine text,
//! ask the model) and fall back to the vision stage (rasterize, send the
//! first page image). Bare images only run the vision stage.

mod detect;

pub use detect::{Format, detect_format, image_dimensions, sniff_image_mime};

use std::io::Read;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::context::CallContext;
use crate::error::ExtractError;
use crate::llm::{LlmExtractor, ModelClient};
use crate::models::config::PipelineConfig;
use crate::models::invoice::Invoice;
use crate::pdf::{ExternalRasterizer, PdfMiner, Rasterizer, TextMiner};
use crate::xml::{XmlParser, XmlRegistry};

/// MIME type that marks input as a PDF for the vision stage.
pub const PDF_MIME: &str = "application/pdf";

/// How an invoice was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    Xml,
    LlmText,
    LlmVision,
}

impl ExtractionMethod {
    /// Fixed reliability attached to results from this method.
    pub fn confidence(self) -> f64 {
        match self {
            ExtractionMethod::Xml => 1.0,
            ExtractionMethod::LlmText => 0.85,
            ExtractionMethod::LlmVision => 0.80,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExtractionMethod::Xml => "xml",
            ExtractionMethod::LlmText => "llm_text",
            ExtractionMethod::LlmVision => "llm_vision",
        }
    }
}

/// A successful extraction.
#[derive(Debug, Clone, Serialize)]
pub struct Extraction {
    pub invoice: Invoice,
    pub method: ExtractionMethod,
    pub confidence: f64,
    /// Problems met on the way, e.g. a failed text stage before vision succeeded.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// A failed extraction.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct ExtractionFailure {
    pub error: ExtractError,
    pub warnings: Vec<String>,
}

impl From<ExtractError> for ExtractionFailure {
    fn from(error: ExtractError) -> Self {
        Self {
            error,
            warnings: Vec::new(),
        }
    }
}

/// Outcome of one `process*` call.
pub type ProcessResult = std::result::Result<Extraction, ExtractionFailure>;

/// A stage failure and the warning it leaves behind.
type StageResult = std::result::Result<Invoice, (ExtractError, String)>;

/// The extraction orchestrator.
///
/// Holds only read-only collaborators, so one pipeline can serve concurrent
/// callers.
pub struct Pipeline {
    config: PipelineConfig,
    xml: XmlRegistry,
    miner: Arc<dyn TextMiner>,
    rasterizer: Arc<dyn Rasterizer>,
    llm: Option<LlmExtractor>,
}

impl Pipeline {
    /// Create a pipeline with the bundled PDF miner and rasterizer and no
    /// model client or XML parsers.
    pub fn new(config: PipelineConfig) -> Self {
        let miner = Arc::new(PdfMiner::from_config(&config.pdf));
        let rasterizer = Arc::new(ExternalRasterizer::new(&config.pdf));
        Self {
            config,
            xml: XmlRegistry::new(),
            miner,
            rasterizer,
            llm: None,
        }
    }

    /// Use `client` for model-based extraction.
    pub fn with_model_client(mut self, client: Arc<dyn ModelClient>) -> Self {
        self.llm = Some(LlmExtractor::new(client, &self.config.llm, &self.config.extraction));
        self
    }

    pub fn with_xml_parser(mut self, parser: Arc<dyn XmlParser>) -> Self {
        self.xml.register(parser);
        self
    }

    pub fn with_xml_registry(mut self, registry: XmlRegistry) -> Self {
        self.xml = registry;
        self
    }

    pub fn with_text_miner(mut self, miner: Arc<dyn TextMiner>) -> Self {
        self.miner = miner;
        self
    }

    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn Rasterizer>) -> Self {
        self.rasterizer = rasterizer;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Detect the input format and run the matching operation.
    pub fn process(&self, ctx: &CallContext, data: &[u8], mime: &str) -> ProcessResult {
        let format = detect_format(data);
        debug!("Detected {} input ({} bytes)", format, data.len());

        match format {
            Format::Xml => self.process_xml(data),
            Format::Pdf => self.process_pdf(ctx, data, mime),
            Format::Image => self.process_image(ctx, data, mime),
            Format::Unknown => Err(ExtractError::UnsupportedInput(format!(
                "unrecognized format ({} bytes)",
                data.len()
            ))
            .into()),
        }
    }

    /// Parse an XML e-invoice. There is no model fallback on this path.
    pub fn process_xml(&self, data: &[u8]) -> ProcessResult {
        let invoice = self.xml.parse(data).map_err(ExtractError::XmlParse)?;
        Ok(self.finish(invoice, ExtractionMethod::Xml, Vec::new(), data))
    }

    pub fn process_xml_reader<R: Read>(&self, mut reader: R) -> ProcessResult {
        let mut data = Vec::new();
        reader.read_to_end(&mut data).map_err(ExtractError::Read)?;
        self.process_xml(&data)
    }

    /// Extract from a PDF: text stage first, vision stage on failure.
    pub fn process_pdf(&self, ctx: &CallContext, data: &[u8], mime: &str) -> ProcessResult {
        let llm = self
            .llm
            .as_ref()
            .ok_or(ExtractError::ExtractorUnavailable("PDF"))?;

        let text_err = match self.text_stage(ctx, llm, data) {
            Ok(invoice) => return Ok(self.finish(invoice, ExtractionMethod::LlmText, Vec::new(), data)),
            Err(failure) => failure,
        };
        warn!("Text stage failed, falling back to vision: {}", text_err.0);

        if ctx.is_done() {
            warn!("Call context is already done; running the vision stage anyway");
        }

        let mut warnings = vec![text_err.1];
        match self.vision_stage(ctx, llm, data, mime) {
            Ok(invoice) => Ok(self.finish(invoice, ExtractionMethod::LlmVision, warnings, data)),
            Err((vision_err, warning)) => {
                warn!("Vision stage failed: {}", vision_err);
                warnings.push(warning);
                Err(ExtractionFailure {
                    error: ExtractError::Composite {
                        text: Box::new(text_err.0),
                        vision: Box::new(vision_err),
                    },
                    warnings,
                })
            }
        }
    }

    pub fn process_pdf_reader<R: Read>(&self, ctx: &CallContext, mut reader: R, mime: &str) -> ProcessResult {
        let mut data = Vec::new();
        reader.read_to_end(&mut data).map_err(ExtractError::Read)?;
        self.process_pdf(ctx, &data, mime)
    }

    /// Extract from an image with the vision stage only.
    pub fn process_image(&self, ctx: &CallContext, data: &[u8], mime: &str) -> ProcessResult {
        let llm = self
            .llm
            .as_ref()
            .ok_or(ExtractError::ExtractorUnavailable("image"))?;

        match self.vision_stage(ctx, llm, data, mime) {
            Ok(invoice) => Ok(self.finish(invoice, ExtractionMethod::LlmVision, Vec::new(), data)),
            Err((error, warning)) => Err(ExtractionFailure {
                error,
                warnings: vec![warning],
            }),
        }
    }

    fn text_stage(&self, ctx: &CallContext, llm: &LlmExtractor, data: &[u8]) -> StageResult {
        let mined = self.miner.mine(data).map_err(|e| {
            let warning = format!("PDF text extraction failed: {}", e);
            (ExtractError::from(e), warning)
        })?;

        if mined.is_empty() {
            return Err((
                ExtractError::NoExtractableText,
                "PDF contains no extractable text".to_string(),
            ));
        }

        debug!("Text stage: {} chars from {} pages", mined.raw_text.len(), mined.page_count);
        llm.extract_from_ocr_text(ctx, &mined.raw_text).map_err(|e| {
            let warning = format!("LLM text extraction failed: {}", e);
            (e, warning)
        })
    }

    fn vision_stage(&self, ctx: &CallContext, llm: &LlmExtractor, data: &[u8], mime: &str) -> StageResult {
        let rendered;
        let (image, image_mime): (&[u8], &str) = if mime == PDF_MIME || data.starts_with(b"%PDF") {
            rendered = self.rasterizer.rasterize(ctx, data).map_err(|e| {
                let warning = format!("PDF to image conversion failed: {}", e);
                (e, warning)
            })?;
            let first = rendered.first().ok_or_else(|| {
                (
                    ExtractError::NoImagesProduced,
                    format!("PDF to image conversion failed: {}", ExtractError::NoImagesProduced),
                )
            })?;
            debug!("Vision stage: using first of {} page images", rendered.len());
            (first.as_slice(), sniff_image_mime(first))
        } else if mime.is_empty() {
            (data, sniff_image_mime(data))
        } else {
            (data, mime)
        };

        llm.extract_from_image(ctx, image, image_mime, self.config.llm.vision_prompt)
            .map_err(|e| {
                let warning = format!("LLM vision extraction failed: {}", e);
                (e, warning)
            })
    }

    fn finish(&self, mut invoice: Invoice, method: ExtractionMethod, warnings: Vec<String>, data: &[u8]) -> Extraction {
        if invoice.raw_source.is_empty() {
            invoice.raw_source = data.to_vec();
        }
        info!(
            "Extracted invoice {:?} via {} ({} items)",
            invoice.header.number,
            method.as_str(),
            invoice.items.len()
        );
        Extraction {
            invoice,
            method,
            confidence: method.confidence(),
            warnings,
        }
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("xml", &self.xml)
            .field("llm", &self.llm)
            .finish_non_exhaustive()
    }
}
