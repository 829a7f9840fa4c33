//! Error types for the invx-core library.

use thiserror::Error;

/// Main error type for invoice extraction.
///
/// Every failure the pipeline can produce is represented here as a value;
/// nothing in the core panics on bad input.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Reading the input failed.
    #[error("failed to read input: {0}")]
    Read(#[from] std::io::Error),

    /// The XML collaborator rejected the document.
    #[error("XML parsing failed: {0}")]
    XmlParse(String),

    /// No model client is configured, so model-based extraction cannot run.
    #[error("LLM extractor not configured - required for {0} processing")]
    ExtractorUnavailable(&'static str),

    /// The text miner produced no usable text.
    #[error("no text extracted from PDF")]
    NoExtractableText,

    /// The model call itself failed.
    #[error("LLM request failed: {0}")]
    ModelCall(String),

    /// The model answered but the answer could not be turned into an invoice.
    #[error("failed to parse LLM response: {0}")]
    ResponseDecode(String),

    /// Rasterizing the PDF failed.
    #[error("failed to convert PDF to images: {0}")]
    Render(String),

    /// Rasterizing finished without writing any page image.
    #[error("no images generated from PDF")]
    NoImagesProduced,

    /// The input is not XML, PDF or a supported image.
    #[error("unsupported input: {0}")]
    UnsupportedInput(String),

    /// Structural PDF failure.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// Both PDF stages failed.
    #[error("PDF extraction failed (text: {text}, vision: {vision})")]
    Composite {
        text: Box<ExtractError>,
        vision: Box<ExtractError>,
    },
}

/// Errors related to PDF structure and content streams.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to pull content streams out of the document.
    #[error("failed to extract content: {0}")]
    ContentExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,
}

/// Errors raised by the decimal invoice calculator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalcError {
    /// An intermediate value does not fit the decimal representation.
    #[error("decimal overflow while computing {field} of line {line}")]
    Overflow { field: &'static str, line: u32 },

    /// An invoice-level sum does not fit the decimal representation.
    #[error("decimal overflow while computing invoice {0}")]
    TotalOverflow(&'static str),
}

impl From<CalcError> for ExtractError {
    fn from(err: CalcError) -> Self {
        ExtractError::ResponseDecode(err.to_string())
    }
}

impl ExtractError {
    /// Short, stable name of the failure kind, used in logs and CSV summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            ExtractError::Read(_) => "read_failure",
            ExtractError::XmlParse(_) => "xml_parse_failure",
            ExtractError::ExtractorUnavailable(_) => "extractor_unavailable",
            ExtractError::NoExtractableText => "no_extractable_text",
            ExtractError::ModelCall(_) => "model_call_failure",
            ExtractError::ResponseDecode(_) => "response_decode_failure",
            ExtractError::Render(_) => "render_failure",
            ExtractError::NoImagesProduced => "no_images_produced",
            ExtractError::UnsupportedInput(_) => "unsupported_input",
            ExtractError::Pdf(_) => "pdf_failure",
            ExtractError::Composite { .. } => "composite_failure",
        }
    }
}

/// Result type for the invx library.
pub type Result<T> = std::result::Result<T, ExtractError>;
