//! Core library for Vietnamese invoice extraction.
//!
//! This crate provides:
//! - Invoice/receipt data models and pipeline configuration
//! - Deterministic VND arithmetic for line items and totals
//! - Heuristic PDF text mining and page rasterization
//! - Normalization of model answers into canonical invoices
//! - The extraction pipeline that sequences XML, text and vision strategies

pub mod context;
pub mod error;
pub mod invoice;
pub mod llm;
pub mod models;
pub mod pdf;
pub mod pipeline;
pub mod xml;

pub use context::CallContext;
pub use error::{CalcError, ExtractError, PdfError, Result};
pub use invoice::round_vnd;
pub use llm::{LlmExtractor, ModelClient, ModelError};
pub use models::config::{PipelineConfig, VisionPrompt};
pub use models::invoice::{
    DocumentType, Invoice, InvoiceHeader, InvoiceSummary, InvoiceType, LineItem, Party, Provider,
    ReceiptDetails, VatRate,
};
pub use pdf::{ExternalRasterizer, MinedText, PdfMiner, Rasterizer, TextMiner};
pub use pipeline::{
    Extraction, ExtractionFailure, ExtractionMethod, Format, PDF_MIME, Pipeline, ProcessResult,
    detect_format, image_dimensions, sniff_image_mime,
};
pub use xml::{XmlParser, XmlRegistry};
