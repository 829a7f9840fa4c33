//! PDF processing module.
//!
//! Two concerns live here: best-effort text mining over raw content streams
//! and rasterizing pages to images for the vision stage. Both sit behind
//! traits so the pipeline can be driven with other implementations.

mod extractor;
mod raster;
pub mod strings;
mod text;

pub use extractor::PdfMiner;
pub use raster::ExternalRasterizer;
pub use text::{MinedText, MiningPath, PageText, is_label, split_into_lines};

use crate::context::CallContext;
use crate::error::PdfError;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// Recovers readable text from raw PDF bytes.
pub trait TextMiner: Send + Sync {
    /// Mine text from a PDF held in memory.
    fn mine(&self, data: &[u8]) -> Result<MinedText>;
}

/// Renders PDF pages to encoded raster images.
pub trait Rasterizer: Send + Sync {
    /// Render every page, in page order.
    ///
    /// The returned images are encoded files (JPEG or PNG), not pixel buffers.
    fn rasterize(&self, ctx: &CallContext, data: &[u8]) -> crate::Result<Vec<Vec<u8>>>;
}
