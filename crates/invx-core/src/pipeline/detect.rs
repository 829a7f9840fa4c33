//! Input format detection and image MIME sniffing.

use std::io::Cursor;

use image::ImageReader;
use serde::Serialize;

/// Shape of an input document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Unknown,
    Xml,
    Pdf,
    Image,
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Format::Unknown => "unknown",
            Format::Xml => "xml",
            Format::Pdf => "pdf",
            Format::Image => "image",
        };
        f.write_str(name)
    }
}

const PNG_MAGIC: &[u8] = &[0x89, 0x50, 0x4E, 0x47];
const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];
const TIFF_LE_MAGIC: &[u8] = &[0x49, 0x49, 0x2A, 0x00];
const TIFF_BE_MAGIC: &[u8] = &[0x4D, 0x4D, 0x00, 0x2A];

/// Classify raw input bytes.
pub fn detect_format(data: &[u8]) -> Format {
    if data.is_empty() {
        return Format::Unknown;
    }

    let head = &data[..data.len().min(100)];
    if data[0] == b'<' || head.windows(5).any(|w| w == b"<?xml") {
        return Format::Xml;
    }

    if data.starts_with(b"%PDF") {
        return Format::Pdf;
    }

    if [PNG_MAGIC, JPEG_MAGIC, TIFF_LE_MAGIC, TIFF_BE_MAGIC]
        .iter()
        .any(|magic| data.starts_with(magic))
    {
        return Format::Image;
    }

    Format::Unknown
}

/// MIME type of an encoded page image: JPEG or PNG, defaulting to JPEG.
pub fn sniff_image_mime(data: &[u8]) -> &'static str {
    if data.starts_with(JPEG_MAGIC) {
        "image/jpeg"
    } else if data.starts_with(PNG_MAGIC) {
        "image/png"
    } else {
        "image/jpeg"
    }
}

/// Pixel dimensions of an encoded image, read from its header only.
pub fn image_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}
