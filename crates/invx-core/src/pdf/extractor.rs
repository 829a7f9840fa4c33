//! Heuristic PDF text miner built on lopdf.

use lopdf::{Document, Object, ObjectId};
use tracing::{debug, trace, warn};

use super::strings::{DEFAULT_PRINTABLE_RATIO, extract_text_from_content_stream};
use super::text::{MinedText, MiningPath, PageText};
use super::{Result, TextMiner};
use crate::error::PdfError;
use crate::models::config::PdfConfig;

/// Text miner that scans raw content streams for string literals.
///
/// Content streams are collected for the whole document first. If any of
/// them cannot be read, the page tree is walked instead and each page is
/// mined on its own, keeping page boundaries.
#[derive(Debug, Clone)]
pub struct PdfMiner {
    printable_ratio: f64,
}

impl PdfMiner {
    /// Create a new miner with the default printable ratio.
    pub fn new() -> Self {
        Self {
            printable_ratio: DEFAULT_PRINTABLE_RATIO,
        }
    }

    pub fn from_config(config: &PdfConfig) -> Self {
        Self::new().with_printable_ratio(config.printable_ratio)
    }

    pub fn with_printable_ratio(mut self, ratio: f64) -> Self {
        self.printable_ratio = ratio;
        self
    }

    fn load(&self, data: &[u8]) -> Result<Document> {
        let mut doc = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        // Handle PDFs with empty password encryption
        if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");
        }

        Ok(doc)
    }

    /// Read every content stream of every page, in page order.
    fn content_streams(&self, doc: &Document, pages: &[ObjectId]) -> Result<Vec<Vec<u8>>> {
        let mut streams = Vec::new();

        for &page_id in pages {
            for object_id in doc.get_page_contents(page_id) {
                let stream = doc
                    .get_object(object_id)
                    .and_then(Object::as_stream)
                    .map_err(|e| {
                        PdfError::ContentExtraction(format!("object {:?}: {}", object_id, e))
                    })?;

                let content = if stream.dict.has(b"Filter") {
                    stream.decompressed_content().map_err(|e| {
                        PdfError::ContentExtraction(format!("object {:?}: {}", object_id, e))
                    })?
                } else {
                    stream.content.clone()
                };
                streams.push(content);
            }
        }

        Ok(streams)
    }

    fn mine_content_streams(&self, streams: &[Vec<u8>], page_count: u32) -> MinedText {
        let mut raw_text = String::new();
        for stream in streams {
            let text = extract_text_from_content_stream(stream, self.printable_ratio);
            if !text.is_empty() {
                raw_text.push_str(&text);
                raw_text.push('\n');
            }
        }

        let pages = if raw_text.is_empty() {
            Vec::new()
        } else {
            vec![PageText::new(1, raw_text.clone())]
        };

        MinedText {
            raw_text,
            pages,
            page_count,
            path: MiningPath::ContentStreams,
        }
    }

    fn mine_page_tree(&self, doc: &Document, page_count: u32) -> MinedText {
        let mut raw_text = String::new();
        let mut pages = Vec::new();

        for (number, page_id) in doc.get_pages() {
            let content = match doc.get_page_content(page_id) {
                Ok(content) => content,
                Err(e) => {
                    trace!("Skipping page {}: {}", number, e);
                    continue;
                }
            };

            let text = extract_text_from_content_stream(&content, self.printable_ratio);
            if !text.is_empty() {
                raw_text.push_str(&text);
                raw_text.push('\n');
                pages.push(PageText::new(number, text));
            }
        }

        MinedText {
            raw_text,
            pages,
            page_count,
            path: MiningPath::PageTree,
        }
    }
}

impl Default for PdfMiner {
    fn default() -> Self {
        Self::new()
    }
}

impl TextMiner for PdfMiner {
    fn mine(&self, data: &[u8]) -> Result<MinedText> {
        let doc = self.load(data)?;

        let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
        let page_count = page_ids.len() as u32;
        if page_count == 0 {
            return Err(PdfError::NoPages);
        }
        debug!("Loaded PDF with {} pages", page_count);

        let mined = match self.content_streams(&doc, &page_ids) {
            Ok(streams) => {
                debug!("Mining {} content streams", streams.len());
                self.mine_content_streams(&streams, page_count)
            }
            Err(e) => {
                warn!("Content stream extraction failed, walking page tree: {}", e);
                self.mine_page_tree(&doc, page_count)
            }
        };

        debug!(
            "Mined {} chars from {} pages via {:?}",
            mined.raw_text.len(),
            mined.pages.len(),
            mined.path
        );
        Ok(mined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{Stream, dictionary};
    use pretty_assertions::assert_eq;

    /// Build a PDF whose pages each carry the given `Contents` objects.
    fn build_pdf(pages: Vec<Vec<Object>>) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut kids = Vec::new();
        for contents in pages {
            let content_ids: Vec<Object> = contents
                .into_iter()
                .map(|object| Object::Reference(doc.add_object(object)))
                .collect();
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
                "Contents" => content_ids,
            });
            kids.push(Object::Reference(page_id));
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    fn content(text: &[u8]) -> Object {
        Object::Stream(Stream::new(dictionary! {}, text.to_vec()))
    }

    #[test]
    fn test_mine_content_streams() {
        let pdf = build_pdf(vec![
            vec![content(b"BT /F1 12 Tf (HOA DON GTGT) Tj 0 -14 Td (Invoice No: 0000123) Tj ET")],
            vec![content(b"BT (Total: 1.100.000) Tj ET")],
        ]);

        let mined = PdfMiner::new().mine(&pdf).unwrap();
        assert_eq!(mined.path, MiningPath::ContentStreams);
        assert_eq!(mined.page_count, 2);
        assert_eq!(
            mined.raw_text,
            "HOA DON GTGT Invoice No: 0000123\nTotal: 1.100.000\n"
        );
        assert_eq!(mined.pages.len(), 1);
        assert_eq!(mined.pages[0].number, 1);
        assert_eq!(mined.find_near("invoice no", 3), Some("0000123".to_string()));
    }

    #[test]
    fn test_flate_compressed_content_stream() {
        let mut plain = b"q 1 0 0 1 0 0 cm Q\n".repeat(20);
        plain.extend_from_slice(b"BT /F1 10 Tf (Tong cong: 605.000) Tj ET");
        let mut stream = Stream::new(dictionary! {}, plain);
        stream.compress().unwrap();
        assert_eq!(stream.dict.get(b"Filter").unwrap().as_name().unwrap(), b"FlateDecode");

        let pdf = build_pdf(vec![vec![Object::Stream(stream)]]);
        let mined = PdfMiner::new().mine(&pdf).unwrap();
        assert_eq!(mined.path, MiningPath::ContentStreams);
        assert_eq!(mined.raw_text, "Tong cong: 605.000\n");
    }

    #[test]
    fn test_single_byte_encoded_strings_are_mined() {
        // WinAnsi bytes for "Hóa đơn" style text are not valid UTF-8.
        let pdf = build_pdf(vec![vec![content(b"BT (H\xF3a don s\xF4: 0000123) Tj ET")]]);

        let mined = PdfMiner::new().mine(&pdf).unwrap();
        assert!(!mined.is_empty());
        assert!(mined.raw_text.contains("don s"));
        assert!(mined.raw_text.contains(": 0000123"));
    }

    #[test]
    fn test_unreadable_content_falls_back_to_page_tree() {
        // A dictionary where a content stream is expected breaks the
        // whole-document pass; the page pass skips it.
        let pdf = build_pdf(vec![
            vec![
                Object::Dictionary(dictionary! { "Broken" => true }),
                content(b"BT (Seller: Cong ty ABC) Tj ET"),
            ],
            vec![content(b"q 1 0 0 1 0 0 cm Q")],
            vec![content(b"BT (Page three) Tj ET")],
        ]);

        let mined = PdfMiner::new().mine(&pdf).unwrap();
        assert_eq!(mined.path, MiningPath::PageTree);
        assert_eq!(mined.page_count, 3);
        assert_eq!(mined.pages.len(), 2);
        assert_eq!(mined.pages[0].number, 1);
        assert_eq!(mined.pages[0].text, "Seller: Cong ty ABC");
        assert_eq!(mined.pages[1].number, 3);
        assert_eq!(mined.raw_text, "Seller: Cong ty ABC\nPage three\n");
    }

    #[test]
    fn test_pdf_without_text_is_empty() {
        let pdf = build_pdf(vec![vec![content(b"q 100 0 0 100 0 0 cm /Im0 Do Q")]]);
        let mined = PdfMiner::new().mine(&pdf).unwrap();
        assert!(mined.is_empty());
        assert!(mined.pages.is_empty());
        assert_eq!(mined.page_count, 1);
    }

    #[test]
    fn test_no_pages() {
        let pdf = build_pdf(vec![]);
        let err = PdfMiner::new().mine(&pdf).unwrap_err();
        assert!(matches!(err, PdfError::NoPages));
    }

    #[test]
    fn test_garbage_is_parse_error() {
        let err = PdfMiner::new().mine(b"definitely not a pdf").unwrap_err();
        assert!(matches!(err, PdfError::Parse(_)));
    }

    #[test]
    fn test_printable_ratio_is_configurable() {
        // "ab@@" is exactly half printable.
        let pdf = build_pdf(vec![vec![content(b"BT (ab@@) Tj ET")]]);
        assert!(PdfMiner::new().mine(&pdf).unwrap().is_empty());

        let lenient = PdfMiner::new().with_printable_ratio(0.4);
        assert_eq!(lenient.mine(&pdf).unwrap().raw_text, "ab@@\n");
    }
}
