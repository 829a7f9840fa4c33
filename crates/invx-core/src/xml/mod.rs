//! Boundary to structured XML e-invoice parsers.
//!
//! Provider-specific parsers (TCT, VNPT, MISA, ...) implement [`XmlParser`]
//! and are registered with an [`XmlRegistry`], which hands each document to
//! the first parser that claims it.

use std::sync::Arc;

use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::debug;

use crate::models::invoice::Invoice;

/// A parser for one XML e-invoice dialect.
pub trait XmlParser: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Whether this parser understands a document with the given root element.
    fn can_parse(&self, root: &str, data: &[u8]) -> bool;

    /// Parse the document.
    fn parse(&self, data: &[u8]) -> Result<Invoice, String>;
}

/// Read the local name of the document's root element.
pub fn root_element(data: &[u8]) -> Result<String, String> {
    let mut reader = Reader::from_reader(data);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Ok(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
            }
            Ok(Event::Eof) => return Err("document has no root element".to_string()),
            Ok(_) => {}
            Err(e) => {
                return Err(format!(
                    "malformed XML at position {}: {}",
                    reader.buffer_position(),
                    e
                ));
            }
        }
        buf.clear();
    }
}

/// Ordered collection of XML parsers.
#[derive(Clone, Default)]
pub struct XmlRegistry {
    parsers: Vec<Arc<dyn XmlParser>>,
}

impl XmlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parser; earlier registrations take precedence.
    pub fn register(&mut self, parser: Arc<dyn XmlParser>) {
        self.parsers.push(parser);
    }

    pub fn with_parser(mut self, parser: Arc<dyn XmlParser>) -> Self {
        self.register(parser);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }

    /// Parse with the first parser that claims the document.
    pub fn parse(&self, data: &[u8]) -> Result<Invoice, String> {
        let root = root_element(data)?;

        let parser = self
            .parsers
            .iter()
            .find(|parser| parser.can_parse(&root, data))
            .ok_or_else(|| format!("no parser registered for root element <{}>", root))?;

        debug!("Parsing <{}> with {} parser", root, parser.name());
        parser.parse(data)
    }
}

impl std::fmt::Debug for XmlRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.parsers.iter().map(|p| p.name()).collect();
        f.debug_struct("XmlRegistry").field("parsers", &names).finish()
    }
}
