//! Best-effort string recovery from raw PDF content streams.
//!
//! This is not a content-stream interpreter: text positioning and font
//! operators are ignored. Literal `( … )` strings are collected first, then
//! hex `< … >` strings, so the output order follows the scan, not the page.

use lazy_static::lazy_static;
use regex::bytes::Regex;
use tracing::trace;

lazy_static! {
    // A literal string ends at the first `)`, escaped or not. Unicode mode is
    // off so `[^)]` also matches bytes that are not valid UTF-8.
    static ref LITERAL_STRING: Regex = Regex::new(r"(?-u)\(([^)]*)\)").unwrap();

    static ref HEX_STRING: Regex = Regex::new(r"(?-u)<([0-9A-Fa-f]+)>").unwrap();
}

/// Default minimum printable-character ratio for a decoded string.
pub const DEFAULT_PRINTABLE_RATIO: f64 = 0.5;

/// Extract readable text from a content stream.
///
/// Strings whose printable ratio does not exceed `min_ratio` are dropped;
/// the rest are joined with single spaces.
pub fn extract_text_from_content_stream(content: &[u8], min_ratio: f64) -> String {
    let mut kept = Vec::new();

    for caps in LITERAL_STRING.captures_iter(content) {
        let text = String::from_utf8_lossy(&unescape_literal(&caps[1])).into_owned();
        if is_printable_text(&text, min_ratio) {
            kept.push(text);
        } else {
            trace!("dropping literal string candidate {:?}", text);
        }
    }

    for caps in HEX_STRING.captures_iter(content) {
        let text = String::from_utf8_lossy(&decode_hex(&caps[1])).into_owned();
        if is_printable_text(&text, min_ratio) {
            kept.push(text);
        } else {
            trace!("dropping hex string candidate {:?}", text);
        }
    }

    kept.join(" ").trim().to_string()
}

/// Resolve the escapes `\n \r \t \( \) \\`; any other backslash is kept as-is.
pub fn unescape_literal(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut bytes = raw.iter().copied().peekable();

    while let Some(b) = bytes.next() {
        if b != b'\\' {
            out.push(b);
            continue;
        }
        let replacement = match bytes.peek() {
            Some(b'n') => b'\n',
            Some(b'r') => b'\r',
            Some(b't') => b'\t',
            Some(b'(') => b'(',
            Some(b')') => b')',
            Some(b'\\') => b'\\',
            _ => {
                out.push(b'\\');
                continue;
            }
        };
        bytes.next();
        out.push(replacement);
    }

    out
}

/// Decode pairs of hex digits; a trailing odd digit is ignored.
pub fn decode_hex(hex: &[u8]) -> Vec<u8> {
    hex.chunks_exact(2)
        .filter_map(|pair| {
            let hi = (pair[0] as char).to_digit(16)?;
            let lo = (pair[1] as char).to_digit(16)?;
            Some((hi * 16 + lo) as u8)
        })
        .collect()
}

/// Whether a character belongs to the allow-list used for the printable ratio.
pub fn is_printable_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(c, ' ' | '.' | ',' | ':' | '-' | '/')
        // Latin-1 letters and Latin Extended-A/B
        || ('\u{00C0}'..='\u{024F}').contains(&c)
        // Latin Extended Additional (Vietnamese letters with stacked diacritics)
        || ('\u{1E00}'..='\u{1EFF}').contains(&c)
}

/// True when more than `min_ratio` of the characters are printable.
pub fn is_printable_text(s: &str, min_ratio: f64) -> bool {
    let total = s.chars().count();
    if total == 0 {
        return false;
    }
    let printable = s.chars().filter(|&c| is_printable_char(c)).count();
    printable as f64 / total as f64 > min_ratio
}
