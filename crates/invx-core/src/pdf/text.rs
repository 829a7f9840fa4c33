//! Mined PDF text and lookups over it.

use regex::Regex;

/// Tokens that mark a line as a field label rather than a value.
const LABEL_TOKENS: &[&str] = &[
    "mã số thuế",
    "tax id",
    "taxid",
    "số hóa đơn",
    "invoice no",
    "invoice number",
    "ngày",
    "date",
    "tên",
    "name",
    "địa chỉ",
    "address",
];

/// Which extraction path produced the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiningPath {
    /// Content streams collected from the document as a whole.
    ContentStreams,
    /// Page tree walked page by page after content extraction failed.
    PageTree,
}

/// Text from a single page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageText {
    /// Page number (1-indexed).
    pub number: u32,
    pub text: String,
    /// Non-blank, trimmed lines of `text`.
    pub lines: Vec<String>,
}

impl PageText {
    pub fn new(number: u32, text: String) -> Self {
        let lines = split_into_lines(&text);
        Self { number, text, lines }
    }
}

/// Everything mined from a PDF.
#[derive(Debug, Clone, PartialEq)]
pub struct MinedText {
    /// Flattened text of the whole document.
    pub raw_text: String,
    /// A single entry on the content-stream path, one per non-empty page on
    /// the page-tree path.
    pub pages: Vec<PageText>,
    pub page_count: u32,
    pub path: MiningPath,
}

impl MinedText {
    /// True when nothing readable was recovered.
    pub fn is_empty(&self) -> bool {
        self.raw_text.trim().is_empty()
    }

    /// All matches of a regular expression over the raw text.
    pub fn find_pattern(&self, pattern: &str) -> Result<Vec<String>, regex::Error> {
        let re = Regex::new(pattern)?;
        Ok(re
            .find_iter(&self.raw_text)
            .map(|m| m.as_str().to_string())
            .collect())
    }

    /// Find the value printed next to `label`.
    ///
    /// The first line containing the label (case-insensitively) is checked
    /// for a colon after the label; if there is a non-empty remainder it is
    /// the value. Otherwise the next `max_distance` lines are scanned for the
    /// first non-blank line that is not itself a label. Later occurrences of
    /// the label are tried if an earlier one yields nothing.
    pub fn find_near(&self, label: &str, max_distance: usize) -> Option<String> {
        let lines: Vec<&str> = self.raw_text.split('\n').collect();

        for (i, line) in lines.iter().enumerate() {
            let Some((_, label_end)) = find_case_insensitive(line, label) else {
                continue;
            };

            if let Some(colon) = line[label_end..].find(':') {
                let value = line[label_end + colon + 1..].trim();
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }

            let following = lines.iter().skip(i + 1).take(max_distance);
            for candidate in following {
                let value = candidate.trim();
                if !value.is_empty() && !is_label(value) {
                    return Some(value.to_string());
                }
            }
        }

        None
    }

    /// A single trimmed line of the raw text, blank lines included in the count.
    pub fn line(&self, index: usize) -> Option<String> {
        self.raw_text
            .split('\n')
            .nth(index)
            .map(|line| line.trim().to_string())
    }

    /// Non-blank, trimmed lines of the raw text.
    pub fn lines(&self) -> Vec<String> {
        split_into_lines(&self.raw_text)
    }
}

/// Split text into trimmed, non-blank lines.
pub fn split_into_lines(text: &str) -> Vec<String> {
    text.split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Whether a line looks like a field label.
pub fn is_label(s: &str) -> bool {
    let s = s.trim();
    if s.ends_with(':') {
        return true;
    }

    let lower = s.to_lowercase();
    s.chars().count() < 50 && LABEL_TOKENS.iter().any(|token| lower.contains(token))
}

/// Byte range of the first case-insensitive occurrence of `needle` in `haystack`.
fn find_case_insensitive(haystack: &str, needle: &str) -> Option<(usize, usize)> {
    let needle: Vec<char> = needle.chars().flat_map(char::to_lowercase).collect();
    if needle.is_empty() {
        return Some((0, 0));
    }

    for (start, _) in haystack.char_indices() {
        let mut wanted = needle.iter();
        let mut end = start;
        let mut matched = true;

        'scan: for (offset, c) in haystack[start..].char_indices() {
            for lower in c.to_lowercase() {
                match wanted.next() {
                    Some(&w) if w == lower => {}
                    Some(_) => {
                        matched = false;
                        break 'scan;
                    }
                    None => break 'scan,
                }
            }
            end = start + offset + c.len_utf8();
            if wanted.len() == 0 {
                break;
            }
        }

        if matched && wanted.len() == 0 {
            return Some((start, end));
        }
    }

    None
}
