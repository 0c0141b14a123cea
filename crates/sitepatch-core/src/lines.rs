//! Line ranges reported for each applied edit.
//!
//! Lines are 1-based and `\n` is the only separator, so `"a\r\nb"` is two
//! lines and a trailing newline opens an (empty) extra line.

use serde::{Deserialize, Serialize};

/// Inclusive, 1-based span of lines touched by an edit.
///
/// Serialized as the two-element array `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[usize; 2]", into = "[usize; 2]")]
pub struct LineRange {
    /// First affected line.
    pub start: usize,
    /// Last affected line.
    pub end: usize,
}

impl LineRange {
    /// Creates a range from explicit bounds.
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Range covering `replace` when it is prepended to a document.
    pub fn insertion(replace: &str) -> Self {
        Self::new(1, line_count(replace))
    }

    /// Range covering `replace` once it has replaced the text found at byte
    /// offset `position` of `document`.
    ///
    /// `document` must be the state right before this edit; earlier edits to
    /// the same page shift the result.
    pub fn replacement(document: &str, position: usize, replace: &str) -> Self {
        let start = line_at(document, position);
        Self::new(start, start + line_count(replace) - 1)
    }
}

impl From<[usize; 2]> for LineRange {
    fn from([start, end]: [usize; 2]) -> Self {
        Self::new(start, end)
    }
}

impl From<LineRange> for [usize; 2] {
    fn from(range: LineRange) -> Self {
        [range.start, range.end]
    }
}

/// Number of lines in `text`; never less than one.
pub fn line_count(text: &str) -> usize {
    newline_count(text) + 1
}

/// 1-based line number of byte offset `position` in `text`.
pub fn line_at(text: &str, position: usize) -> usize {
    newline_count(&text[..position]) + 1
}

fn newline_count(text: &str) -> usize {
    text.bytes().filter(|&b| b == b'\n').count()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn counts_lines() {
        assert_eq!(line_count(""), 1);
        assert_eq!(line_count("one"), 1);
        assert_eq!(line_count("one\ntwo"), 2);
        assert_eq!(line_count("one\n"), 2);
        assert_eq!(line_count("a\r\nb"), 2);
    }

    #[test]
    fn replacement_range_uses_pre_edit_document() {
        let doc = "<html>\n<body>\n<h1>Hi</h1>\n</body>";
        let pos = doc.find("<h1>").unwrap();
        assert_eq!(
            LineRange::replacement(doc, pos, "<h1>Hello</h1>\n<p>x</p>"),
            LineRange::new(3, 4)
        );
    }

    #[test]
    fn match_at_start_is_line_one() {
        assert_eq!(LineRange::replacement("abc", 0, "xyz"), LineRange::new(1, 1));
    }

    #[test]
    fn insertion_range() {
        assert_eq!(LineRange::insertion("<a>\n<b>\n<c>"), LineRange::new(1, 3));
    }

    #[test]
    fn serializes_as_pair() {
        let json = serde_json::to_string(&vec![LineRange::new(2, 5)]).unwrap();
        assert_eq!(json, "[[2,5]]");
        let back: LineRange = serde_json::from_str("[7,9]").unwrap();
        assert_eq!(back, LineRange::new(7, 9));
    }
}
