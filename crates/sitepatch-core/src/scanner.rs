//! Cursor-based scanners over raw model output.
//!
//! Two scanners live here:
//!
//! - [`RegionScanner`] finds page regions (`NEW_PAGE_*` / `UPDATE_PAGE_*`
//!   headers followed by a body that runs up to the next page header).
//! - [`BlockScanner`] finds search/replace blocks inside a body. It is a
//!   small state machine (seeking a marker, inside the search half, inside
//!   the replace half). Each marker is searched for from the cursor with no
//!   lookahead bound, so a block missing its divider or end marker borrows
//!   the companion of a later block and the two merge into one. The scan
//!   only stops early when no such marker remains in the text.
//!
//! Neither scanner allocates; both hand out slices of the scanned text.

use crate::markers::{
    DIVIDER, FENCE_CLOSE, HTML_FENCE_OPEN, NEW_PAGE_END, NEW_PAGE_START, REPLACE_END,
    SEARCH_START, UPDATE_PAGE_END, UPDATE_PAGE_START,
};
use tracing::trace;

/// One search/replace instruction, borrowed from the scanned text.
///
/// Neither half is trimmed: whitespace around the markers is part of the
/// literal to find and of the text that replaces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchReplaceBlock<'a> {
    /// Literal text to locate.
    pub search: &'a str,
    /// Text substituted for the first occurrence of `search`.
    pub replace: &'a str,
}

impl SearchReplaceBlock<'_> {
    /// Blocks with a blank search half prepend their replacement.
    pub fn is_insertion(&self) -> bool {
        self.search.trim().is_empty()
    }
}

/// Scanner position within the block grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    /// Looking for the next `SEARCH_START`.
    SeekingMarker,
    /// Past `SEARCH_START`; looking for the divider.
    InSearch {
        /// Byte offset where the search text begins.
        search_start: usize,
    },
    /// Past the divider; looking for `REPLACE_END`.
    InReplace {
        /// Byte offset where the search text begins.
        search_start: usize,
        /// Byte offset of the divider.
        divider: usize,
    },
    /// No further blocks can be produced.
    Finished {
        /// `true` when the scan stopped on a block missing a companion marker.
        truncated: bool,
    },
}

/// Iterator over the search/replace blocks of a body, left to right.
#[derive(Debug, Clone)]
pub struct BlockScanner<'a> {
    source: &'a str,
    cursor: usize,
    state: BlockState,
}

impl<'a> BlockScanner<'a> {
    /// Starts scanning `source` from its beginning.
    pub const fn new(source: &'a str) -> Self {
        Self {
            source,
            cursor: 0,
            state: BlockState::SeekingMarker,
        }
    }

    /// Current state of the machine.
    pub const fn state(&self) -> BlockState {
        self.state
    }

    /// Whether scanning stopped because a trailing block was malformed.
    pub const fn truncated(&self) -> bool {
        matches!(self.state, BlockState::Finished { truncated: true })
    }

    fn find_from(&self, from: usize, needle: &str) -> Option<usize> {
        self.source[from..].find(needle).map(|offset| from + offset)
    }

    fn finish(&mut self, truncated: bool) -> Option<SearchReplaceBlock<'a>> {
        if truncated {
            trace!(cursor = self.cursor, "abandoning unterminated search/replace block");
        }
        self.state = BlockState::Finished { truncated };
        None
    }
}

impl<'a> Iterator for BlockScanner<'a> {
    type Item = SearchReplaceBlock<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.state {
                BlockState::SeekingMarker => match self.find_from(self.cursor, SEARCH_START) {
                    Some(marker) => {
                        self.state = BlockState::InSearch {
                            search_start: marker + SEARCH_START.len(),
                        };
                    },
                    None => return self.finish(false),
                },
                BlockState::InSearch { search_start } => {
                    match self.find_from(search_start, DIVIDER) {
                        Some(divider) => {
                            self.state = BlockState::InReplace {
                                search_start,
                                divider,
                            };
                        },
                        None => return self.finish(true),
                    }
                },
                BlockState::InReplace {
                    search_start,
                    divider,
                } => {
                    let replace_start = divider + DIVIDER.len();
                    let Some(end) = self.find_from(replace_start, REPLACE_END) else {
                        return self.finish(true);
                    };
                    self.cursor = end + REPLACE_END.len();
                    self.state = BlockState::SeekingMarker;
                    return Some(SearchReplaceBlock {
                        search: &self.source[search_start..divider],
                        replace: &self.source[replace_start..end],
                    });
                },
                BlockState::Finished { .. } => return None,
            }
        }
    }
}

/// Which family of page headers a [`RegionScanner`] looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    /// `NEW_PAGE_START path NEW_PAGE_END`
    NewPage,
    /// `UPDATE_PAGE_START path UPDATE_PAGE_END`
    UpdatePage,
}

impl RegionKind {
    const fn start_marker(self) -> &'static str {
        match self {
            Self::NewPage => NEW_PAGE_START,
            Self::UpdatePage => UPDATE_PAGE_START,
        }
    }

    const fn end_marker(self) -> &'static str {
        match self {
            Self::NewPage => NEW_PAGE_END,
            Self::UpdatePage => UPDATE_PAGE_END,
        }
    }
}

/// A page header and the body that follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRegion<'a> {
    /// Page path taken from the header.
    pub path: &'a str,
    /// Everything after the header up to the next page header or the end.
    pub body: &'a str,
}

/// Iterator over the page regions of one kind, left to right.
///
/// A header whose path is missing, or that is not closed by its end marker
/// (after optional whitespace), is skipped.
#[derive(Debug, Clone)]
pub struct RegionScanner<'a> {
    text: &'a str,
    cursor: usize,
    kind: RegionKind,
}

impl<'a> RegionScanner<'a> {
    /// Scans `text` for regions of `kind`.
    pub const fn new(text: &'a str, kind: RegionKind) -> Self {
        Self {
            text,
            cursor: 0,
            kind,
        }
    }

    /// Offset where the body starting at `from` stops: the nearest page
    /// header of either kind, or the end of the text.
    fn body_end(&self, from: usize) -> usize {
        [NEW_PAGE_START, UPDATE_PAGE_START]
            .iter()
            .filter_map(|marker| self.text[from..].find(marker))
            .min()
            .map_or(self.text.len(), |offset| from + offset)
    }
}

impl<'a> Iterator for RegionScanner<'a> {
    type Item = PageRegion<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let start_marker = self.kind.start_marker();
        loop {
            let marker = self.cursor + self.text[self.cursor..].find(start_marker)?;
            let path_start = marker + start_marker.len();
            self.cursor = path_start;

            let rest = &self.text[path_start..];
            let path_len = rest.find(char::is_whitespace).unwrap_or(rest.len());
            if path_len == 0 {
                trace!(offset = marker, "page header without a path");
                continue;
            }
            let path_end = path_start + path_len;

            let Some(body_start) = match_after_whitespace(self.text, path_end, self.kind.end_marker())
            else {
                trace!(offset = marker, "page header without its end marker");
                continue;
            };

            let body_end = self.body_end(body_start);
            self.cursor = body_end;
            return Some(PageRegion {
                path: &self.text[path_start..path_end],
                body: &self.text[body_start..body_end],
            });
        }
    }
}

/// Matches optional whitespace followed by `literal` at `pos`, returning the
/// offset just past the literal.
///
/// The longest whitespace run is tried first and then shortened, so a
/// literal that itself begins with a space can claim the last space of the
/// run.
fn match_after_whitespace(text: &str, pos: usize, literal: &str) -> Option<usize> {
    let rest = &text[pos..];
    let ws_len = rest.len() - rest.trim_start().len();
    (0..=ws_len)
        .rev()
        .filter(|&i| rest.is_char_boundary(i))
        .find(|&i| rest[i..].starts_with(literal))
        .map(|i| pos + i + literal.len())
}

/// Interior of the first ```` ```html ```` fence in `text`, trimmed.
///
/// Returns `None` when there is no opening fence or it is never closed.
pub fn html_fence_interior(text: &str) -> Option<&str> {
    let open = text.find(HTML_FENCE_OPEN)?;
    let body_start = open + HTML_FENCE_OPEN.len();
    let close = body_start + text[body_start..].find(FENCE_CLOSE)?;
    Some(text[body_start..close].trim())
}
