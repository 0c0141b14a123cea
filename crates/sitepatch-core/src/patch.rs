//! Applies a buffered follow-up response to a page store.
//!
//! The response is free-form prose with embedded page headers and
//! search/replace blocks. Application is best-effort: headers without an
//! end marker, blocks without a divider or end marker, search text that is
//! not in the page, and unknown page paths are all skipped without error.
//!
//! Order of operations:
//!
//! 1. every `NEW_PAGE` region creates or overwrites a page;
//! 2. every `UPDATE_PAGE` region runs its blocks against the named page;
//! 3. when neither step changed the page count and the response never
//!    mentions `UPDATE_PAGE_START`, the whole response is run as blocks
//!    against the primary page (output from models that skip page headers).
//!
//! ```rust
//! use sitepatch_core::markers::{DIVIDER, REPLACE_END, SEARCH_START, UPDATE_PAGE_END, UPDATE_PAGE_START};
//! use sitepatch_core::{apply_response, LineRange, Page, PageStore};
//!
//! let mut store = PageStore::from_pages([Page::new("/", "<body><h1>Hi</h1></body>")]);
//! let response = format!(
//!     "{UPDATE_PAGE_START}/{UPDATE_PAGE_END}\n{SEARCH_START}<h1>Hi</h1>{DIVIDER}<h1>Hello</h1>{REPLACE_END}"
//! );
//! let outcome = apply_response(&mut store, &response)?;
//! assert_eq!(store.as_slice()[0].html, "<body><h1>Hello</h1></body>");
//! assert_eq!(outcome.updated_lines, vec![LineRange::new(1, 1)]);
//! # Ok::<(), sitepatch_core::Error>(())
//! ```

use crate::lines::LineRange;
use crate::markers::UPDATE_PAGE_START;
use crate::pages::{Page, PageStore, Upsert};
use crate::scanner::{BlockScanner, RegionKind, RegionScanner, html_fence_interior};
use crate::{Error, Result};
use serde::Serialize;
use tracing::{debug, info};

/// What happened while applying one response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchReport {
    /// Blocks whose edit landed.
    pub blocks_applied: usize,
    /// Blocks whose search text was not found.
    pub blocks_missed: usize,
    /// Bodies whose last block was cut off before its end marker.
    pub truncated_bodies: usize,
    /// New pages appended to the store.
    pub pages_created: usize,
    /// Existing pages overwritten by a new-page region.
    pub pages_replaced: usize,
    /// Update regions that named a page in the store.
    pub pages_updated: usize,
    /// Update regions that named an unknown page.
    pub unknown_pages: usize,
    /// Whether the header-less fallback ran.
    pub legacy_fallback: bool,
}

/// Result of [`apply_response`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchOutcome {
    /// One range per applied block, in discovery order.
    pub updated_lines: Vec<LineRange>,
    /// Summary counts.
    pub report: PatchReport,
}

/// Result of running the blocks of one body against one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockOutcome {
    /// One range per applied block, in order.
    pub ranges: Vec<LineRange>,
    /// Number of blocks applied.
    pub applied: usize,
    /// Number of blocks whose search text was absent.
    pub missed: usize,
    /// Whether the body ended inside an unterminated block.
    pub truncated: bool,
}

/// Runs every search/replace block found in `source` against `document`.
///
/// Each block sees the document as left by the blocks before it. A blank
/// search half prepends the replacement plus a newline; otherwise the first
/// literal occurrence of the search half is replaced.
pub fn apply_blocks(document: &mut String, source: &str) -> BlockOutcome {
    let mut outcome = BlockOutcome::default();
    let mut scanner = BlockScanner::new(source);

    for block in scanner.by_ref() {
        if block.is_insertion() {
            outcome.ranges.push(LineRange::insertion(block.replace));
            document.insert(0, '\n');
            document.insert_str(0, block.replace);
            outcome.applied += 1;
            continue;
        }

        match document.find(block.search) {
            Some(position) => {
                outcome
                    .ranges
                    .push(LineRange::replacement(document, position, block.replace));
                document.replace_range(position..position + block.search.len(), block.replace);
                outcome.applied += 1;
            },
            None => {
                debug!(
                    search_len = block.search.len(),
                    "search text not found; skipping block"
                );
                outcome.missed += 1;
            },
        }
    }

    outcome.truncated = scanner.truncated();
    outcome
}

/// Applies a complete follow-up response to `store`.
///
/// Returns [`Error::NoContent`] when the response is blank. Every other
/// anomaly is skipped and shows up only in the [`PatchReport`].
pub fn apply_response(store: &mut PageStore, response: &str) -> Result<PatchOutcome> {
    if response.trim().is_empty() {
        return Err(Error::NoContent);
    }

    let initial_pages = store.len();
    let mut outcome = PatchOutcome::default();

    for region in RegionScanner::new(response, RegionKind::NewPage) {
        let html = html_fence_interior(region.body).unwrap_or(region.body).trim();
        match store.upsert(Page::new(region.path, html)) {
            Upsert::Appended => outcome.report.pages_created += 1,
            Upsert::Replaced => outcome.report.pages_replaced += 1,
        }
        debug!(path = region.path, bytes = html.len(), "page written from new-page region");
    }

    for region in RegionScanner::new(response, RegionKind::UpdatePage) {
        let Some(index) = store.position(region.path) else {
            debug!(path = region.path, "update region names an unknown page; skipping");
            outcome.report.unknown_pages += 1;
            continue;
        };
        let source = html_fence_interior(region.body).unwrap_or(region.body);
        let mut document = store.html_at(index).to_owned();
        let blocks = apply_blocks(&mut document, source);
        store.set_html(index, document);
        record(&mut outcome, blocks);
        outcome.report.pages_updated += 1;
    }

    if store.len() == initial_pages && !response.contains(UPDATE_PAGE_START) {
        if let Some(index) = store.primary_position() {
            let mut document = store.html_at(index).to_owned();
            let blocks = apply_blocks(&mut document, response);
            store.set_html(index, document);
            record(&mut outcome, blocks);
            outcome.report.legacy_fallback = true;
        } else {
            debug!("no primary page; header-less blocks ignored");
        }
    }

    let report = &outcome.report;
    info!(
        applied = report.blocks_applied,
        missed = report.blocks_missed,
        created = report.pages_created,
        replaced = report.pages_replaced,
        updated = report.pages_updated,
        legacy = report.legacy_fallback,
        "applied model response"
    );
    Ok(outcome)
}

fn record(outcome: &mut PatchOutcome, blocks: BlockOutcome) {
    outcome.updated_lines.extend(blocks.ranges);
    outcome.report.blocks_applied += blocks.applied;
    outcome.report.blocks_missed += blocks.missed;
    if blocks.truncated {
        outcome.report.truncated_bodies += 1;
    }
}
