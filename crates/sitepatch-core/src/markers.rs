//! Sentinel literals that delimit regions in a model response.
//!
//! The page markers carry their separating space on the side facing the
//! page path (`<<<<<<< NEW_PAGE_START about.html >>>>>>> NEW_PAGE_END`).

/// Opens a search block inside an update region.
pub const SEARCH_START: &str = "<<<<<<< SEARCH";
/// Separates search text from replacement text.
pub const DIVIDER: &str = "=======";
/// Closes a search/replace block.
pub const REPLACE_END: &str = ">>>>>>> REPLACE";
/// Opens a new-page header; followed by the page path.
pub const NEW_PAGE_START: &str = "<<<<<<< NEW_PAGE_START ";
/// Closes a new-page header.
pub const NEW_PAGE_END: &str = " >>>>>>> NEW_PAGE_END";
/// Opens an update-page header; followed by the page path.
pub const UPDATE_PAGE_START: &str = "<<<<<<< UPDATE_PAGE_START ";
/// Closes an update-page header.
pub const UPDATE_PAGE_END: &str = " >>>>>>> UPDATE_PAGE_END";

/// Opening fence for an embedded HTML block.
pub const HTML_FENCE_OPEN: &str = "```html";
/// Closing fence for any embedded block.
pub const FENCE_CLOSE: &str = "```";

/// Paths that designate the primary page of a site.
pub const PRIMARY_PATHS: [&str; 3] = ["/", "/index", "index"];

/// Whether `path` names the primary page.
pub fn is_primary_path(path: &str) -> bool {
    PRIMARY_PATHS.contains(&path)
}
