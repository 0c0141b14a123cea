//! In-memory working set of site pages.

use crate::markers::is_primary_path;
use serde::{Deserialize, Serialize};

/// One HTML document of a site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Unique key within a project, e.g. `/` or `/about.html`.
    pub path: String,
    /// Full document text.
    pub html: String,
}

impl Page {
    /// Creates a page.
    pub fn new(path: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            html: html.into(),
        }
    }

    /// Whether this is the site's primary page.
    pub fn is_primary(&self) -> bool {
        is_primary_path(&self.path)
    }
}

/// Result of [`PageStore::upsert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// A page with that path existed and was overwritten.
    Replaced,
    /// The page was appended.
    Appended,
}

/// Ordered collection of pages keyed by path.
///
/// Order is insertion order; callers conventionally put the primary page
/// first. Paths stay unique because every insertion goes through
/// [`PageStore::upsert`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Page>", into = "Vec<Page>")]
pub struct PageStore {
    pages: Vec<Page>,
}

impl PageStore {
    /// Builds a store from caller-supplied pages.
    ///
    /// If the input repeats a path, the last occurrence wins and keeps the
    /// position of the first.
    pub fn from_pages(pages: impl IntoIterator<Item = Page>) -> Self {
        let mut store = Self::default();
        for page in pages {
            store.upsert(page);
        }
        store
    }

    /// Number of pages.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Whether the store holds no pages.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Index of the page stored under `path`.
    pub fn position(&self, path: &str) -> Option<usize> {
        self.pages.iter().position(|page| page.path == path)
    }

    /// Page stored under `path`.
    pub fn get(&self, path: &str) -> Option<&Page> {
        self.pages.iter().find(|page| page.path == path)
    }

    /// Index of the primary page, if the site has one.
    pub fn primary_position(&self) -> Option<usize> {
        self.pages.iter().position(Page::is_primary)
    }

    /// The primary page, if the site has one.
    pub fn primary(&self) -> Option<&Page> {
        self.pages.iter().find(|page| page.is_primary())
    }

    /// Inserts `page`, overwriting any page with the same path in place.
    pub fn upsert(&mut self, page: Page) -> Upsert {
        match self.position(&page.path) {
            Some(index) => {
                self.pages[index] = page;
                Upsert::Replaced
            },
            None => {
                self.pages.push(page);
                Upsert::Appended
            },
        }
    }

    /// Replaces the document of the page at `index`.
    pub(crate) fn set_html(&mut self, index: usize, html: String) {
        self.pages[index].html = html;
    }

    /// Document of the page at `index`.
    pub(crate) fn html_at(&self, index: usize) -> &str {
        &self.pages[index].html
    }

    /// Iterates pages in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Page> {
        self.pages.iter()
    }

    /// Borrows the pages as a slice.
    pub fn as_slice(&self) -> &[Page] {
        &self.pages
    }

    /// Consumes the store, returning pages in order.
    pub fn into_pages(self) -> Vec<Page> {
        self.pages
    }
}

impl From<Vec<Page>> for PageStore {
    fn from(pages: Vec<Page>) -> Self {
        Self::from_pages(pages)
    }
}

impl From<PageStore> for Vec<Page> {
    fn from(store: PageStore) -> Self {
        store.pages
    }
}

impl<'a> IntoIterator for &'a PageStore {
    type Item = &'a Page;
    type IntoIter = std::slice::Iter<'a, Page>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
