//! Projects stored as a directory of HTML files.
//!
//! The primary page lives in `index.html`; every other page is saved under
//! its route path. Prompt history sits beside the pages.

use crate::markers::is_primary_path;
use crate::pages::{Page, PageStore};
use crate::{Error, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

/// File holding the prompt history of a project, one prompt per line.
pub const PROMPTS_FILE: &str = "prompts.txt";

/// File the primary page is written to.
pub const PRIMARY_FILE: &str = "index.html";

/// Extensions listed as project images.
pub const IMAGE_EXTENSIONS: [&str; 13] = [
    "jpg", "jpeg", "png", "gif", "svg", "webp", "avif", "heic", "heif", "ico", "bmp", "tiff",
    "tif",
];

/// Pages and image references read from a project directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Project {
    /// `index.html` first, then the other pages by file name.
    pub pages: Vec<Page>,
    /// `images/{file}` references, sorted.
    pub images: Vec<String>,
}

impl Project {
    /// Builds a page store, addressing `index.html` as the primary page `/`.
    pub fn into_store(self) -> PageStore {
        PageStore::from_pages(self.pages.into_iter().map(|mut page| {
            if page.path == PRIMARY_FILE {
                page.path = "/".to_string();
            }
            page
        }))
    }
}

/// A site stored as a flat directory of HTML files
pub struct ProjectStorage {
    root_dir: PathBuf,
}

impl ProjectStorage {
    /// Creates a storage handle; nothing is touched on disk until used
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Returns the project directory
    #[must_use]
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Reads every top-level `.html` file and lists images.
    pub fn load(&self) -> Result<Project> {
        let entries = fs::read_dir(&self.root_dir).map_err(|e| {
            Error::NotFound(format!("Project not found at '{}': {e}", self.root_dir.display()))
        })?;

        let mut primary = None;
        let mut pages = Vec::new();
        let mut images = Vec::new();

        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                debug!(path = %entry.path().display(), "skipping non UTF-8 file name");
                continue;
            };

            if name.ends_with(".html") {
                let html = fs::read_to_string(entry.path())
                    .map_err(|e| Error::Storage(format!("Failed to read {name}: {e}")))?;
                let page = Page::new(name.as_str(), html);
                if name == PRIMARY_FILE {
                    primary = Some(page);
                } else {
                    pages.push(page);
                }
            } else if is_image(&name) {
                images.push(format!("images/{name}"));
            }
        }

        pages.sort_by(|a, b| a.path.cmp(&b.path));
        if let Some(index) = primary {
            pages.insert(0, index);
        }
        images.sort();

        if pages.is_empty() {
            return Err(Error::NotFound(format!(
                "No HTML files found in '{}'",
                self.root_dir.display()
            )));
        }

        debug!(pages = pages.len(), images = images.len(), "loaded project");
        Ok(Project { pages, images })
    }

    /// Writes pages and, when given, the prompt history.
    ///
    /// Pages with an empty path or empty document are skipped. Returns the
    /// number of pages written.
    pub fn save(&self, pages: &[Page], prompts: Option<&[String]>) -> Result<usize> {
        fs::create_dir_all(&self.root_dir)
            .map_err(|e| Error::Storage(format!("Failed to create project directory: {e}")))?;

        let mut written = 0;
        for page in pages {
            if page.path.is_empty() || page.html.is_empty() {
                continue;
            }
            let target = self.page_file(&page.path)?;
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .map_err(|e| Error::Storage(format!("Failed to create {}: {e}", parent.display())))?;
            }
            fs::write(&target, &page.html)
                .map_err(|e| Error::Storage(format!("Failed to write {}: {e}", page.path)))?;
            written += 1;
        }

        if let Some(prompts) = prompts {
            fs::write(self.root_dir.join(PROMPTS_FILE), prompts.join("\n"))
                .map_err(|e| Error::Storage(format!("Failed to write prompts: {e}")))?;
        }

        info!(pages = written, dir = %self.root_dir.display(), "saved project");
        Ok(written)
    }

    /// Reads the prompt history; a missing file is an empty history.
    pub fn load_prompts(&self) -> Result<Vec<String>> {
        let path = self.root_dir.join(PROMPTS_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path)
            .map_err(|e| Error::Storage(format!("Failed to read prompts: {e}")))?;
        Ok(content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(ToString::to_string)
            .collect())
    }

    /// Resolves a page path to a file inside the project directory.
    ///
    /// A leading `/` is dropped and the primary page maps to `index.html`.
    /// Paths that could leave the directory are rejected.
    pub fn page_file(&self, page_path: &str) -> Result<PathBuf> {
        if is_primary_path(page_path) {
            return Ok(self.root_dir.join(PRIMARY_FILE));
        }
        let relative = Path::new(page_path.trim_start_matches('/'));
        let safe = !relative.as_os_str().is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !safe {
            return Err(Error::Storage(format!(
                "Page path '{page_path}' escapes the project directory"
            )));
        }
        Ok(self.root_dir.join(relative))
    }
}

fn is_image(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}
