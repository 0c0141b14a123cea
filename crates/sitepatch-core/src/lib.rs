//! # sitepatch-core
//!
//! Core functionality for sitepatch - LLM-driven editing of multi-page HTML
//! sites through an incremental, marker-delimited patch protocol.
//!
//! A site is a [`PageStore`] of HTML documents. Initial generation streams a
//! complete document from the model straight to the caller. Follow-up edits
//! ask the model for search/replace blocks grouped into page regions, buffer
//! the whole answer and apply it with [`apply_response`], reporting the line
//! range each edit touched.
//!
//! ## Architecture
//!
//! - **Protocol**: marker literals ([`markers`]), a finite-state scanner
//!   ([`scanner`]) and the patch extractor ([`patch`])
//! - **Streaming**: event-stream decoding ([`sse`]) and the bounded relay
//!   into an async sink ([`relay`])
//! - **Model access**: the [`ModelTransport`] seam, the LM Studio client and
//!   the cached [`ModelCatalog`]
//! - **Handlers**: [`SiteEditor`] validates requests and maps failures to
//!   [`ApiFailure`]
//! - **Storage**: projects as directories of HTML files ([`ProjectStorage`])
//!
//! ## Quick Start
//!
//! ```rust
//! use sitepatch_core::{apply_response, Page, PageStore};
//!
//! let mut store = PageStore::from_pages([Page::new("/", "<body>\n<h1>Hi</h1>\n</body>")]);
//! let response = "<<<<<<< UPDATE_PAGE_START / >>>>>>> UPDATE_PAGE_END\n\
//!                 <<<<<<< SEARCH\n<h1>Hi</h1>\n=======\n<h1>Hello</h1>\n>>>>>>> REPLACE";
//! let outcome = apply_response(&mut store, response)?;
//!
//! assert_eq!(
//!     store.primary().map(|p| p.html.as_str()),
//!     Some("<body>\n<h1>Hello</h1>\n</body>")
//! );
//! assert_eq!(outcome.report.blocks_applied, 1);
//! # Ok::<(), sitepatch_core::Error>(())
//! ```
//!
//! ## Error Handling
//!
//! Operations return [`Result<T, Error>`]. Anomalies inside a model response
//! (unmatched markers, search text that is not found, unknown pages) are
//! skipped rather than reported as errors:
//!
//! ```rust
//! use sitepatch_core::{apply_response, Error, Page, PageStore};
//!
//! let mut store = PageStore::from_pages([Page::new("/", "<p></p>")]);
//! match apply_response(&mut store, "   ") {
//!     Err(Error::NoContent) => {},
//!     other => panic!("unexpected: {other:?}"),
//! }
//! ```

/// Request handlers for generation and edits
pub mod api;
/// Configuration loading and environment overrides
pub mod config;
/// Error types and result aliases
pub mod error;
/// Line ranges of applied edits
pub mod lines;
/// Protocol marker literals
pub mod markers;
/// Model catalog and provider resolution
pub mod models;
/// In-memory page store
pub mod pages;
/// Patch extraction and application
pub mod patch;
/// System prompts and message assembly
pub mod prompts;
/// Streaming relay into an async sink
pub mod relay;
/// Marker scanners
pub mod scanner;
/// Event-stream decoding
pub mod sse;
/// Project directories on disk
pub mod storage;
/// Chat-completion transport
pub mod transport;

// Re-export commonly used types
pub use api::{ApiFailure, EditRequest, EditResponse, FailureBody, GenerateRequest, SiteEditor};
pub use config::{Config, LmStudioConfig, RelayConfig};
pub use error::{Error, Result};
pub use lines::LineRange;
pub use models::{ModelCatalog, ModelInfo, Provider, Providers};
pub use pages::{Page, PageStore, Upsert};
pub use patch::{PatchOutcome, PatchReport, apply_blocks, apply_response};
pub use relay::{Relay, RelayOutcome, RelayStatus};
pub use storage::{Project, ProjectStorage};
pub use transport::{ByteStream, ChatMessage, ChatRequest, LmStudioClient, ModelTransport, Role};
