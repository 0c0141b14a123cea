//! List models offered by the server

use anyhow::Result;
use sitepatch_core::SiteEditor;

use crate::error::CliError;
use crate::output::{OutputFormat, print_models};

/// Execute the models command
///
/// Unlike the cached listing used when validating requests, a failed fetch
/// here is reported instead of showing an empty list.
pub async fn execute(editor: &SiteEditor, format: OutputFormat) -> Result<()> {
    let models = editor.catalog().refresh().await.map_err(CliError::from)?;
    print_models(&models, format)
}
