//! Follow-up edit of an existing project

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use sitepatch_core::{EditRequest, ProjectStorage, SiteEditor};
use tracing::info;

use crate::error::CliError;
use crate::output::{OutputFormat, PatchSummary};

/// Arguments of the edit command
#[derive(Debug, Clone)]
pub struct EditArgs {
    pub project: PathBuf,
    pub prompt: String,
    pub model: String,
    pub provider: String,
    /// File holding the HTML of the element to focus on
    pub selected_element: Option<PathBuf>,
}

/// Execute the edit command
///
/// Every page, the prompt history and the image list are sent as context.
/// On success the pages are written back and the prompt is appended to the
/// history.
pub async fn execute(editor: &SiteEditor, args: EditArgs, format: OutputFormat) -> Result<()> {
    let storage = ProjectStorage::new(&args.project);
    let project = storage.load().map_err(CliError::from)?;
    let files = project.images.clone();
    let pages = project.into_store().into_pages();
    let mut prompts = storage.load_prompts().map_err(CliError::from)?;

    let selected_element_html = match &args.selected_element {
        Some(path) => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?,
        ),
        None => None,
    };

    let request = EditRequest {
        prompt: Some(args.prompt.clone()),
        pages,
        previous_prompts: prompts.clone(),
        selected_element_html,
        model: Some(args.model),
        provider: Some(args.provider),
        files,
    };

    let response = tokio::select! {
        response = editor.edit(&request) => response.map_err(CliError::from)?,
        _ = tokio::signal::ctrl_c() => {
            return Err(CliError::cancelled(anyhow!("Edit interrupted; project left unchanged")).into());
        },
    };

    prompts.push(args.prompt);
    storage
        .save(&response.pages, Some(&prompts))
        .map_err(CliError::from)?;
    info!(
        project = %args.project.display(),
        edits = response.updated_lines.len(),
        "saved edited project"
    );

    PatchSummary {
        project: args.project.display().to_string(),
        updated_lines: response.updated_lines,
        pages: response.pages.iter().map(|page| page.path.clone()).collect(),
        report: response.report,
        saved: true,
    }
    .print(format)
}
