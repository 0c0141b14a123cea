//! Generate a page and stream it to stdout

use std::path::PathBuf;

use anyhow::{Context, Result};
use sitepatch_core::scanner::html_fence_interior;
use sitepatch_core::{
    Error as CoreError, GenerateRequest, Page, ProjectStorage, RelayOutcome, RelayStatus,
    SiteEditor,
};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::CliError;

/// Arguments of the generate command
#[derive(Debug, Clone)]
pub struct GenerateArgs {
    /// Project directory, which may not exist yet
    pub project: PathBuf,
    pub prompt: Option<String>,
    /// Markdown file describing a site to redesign
    pub redesign: Option<PathBuf>,
    pub model: String,
    pub provider: String,
    /// Buffer the answer and write it to the project
    pub save: bool,
}

/// Execute the generate command
///
/// Output is streamed as it arrives unless `--save` is given, in which case
/// the document is buffered, printed, then written as the project's
/// `index.html` together with the updated prompt history.
pub async fn execute(editor: &SiteEditor, args: GenerateArgs) -> Result<()> {
    let storage = ProjectStorage::new(&args.project);
    let pages = match storage.load() {
        Ok(project) => project.into_store().into_pages(),
        Err(CoreError::NotFound(_)) => Vec::new(),
        Err(err) => return Err(CliError::from(err).into()),
    };
    let mut prompts = storage.load_prompts().map_err(CliError::from)?;

    let redesign_markdown = match &args.redesign {
        Some(path) => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?,
        ),
        None => None,
    };

    let request = GenerateRequest {
        prompt: args.prompt.clone(),
        redesign_markdown,
        model: Some(args.model.clone()),
        provider: Some(args.provider.clone()),
        pages,
        previous_prompts: prompts.clone(),
    };

    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let mut buffer = Vec::new();
    let outcome = if args.save {
        editor.generate(&request, &mut buffer, cancel).await
    } else {
        let mut stdout = tokio::io::stdout();
        editor.generate(&request, &mut stdout, cancel).await
    };
    watcher.abort();
    let outcome = outcome.map_err(CliError::from)?;

    if args.save {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(&buffer).await?;
        stdout.flush().await?;
    }

    if !finished(outcome)? || !args.save {
        return Ok(());
    }

    let text = String::from_utf8_lossy(&buffer);
    let html = html_fence_interior(&text).unwrap_or_else(|| text.trim());
    if let Some(prompt) = args.prompt {
        prompts.push(prompt);
    }
    storage
        .save(&[Page::new("/", html)], Some(&prompts))
        .map_err(CliError::from)?;
    info!(project = %args.project.display(), "saved generated page");
    Ok(())
}

// Ok(false) when the reader went away; that is not an error for a CLI.
fn finished(outcome: RelayOutcome) -> Result<bool> {
    if outcome.status == RelayStatus::SinkClosed {
        debug!("stdout closed during generation");
        return Ok(false);
    }
    let bytes = outcome.into_result().map_err(CliError::from)?;
    debug!(bytes, "generation finished");
    Ok(true)
}
