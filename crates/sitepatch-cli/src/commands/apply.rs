//! Apply a saved model answer to a project

use std::io::{ErrorKind, Read};
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use sitepatch_core::sse::decode_all;
use sitepatch_core::{ProjectStorage, apply_response};
use tracing::info;

use crate::error::CliError;
use crate::output::{OutputFormat, PatchSummary};

/// Execute the apply command
pub fn execute(
    project: &Path,
    response: &Path,
    sse: bool,
    dry_run: bool,
    format: OutputFormat,
) -> Result<()> {
    let storage = ProjectStorage::new(project);
    let mut store = storage.load().map_err(CliError::from)?.into_store();

    let raw = read_response(response)?;
    let text = if sse {
        decode_all(&raw)
    } else {
        String::from_utf8_lossy(&raw).into_owned()
    };

    let outcome = apply_response(&mut store, &text).map_err(CliError::from)?;
    if dry_run {
        info!("dry run; nothing written");
    } else {
        storage.save(store.as_slice(), None).map_err(CliError::from)?;
    }

    PatchSummary {
        project: project.display().to_string(),
        updated_lines: outcome.updated_lines,
        pages: store.iter().map(|page| page.path.clone()).collect(),
        report: outcome.report,
        saved: !dry_run,
    }
    .print(format)
}

fn read_response(path: &Path) -> Result<Vec<u8>> {
    if path.as_os_str() == "-" {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .context("Failed to read answer from stdin")?;
        return Ok(buf);
    }

    std::fs::read(path).map_err(|err| {
        if err.kind() == ErrorKind::NotFound {
            anyhow::Error::from(CliError::not_found(anyhow!(
                "Answer file not found: {}",
                path.display()
            )))
        } else {
            anyhow::Error::new(err).context(format!("Failed to read {}", path.display()))
        }
    })
}
