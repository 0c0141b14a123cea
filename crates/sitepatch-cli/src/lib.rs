//! sitepatch CLI library
//!
//! Command-line front end for `sitepatch-core`. The binary in `main.rs`
//! calls [`run`] and turns its error into an exit code with
//! [`error::category_from_error`].

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;
pub mod utils;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use sitepatch_core::{Config, LmStudioClient, ModelTransport, SiteEditor};
use tracing::debug;

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::utils::logging::initialize_logging;

/// Parse arguments and run the selected command.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    initialize_logging(&cli)?;

    let config = load_config(&cli)?;
    debug!(base_url = %config.lmstudio.base_url(), "configuration loaded");

    execute_command(cli, &config).await
}

fn load_config(cli: &Cli) -> Result<Config> {
    let config = match &cli.config {
        Some(path) => {
            let mut config = Config::load_from(path).map_err(CliError::from)?;
            config
                .apply_overrides(|key| std::env::var(key).ok())
                .map_err(CliError::from)?;
            config
        },
        None => Config::load().map_err(CliError::from)?,
    };
    Ok(config)
}

fn editor(config: &Config) -> Result<SiteEditor> {
    let client = LmStudioClient::new(&config.lmstudio)
        .map_err(CliError::from)
        .context("Failed to create LM Studio client")?;
    let transport: Arc<dyn ModelTransport> = Arc::new(client);
    Ok(SiteEditor::new(transport, config))
}

async fn execute_command(cli: Cli, config: &Config) -> Result<()> {
    match cli.command {
        Commands::Generate {
            project,
            prompt,
            redesign,
            model,
            provider,
            save,
        } => {
            let args = commands::GenerateArgs {
                project,
                prompt,
                redesign,
                model,
                provider,
                save,
            };
            commands::generate(&editor(config)?, args).await?;
        },
        Commands::Edit {
            project,
            prompt,
            model,
            provider,
            selected_element,
            format,
        } => {
            let args = commands::EditArgs {
                project,
                prompt,
                model,
                provider,
                selected_element,
            };
            commands::edit(&editor(config)?, args, format).await?;
        },
        Commands::Apply {
            project,
            response,
            sse,
            dry_run,
            format,
        } => {
            commands::apply(&project, &response, sse, dry_run, format)?;
        },
        Commands::Models { format } => {
            commands::list_models(&editor(config)?, format).await?;
        },
    }

    Ok(())
}
