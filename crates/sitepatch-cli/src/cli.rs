//! # CLI Structure and Argument Parsing
//!
//! The `sitepatch` command line drives a local LM Studio server to build and
//! edit a site kept as a directory of HTML files.
//!
//! ```bash
//! # Generate a first page and save it as index.html
//! sitepatch generate ./site --model qwen2.5-coder --prompt "a bakery landing page" --save
//!
//! # Ask for a follow-up edit; only the changed lines are rewritten
//! sitepatch edit ./site --model qwen2.5-coder --prompt "add an about page"
//!
//! # Replay a saved model answer without calling the model
//! sitepatch apply ./site answer.txt --dry-run -f json
//!
//! # Show which models the server offers
//! sitepatch models
//! ```
//!
//! Connection settings come from the config file, overridden by the `LMHOST`,
//! `LMPORT` and `tokenlimit` environment variables.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::output::OutputFormat;

/// Main CLI structure for the `sitepatch` command
#[derive(Parser, Clone, Debug)]
#[command(name = "sitepatch")]
#[command(version)]
#[command(about = "sitepatch - generate and edit HTML sites with a local model", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Suppress informational messages (only show errors)
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Disable all ANSI colors in output (also respects `NO_COLOR` env)
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Path to configuration file. Also via `SITEPATCH_CONFIG`.
    #[arg(long, global = true, value_name = "FILE", env = "SITEPATCH_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available subcommands for the `sitepatch` CLI
#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Generate a page from a prompt, streaming the document to stdout
    Generate {
        /// Project directory; existing pages and prompts are sent as context
        project: PathBuf,

        /// What to build
        #[arg(short, long)]
        prompt: Option<String>,

        /// Markdown file describing an existing site to redesign
        #[arg(long, value_name = "FILE")]
        redesign: Option<PathBuf>,

        /// Model id as listed by `sitepatch models`
        #[arg(short, long)]
        model: String,

        /// Provider id
        #[arg(long, default_value = "auto")]
        provider: String,

        /// Write the generated document to the project as index.html
        #[arg(long)]
        save: bool,
    },

    /// Ask the model for a follow-up edit and apply it to the project
    Edit {
        /// Project directory
        project: PathBuf,

        /// The change to make
        #[arg(short, long)]
        prompt: String,

        /// Model id as listed by `sitepatch models`
        #[arg(short, long)]
        model: String,

        /// Provider id
        #[arg(long, default_value = "auto")]
        provider: String,

        /// File holding the HTML of the element the edit should focus on
        #[arg(long, value_name = "FILE")]
        selected_element: Option<PathBuf>,

        /// Output format
        #[arg(short = 'f', long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Apply a saved model answer to the project without calling the model
    Apply {
        /// Project directory
        project: PathBuf,

        /// File with the model answer, or `-` for stdin
        response: PathBuf,

        /// The answer is a raw event-stream capture (`data:` lines)
        #[arg(long)]
        sse: bool,

        /// Report what would change without writing files
        #[arg(long)]
        dry_run: bool,

        /// Output format
        #[arg(short = 'f', long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// List the models the server offers
    Models {
        /// Output format
        #[arg(short = 'f', long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl Commands {
    /// Output format selected for the command, if it has one.
    pub const fn format(&self) -> Option<OutputFormat> {
        match self {
            Self::Edit { format, .. } | Self::Apply { format, .. } | Self::Models { format } => {
                Some(*format)
            },
            Self::Generate { .. } => None,
        }
    }
}
