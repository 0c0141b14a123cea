//! Output formatting for command results.
//!
//! Commands build a serializable summary and hand it to [`OutputFormat`],
//! which prints it either as colored text for people or as pretty JSON for
//! scripts.

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use sitepatch_core::{LineRange, ModelInfo, PatchReport};

/// Output format options supported by the CLI
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// Pretty-printed JSON
    Json,
}

impl OutputFormat {
    /// Whether output is meant for machines.
    pub const fn is_machine_readable(self) -> bool {
        matches!(self, Self::Json)
    }
}

/// Result of applying a model answer to a project.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchSummary {
    /// Project directory.
    pub project: String,
    /// Line ranges touched, in the order the edits were applied.
    pub updated_lines: Vec<LineRange>,
    /// Paths of every page after the edit.
    pub pages: Vec<String>,
    /// Counts reported by the patcher.
    pub report: PatchReport,
    /// Whether files were written.
    pub saved: bool,
}

impl PatchSummary {
    /// Print the summary in `format`.
    pub fn print(&self, format: OutputFormat) -> Result<()> {
        match format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(self)?);
            },
            OutputFormat::Text => self.print_text(),
        }
        Ok(())
    }

    fn print_text(&self) {
        let report = &self.report;
        let verb = if self.saved { "Updated" } else { "Would update" };
        println!("{} {}", verb.green().bold(), self.project.bold());

        if report.legacy_fallback {
            println!("  {}", "no page markers; edits applied to the primary page".yellow());
        }
        println!(
            "  {} applied, {} missed",
            report.blocks_applied.to_string().green(),
            if report.blocks_missed > 0 {
                report.blocks_missed.to_string().red()
            } else {
                report.blocks_missed.to_string().normal()
            }
        );
        if report.pages_created + report.pages_replaced > 0 {
            println!(
                "  {} page(s) created, {} replaced",
                report.pages_created, report.pages_replaced
            );
        }
        if report.unknown_pages > 0 {
            println!("  {} update(s) named unknown pages", report.unknown_pages.to_string().yellow());
        }
        if report.truncated_bodies > 0 {
            println!("  {}", "answer was cut off mid-edit".yellow());
        }
        for range in &self.updated_lines {
            let lines = if range.start == range.end {
                format!("line {}", range.start)
            } else {
                format!("lines {}-{}", range.start, range.end)
            };
            println!("  {} {}", "~".cyan(), lines.dimmed());
        }
        println!("  pages: {}", self.pages.join(", "));
    }
}

/// Print the model catalog in `format`.
pub fn print_models(models: &[ModelInfo], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(models)?);
        },
        OutputFormat::Text => {
            if models.is_empty() {
                println!("No models available. Is LM Studio running?");
                return Ok(());
            }
            println!("Available models ({}):\n", models.len());
            for model in models {
                println!(
                    "  {} {}",
                    model.value.green(),
                    format!("[{}]", model.providers.join(", ")).dimmed()
                );
            }
        },
    }
    Ok(())
}
