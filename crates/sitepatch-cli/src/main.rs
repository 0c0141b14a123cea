//! sitepatch CLI - generate and edit HTML sites with a local model
//!
//! This is the main entry point for the sitepatch command-line interface.
//! Command implementations live in the library crate.

use std::process::ExitCode;

use sitepatch_cli::error::{category_from_error, retry_hint};

#[tokio::main]
async fn main() -> ExitCode {
    match sitepatch_cli::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let category = category_from_error(&err);
            eprintln!("Error ({category}): {err:#}");
            if let Some(hint) = retry_hint(&err) {
                eprintln!("hint: {hint}");
            }
            ExitCode::from(category.exit_code())
        },
    }
}
