//! Command implementations for the sitepatch CLI

mod apply;
mod edit;
mod generate;
mod models;

pub use apply::execute as apply;
pub use edit::{EditArgs, execute as edit};
pub use generate::{GenerateArgs, execute as generate};
pub use models::execute as list_models;
