//! CLI command handlers. Each command is in its own file.

mod check;
mod completions;
mod run;

pub use check::run_check;
pub use completions::run_completions;
pub use run::{run_manifest, RunOptions};
