//! CLI command handlers, one file per subcommand.

mod check;
mod completions;
mod prune;
mod run;

pub use check::run_check;
pub use completions::run_completions;
pub use prune::run_prune;
pub use run::run_backup;
