//! CLI command handlers, one file per command.

mod bridge;
mod completions;
mod config;
mod dry_run;
mod man;
mod manifest;
mod url;

pub use bridge::run_bridge_stdio;
pub use completions::run_completions;
pub use config::run_config;
pub use dry_run::run_dry_run;
pub use man::run_man;
pub use manifest::run_manifest;
pub use url::run_url;
