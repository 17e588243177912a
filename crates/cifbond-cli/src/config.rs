//! Layered configuration for the `connect` command.
//!
//! Values are resolved from, in increasing priority: built-in defaults, the TOML config
//! file, `--set KEY=VALUE` overrides, and dedicated command-line flags.

mod builder;
mod defaults;
mod file;
mod models;

pub use builder::{build_config, load_radii};
pub use models::AppConfig;
