//! Application configuration.
//!
//! Every section is optional; a missing section takes its defaults. Values are
//! read from a TOML file and then overridden by `DROPCONV_` environment
//! variables, with `__` separating section and key
//! (`DROPCONV_JOBS__MAX_PARALLEL=2`).

mod loader;
mod types;
mod validate;

pub use loader::{load_config, load_config_from_str, load_config_or_default};
pub use types::*;
pub use validate::validate_config;

use thiserror::Error;

/// Why a configuration could not be produced.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested file is missing. Absent optional files are not
    /// an error.
    #[error("Config file {0} does not exist")]
    FileNotFound(String),

    /// TOML syntax, a wrong value type or a malformed environment override.
    #[error("Invalid configuration: {0}")]
    ParseError(String),

    #[error("Configuration rejected: {0}")]
    ValidationError(String),
}
