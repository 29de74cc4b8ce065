//! Error types for flag derivation and parsing.

use cfgmodel_core::ConfigError;
use thiserror::Error;

/// Errors surfaced while deriving or parsing a command line.
#[derive(Debug, Error)]
pub enum CliError {
    /// Argument parsing failed (unknown flag, missing required flag).
    #[error(transparent)]
    Clap(#[from] clap::Error),

    /// A flag value could not be converted to the field's declared type.
    #[error("invalid value for --{flag}: expected {expected}, got '{given}'")]
    InvalidValue {
        /// Long flag name without the leading dashes.
        flag: String,
        /// Declared type, rendered.
        expected: String,
        /// Raw token supplied on the command line.
        given: String,
    },

    /// Constructing the instance from the reassembled mapping failed.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CliError>;
