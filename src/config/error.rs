//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or validating qprobe configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A config file exists but could not be read, or an explicit
    /// `--config` path is missing.
    #[error("Cannot read qprobe config {path}: {source}")]
    ReadError {
        /// Offending file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A config file is not valid TOML or does not match the schema.
    #[error("Malformed qprobe config {path}: {source}")]
    ParseError {
        /// Offending file.
        path: PathBuf,
        /// The TOML decoder error, including line and column.
        source: toml::de::Error,
    },

    /// The merged configuration cannot be used, e.g. keystone auth without
    /// an `auth_url`.
    #[error("Invalid setting {field}: {message}")]
    InvalidValue {
        /// Dotted setting name, such as `auth.auth_url`.
        field: String,
        /// What is wrong with it.
        message: String,
    },
}
