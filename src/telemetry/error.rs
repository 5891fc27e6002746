//! Telemetry error types.

use thiserror::Error;

/// Errors that can occur while setting up audit logging.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Failed to connect to syslog.
    #[error("Failed to connect to syslog: {0}")]
    SyslogConnection(String),
}
