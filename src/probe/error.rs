//! Probe agent error types.

use thiserror::Error;

use crate::client::ClientError;
use crate::linux::{DriverError, ExecutionError};

/// Errors surfaced by [`ProbeAgent`](super::ProbeAgent) operations.
///
/// Nothing is retried; the first failure aborts the operation and earlier
/// side effects (a created port, a plugged device) are left in place.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// A referenced network, subnet or port does not exist.
    #[error("{resource} {id} not found")]
    NotFound {
        /// Resource kind.
        resource: &'static str,
        /// Requested identifier.
        id: String,
    },

    /// The network-management API failed for another reason.
    #[error("Network API error: {0}")]
    Client(ClientError),

    /// A host command or namespace operation failed.
    #[error("Execution failed: {0}")]
    Execution(#[from] ExecutionError),

    /// The interface driver rejected the request.
    #[error("Interface driver error: {0}")]
    Driver(DriverError),

    /// The command string could not be turned into arguments.
    #[error("Invalid command: {0}")]
    InvalidCommand(String),
}

impl From<ClientError> for ProbeError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::NotFound { resource, id } => ProbeError::NotFound { resource, id },
            other => ProbeError::Client(other),
        }
    }
}

impl From<DriverError> for ProbeError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::Execution(e) => ProbeError::Execution(e),
            other => ProbeError::Driver(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_not_found_from_client() {
        let err: ProbeError = ClientError::NotFound {
            resource: "network",
            id: "n1".to_string(),
        }
        .into();
        assert_matches!(err, ProbeError::NotFound { resource: "network", .. });
        assert_eq!(err.to_string(), "network n1 not found");
    }

    #[test]
    fn test_other_client_errors_wrap() {
        let err: ProbeError = ClientError::Auth("bad token".to_string()).into();
        assert_matches!(err, ProbeError::Client(_));
    }

    #[test]
    fn test_driver_execution_flattens() {
        let err: ProbeError = DriverError::Execution(ExecutionError::EmptyCommand).into();
        assert_matches!(err, ProbeError::Execution(ExecutionError::EmptyCommand));

        let err: ProbeError = DriverError::DuplicateRegistration("ovs".to_string()).into();
        assert_matches!(err, ProbeError::Driver(_));
    }
}
