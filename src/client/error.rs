//! Network-management client error types.

use thiserror::Error;

/// Errors returned by a [`NetworkClient`](super::NetworkClient).
#[derive(Debug, Error)]
pub enum ClientError {
    /// The referenced resource does not exist.
    #[error("{resource} {id} could not be found")]
    NotFound {
        /// Resource kind (network, subnet, port).
        resource: &'static str,
        /// Requested identifier.
        id: String,
    },

    /// The API answered with an unexpected status code.
    #[error("Request to {url} failed with HTTP {status}")]
    Status {
        /// Request URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// The request never produced a response.
    #[error("Request to {url} failed: {message}")]
    Transport {
        /// Request URL.
        url: String,
        /// Transport failure description.
        message: String,
    },

    /// The response body did not have the expected shape.
    #[error("Failed to decode response from {url}: {message}")]
    Decode {
        /// Request URL.
        url: String,
        /// Decode failure description.
        message: String,
    },

    /// Authentication failed or the service catalog had no usable endpoint.
    #[error("Authentication failed: {0}")]
    Auth(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = ClientError::NotFound {
            resource: "network",
            id: "n-404".to_string(),
        };
        assert_eq!(err.to_string(), "network n-404 could not be found");
    }

    #[test]
    fn test_status_display() {
        let err = ClientError::Status {
            url: "http://quantum:9696/v2.0/ports".to_string(),
            status: 409,
        };
        let msg = err.to_string();
        assert!(msg.contains("409"));
        assert!(msg.contains("/v2.0/ports"));
    }
}
