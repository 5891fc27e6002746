//! Error types for host networking operations.
//!
//! - Command execution errors (spawn failures, non-zero exits)
//! - Interface driver errors (registry lookups, plug failures)

use thiserror::Error;

/// Errors from running a host command.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The command could not be started at all.
    #[error("Failed to start execution of [{command}]: {source}")]
    Spawn {
        /// Full command line.
        command: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The command ran and exited unsuccessfully.
    #[error(
        "Command [{command}] failed with status {}\nstdout: {stdout}\nstderr: {stderr}",
        exit_status(.status)
    )]
    CommandFailure {
        /// Full command line.
        command: String,
        /// Exit code, `None` if killed by a signal.
        status: Option<i32>,
        /// Captured standard output.
        stdout: String,
        /// Captured standard error.
        stderr: String,
    },

    /// Nothing to execute.
    #[error("Empty command")]
    EmptyCommand,

    /// The configured root helper could not be parsed.
    #[error("Invalid root helper '{helper}': {message}")]
    InvalidRootHelper {
        /// The raw helper string.
        helper: String,
        /// Parse failure description.
        message: String,
    },
}

fn exit_status(status: &Option<i32>) -> String {
    status.map_or_else(|| "signal".to_string(), |code| code.to_string())
}

/// Errors from virtual-interface drivers.
#[derive(Debug, Error)]
pub enum DriverError {
    /// A driver tag was registered twice.
    #[error("Interface driver '{0}' is already registered")]
    DuplicateRegistration(String),

    /// No driver is registered under the requested tag.
    #[error("Unknown interface driver '{tag}' (available: {available})")]
    UnknownDriver {
        /// Requested tag.
        tag: String,
        /// Comma separated list of registered tags.
        available: String,
    },

    /// A CIDR passed to `init_l3` could not be parsed.
    #[error("Invalid CIDR '{cidr}': {message}")]
    InvalidCidr {
        /// The offending value.
        cidr: String,
        /// Parse failure description.
        message: String,
    },

    /// An underlying command failed.
    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_failure_display() {
        let err = ExecutionError::CommandFailure {
            command: "ip netns add qprobe-1".to_string(),
            status: Some(1),
            stdout: String::new(),
            stderr: "File exists".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("ip netns add qprobe-1"));
        assert!(msg.contains("status 1"));
        assert!(msg.contains("File exists"));
    }

    #[test]
    fn test_command_failure_signal_display() {
        let err = ExecutionError::CommandFailure {
            command: "ping -c 1 10.0.0.1".to_string(),
            status: None,
            stdout: String::new(),
            stderr: String::new(),
        };
        assert!(err.to_string().contains("status signal"));
    }

    #[test]
    fn test_unknown_driver_display() {
        let err = DriverError::UnknownDriver {
            tag: "midonet".to_string(),
            available: "bridge, ovs".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("midonet"));
        assert!(msg.contains("bridge, ovs"));
    }
}
