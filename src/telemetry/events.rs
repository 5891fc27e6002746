//! Audit event types for structured logging.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Probe lifecycle events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    /// A probe port was created and its interface configured.
    ProbeCreate {
        /// Probe port id.
        port_id: String,
        /// Network the probe sits on.
        network_id: String,
        /// Host interface name.
        device: String,
        /// Namespace holding the interface, if namespaces are in use.
        namespace: Option<String>,
    },

    /// A probe was unplugged and its port deleted.
    ProbeDelete {
        /// Probe port id.
        port_id: String,
        /// Network the probe sat on.
        network_id: String,
        /// Whether the probe namespace was removed as well.
        namespace_removed: bool,
    },

    /// All probes of a host were deleted.
    ProbeClear {
        /// Host whose probes were cleared.
        host: String,
        /// Number of probes deleted.
        count: usize,
    },

    /// A command was run on behalf of a probe.
    CommandExec {
        /// Probe port id.
        port_id: String,
        /// Namespace the command ran in.
        namespace: Option<String>,
        /// Command line as given.
        command: String,
    },
}

/// Wrapper for serializing events with timestamp.
#[derive(Debug, Clone, Serialize)]
pub struct TimestampedEvent<'a> {
    /// ISO8601 timestamp.
    #[serde(rename = "ts")]
    pub timestamp: DateTime<Utc>,

    /// The event, flattened into this struct.
    #[serde(flatten)]
    pub event: &'a AuditEvent,
}

impl AuditEvent {
    /// Wrap this event with a timestamp for serialization.
    pub fn with_timestamp(&self) -> TimestampedEvent<'_> {
        TimestampedEvent {
            timestamp: Utc::now(),
            event: self,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_create_serialization() {
        let event = AuditEvent::ProbeCreate {
            port_id: "p1".to_string(),
            network_id: "n1".to_string(),
            device: "tapp1".to_string(),
            namespace: Some("qprobe-p1".to_string()),
        };

        let json = serde_json::to_string(&event.with_timestamp()).unwrap();

        assert!(json.contains("\"event\":\"probe_create\""));
        assert!(json.contains("\"port_id\":\"p1\""));
        assert!(json.contains("\"namespace\":\"qprobe-p1\""));
        assert!(json.contains("\"ts\""));
    }

    #[test]
    fn test_probe_delete_serialization() {
        let event = AuditEvent::ProbeDelete {
            port_id: "p1".to_string(),
            network_id: "n1".to_string(),
            namespace_removed: false,
        };

        let json = serde_json::to_string(&event.with_timestamp()).unwrap();

        assert!(json.contains("\"event\":\"probe_delete\""));
        assert!(json.contains("\"namespace_removed\":false"));
    }

    #[test]
    fn test_probe_clear_serialization() {
        let event = AuditEvent::ProbeClear {
            host: "compute-1".to_string(),
            count: 3,
        };

        let json = serde_json::to_string(&event.with_timestamp()).unwrap();

        assert!(json.contains("\"event\":\"probe_clear\""));
        assert!(json.contains("\"count\":3"));
    }

    #[test]
    fn test_command_exec_without_namespace() {
        let event = AuditEvent::CommandExec {
            port_id: "p1".to_string(),
            namespace: None,
            command: "ping -c 1 10.0.0.3".to_string(),
        };

        let json = serde_json::to_string(&event.with_timestamp()).unwrap();

        assert!(json.contains("\"event\":\"command_exec\""));
        assert!(json.contains("\"namespace\":null"));
        assert!(json.contains("\"command\":\"ping -c 1 10.0.0.3\""));
    }
}
