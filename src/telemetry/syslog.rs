//! Syslog integration for audit logging.

use std::sync::Mutex;

use syslog::{Facility, Formatter3164};
use tracing::{debug, error};

use super::error::TelemetryError;
use super::events::AuditEvent;

/// Syslog tag for all audit events.
pub const SYSLOG_TAG: &str = "QPROBE";

enum Sink {
    Null,
    Syslog(Mutex<syslog::Logger<syslog::LoggerBackend, Formatter3164>>),
    Memory(Mutex<Vec<String>>),
}

/// Audit logger that writes structured JSON events to syslog.
pub struct AuditLogger {
    sink: Sink,
}

impl AuditLogger {
    /// Create a new audit logger connected to the local syslog socket.
    pub fn new() -> Result<Self, TelemetryError> {
        let formatter = Formatter3164 {
            facility: Facility::LOG_USER,
            hostname: None,
            process: SYSLOG_TAG.to_string(),
            pid: std::process::id(),
        };

        let writer = syslog::unix(formatter)
            .map_err(|e| TelemetryError::SyslogConnection(e.to_string()))?;

        debug!("Connected to syslog with tag '{}'", SYSLOG_TAG);
        Ok(Self {
            sink: Sink::Syslog(Mutex::new(writer)),
        })
    }

    /// Create a logger that discards all events.
    pub fn new_null() -> Self {
        Self { sink: Sink::Null }
    }

    /// Create a logger that keeps serialized events in memory.
    pub fn new_memory() -> Self {
        Self {
            sink: Sink::Memory(Mutex::new(Vec::new())),
        }
    }

    /// Log an audit event.
    ///
    /// Failures to serialize or write are reported through `tracing` and
    /// otherwise ignored.
    pub fn log(&self, event: AuditEvent) {
        if matches!(self.sink, Sink::Null) {
            return;
        }

        let json = match serde_json::to_string(&event.with_timestamp()) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize audit event: {}", e);
                return;
            }
        };

        match &self.sink {
            Sink::Null => {}
            Sink::Syslog(writer) => match writer.lock() {
                Ok(mut writer) => {
                    if let Err(e) = writer.info(&json) {
                        error!("Failed to write to syslog: {}", e);
                    }
                }
                Err(e) => error!("Failed to acquire syslog writer lock: {}", e),
            },
            Sink::Memory(events) => match events.lock() {
                Ok(mut events) => events.push(json.clone()),
                Err(e) => error!("Failed to acquire audit buffer lock: {}", e),
            },
        }
        debug!("Logged audit event: {}", json);
    }

    /// Events recorded by a memory logger, oldest first. Empty for other sinks.
    pub fn recorded(&self) -> Vec<String> {
        match &self.sink {
            Sink::Memory(events) => events.lock().map(|e| e.clone()).unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// Check if this is a null logger.
    pub fn is_null(&self) -> bool {
        matches!(self.sink, Sink::Null)
    }
}

impl std::fmt::Debug for AuditLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sink = match self.sink {
            Sink::Null => "null",
            Sink::Syslog(_) => "syslog",
            Sink::Memory(_) => "memory",
        };
        f.debug_struct("AuditLogger").field("sink", &sink).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clear_event() -> AuditEvent {
        AuditEvent::ProbeClear {
            host: "compute-1".to_string(),
            count: 0,
        }
    }

    #[test]
    fn test_syslog_tag() {
        assert_eq!(SYSLOG_TAG, "QPROBE");
    }

    #[test]
    fn test_null_logger_discards() {
        let logger = AuditLogger::new_null();
        assert!(logger.is_null());
        logger.log(clear_event());
        assert!(logger.recorded().is_empty());
    }

    #[test]
    fn test_memory_logger_records_json() {
        let logger = AuditLogger::new_memory();
        assert!(!logger.is_null());
        logger.log(clear_event());
        let events = logger.recorded();
        assert_eq!(events.len(), 1);
        assert!(events[0].contains("\"event\":\"probe_clear\""));
    }

    #[test]
    #[ignore = "Requires running syslog daemon"]
    fn test_log_event() {
        let logger = AuditLogger::new().unwrap();
        logger.log(clear_event());
    }
}
