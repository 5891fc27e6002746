//! Audit logging for probe lifecycle changes.
//!
//! Every probe created or deleted, every host sweep and every command run
//! inside a probe namespace is recorded as a JSON event in syslog under the
//! `QPROBE` tag. This is separate from the `tracing` diagnostics on stderr.
//!
//! The logger is an ordinary value owned by the probe agent; there is no
//! process-wide instance.
//!
//! # Event Format
//!
//! ```json
//! {"ts":"2026-01-07T14:32:01Z","event":"probe_create","port_id":"9d1c...","network_id":"4e2a...","device":"tap9d1c...","namespace":"qprobe-9d1c..."}
//! ```

mod error;
mod events;
mod syslog;

pub use error::TelemetryError;
pub use events::AuditEvent;
pub use self::syslog::{AuditLogger, SYSLOG_TAG};
