//! Debug probes: ports whose interfaces live in per-probe namespaces on this
//! host, used to reach tenant networks for troubleshooting.

mod agent;
mod error;

pub use agent::{
    AgentConfig, DEFAULT_EXTERNAL_BRIDGE, DEVICE_OWNER_PROBE, NAMESPACE_PREFIX, ProbeAgent,
    ProbeListing, namespace_for, ping_command, split_command,
};
pub use error::ProbeError;
