//! Host networking primitives for probes.
//!
//! This module wraps the Linux tooling the probe agent drives:
//! - Command execution through a root helper ([`executor`])
//! - Network namespaces, links and addresses via `ip` ([`ip_lib`])
//! - Virtual-interface drivers for OVS and Linux bridge ([`interface`])
//!
//! # Requirements
//!
//! - `CAP_NET_ADMIN` capability or a root helper such as `sudo`
//! - `ip` (iproute2) and, for the OVS driver, `ovs-vsctl` in PATH
//!
//! # Concurrency
//!
//! Nothing here locks. Existence checks followed by creation (namespaces,
//! devices) race with any other process touching the same names; two agents
//! probing the same network from one host can collide.

pub mod error;
pub mod executor;
pub mod interface;
pub mod ip_lib;

pub use error::{DriverError, ExecutionError};
pub use executor::{DEFAULT_ROOT_HELPER, Executor, HostExecutor};
pub use interface::{
    BridgeInterfaceDriver, DriverRegistry, DriverSettings, InterfaceDriver, OvsInterfaceDriver,
    PlugRequest,
};
pub use ip_lib::IpWrapper;
