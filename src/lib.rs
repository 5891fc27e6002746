//! qprobe: debug probes for Quantum tenant networks.
//!
//! A probe is a port created on a tenant network and plugged into a
//! dedicated network namespace on the local host. From inside that namespace
//! an operator can run `ping`, `ip` or any other command as if it were a
//! VM on the network.
//!
//! # Architecture
//!
//! - **Probe**: lifecycle of probes: create, reuse, delete, sweep, exec, ping
//! - **Client**: blocking REST client for the network API, with Keystone auth
//! - **Linux**: root-helper command execution, `ip` wrapper, interface drivers
//! - **Config**: hierarchical TOML configuration
//! - **Telemetry**: JSON audit events in syslog

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod cli;
pub mod cli_handler;
pub mod client;
pub mod config;
#[allow(missing_docs)]
pub mod fakes;
pub mod linux;
pub mod probe;
pub mod telemetry;
