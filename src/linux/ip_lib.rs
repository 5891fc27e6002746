//! Wrappers around the `ip` command.
//!
//! [`IpWrapper`] covers the small slice of iproute2 the probe agent needs:
//! namespace lifecycle, link state and address management. Every operation
//! optionally targets a network namespace, in which case the command runs as
//! `ip netns exec <ns> ip ...`.
//!
//! # Requirements
//!
//! - `CAP_NET_ADMIN` (normally through the root helper)
//! - `ip` command available in PATH

use std::net::IpAddr;
use std::rc::Rc;

use ipnetwork::IpNetwork;
use tracing::{debug, info};

use super::error::ExecutionError;
use super::executor::{Executor, argv};

/// Handle for running `ip` commands through an [`Executor`].
#[derive(Clone)]
pub struct IpWrapper {
    exec: Rc<dyn Executor>,
}

impl std::fmt::Debug for IpWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpWrapper").finish_non_exhaustive()
    }
}

impl IpWrapper {
    /// Create a wrapper that runs commands through `exec`.
    pub fn new(exec: Rc<dyn Executor>) -> Self {
        Self { exec }
    }

    /// Run an `ip` subcommand, inside `namespace` when given.
    fn run_ip(&self, namespace: Option<&str>, args: &[&str]) -> Result<String, ExecutionError> {
        let mut full = match namespace {
            Some(ns) => argv(["ip", "netns", "exec", ns, "ip"]),
            None => argv(["ip"]),
        };
        full.extend(args.iter().map(|a| a.to_string()));
        self.exec.execute(&full)
    }

    /// Run an arbitrary command on the host.
    pub fn execute(&self, command: &[String]) -> Result<String, ExecutionError> {
        self.exec.execute(command)
    }

    // -- namespaces ---------------------------------------------------------

    /// Names of all network namespaces on the host.
    pub fn list_namespaces(&self) -> Result<Vec<String>, ExecutionError> {
        let out = self.run_ip(None, &["-o", "netns", "list"])?;
        Ok(out
            .lines()
            .filter_map(|line| line.split_whitespace().next())
            .map(str::to_string)
            .collect())
    }

    /// Check if a network namespace exists.
    ///
    /// A failure to list namespaces is treated as "does not exist".
    pub fn netns_exists(&self, name: &str) -> bool {
        match self.list_namespaces() {
            Ok(names) => names.iter().any(|n| n == name),
            Err(e) => {
                debug!("Cannot list network namespaces: {}", e);
                false
            }
        }
    }

    /// Create a network namespace.
    pub fn add_namespace(&self, name: &str) -> Result<(), ExecutionError> {
        info!("Creating network namespace: {}", name);
        self.run_ip(None, &["netns", "add", name])?;
        Ok(())
    }

    /// Delete a network namespace.
    pub fn delete_namespace(&self, name: &str) -> Result<(), ExecutionError> {
        info!("Deleting network namespace: {}", name);
        self.run_ip(None, &["netns", "delete", name])?;
        Ok(())
    }

    /// Make sure `name` exists, creating it and bringing up its loopback if not.
    ///
    /// Only the namespace itself is created; interfaces are the driver's job.
    pub fn ensure_namespace(&self, name: &str) -> Result<(), ExecutionError> {
        if self.netns_exists(name) {
            debug!("Network namespace {} already exists", name);
            return Ok(());
        }
        self.add_namespace(name)?;
        self.run_ip(Some(name), &["link", "set", "lo", "up"])?;
        Ok(())
    }

    /// Run `command` inside the namespace and return its stdout.
    pub fn netns_execute(&self, name: &str, command: &[String]) -> Result<String, ExecutionError> {
        let mut full = argv(["ip", "netns", "exec", name]);
        full.extend_from_slice(command);
        self.exec.execute(&full)
    }

    // -- links --------------------------------------------------------------

    /// Check whether `device` exists, inside `namespace` when given.
    pub fn device_exists(&self, device: &str, namespace: Option<&str>) -> bool {
        match self.run_ip(namespace, &["-o", "link", "show", "dev", device]) {
            Ok(out) => !out.trim().is_empty(),
            Err(_) => false,
        }
    }

    /// Set the MAC address of a link.
    pub fn set_address(
        &self,
        device: &str,
        mac: &str,
        namespace: Option<&str>,
    ) -> Result<(), ExecutionError> {
        self.run_ip(namespace, &["link", "set", "dev", device, "address", mac])?;
        Ok(())
    }

    /// Set the MTU of a link.
    pub fn set_mtu(
        &self,
        device: &str,
        mtu: u32,
        namespace: Option<&str>,
    ) -> Result<(), ExecutionError> {
        let mtu = mtu.to_string();
        self.run_ip(namespace, &["link", "set", "dev", device, "mtu", &mtu])?;
        Ok(())
    }

    /// Bring a link up.
    pub fn set_up(&self, device: &str, namespace: Option<&str>) -> Result<(), ExecutionError> {
        self.run_ip(namespace, &["link", "set", "dev", device, "up"])?;
        Ok(())
    }

    /// Move a host link into `target` namespace.
    pub fn set_netns(&self, device: &str, target: &str) -> Result<(), ExecutionError> {
        self.run_ip(None, &["link", "set", "dev", device, "netns", target])?;
        Ok(())
    }

    /// Delete a link.
    pub fn delete_link(&self, device: &str, namespace: Option<&str>) -> Result<(), ExecutionError> {
        self.run_ip(namespace, &["link", "delete", device])?;
        Ok(())
    }

    /// Create a veth pair, placing the peer in `peer_namespace` when given.
    pub fn add_veth(
        &self,
        name: &str,
        peer: &str,
        peer_namespace: Option<&str>,
    ) -> Result<(), ExecutionError> {
        let mut args = vec!["link", "add", name, "type", "veth", "peer", "name", peer];
        if let Some(ns) = peer_namespace {
            self.ensure_namespace(ns)?;
            args.extend(["netns", ns]);
        }
        self.run_ip(None, &args)?;
        Ok(())
    }

    // -- addresses ----------------------------------------------------------

    /// Global-scope permanent addresses configured on `device`.
    pub fn list_global_addresses(
        &self,
        device: &str,
        namespace: Option<&str>,
    ) -> Result<Vec<IpNetwork>, ExecutionError> {
        let out = self.run_ip(
            namespace,
            &["-o", "addr", "show", "dev", device, "scope", "global", "permanent"],
        )?;
        Ok(parse_addresses(&out))
    }

    /// Add an address to `device`. IPv4 addresses get an explicit broadcast.
    pub fn add_address(
        &self,
        cidr: &IpNetwork,
        device: &str,
        namespace: Option<&str>,
    ) -> Result<(), ExecutionError> {
        let cidr_str = cidr_string(cidr);
        let family = family_flag(cidr);
        let mut args = vec![family, "addr", "add", cidr_str.as_str()];
        let broadcast;
        if let IpNetwork::V4(net) = cidr {
            broadcast = net.broadcast().to_string();
            args.extend(["brd", broadcast.as_str()]);
        }
        args.extend(["scope", "global", "dev", device]);
        self.run_ip(namespace, &args)?;
        Ok(())
    }

    /// Remove an address from `device`.
    pub fn delete_address(
        &self,
        cidr: &IpNetwork,
        device: &str,
        namespace: Option<&str>,
    ) -> Result<(), ExecutionError> {
        let cidr_str = cidr_string(cidr);
        self.run_ip(
            namespace,
            &[family_flag(cidr), "addr", "del", &cidr_str, "dev", device],
        )?;
        Ok(())
    }
}

fn family_flag(cidr: &IpNetwork) -> &'static str {
    match cidr {
        IpNetwork::V4(_) => "-4",
        IpNetwork::V6(_) => "-6",
    }
}

/// Host address plus prefix length, e.g. `10.0.0.3/24`.
pub fn cidr_string(cidr: &IpNetwork) -> String {
    format!("{}/{}", cidr.ip(), cidr.prefix())
}

/// Build an interface CIDR from an address and the subnet it belongs to.
pub fn interface_cidr(address: IpAddr, subnet: &IpNetwork) -> String {
    format!("{}/{}", address, subnet.prefix())
}

/// Parse `ip -o addr show` output into host CIDRs.
fn parse_addresses(output: &str) -> Vec<IpNetwork> {
    output
        .lines()
        .filter_map(|line| {
            let mut tokens = line.split_whitespace();
            tokens.find(|t| *t == "inet" || *t == "inet6")?;
            tokens.next()?.parse::<IpNetwork>().ok()
        })
        .collect()
}
