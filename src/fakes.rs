//! In-memory stand-ins for the host and the network API.
//!
//! Used by unit and integration tests to drive the probe agent without
//! root privileges or a live endpoint.

use std::cell::RefCell;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use ipnetwork::IpNetwork;

use crate::client::{
    ClientError, FixedIp, Network, NetworkClient, Port, PortFilter, PortRequest, Subnet,
};
use crate::linux::{ExecutionError, Executor};

struct Rule {
    pattern: String,
    outcome: Result<String, String>,
}

/// Records every command and answers from a list of scripted rules.
///
/// A rule matches when the space-joined command line contains its pattern.
/// The most recently added matching rule wins; unmatched commands succeed
/// with empty output.
#[derive(Default)]
pub struct ScriptedExecutor {
    calls: RefCell<Vec<Vec<String>>>,
    rules: RefCell<Vec<Rule>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer commands containing `pattern` with `stdout`.
    pub fn respond(&self, pattern: &str, stdout: &str) {
        self.rules.borrow_mut().push(Rule {
            pattern: pattern.to_string(),
            outcome: Ok(stdout.to_string()),
        });
    }

    /// Fail commands containing `pattern` with exit status 1 and `stderr`.
    pub fn fail(&self, pattern: &str, stderr: &str) {
        self.rules.borrow_mut().push(Rule {
            pattern: pattern.to_string(),
            outcome: Err(stderr.to_string()),
        });
    }

    /// Every command line run so far, joined with spaces.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|argv| argv.join(" ")).collect()
    }

    /// Whether any command line contained `needle`.
    pub fn was_called(&self, needle: &str) -> bool {
        self.call_count(needle) > 0
    }

    /// Number of command lines containing `needle`.
    pub fn call_count(&self, needle: &str) -> usize {
        self.calls().iter().filter(|c| c.contains(needle)).count()
    }
}

impl Executor for ScriptedExecutor {
    fn execute(&self, argv: &[String]) -> Result<String, ExecutionError> {
        if argv.is_empty() {
            return Err(ExecutionError::EmptyCommand);
        }
        self.calls.borrow_mut().push(argv.to_vec());

        let line = argv.join(" ");
        let rules = self.rules.borrow();
        match rules.iter().rev().find(|r| line.contains(&r.pattern)) {
            None => Ok(String::new()),
            Some(Rule { outcome: Ok(stdout), .. }) => Ok(stdout.clone()),
            Some(Rule { outcome: Err(stderr), .. }) => Err(ExecutionError::CommandFailure {
                command: line,
                status: Some(1),
                stdout: String::new(),
                stderr: stderr.clone(),
            }),
        }
    }
}

#[derive(Default)]
struct FakeState {
    networks: Vec<Network>,
    subnets: Vec<Subnet>,
    ports: Vec<Port>,
    next_port: u32,
    created: usize,
    deleted: usize,
}

/// A network API backed by vectors.
///
/// Created ports get sequential ids (`port-1`, `port-2`, ...), a MAC in the
/// `fa:16:3e` range and the next free host address of each requested subnet.
#[derive(Default)]
pub struct FakeNetworkClient {
    state: RefCell<FakeState>,
}

impl FakeNetworkClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_network(&self, network: Network) {
        self.state.borrow_mut().networks.push(network);
    }

    pub fn add_subnet(&self, subnet: Subnet) {
        self.state.borrow_mut().subnets.push(subnet);
    }

    pub fn add_port(&self, port: Port) {
        self.state.borrow_mut().ports.push(port);
    }

    /// Snapshot of all stored ports.
    pub fn ports(&self) -> Vec<Port> {
        self.state.borrow().ports.clone()
    }

    /// Number of successful `create_port` calls.
    pub fn created(&self) -> usize {
        self.state.borrow().created
    }

    /// Number of successful `delete_port` calls.
    pub fn deleted(&self) -> usize {
        self.state.borrow().deleted
    }
}

fn not_found(resource: &'static str, id: &str) -> ClientError {
    ClientError::NotFound {
        resource,
        id: id.to_string(),
    }
}

fn host_address(cidr: &IpNetwork, offset: u32) -> IpAddr {
    match cidr.network() {
        IpAddr::V4(base) => IpAddr::V4(Ipv4Addr::from(u32::from(base).wrapping_add(offset))),
        IpAddr::V6(base) => IpAddr::V6(Ipv6Addr::from(u128::from(base).wrapping_add(offset.into()))),
    }
}

impl NetworkClient for FakeNetworkClient {
    fn show_network(&self, network_id: &str) -> Result<Network, ClientError> {
        let state = self.state.borrow();
        state
            .networks
            .iter()
            .find(|n| n.id == network_id)
            .cloned()
            .ok_or_else(|| not_found("network", network_id))
    }

    fn show_subnet(&self, subnet_id: &str) -> Result<Subnet, ClientError> {
        let state = self.state.borrow();
        state
            .subnets
            .iter()
            .find(|s| s.id == subnet_id)
            .cloned()
            .ok_or_else(|| not_found("subnet", subnet_id))
    }

    fn show_port(&self, port_id: &str) -> Result<Port, ClientError> {
        let state = self.state.borrow();
        state
            .ports
            .iter()
            .find(|p| p.id == port_id)
            .cloned()
            .ok_or_else(|| not_found("port", port_id))
    }

    fn list_ports(&self, filter: &PortFilter) -> Result<Vec<Port>, ClientError> {
        let state = self.state.borrow();
        Ok(state.ports.iter().filter(|p| filter.matches(p)).cloned().collect())
    }

    fn create_port(&self, request: &PortRequest) -> Result<Port, ClientError> {
        let mut state = self.state.borrow_mut();
        if !state.networks.iter().any(|n| n.id == request.network_id) {
            return Err(not_found("network", &request.network_id));
        }

        let mut fixed_ips = Vec::with_capacity(request.fixed_ips.len());
        for req in &request.fixed_ips {
            let subnet = state
                .subnets
                .iter()
                .find(|s| s.id == req.subnet_id)
                .ok_or_else(|| not_found("subnet", &req.subnet_id))?;
            let used = state
                .ports
                .iter()
                .flat_map(|p| &p.fixed_ips)
                .filter(|ip| ip.subnet_id == subnet.id)
                .count();
            // .1 is left for the gateway
            let offset = u32::try_from(used).unwrap_or(u32::MAX).saturating_add(2);
            fixed_ips.push(FixedIp {
                subnet_id: subnet.id.clone(),
                ip_address: host_address(&subnet.cidr, offset),
            });
        }

        state.next_port += 1;
        let n = state.next_port;
        let port = Port {
            id: format!("port-{}", n),
            name: String::new(),
            network_id: request.network_id.clone(),
            tenant_id: request.tenant_id.clone(),
            device_id: request.device_id.clone(),
            device_owner: request.device_owner.clone(),
            mac_address: format!("fa:16:3e:00:{:02x}:{:02x}", (n >> 8) & 0xff, n & 0xff),
            admin_state_up: request.admin_state_up,
            status: "DOWN".to_string(),
            fixed_ips,
        };
        state.ports.push(port.clone());
        state.created += 1;
        Ok(port)
    }

    fn delete_port(&self, port_id: &str) -> Result<(), ClientError> {
        let mut state = self.state.borrow_mut();
        let before = state.ports.len();
        state.ports.retain(|p| p.id != port_id);
        if state.ports.len() == before {
            return Err(not_found("port", port_id));
        }
        state.deleted += 1;
        Ok(())
    }
}

/// A network record with the given subnets.
pub fn network_fixture(id: &str, subnets: &[&str], external: bool) -> Network {
    Network {
        id: id.to_string(),
        name: format!("net-{}", id),
        tenant_id: "tenant-1".to_string(),
        admin_state_up: true,
        status: "ACTIVE".to_string(),
        subnets: subnets.iter().map(|s| s.to_string()).collect(),
        external,
    }
}

/// A subnet record. The IP version is taken from `cidr`.
///
/// # Panics
///
/// Panics if `cidr` does not parse.
pub fn subnet_fixture(id: &str, network_id: &str, cidr: &str) -> Subnet {
    let cidr: IpNetwork = cidr.parse().expect("fixture cidr");
    Subnet {
        id: id.to_string(),
        name: String::new(),
        network_id: network_id.to_string(),
        tenant_id: "tenant-1".to_string(),
        ip_version: if cidr.is_ipv4() { 4 } else { 6 },
        gateway_ip: None,
        cidr,
    }
}

/// A plain compute port with no fixed IPs.
pub fn port_fixture(id: &str, network_id: &str) -> Port {
    Port {
        id: id.to_string(),
        name: String::new(),
        network_id: network_id.to_string(),
        tenant_id: "tenant-1".to_string(),
        device_id: "instance-1".to_string(),
        device_owner: "compute:nova".to_string(),
        mac_address: "fa:16:3e:aa:bb:cc".to_string(),
        admin_state_up: true,
        status: "ACTIVE".to_string(),
        fixed_ips: Vec::new(),
    }
}
