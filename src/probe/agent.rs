//! The probe lifecycle manager.
//!
//! A probe is an ordinary port on a tenant network, tagged with
//! [`DEVICE_OWNER_PROBE`] and bound to this host, whose interface is plugged
//! into a dedicated namespace `qprobe-<port-id>`. The agent keeps no state
//! between calls: every operation re-reads the API and the host.
//!
//! # Idempotence
//!
//! [`ProbeAgent::ensure_probe`] looks up an existing probe before creating
//! one, and [`ProbeAgent::create_probe`] reuses an interface that already
//! exists in the probe namespace. Both are check-then-act and give no
//! guarantee against a concurrent caller doing the same thing.

use serde::Serialize;
use tracing::{debug, info, warn};

use super::error::ProbeError;
use crate::client::{FixedIpRequest, Network, NetworkClient, Port, PortFilter, PortRequest, Subnet};
use crate::linux::ip_lib::interface_cidr;
use crate::linux::{DEFAULT_ROOT_HELPER, InterfaceDriver, IpWrapper, PlugRequest};
use crate::telemetry::{AuditEvent, AuditLogger};

/// Device owner tag marking a port as a probe.
pub const DEVICE_OWNER_PROBE: &str = "network:probe";

/// Prefix of probe namespace names.
pub const NAMESPACE_PREFIX: &str = "qprobe-";

/// Default bridge for externally routable networks.
pub const DEFAULT_EXTERNAL_BRIDGE: &str = "br-ex";

/// Namespace name for a probe port.
pub fn namespace_for(port_id: &str) -> String {
    format!("{}{}", NAMESPACE_PREFIX, port_id)
}

/// Ping binary for an IP version.
pub fn ping_command(ip_version: u8) -> &'static str {
    if ip_version == 4 { "ping" } else { "ping6" }
}

/// Settings that drive probe behaviour.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Isolate each probe in its own network namespace.
    pub use_namespaces: bool,
    /// Bridge used when the probed network is external.
    pub external_network_bridge: String,
    /// Identifier of this host; stored as the probe port's device id.
    pub host: String,
    /// Root helper shown in the interactive `ip netns exec` hint.
    pub root_helper: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            use_namespaces: true,
            external_network_bridge: DEFAULT_EXTERNAL_BRIDGE.to_string(),
            host: String::new(),
            root_helper: DEFAULT_ROOT_HELPER.to_string(),
        }
    }
}

/// A probe port plus its host interface name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeListing {
    /// The port record.
    #[serde(flatten)]
    pub port: Port,
    /// Interface name the driver uses for this port.
    pub device_name: String,
}

/// A network with its subnets resolved, valid for one operation.
#[derive(Debug, Clone)]
struct NetworkView {
    network: Network,
    subnets: Vec<Subnet>,
}

impl NetworkView {
    fn subnet(&self, subnet_id: &str) -> Option<&Subnet> {
        self.subnets.iter().find(|s| s.id == subnet_id)
    }
}

/// Creates, reuses, lists and tears down probes.
pub struct ProbeAgent<C> {
    conf: AgentConfig,
    client: C,
    driver: Box<dyn InterfaceDriver>,
    ip: IpWrapper,
    audit: AuditLogger,
}

impl<C: NetworkClient> ProbeAgent<C> {
    /// Assemble an agent from its collaborators.
    pub fn new(
        conf: AgentConfig,
        client: C,
        driver: Box<dyn InterfaceDriver>,
        ip: IpWrapper,
        audit: AuditLogger,
    ) -> Self {
        Self {
            conf,
            client,
            driver,
            ip,
            audit,
        }
    }

    /// The agent's configuration.
    pub fn config(&self) -> &AgentConfig {
        &self.conf
    }

    /// The network-management client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// The audit logger events are written to.
    pub fn audit(&self) -> &AuditLogger {
        &self.audit
    }

    /// Create a new probe port on `network_id` and plug it into this host.
    pub fn create_probe(&self, network_id: &str) -> Result<Port, ProbeError> {
        let view = self.network_view(network_id)?;
        let bridge = self.bridge_for(&view.network);

        let port = self.create_port(&view)?;
        info!("Created probe port {} on network {}", port.id, network_id);

        let device = self.driver.device_name(&port);
        let namespace = self.namespace(&port);

        if self.ip.device_exists(&device, namespace.as_deref()) {
            debug!("Reusing existing device: {}", device);
        } else {
            self.driver.plug(&PlugRequest {
                network_id: &view.network.id,
                port_id: &port.id,
                device_name: &device,
                mac_address: &port.mac_address,
                bridge,
                namespace: namespace.as_deref(),
            })?;
        }

        let mut cidrs = Vec::with_capacity(port.fixed_ips.len());
        for fixed_ip in &port.fixed_ips {
            let subnet = match view.subnet(&fixed_ip.subnet_id) {
                Some(subnet) => subnet.clone(),
                None => self.client.show_subnet(&fixed_ip.subnet_id)?,
            };
            cidrs.push(interface_cidr(fixed_ip.ip_address, &subnet.cidr));
        }
        self.driver.init_l3(&device, &cidrs, namespace.as_deref())?;

        self.audit.log(AuditEvent::ProbeCreate {
            port_id: port.id.clone(),
            network_id: network_id.to_string(),
            device,
            namespace,
        });
        Ok(port)
    }

    /// Return this host's probe on `network_id`, creating one if needed.
    pub fn ensure_probe(&self, network_id: &str) -> Result<Port, ProbeError> {
        let filter = self.host_probes().network(network_id);
        match self.client.list_ports(&filter)?.into_iter().next() {
            Some(port) => {
                debug!("Found existing probe {} on network {}", port.id, network_id);
                Ok(port)
            }
            None => self.create_probe(network_id),
        }
    }

    /// Unplug a probe, remove its namespace and delete the port.
    ///
    /// Host cleanup is best-effort: failing to unplug the device or remove
    /// the namespace is logged and the port is still deleted.
    pub fn delete_probe(&self, port_id: &str) -> Result<(), ProbeError> {
        let port = self.client.show_port(port_id)?;
        let network = self.client.show_network(&port.network_id)?;
        let bridge = self.bridge_for(&network);
        let device = self.driver.device_name(&port);
        let namespace = namespace_for(&port.id);

        let mut namespace_removed = false;
        if self.conf.use_namespaces && self.ip.netns_exists(&namespace) {
            if let Err(e) = self.driver.unplug(&device, bridge, Some(&namespace)) {
                warn!("Failed unplugging {} in {}: {}", device, namespace, e);
            }
            match self.ip.delete_namespace(&namespace) {
                Ok(()) => namespace_removed = true,
                Err(e) => warn!("Failed to delete namespace {}: {}", namespace, e),
            }
        } else if let Err(e) = self.driver.unplug(&device, bridge, None) {
            warn!("Failed unplugging {}: {}", device, e);
        }

        self.client.delete_port(&port.id)?;
        info!("Deleted probe port {}", port.id);

        self.audit.log(AuditEvent::ProbeDelete {
            port_id: port.id,
            network_id: port.network_id,
            namespace_removed,
        });
        Ok(())
    }

    /// Delete every probe bound to this host. Returns the deleted port ids.
    ///
    /// Stops at the first probe that fails to delete.
    pub fn clear_probe(&self) -> Result<Vec<String>, ProbeError> {
        let ports = self.client.list_ports(&self.host_probes())?;
        let mut deleted = Vec::with_capacity(ports.len());
        for port in ports {
            self.delete_probe(&port.id)?;
            deleted.push(port.id);
        }
        self.audit.log(AuditEvent::ProbeClear {
            host: self.conf.host.clone(),
            count: deleted.len(),
        });
        Ok(deleted)
    }

    /// All probe ports known to the API, from any host.
    pub fn list_probes(&self) -> Result<Vec<ProbeListing>, ProbeError> {
        let filter = PortFilter::default().owner(DEVICE_OWNER_PROBE);
        Ok(self
            .client
            .list_ports(&filter)?
            .into_iter()
            .map(|port| ProbeListing {
                device_name: self.driver.device_name(&port),
                port,
            })
            .collect())
    }

    /// Run `command` in the probe's namespace and return its output.
    ///
    /// Without a command (and with namespaces enabled) this returns the
    /// command prefix for entering the namespace by hand instead.
    pub fn exec_command(&self, port_id: &str, command: Option<&str>) -> Result<String, ProbeError> {
        let port = self.client.show_port(port_id)?;
        let command = command.map(str::trim).filter(|c| !c.is_empty());

        if !self.conf.use_namespaces {
            let command = command.ok_or_else(|| {
                ProbeError::InvalidCommand("a command is required when namespaces are disabled".into())
            })?;
            let argv = split_command(command)?;
            let output = self.ip.execute(&argv)?;
            self.audit_exec(&port, None, command);
            return Ok(output);
        }

        let namespace = namespace_for(&port.id);
        let Some(command) = command else {
            return Ok(self.netns_exec_hint(&namespace));
        };

        let argv = split_command(command)?;
        self.ip.ensure_namespace(&namespace)?;
        let output = self.ip.netns_execute(&namespace, &argv)?;
        self.audit_exec(&port, Some(namespace), command);
        Ok(output)
    }

    /// Ping every fixed IP of every non-probe port, from a probe on its network.
    ///
    /// Failed pings contribute their error text and the sweep carries on.
    pub fn ping_all(&self, network_id: Option<&str>, timeout: u32) -> Result<String, ProbeError> {
        let filter = match network_id {
            Some(id) => PortFilter::default().network(id),
            None => PortFilter::default(),
        };
        let ports = self.client.list_ports(&filter)?;

        let mut result = String::new();
        for port in ports.iter().filter(|p| p.device_owner != DEVICE_OWNER_PROBE) {
            let probe = self.ensure_probe(&port.network_id)?;
            for fixed_ip in &port.fixed_ips {
                let subnet = self.client.show_subnet(&fixed_ip.subnet_id)?;
                let command = format!(
                    "{} -c 1 -w {} {}",
                    ping_command(subnet.ip_version),
                    timeout,
                    fixed_ip.ip_address
                );
                match self.exec_command(&probe.id, Some(&command)) {
                    Ok(output) => result.push_str(&output),
                    Err(ProbeError::Execution(e)) => {
                        debug!("{} from probe {} failed", command, probe.id);
                        result.push_str(&e.to_string());
                        result.push('\n');
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(result)
    }

    fn namespace(&self, port: &Port) -> Option<String> {
        self.conf.use_namespaces.then(|| namespace_for(&port.id))
    }

    fn bridge_for(&self, network: &Network) -> Option<&str> {
        network
            .external
            .then_some(self.conf.external_network_bridge.as_str())
    }

    fn host_probes(&self) -> PortFilter {
        PortFilter::default()
            .device(self.conf.host.as_str())
            .owner(DEVICE_OWNER_PROBE)
    }

    fn network_view(&self, network_id: &str) -> Result<NetworkView, ProbeError> {
        let network = self.client.show_network(network_id)?;
        let subnets = network
            .subnets
            .iter()
            .map(|id| self.client.show_subnet(id))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(NetworkView { network, subnets })
    }

    fn create_port(&self, view: &NetworkView) -> Result<Port, ProbeError> {
        let request = PortRequest {
            admin_state_up: true,
            network_id: view.network.id.clone(),
            device_id: self.conf.host.clone(),
            device_owner: DEVICE_OWNER_PROBE.to_string(),
            tenant_id: view.network.tenant_id.clone(),
            fixed_ips: view
                .subnets
                .iter()
                .map(|s| FixedIpRequest {
                    subnet_id: s.id.clone(),
                })
                .collect(),
        };
        Ok(self.client.create_port(&request)?)
    }

    fn netns_exec_hint(&self, namespace: &str) -> String {
        let helper = self.conf.root_helper.trim();
        if helper.is_empty() {
            format!("ip netns exec {}", namespace)
        } else {
            format!("{} ip netns exec {}", helper, namespace)
        }
    }

    fn audit_exec(&self, port: &Port, namespace: Option<String>, command: &str) {
        self.audit.log(AuditEvent::CommandExec {
            port_id: port.id.clone(),
            namespace,
            command: command.to_string(),
        });
    }
}

/// Split a shell-style command line into arguments without invoking a shell.
pub fn split_command(command: &str) -> Result<Vec<String>, ProbeError> {
    let argv = shell_words::split(command)
        .map_err(|e| ProbeError::InvalidCommand(format!("{}: {}", command, e)))?;
    if argv.is_empty() {
        return Err(ProbeError::InvalidCommand("empty command".to_string()));
    }
    Ok(argv)
}
