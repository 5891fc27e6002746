//! Resource records exchanged with the network-management API.
//!
//! Field names follow the Quantum v2.0 JSON representation so the records
//! deserialize straight from response bodies.

use std::net::IpAddr;

use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};

/// A virtual network.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Network {
    /// Network identifier.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Owning tenant.
    #[serde(default)]
    pub tenant_id: String,
    /// Administrative state.
    #[serde(default = "default_true")]
    pub admin_state_up: bool,
    /// Operational status reported by the API.
    #[serde(default)]
    pub status: String,
    /// Identifiers of the subnets on this network, in API order.
    #[serde(default)]
    pub subnets: Vec<String>,
    /// Whether the network is externally routable.
    #[serde(rename = "router:external", default, deserialize_with = "null_as_false")]
    pub external: bool,
}

/// An IP subnet on a network.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Subnet {
    /// Subnet identifier.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Network the subnet belongs to.
    #[serde(default)]
    pub network_id: String,
    /// Owning tenant.
    #[serde(default)]
    pub tenant_id: String,
    /// Address range.
    pub cidr: IpNetwork,
    /// IP version, 4 or 6.
    pub ip_version: u8,
    /// Default gateway, if any.
    #[serde(default)]
    pub gateway_ip: Option<IpAddr>,
}

/// A fixed IP binding on a port.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FixedIp {
    /// Subnet the address was allocated from.
    pub subnet_id: String,
    /// The allocated address.
    pub ip_address: IpAddr,
}

/// A port on a network.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Port {
    /// Port identifier.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Network the port is attached to.
    pub network_id: String,
    /// Owning tenant.
    #[serde(default)]
    pub tenant_id: String,
    /// Device the port is bound to (the host name for probes).
    #[serde(default)]
    pub device_id: String,
    /// Tag identifying what created the port.
    #[serde(default)]
    pub device_owner: String,
    /// MAC address assigned by the API.
    #[serde(default)]
    pub mac_address: String,
    /// Administrative state.
    #[serde(default = "default_true")]
    pub admin_state_up: bool,
    /// Operational status reported by the API.
    #[serde(default)]
    pub status: String,
    /// Fixed IP assignments.
    #[serde(default)]
    pub fixed_ips: Vec<FixedIp>,
}

/// Query filter for port listings. Unset fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortFilter {
    /// Only ports on this network.
    pub network_id: Option<String>,
    /// Only ports bound to this device.
    pub device_id: Option<String>,
    /// Only ports with this owner tag.
    pub device_owner: Option<String>,
}

impl PortFilter {
    /// Filter on network id.
    #[must_use]
    pub fn network(mut self, network_id: impl Into<String>) -> Self {
        self.network_id = Some(network_id.into());
        self
    }

    /// Filter on device id.
    #[must_use]
    pub fn device(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    /// Filter on device owner.
    #[must_use]
    pub fn owner(mut self, device_owner: impl Into<String>) -> Self {
        self.device_owner = Some(device_owner.into());
        self
    }

    /// Whether `port` passes every set field of this filter.
    pub fn matches(&self, port: &Port) -> bool {
        let check = |want: &Option<String>, have: &str| want.as_deref().is_none_or(|w| w == have);
        check(&self.network_id, &port.network_id)
            && check(&self.device_id, &port.device_id)
            && check(&self.device_owner, &port.device_owner)
    }

    /// Query string pairs for set fields.
    pub fn query_pairs(&self) -> Vec<(&'static str, &str)> {
        [
            ("network_id", &self.network_id),
            ("device_id", &self.device_id),
            ("device_owner", &self.device_owner),
        ]
        .into_iter()
        .filter_map(|(k, v)| v.as_deref().map(|v| (k, v)))
        .collect()
    }
}

/// Subnet reference in a port create request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FixedIpRequest {
    /// Subnet to allocate from.
    pub subnet_id: String,
}

/// Body of a port create request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PortRequest {
    /// Administrative state.
    pub admin_state_up: bool,
    /// Network to attach to.
    pub network_id: String,
    /// Device to bind to.
    pub device_id: String,
    /// Owner tag.
    pub device_owner: String,
    /// Tenant that will own the port.
    pub tenant_id: String,
    /// One allocation request per subnet.
    pub fixed_ips: Vec<FixedIpRequest>,
}

fn default_true() -> bool {
    true
}

fn null_as_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_external_flag() {
        let json = r#"{"id": "n1", "tenant_id": "t1", "subnets": ["s1"], "router:external": true}"#;
        let net: Network = serde_json::from_str(json).unwrap();
        assert!(net.external);
        assert_eq!(net.subnets, vec!["s1"]);

        let json = r#"{"id": "n2", "router:external": null}"#;
        let net: Network = serde_json::from_str(json).unwrap();
        assert!(!net.external);

        let json = r#"{"id": "n3"}"#;
        let net: Network = serde_json::from_str(json).unwrap();
        assert!(!net.external);
        assert!(net.admin_state_up);
    }

    #[test]
    fn test_subnet_deserialize() {
        let json = r#"{"id": "s1", "network_id": "n1", "cidr": "10.0.0.0/24",
                       "ip_version": 4, "gateway_ip": "10.0.0.1"}"#;
        let subnet: Subnet = serde_json::from_str(json).unwrap();
        assert_eq!(subnet.cidr.prefix(), 24);
        assert_eq!(subnet.gateway_ip, Some("10.0.0.1".parse().unwrap()));

        let json = r#"{"id": "s2", "cidr": "fd00::/64", "ip_version": 6, "gateway_ip": null}"#;
        let subnet: Subnet = serde_json::from_str(json).unwrap();
        assert_eq!(subnet.cidr.prefix(), 64);
        assert!(subnet.gateway_ip.is_none());
    }

    #[test]
    fn test_port_deserialize() {
        let json = r#"{
            "id": "p1", "network_id": "n1", "device_id": "host-a",
            "device_owner": "network:probe", "mac_address": "fa:16:3e:00:00:01",
            "fixed_ips": [{"subnet_id": "s1", "ip_address": "10.0.0.3"}]
        }"#;
        let port: Port = serde_json::from_str(json).unwrap();
        assert_eq!(port.fixed_ips.len(), 1);
        assert_eq!(port.fixed_ips[0].ip_address, "10.0.0.3".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_port_filter_matches() {
        let port = Port {
            id: "p1".to_string(),
            name: String::new(),
            network_id: "n1".to_string(),
            tenant_id: String::new(),
            device_id: "host-a".to_string(),
            device_owner: "network:probe".to_string(),
            mac_address: String::new(),
            admin_state_up: true,
            status: String::new(),
            fixed_ips: vec![],
        };

        assert!(PortFilter::default().matches(&port));
        assert!(PortFilter::default().network("n1").device("host-a").matches(&port));
        assert!(!PortFilter::default().network("n2").matches(&port));
        assert!(!PortFilter::default().owner("compute:nova").matches(&port));
    }

    #[test]
    fn test_port_filter_query_pairs() {
        let filter = PortFilter::default().network("n1").owner("network:probe");
        assert_eq!(
            filter.query_pairs(),
            vec![("network_id", "n1"), ("device_owner", "network:probe")]
        );
    }
}
