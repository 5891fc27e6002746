//! Virtual-interface drivers.
//!
//! A driver knows how to name, plug and unplug the host-side interface that
//! backs a port, and how to put layer-3 addresses on it. Drivers are picked by
//! a configuration tag through [`DriverRegistry`]; the registry is populated
//! explicitly at startup rather than by loading types from strings.
//!
//! Built-in drivers:
//!
//! | Tag      | Driver                    | Device name      |
//! |----------|---------------------------|------------------|
//! | `ovs`    | [`OvsInterfaceDriver`]    | `tap<port-id>`   |
//! | `bridge` | [`BridgeInterfaceDriver`] | `ns-<port-id>`   |

mod bridge;
mod ovs;

use std::collections::BTreeMap;

use ipnetwork::IpNetwork;
use tracing::debug;

use super::error::DriverError;
use super::ip_lib::{IpWrapper, cidr_string};
use crate::client::Port;

pub use bridge::BridgeInterfaceDriver;
pub use ovs::OvsInterfaceDriver;

/// Maximum interface name length we generate (IFNAMSIZ minus headroom).
pub const DEV_NAME_LEN: usize = 14;

/// Default OVS integration bridge.
pub const DEFAULT_OVS_INTEGRATION_BRIDGE: &str = "br-int";

/// Settings shared by all driver factories.
#[derive(Debug, Clone)]
pub struct DriverSettings {
    /// Bridge used by the OVS driver when the caller passes none.
    pub ovs_integration_bridge: String,
    /// MTU applied to plugged devices, if set.
    pub network_device_mtu: Option<u32>,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            ovs_integration_bridge: DEFAULT_OVS_INTEGRATION_BRIDGE.to_string(),
            network_device_mtu: None,
        }
    }
}

/// Arguments for [`InterfaceDriver::plug`].
#[derive(Debug, Clone, Copy)]
pub struct PlugRequest<'a> {
    /// Network the port belongs to.
    pub network_id: &'a str,
    /// Port being plugged.
    pub port_id: &'a str,
    /// Interface name from [`InterfaceDriver::device_name`].
    pub device_name: &'a str,
    /// MAC address to assign.
    pub mac_address: &'a str,
    /// Bridge to attach to, driver default when `None`.
    pub bridge: Option<&'a str>,
    /// Namespace to place the interface in.
    pub namespace: Option<&'a str>,
}

/// Host-side virtual interface management for a port.
pub trait InterfaceDriver {
    /// The `ip` handle this driver runs commands through.
    fn ip(&self) -> &IpWrapper;

    /// Deterministic interface name for `port`.
    fn device_name(&self, port: &Port) -> String;

    /// Create the interface and attach it.
    ///
    /// Callers check for an existing device first; `plug` always creates.
    fn plug(&self, request: &PlugRequest<'_>) -> Result<(), DriverError>;

    /// Detach and remove the interface.
    fn unplug(
        &self,
        device_name: &str,
        bridge: Option<&str>,
        namespace: Option<&str>,
    ) -> Result<(), DriverError>;

    /// Make `device_name` carry exactly `cidrs` as global addresses.
    ///
    /// Addresses already present are kept, missing ones are added and any
    /// other global permanent address is removed.
    fn init_l3(
        &self,
        device_name: &str,
        cidrs: &[String],
        namespace: Option<&str>,
    ) -> Result<(), DriverError> {
        let wanted = cidrs
            .iter()
            .map(|c| {
                c.parse::<IpNetwork>().map_err(|e| DriverError::InvalidCidr {
                    cidr: c.clone(),
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut previous = self.ip().list_global_addresses(device_name, namespace)?;

        for cidr in &wanted {
            if let Some(pos) = previous.iter().position(|p| p == cidr) {
                previous.remove(pos);
                debug!("Address {} already on {}", cidr_string(cidr), device_name);
                continue;
            }
            self.ip().add_address(cidr, device_name, namespace)?;
        }

        for stale in &previous {
            debug!("Removing stale address {} from {}", cidr_string(stale), device_name);
            self.ip().delete_address(stale, device_name, namespace)?;
        }

        Ok(())
    }
}

/// `<prefix><port-id>` cut to [`DEV_NAME_LEN`] characters.
pub fn prefixed_device_name(prefix: &str, port_id: &str) -> String {
    prefix.chars().chain(port_id.chars()).take(DEV_NAME_LEN).collect()
}

/// Constructor for a registered driver.
pub type DriverFactory = fn(&DriverSettings, IpWrapper) -> Box<dyn InterfaceDriver>;

/// Maps configuration tags to driver constructors.
pub struct DriverRegistry {
    factories: BTreeMap<String, DriverFactory>,
}

impl DriverRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// A registry holding the built-in `ovs` and `bridge` drivers.
    pub fn with_builtin() -> Self {
        let mut factories: BTreeMap<String, DriverFactory> = BTreeMap::new();
        factories.insert(OvsInterfaceDriver::TAG.to_string(), |settings, ip| {
            Box::new(OvsInterfaceDriver::new(settings.clone(), ip))
        });
        factories.insert(BridgeInterfaceDriver::TAG.to_string(), |settings, ip| {
            Box::new(BridgeInterfaceDriver::new(settings.clone(), ip))
        });
        Self { factories }
    }

    /// Register `factory` under `tag`. Registering a tag twice is an error.
    pub fn register(&mut self, tag: &str, factory: DriverFactory) -> Result<(), DriverError> {
        if self.factories.contains_key(tag) {
            return Err(DriverError::DuplicateRegistration(tag.to_string()));
        }
        self.factories.insert(tag.to_string(), factory);
        Ok(())
    }

    /// Registered tags, sorted.
    pub fn tags(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Construct the driver registered under `tag`.
    pub fn build(
        &self,
        tag: &str,
        settings: &DriverSettings,
        ip: IpWrapper,
    ) -> Result<Box<dyn InterfaceDriver>, DriverError> {
        let factory = self.factories.get(tag).ok_or_else(|| DriverError::UnknownDriver {
            tag: tag.to_string(),
            available: self.tags().join(", "),
        })?;
        debug!("Using interface driver '{}'", tag);
        Ok(factory(settings, ip))
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{ScriptedExecutor, port_fixture};
    use assert_matches::assert_matches;
    use std::rc::Rc;

    fn ovs() -> (Rc<ScriptedExecutor>, Box<dyn InterfaceDriver>) {
        let exec = Rc::new(ScriptedExecutor::new());
        let driver = DriverRegistry::with_builtin()
            .build("ovs", &DriverSettings::default(), IpWrapper::new(exec.clone()))
            .unwrap();
        (exec, driver)
    }

    #[test]
    fn test_prefixed_device_name_truncates() {
        assert_eq!(
            prefixed_device_name("tap", "0123456789abcdef"),
            "tap0123456789a"
        );
        assert_eq!(prefixed_device_name("tap", "short"), "tapshort");
    }

    #[test]
    fn test_registry_builtin_tags() {
        let registry = DriverRegistry::with_builtin();
        assert_eq!(registry.tags(), vec!["bridge", "ovs"]);
    }

    #[test]
    fn test_registry_duplicate_fails() {
        let mut registry = DriverRegistry::with_builtin();
        let err = registry
            .register("ovs", |settings, ip| {
                Box::new(OvsInterfaceDriver::new(settings.clone(), ip))
            })
            .unwrap_err();
        assert_matches!(err, DriverError::DuplicateRegistration(ref tag) if tag == "ovs");
    }

    #[test]
    fn test_registry_register_custom() {
        let mut registry = DriverRegistry::new();
        registry
            .register("veth", |settings, ip| {
                Box::new(BridgeInterfaceDriver::new(settings.clone(), ip))
            })
            .unwrap();
        let exec = Rc::new(ScriptedExecutor::new());
        let driver = registry
            .build("veth", &DriverSettings::default(), IpWrapper::new(exec))
            .unwrap();
        assert!(driver.device_name(&port_fixture("p1", "n1")).starts_with("ns-"));
    }

    #[test]
    fn test_registry_unknown_driver() {
        let registry = DriverRegistry::with_builtin();
        let exec = Rc::new(ScriptedExecutor::new());
        let err = registry
            .build("midonet", &DriverSettings::default(), IpWrapper::new(exec))
            .err()
            .unwrap();
        assert_matches!(err, DriverError::UnknownDriver { ref available, .. } if available == "bridge, ovs");
    }

    #[test]
    fn test_init_l3_adds_missing_and_removes_stale() {
        let (exec, driver) = ovs();
        exec.respond(
            "addr show dev tap1",
            "2: tap1    inet 10.0.0.3/24 brd 10.0.0.255 scope global tap1\n\
             2: tap1    inet 10.9.9.9/24 brd 10.9.9.255 scope global tap1\n",
        );

        driver
            .init_l3(
                "tap1",
                &["10.0.0.3/24".to_string(), "fd00::3/64".to_string()],
                Some("qprobe-1"),
            )
            .unwrap();

        assert!(!exec.was_called("addr add 10.0.0.3/24"));
        assert!(exec.was_called("ip netns exec qprobe-1 ip -6 addr add fd00::3/64 scope global dev tap1"));
        assert!(exec.was_called("ip netns exec qprobe-1 ip -4 addr del 10.9.9.9/24 dev tap1"));
    }

    #[test]
    fn test_init_l3_rejects_bad_cidr() {
        let (_exec, driver) = ovs();
        let err = driver
            .init_l3("tap1", &["not-a-cidr".to_string()], None)
            .unwrap_err();
        assert_matches!(err, DriverError::InvalidCidr { .. });
    }
}
