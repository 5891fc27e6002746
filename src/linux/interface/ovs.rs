//! Open vSwitch internal-port driver.

use tracing::info;

use super::{DriverSettings, InterfaceDriver, PlugRequest, prefixed_device_name};
use crate::client::Port;
use crate::linux::error::DriverError;
use crate::linux::executor::argv;
use crate::linux::ip_lib::IpWrapper;

/// Plugs ports as OVS internal ports on an integration bridge.
pub struct OvsInterfaceDriver {
    settings: DriverSettings,
    ip: IpWrapper,
}

impl OvsInterfaceDriver {
    /// Registry tag.
    pub const TAG: &'static str = "ovs";

    /// Interface name prefix.
    pub const DEV_NAME_PREFIX: &'static str = "tap";

    /// Create the driver.
    pub fn new(settings: DriverSettings, ip: IpWrapper) -> Self {
        Self { settings, ip }
    }

    fn bridge<'a>(&'a self, bridge: Option<&'a str>) -> &'a str {
        bridge.unwrap_or(&self.settings.ovs_integration_bridge)
    }

    fn add_port_command(bridge: &str, req: &PlugRequest<'_>) -> Vec<String> {
        let dev = req.device_name;
        let iface_id = format!("external-ids:iface-id={}", req.port_id);
        let attached_mac = format!("external-ids:attached-mac={}", req.mac_address);
        argv([
            "ovs-vsctl",
            "--",
            "--may-exist",
            "add-port",
            bridge,
            dev,
            "--",
            "set",
            "Interface",
            dev,
            "type=internal",
            "--",
            "set",
            "Interface",
            dev,
            iface_id.as_str(),
            "--",
            "set",
            "Interface",
            dev,
            "external-ids:iface-status=active",
            "--",
            "set",
            "Interface",
            dev,
            attached_mac.as_str(),
        ])
    }
}

impl InterfaceDriver for OvsInterfaceDriver {
    fn ip(&self) -> &IpWrapper {
        &self.ip
    }

    fn device_name(&self, port: &Port) -> String {
        prefixed_device_name(Self::DEV_NAME_PREFIX, &port.id)
    }

    fn plug(&self, req: &PlugRequest<'_>) -> Result<(), DriverError> {
        let bridge = self.bridge(req.bridge);
        info!(
            "Plugging {} for port {} on network {} into {}",
            req.device_name, req.port_id, req.network_id, bridge
        );

        self.ip.execute(&Self::add_port_command(bridge, req))?;
        self.ip.set_address(req.device_name, req.mac_address, None)?;
        if let Some(mtu) = self.settings.network_device_mtu {
            self.ip.set_mtu(req.device_name, mtu, None)?;
        }

        if let Some(ns) = req.namespace {
            self.ip.ensure_namespace(ns)?;
            self.ip.set_netns(req.device_name, ns)?;
        }
        self.ip.set_up(req.device_name, req.namespace)?;
        Ok(())
    }

    fn unplug(
        &self,
        device_name: &str,
        bridge: Option<&str>,
        _namespace: Option<&str>,
    ) -> Result<(), DriverError> {
        let bridge = self.bridge(bridge);
        info!("Unplugging {} from {}", device_name, bridge);
        self.ip.execute(&argv([
            "ovs-vsctl",
            "--timeout=2",
            "--",
            "--if-exists",
            "del-port",
            bridge,
            device_name,
        ]))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{ScriptedExecutor, port_fixture};
    use std::rc::Rc;

    fn driver(settings: DriverSettings) -> (Rc<ScriptedExecutor>, OvsInterfaceDriver) {
        let exec = Rc::new(ScriptedExecutor::new());
        let driver = OvsInterfaceDriver::new(settings, IpWrapper::new(exec.clone()));
        (exec, driver)
    }

    fn request<'a>(bridge: Option<&'a str>, namespace: Option<&'a str>) -> PlugRequest<'a> {
        PlugRequest {
            network_id: "net-1",
            port_id: "port-1",
            device_name: "tapport-1",
            mac_address: "fa:16:3e:00:00:01",
            bridge,
            namespace,
        }
    }

    #[test]
    fn test_device_name() {
        let (_exec, driver) = driver(DriverSettings::default());
        let port = port_fixture("8f2b7a1c-1111-2222-3333-444455556666", "n1");
        assert_eq!(driver.device_name(&port), "tap8f2b7a1c-11");
    }

    #[test]
    fn test_plug_into_namespace_on_default_bridge() {
        let (exec, driver) = driver(DriverSettings::default());
        driver.plug(&request(None, Some("qprobe-port-1"))).unwrap();

        assert!(exec.was_called("ovs-vsctl -- --may-exist add-port br-int tapport-1"));
        assert!(exec.was_called("external-ids:iface-id=port-1"));
        assert!(exec.was_called("external-ids:attached-mac=fa:16:3e:00:00:01"));
        assert!(exec.was_called("ip link set dev tapport-1 address fa:16:3e:00:00:01"));
        assert!(exec.was_called("ip netns add qprobe-port-1"));
        assert!(exec.was_called("ip link set dev tapport-1 netns qprobe-port-1"));
        assert!(exec.was_called("ip netns exec qprobe-port-1 ip link set dev tapport-1 up"));
        assert!(!exec.was_called("mtu"));
    }

    #[test]
    fn test_plug_external_bridge_and_mtu() {
        let settings = DriverSettings {
            network_device_mtu: Some(1450),
            ..Default::default()
        };
        let (exec, driver) = driver(settings);
        driver.plug(&request(Some("br-ex"), None)).unwrap();

        assert!(exec.was_called("add-port br-ex tapport-1"));
        assert!(exec.was_called("ip link set dev tapport-1 mtu 1450"));
        assert!(exec.was_called("ip link set dev tapport-1 up"));
        assert!(!exec.was_called("netns"));
    }

    #[test]
    fn test_unplug() {
        let (exec, driver) = driver(DriverSettings::default());
        driver.unplug("tapport-1", Some("br-ex"), Some("qprobe-port-1")).unwrap();
        assert!(exec.was_called("ovs-vsctl --timeout=2 -- --if-exists del-port br-ex tapport-1"));
    }
}
