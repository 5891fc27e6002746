//! Linux bridge (veth pair) driver.
//!
//! The port is realised as a veth pair: the `tap…` end stays on the host for
//! the bridge agent to enslave, the `ns-…` end carries the port's MAC and
//! addresses and lives in the probe namespace.

use tracing::info;

use super::{DriverSettings, InterfaceDriver, PlugRequest, prefixed_device_name};
use crate::client::Port;
use crate::linux::error::DriverError;
use crate::linux::ip_lib::IpWrapper;

/// Plugs ports as veth pairs.
pub struct BridgeInterfaceDriver {
    settings: DriverSettings,
    ip: IpWrapper,
}

impl BridgeInterfaceDriver {
    /// Registry tag.
    pub const TAG: &'static str = "bridge";

    /// Prefix of the namespace-side device.
    pub const DEV_NAME_PREFIX: &'static str = "ns-";

    /// Prefix of the host-side device.
    pub const TAP_PREFIX: &'static str = "tap";

    /// Create the driver.
    pub fn new(settings: DriverSettings, ip: IpWrapper) -> Self {
        Self { settings, ip }
    }

    /// Host-side peer name for a namespace-side device name.
    pub fn tap_name(device_name: &str) -> String {
        match device_name.strip_prefix(Self::DEV_NAME_PREFIX) {
            Some(rest) => format!("{}{}", Self::TAP_PREFIX, rest),
            None => device_name.to_string(),
        }
    }
}

impl InterfaceDriver for BridgeInterfaceDriver {
    fn ip(&self) -> &IpWrapper {
        &self.ip
    }

    fn device_name(&self, port: &Port) -> String {
        prefixed_device_name(Self::DEV_NAME_PREFIX, &port.id)
    }

    fn plug(&self, req: &PlugRequest<'_>) -> Result<(), DriverError> {
        let tap = Self::tap_name(req.device_name);
        info!(
            "Plugging veth {}/{} for port {} on network {}",
            tap, req.device_name, req.port_id, req.network_id
        );

        self.ip.add_veth(&tap, req.device_name, req.namespace)?;
        self.ip.set_address(req.device_name, req.mac_address, req.namespace)?;
        if let Some(mtu) = self.settings.network_device_mtu {
            self.ip.set_mtu(&tap, mtu, None)?;
            self.ip.set_mtu(req.device_name, mtu, req.namespace)?;
        }
        self.ip.set_up(&tap, None)?;
        self.ip.set_up(req.device_name, req.namespace)?;
        Ok(())
    }

    fn unplug(
        &self,
        device_name: &str,
        _bridge: Option<&str>,
        namespace: Option<&str>,
    ) -> Result<(), DriverError> {
        info!("Unplugging veth {}", device_name);
        self.ip.delete_link(device_name, namespace)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{ScriptedExecutor, port_fixture};
    use std::rc::Rc;

    fn driver() -> (Rc<ScriptedExecutor>, BridgeInterfaceDriver) {
        let exec = Rc::new(ScriptedExecutor::new());
        let driver = BridgeInterfaceDriver::new(DriverSettings::default(), IpWrapper::new(exec.clone()));
        (exec, driver)
    }

    #[test]
    fn test_names() {
        let (_exec, driver) = driver();
        let port = port_fixture("8f2b7a1c-1111-2222", "n1");
        let device = driver.device_name(&port);
        assert_eq!(device, "ns-8f2b7a1c-11");
        assert_eq!(BridgeInterfaceDriver::tap_name(&device), "tap8f2b7a1c-11");
    }

    #[test]
    fn test_plug_creates_veth_pair() {
        let (exec, driver) = driver();
        driver
            .plug(&PlugRequest {
                network_id: "n1",
                port_id: "p1",
                device_name: "ns-p1",
                mac_address: "fa:16:3e:00:00:02",
                bridge: None,
                namespace: Some("qprobe-p1"),
            })
            .unwrap();

        assert!(exec.was_called("ip link add tapp1 type veth peer name ns-p1 netns qprobe-p1"));
        assert!(exec.was_called(
            "ip netns exec qprobe-p1 ip link set dev ns-p1 address fa:16:3e:00:00:02"
        ));
        assert!(exec.was_called("ip link set dev tapp1 up"));
        assert!(exec.was_called("ip netns exec qprobe-p1 ip link set dev ns-p1 up"));
    }

    #[test]
    fn test_unplug_deletes_link_in_namespace() {
        let (exec, driver) = driver();
        driver.unplug("ns-p1", None, Some("qprobe-p1")).unwrap();
        assert!(exec.was_called("ip netns exec qprobe-p1 ip link delete ns-p1"));
    }
}
