//! Configuration schema definitions.
//!
//! ```toml
//! [auth]
//! auth_strategy = "keystone"
//! auth_url = "http://keystone:5000/v2.0"
//! admin_user = "quantum"
//! admin_password = "secret"
//! admin_tenant_name = "service"
//! endpoint_type = "publicURL"
//!
//! [agent]
//! use_namespaces = true
//! interface_driver = "ovs"
//! external_network_bridge = "br-ex"
//! ```
//!
//! Every field is optional in a file. Later sources override a field only
//! when they set it.

use serde::{Deserialize, Serialize};

use super::error::ConfigError;
use crate::client::{AuthSettings, AuthStrategy, EndpointType};
use crate::linux::interface::DEFAULT_OVS_INTEGRATION_BRIDGE;
use crate::linux::{DEFAULT_ROOT_HELPER, DriverSettings, OvsInterfaceDriver};
use crate::probe::{AgentConfig, DEFAULT_EXTERNAL_BRIDGE};

/// Top-level configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// API credentials and endpoint selection.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Host-side probe settings.
    #[serde(default)]
    pub agent: AgentSection,
}

impl Config {
    /// Built-in defaults, the base every other source merges onto.
    pub fn defaults() -> Self {
        Self {
            auth: AuthConfig {
                auth_strategy: Some(AuthStrategy::Keystone),
                endpoint_type: Some(EndpointType::Public),
                ..Default::default()
            },
            agent: AgentSection {
                use_namespaces: Some(true),
                interface_driver: Some(OvsInterfaceDriver::TAG.to_string()),
                external_network_bridge: Some(DEFAULT_EXTERNAL_BRIDGE.to_string()),
                ovs_integration_bridge: Some(DEFAULT_OVS_INTEGRATION_BRIDGE.to_string()),
                network_device_mtu: None,
                root_helper: Some(DEFAULT_ROOT_HELPER.to_string()),
                host: None,
            },
        }
    }

    /// Merge another config into this one. Set fields in `other` win.
    pub fn merge(&mut self, other: Config) {
        self.auth.merge(other.auth);
        self.agent.merge(other.agent);
    }

    /// Validated API settings.
    pub fn auth_settings(&self) -> Result<AuthSettings, ConfigError> {
        let auth = &self.auth;
        let strategy = auth.auth_strategy.unwrap_or_default();
        match strategy {
            AuthStrategy::Keystone if auth.auth_url.is_none() => {
                return Err(ConfigError::InvalidValue {
                    field: "auth.auth_url".to_string(),
                    message: "required for the keystone auth strategy".to_string(),
                });
            }
            AuthStrategy::Noauth if auth.endpoint_url.is_none() => {
                return Err(ConfigError::InvalidValue {
                    field: "auth.endpoint_url".to_string(),
                    message: "required for the noauth auth strategy".to_string(),
                });
            }
            _ => {}
        }

        Ok(AuthSettings {
            strategy,
            auth_url: auth.auth_url.clone(),
            username: auth.admin_user.clone(),
            password: auth.admin_password.clone(),
            tenant_name: auth.admin_tenant_name.clone(),
            region: auth.auth_region.clone(),
            endpoint_type: auth.endpoint_type.unwrap_or_default(),
            endpoint_url: auth.endpoint_url.clone(),
        })
    }

    /// Probe agent settings. The host falls back to the system hostname.
    pub fn agent_config(&self) -> AgentConfig {
        let defaults = AgentConfig::default();
        let agent = &self.agent;
        AgentConfig {
            use_namespaces: agent.use_namespaces.unwrap_or(defaults.use_namespaces),
            external_network_bridge: agent
                .external_network_bridge
                .clone()
                .unwrap_or(defaults.external_network_bridge),
            host: agent.host.clone().unwrap_or_else(system_hostname),
            root_helper: agent.root_helper.clone().unwrap_or(defaults.root_helper),
        }
    }

    /// Settings handed to the interface driver factory.
    pub fn driver_settings(&self) -> DriverSettings {
        let defaults = DriverSettings::default();
        DriverSettings {
            ovs_integration_bridge: self
                .agent
                .ovs_integration_bridge
                .clone()
                .unwrap_or(defaults.ovs_integration_bridge),
            network_device_mtu: self.agent.network_device_mtu,
        }
    }

    /// Registry tag of the interface driver to use.
    pub fn interface_driver(&self) -> &str {
        self.agent
            .interface_driver
            .as_deref()
            .unwrap_or(OvsInterfaceDriver::TAG)
    }

    /// Root helper command line.
    pub fn root_helper(&self) -> &str {
        self.agent.root_helper.as_deref().unwrap_or(DEFAULT_ROOT_HELPER)
    }
}

/// `[auth]` section.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Admin user name.
    #[serde(default)]
    pub admin_user: Option<String>,

    /// Admin password.
    #[serde(default)]
    pub admin_password: Option<String>,

    /// Admin tenant name.
    #[serde(default)]
    pub admin_tenant_name: Option<String>,

    /// Keystone URL.
    #[serde(default)]
    pub auth_url: Option<String>,

    /// `keystone` or `noauth`.
    #[serde(default)]
    pub auth_strategy: Option<AuthStrategy>,

    /// Region used to pick the catalog endpoint.
    #[serde(default)]
    pub auth_region: Option<String>,

    /// `publicURL`, `adminURL` or `internalURL`.
    #[serde(default)]
    pub endpoint_type: Option<EndpointType>,

    /// Explicit network API URL.
    #[serde(default)]
    pub endpoint_url: Option<String>,
}

impl AuthConfig {
    fn merge(&mut self, other: AuthConfig) {
        merge_opt(&mut self.admin_user, other.admin_user);
        merge_opt(&mut self.admin_password, other.admin_password);
        merge_opt(&mut self.admin_tenant_name, other.admin_tenant_name);
        merge_opt(&mut self.auth_url, other.auth_url);
        merge_opt(&mut self.auth_strategy, other.auth_strategy);
        merge_opt(&mut self.auth_region, other.auth_region);
        merge_opt(&mut self.endpoint_type, other.endpoint_type);
        merge_opt(&mut self.endpoint_url, other.endpoint_url);
    }
}

/// `[agent]` section.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AgentSection {
    /// Isolate each probe in its own namespace.
    #[serde(default)]
    pub use_namespaces: Option<bool>,

    /// Interface driver tag (`ovs` or `bridge`).
    #[serde(default)]
    pub interface_driver: Option<String>,

    /// Bridge for external networks.
    #[serde(default)]
    pub external_network_bridge: Option<String>,

    /// OVS integration bridge.
    #[serde(default)]
    pub ovs_integration_bridge: Option<String>,

    /// MTU for plugged devices.
    #[serde(default)]
    pub network_device_mtu: Option<u32>,

    /// Command prefix for privileged commands, e.g. `sudo`.
    #[serde(default)]
    pub root_helper: Option<String>,

    /// Host identifier stored on probe ports.
    #[serde(default)]
    pub host: Option<String>,
}

impl AgentSection {
    fn merge(&mut self, other: AgentSection) {
        merge_opt(&mut self.use_namespaces, other.use_namespaces);
        merge_opt(&mut self.interface_driver, other.interface_driver);
        merge_opt(&mut self.external_network_bridge, other.external_network_bridge);
        merge_opt(&mut self.ovs_integration_bridge, other.ovs_integration_bridge);
        merge_opt(&mut self.network_device_mtu, other.network_device_mtu);
        merge_opt(&mut self.root_helper, other.root_helper);
        merge_opt(&mut self.host, other.host);
    }
}

fn merge_opt<T>(dst: &mut Option<T>, src: Option<T>) {
    if src.is_some() {
        *dst = src;
    }
}

fn system_hostname() -> String {
    nix::unistd::gethostname()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "localhost".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_embedded_default_file_matches_defaults() {
        let config: Config = toml::from_str(include_str!("../../config/default.toml")).unwrap();
        assert_eq!(config, Config::defaults());
    }

    #[test]
    fn test_merge_overrides_only_set_fields() {
        let mut config = Config::defaults();
        let other: Config = toml::from_str(
            r#"
            [agent]
            use_namespaces = false
            network_device_mtu = 1450
            "#,
        )
        .unwrap();
        config.merge(other);

        assert_eq!(config.agent.use_namespaces, Some(false));
        assert_eq!(config.agent.network_device_mtu, Some(1450));
        assert_eq!(config.interface_driver(), "ovs");
        assert_eq!(config.agent.external_network_bridge.as_deref(), Some("br-ex"));
    }

    #[test]
    fn test_keystone_requires_auth_url() {
        let config = Config::defaults();
        assert_matches!(
            config.auth_settings(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "auth.auth_url"
        );
    }

    #[test]
    fn test_noauth_requires_endpoint_url() {
        let mut config = Config::defaults();
        config.auth.auth_strategy = Some(AuthStrategy::Noauth);
        assert_matches!(config.auth_settings(), Err(ConfigError::InvalidValue { .. }));

        config.auth.endpoint_url = Some("http://localhost:9696".to_string());
        let settings = config.auth_settings().unwrap();
        assert_eq!(settings.strategy, AuthStrategy::Noauth);
    }

    #[test]
    fn test_unknown_strategy_rejected() {
        let result: Result<Config, _> = toml::from_str(
            r#"
            [auth]
            auth_strategy = "kerberos"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_endpoint_type_names() {
        let config: Config = toml::from_str(
            r#"
            [auth]
            endpoint_type = "internalURL"
            "#,
        )
        .unwrap();
        assert_eq!(config.auth.endpoint_type, Some(EndpointType::Internal));
    }

    #[test]
    fn test_agent_config_host_fallback() {
        let mut config = Config::defaults();
        assert!(!config.agent_config().host.is_empty());

        config.agent.host = Some("compute-7".to_string());
        let agent = config.agent_config();
        assert_eq!(agent.host, "compute-7");
        assert!(agent.use_namespaces);
        assert_eq!(agent.root_helper, "sudo");
    }

    #[test]
    fn test_driver_settings() {
        let mut config = Config::defaults();
        config.agent.ovs_integration_bridge = Some("br-probe".to_string());
        let settings = config.driver_settings();
        assert_eq!(settings.ovs_integration_bridge, "br-probe");
        assert_eq!(settings.network_device_mtu, None);
    }
}
