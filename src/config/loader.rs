//! Configuration loading with hierarchy merging.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::error::ConfigError;
use super::schema::{AuthConfig, Config};
use crate::cli::Cli;

/// System-wide configuration path.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/qprobe/config.toml";

/// User configuration directory name.
pub const USER_CONFIG_DIR: &str = "qprobe";

/// User configuration filename.
pub const USER_CONFIG_FILE: &str = "config.toml";

/// Configuration loader with support for hierarchy merging.
pub struct ConfigLoader {
    /// Path to system-wide configuration.
    system_path: PathBuf,
    /// Path to user configuration.
    user_path: PathBuf,
}

impl ConfigLoader {
    /// Create a new ConfigLoader with default paths.
    #[must_use]
    pub fn new() -> Self {
        let user_config_dir = dirs::config_dir()
            .map(|p| p.join(USER_CONFIG_DIR))
            .unwrap_or_else(|| PathBuf::from(".config").join(USER_CONFIG_DIR));

        Self {
            system_path: PathBuf::from(SYSTEM_CONFIG_PATH),
            user_path: user_config_dir.join(USER_CONFIG_FILE),
        }
    }

    /// Create a ConfigLoader with custom paths (for testing).
    #[must_use]
    pub fn with_paths(system_path: PathBuf, user_path: PathBuf) -> Self {
        Self {
            system_path,
            user_path,
        }
    }

    /// Load and merge configuration from all sources.
    ///
    /// Missing system and user files are skipped; a missing `--config` file
    /// is an error. Invalid TOML is always an error.
    pub fn load(&self, cli: &Cli) -> Result<Config, ConfigError> {
        let mut config = Config::defaults();

        for path in [&self.system_path, &self.user_path] {
            match self.load_file(path)? {
                Some(file_config) => {
                    config.merge(file_config);
                    debug!("Loaded config from {:?}", path);
                }
                None => debug!("No config found at {:?}", path),
            }
        }

        if let Some(ref cli_config_path) = cli.config {
            let cli_config = self.load_file(cli_config_path)?.ok_or_else(|| ConfigError::ReadError {
                path: cli_config_path.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "Specified config file not found",
                ),
            })?;
            config.merge(cli_config);
            debug!("Loaded additional config from {:?}", cli_config_path);
        }

        config.merge(Self::cli_overrides(cli));
        Ok(config)
    }

    /// Config layer built from CLI flags and `OS_*` variables.
    fn cli_overrides(cli: &Cli) -> Config {
        Config {
            auth: AuthConfig {
                admin_user: cli.os_username.clone(),
                admin_password: cli.os_password.clone(),
                admin_tenant_name: cli.os_tenant_name.clone(),
                auth_url: cli.os_auth_url.clone(),
                auth_region: cli.os_region_name.clone(),
                endpoint_url: cli.endpoint_url.clone(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Load a single config file. Returns `None` if it does not exist.
    fn load_file(&self, path: &Path) -> Result<Option<Config>, ConfigError> {
        match fs::read_to_string(path) {
            Ok(contents) => {
                let config = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
                    path: path.to_path_buf(),
                    source: e,
                })?;
                Ok(Some(config))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ConfigError::ReadError {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Commands;
    use tempfile::tempdir;

    fn create_test_cli() -> Cli {
        Cli {
            command: Commands::ProbeClear,
            config: None,
            os_username: None,
            os_password: None,
            os_tenant_name: None,
            os_auth_url: None,
            os_region_name: None,
            endpoint_url: None,
            verbose: 0,
        }
    }

    fn loader_in(dir: &Path) -> ConfigLoader {
        ConfigLoader::with_paths(dir.join("system.toml"), dir.join("user.toml"))
    }

    #[test]
    fn test_missing_files_use_defaults() {
        let dir = tempdir().unwrap();
        let config = loader_in(dir.path()).load(&create_test_cli()).unwrap();
        assert_eq!(config, Config::defaults());
    }

    #[test]
    fn test_user_config_overrides_system() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("system.toml"),
            "[agent]\nexternal_network_bridge = \"br-sys\"\ninterface_driver = \"bridge\"\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("user.toml"),
            "[agent]\nexternal_network_bridge = \"br-user\"\n",
        )
        .unwrap();

        let config = loader_in(dir.path()).load(&create_test_cli()).unwrap();

        assert_eq!(config.agent.external_network_bridge.as_deref(), Some("br-user"));
        assert_eq!(config.interface_driver(), "bridge");
    }

    #[test]
    fn test_cli_flags_override_files() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("user.toml"),
            "[auth]\nauth_url = \"http://file:5000/v2.0\"\nadmin_user = \"file-user\"\n",
        )
        .unwrap();

        let mut cli = create_test_cli();
        cli.os_auth_url = Some("http://cli:5000/v2.0".to_string());

        let config = loader_in(dir.path()).load(&cli).unwrap();

        assert_eq!(config.auth.auth_url.as_deref(), Some("http://cli:5000/v2.0"));
        assert_eq!(config.auth.admin_user.as_deref(), Some("file-user"));
    }

    #[test]
    fn test_explicit_config_file() {
        let dir = tempdir().unwrap();
        let extra = dir.path().join("extra.toml");
        fs::write(&extra, "[agent]\nuse_namespaces = false\n").unwrap();

        let mut cli = create_test_cli();
        cli.config = Some(extra);
        let config = loader_in(dir.path()).load(&cli).unwrap();
        assert!(!config.agent_config().use_namespaces);

        cli.config = Some(dir.path().join("missing.toml"));
        let result = loader_in(dir.path()).load(&cli);
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("system.toml"), "this is not valid TOML [[[").unwrap();

        let result = loader_in(dir.path()).load(&create_test_cli());

        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }
}
