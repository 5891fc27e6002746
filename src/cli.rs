//! Command-line interface definitions for qprobe.
//!
//! Uses clap's derive API for type-safe argument parsing.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Debug probes for tenant networks.
///
/// qprobe creates ports on tenant networks, plugs them into per-probe network
/// namespaces on this host and runs diagnostic commands from there.
#[derive(Parser, Debug)]
#[command(name = "qprobe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Operation to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Path to additional config file.
    ///
    /// Merged on top of the system and user configs.
    #[arg(short = 'c', long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Authentication user name.
    #[arg(long = "os-username", env = "OS_USERNAME", global = true)]
    pub os_username: Option<String>,

    /// Authentication password.
    #[arg(long = "os-password", env = "OS_PASSWORD", hide_env_values = true, global = true)]
    pub os_password: Option<String>,

    /// Authentication tenant name.
    #[arg(long = "os-tenant-name", env = "OS_TENANT_NAME", global = true)]
    pub os_tenant_name: Option<String>,

    /// Keystone URL.
    #[arg(long = "os-auth-url", env = "OS_AUTH_URL", global = true)]
    pub os_auth_url: Option<String>,

    /// Region used to select the network endpoint.
    #[arg(long = "os-region-name", env = "OS_REGION_NAME", global = true)]
    pub os_region_name: Option<String>,

    /// Network API URL, bypassing the service catalog.
    #[arg(long = "endpoint-url", env = "OS_URL", global = true)]
    pub endpoint_url: Option<String>,

    /// Increase log verbosity.
    ///
    /// Can be specified multiple times:
    /// -v    = info level
    /// -vv   = debug level
    /// -vvv  = trace level
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

/// Probe operations.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Create a probe on a network.
    #[command(name = "probe-create")]
    ProbeCreate {
        /// Network to probe.
        network_id: String,
    },

    /// Delete a probe.
    #[command(name = "probe-delete")]
    ProbeDelete {
        /// Probe port id.
        port_id: String,
    },

    /// List all probes.
    #[command(name = "probe-list")]
    ProbeList {
        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Delete every probe on this host.
    #[command(name = "probe-clear")]
    ProbeClear,

    /// Run a command in a probe namespace.
    ///
    /// Without a command, prints the prefix for entering the namespace.
    Exec {
        /// Probe port id.
        port_id: String,

        /// Command and arguments.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Ping every fixed IP, from a probe on each network.
    #[command(name = "ping-all")]
    PingAll {
        /// Restrict the sweep to one network.
        #[arg(long = "id", value_name = "NETWORK_ID")]
        network_id: Option<String>,

        /// Seconds to wait for each reply.
        #[arg(long, default_value_t = 1)]
        timeout: u32,
    },
}

/// How listings are printed.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Aligned columns.
    #[default]
    Table,
    /// JSON array.
    Json,
}

impl Commands {
    /// The `exec` command joined back into one shell-style string.
    ///
    /// Arguments containing whitespace or quotes are re-quoted.
    pub fn joined_command(parts: &[String]) -> Option<String> {
        if parts.is_empty() {
            None
        } else {
            Some(shell_words::join(parts))
        }
    }
}
