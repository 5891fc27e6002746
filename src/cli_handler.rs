//! Command handling for qprobe.
//!
//! Wires configuration into a [`ProbeAgent`] and renders each subcommand's
//! result on the given writer.

use std::io::Write;
use std::rc::Rc;

use anyhow::{Context, Result};
use tracing::warn;

use crate::cli::{Commands, OutputFormat};
use crate::client::{HttpNetworkClient, NetworkClient};
use crate::config::Config;
use crate::linux::{DriverRegistry, HostExecutor, IpWrapper};
use crate::probe::{ProbeAgent, ProbeListing};
use crate::telemetry::AuditLogger;

/// Build an agent that talks to the configured API and this host.
pub fn build_agent(config: &Config) -> Result<ProbeAgent<HttpNetworkClient>> {
    let auth = config.auth_settings().context("Invalid [auth] configuration")?;
    let client = HttpNetworkClient::connect(&auth).context("Failed to reach the network API")?;

    let exec = HostExecutor::new(config.root_helper()).context("Invalid root_helper")?;
    let ip = IpWrapper::new(Rc::new(exec));
    let driver = DriverRegistry::with_builtin()
        .build(config.interface_driver(), &config.driver_settings(), ip.clone())
        .context("Failed to load interface driver")?;

    let audit = AuditLogger::new().unwrap_or_else(|e| {
        warn!("Audit logging disabled: {}", e);
        AuditLogger::new_null()
    });

    Ok(ProbeAgent::new(config.agent_config(), client, driver, ip, audit))
}

/// Run `command` against `agent`, writing results to `out`.
pub fn handle_command<C: NetworkClient>(
    agent: &ProbeAgent<C>,
    command: Commands,
    out: &mut impl Write,
) -> Result<()> {
    match command {
        Commands::ProbeCreate { network_id } => {
            let port = agent
                .create_probe(&network_id)
                .with_context(|| format!("Failed to create probe on network {}", network_id))?;
            writeln!(out, "{}", port.id)?;
        }
        Commands::ProbeDelete { port_id } => {
            agent
                .delete_probe(&port_id)
                .with_context(|| format!("Failed to delete probe {}", port_id))?;
            writeln!(out, "Deleted probe {}", port_id)?;
        }
        Commands::ProbeList { format } => {
            let probes = agent.list_probes().context("Failed to list probes")?;
            match format {
                OutputFormat::Json => {
                    serde_json::to_writer_pretty(&mut *out, &probes)?;
                    writeln!(out)?;
                }
                OutputFormat::Table => write_table(out, &probes)?,
            }
        }
        Commands::ProbeClear => {
            let deleted = agent.clear_probe().context("Failed to clear probes")?;
            for id in &deleted {
                writeln!(out, "Deleted probe {}", id)?;
            }
        }
        Commands::Exec { port_id, command } => {
            let command = Commands::joined_command(&command);
            let output = agent
                .exec_command(&port_id, command.as_deref())
                .with_context(|| format!("Failed to run command for probe {}", port_id))?;
            write!(out, "{}", output)?;
            if !output.ends_with('\n') {
                writeln!(out)?;
            }
        }
        Commands::PingAll {
            network_id,
            timeout,
        } => {
            let output = agent
                .ping_all(network_id.as_deref(), timeout)
                .context("Ping sweep failed")?;
            write!(out, "{}", output)?;
        }
    }
    Ok(())
}

const TABLE_HEADERS: [&str; 5] = ["id", "device_name", "network_id", "device_id", "fixed_ips"];

fn write_table(out: &mut impl Write, probes: &[ProbeListing]) -> std::io::Result<()> {
    let rows: Vec<[String; 5]> = probes
        .iter()
        .map(|p| {
            let ips: Vec<String> = p
                .port
                .fixed_ips
                .iter()
                .map(|ip| ip.ip_address.to_string())
                .collect();
            [
                p.port.id.clone(),
                p.device_name.clone(),
                p.port.network_id.clone(),
                p.port.device_id.clone(),
                ips.join(","),
            ]
        })
        .collect();

    let mut widths = TABLE_HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let line = |cells: &[&str]| -> String {
        cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = width))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    writeln!(out, "{}", line(&TABLE_HEADERS))?;
    for row in &rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        writeln!(out, "{}", line(&cells))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{
        FakeNetworkClient, ScriptedExecutor, network_fixture, port_fixture, subnet_fixture,
    };
    use crate::linux::{DriverSettings, OvsInterfaceDriver};
    use crate::probe::{AgentConfig, DEVICE_OWNER_PROBE};

    fn agent() -> ProbeAgent<FakeNetworkClient> {
        let client = FakeNetworkClient::new();
        client.add_network(network_fixture("n1", &["s1"], false));
        client.add_subnet(subnet_fixture("s1", "n1", "10.0.0.0/24"));

        let ip = IpWrapper::new(Rc::new(ScriptedExecutor::new()));
        let driver = Box::new(OvsInterfaceDriver::new(DriverSettings::default(), ip.clone()));
        let conf = AgentConfig {
            host: "host-a".to_string(),
            ..Default::default()
        };
        ProbeAgent::new(conf, client, driver, ip, AuditLogger::new_null())
    }

    fn run(agent: &ProbeAgent<FakeNetworkClient>, command: Commands) -> String {
        let mut out = Vec::new();
        handle_command(agent, command, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_create_prints_port_id() {
        let agent = agent();
        let out = run(&agent, Commands::ProbeCreate { network_id: "n1".to_string() });
        assert_eq!(out, "port-1\n");
    }

    #[test]
    fn test_list_table() {
        let agent = agent();
        run(&agent, Commands::ProbeCreate { network_id: "n1".to_string() });

        let out = run(&agent, Commands::ProbeList { format: OutputFormat::Table });
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("id"));
        assert!(lines[1].contains("tapport-1"));
        assert!(lines[1].contains("10.0.0.2"));
    }

    #[test]
    fn test_list_json() {
        let agent = agent();
        run(&agent, Commands::ProbeCreate { network_id: "n1".to_string() });

        let out = run(&agent, Commands::ProbeList { format: OutputFormat::Json });
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value[0]["device_name"], "tapport-1");
        assert_eq!(value[0]["device_owner"], DEVICE_OWNER_PROBE);
    }

    #[test]
    fn test_exec_without_command_prints_hint() {
        let agent = agent();
        agent.client().add_port(port_fixture("p9", "n1"));
        let out = run(
            &agent,
            Commands::Exec {
                port_id: "p9".to_string(),
                command: Vec::new(),
            },
        );
        assert_eq!(out, "sudo ip netns exec qprobe-p9\n");
    }

    #[test]
    fn test_delete_missing_probe_fails() {
        let agent = agent();
        let mut out = Vec::new();
        let err = handle_command(
            &agent,
            Commands::ProbeDelete {
                port_id: "nope".to_string(),
            },
            &mut out,
        )
        .unwrap_err();
        assert!(format!("{:#}", err).contains("port nope not found"));
    }
}
