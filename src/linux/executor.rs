//! Process execution for host networking commands.
//!
//! Every `ip`, `ovs-vsctl` and probe command goes through an [`Executor`] so
//! the higher layers never spawn processes directly. [`HostExecutor`] runs
//! commands for real, prefixed with the configured root helper (usually
//! `sudo`).

use std::process::Command;

use tracing::debug;

use super::error::ExecutionError;

/// Default root helper used to gain `CAP_NET_ADMIN`.
pub const DEFAULT_ROOT_HELPER: &str = "sudo";

/// Runs an argument vector and returns its captured stdout.
pub trait Executor {
    /// Execute `argv` (program first) and return stdout on success.
    ///
    /// A non-zero exit status is an error carrying both output streams.
    fn execute(&self, argv: &[String]) -> Result<String, ExecutionError>;
}

/// Executes commands on the host, optionally through a root helper.
#[derive(Debug, Clone, Default)]
pub struct HostExecutor {
    root_helper: Vec<String>,
}

impl HostExecutor {
    /// Create an executor that runs commands through `root_helper`.
    ///
    /// The helper string is split with shell quoting rules, so values such
    /// as `sudo -n` or `sudo quantum-rootwrap /etc/quantum/rootwrap.conf`
    /// work. An empty helper runs commands directly.
    pub fn new(root_helper: &str) -> Result<Self, ExecutionError> {
        let root_helper = shell_words::split(root_helper).map_err(|e| {
            ExecutionError::InvalidRootHelper {
                helper: root_helper.to_string(),
                message: e.to_string(),
            }
        })?;
        Ok(Self { root_helper })
    }

    /// Executor without any privilege escalation.
    pub fn unprivileged() -> Self {
        Self::default()
    }

    /// The split root helper prefix.
    pub fn root_helper(&self) -> &[String] {
        &self.root_helper
    }

    fn full_argv(&self, argv: &[String]) -> Vec<String> {
        self.root_helper.iter().chain(argv).cloned().collect()
    }
}

impl Executor for HostExecutor {
    fn execute(&self, argv: &[String]) -> Result<String, ExecutionError> {
        if argv.is_empty() {
            return Err(ExecutionError::EmptyCommand);
        }
        let full = self.full_argv(argv);
        let Some((program, args)) = full.split_first() else {
            return Err(ExecutionError::EmptyCommand);
        };

        let cmd_str = full.join(" ");
        debug!("Running: {}", cmd_str);

        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| ExecutionError::Spawn {
                command: cmd_str.clone(),
                source: e,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        if !output.status.success() {
            return Err(ExecutionError::CommandFailure {
                command: cmd_str,
                status: output.status.code(),
                stdout,
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }

        Ok(stdout)
    }
}

/// Build an owned argument vector from string slices.
pub fn argv<I, S>(parts: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    parts.into_iter().map(Into::into).collect()
}
