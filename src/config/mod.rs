//! Configuration system for qprobe.
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded from multiple sources and merged in order:
//!
//! 1. Built-in defaults (see `config/default.toml`)
//! 2. System config: `/etc/qprobe/config.toml`
//! 3. User config: `~/.config/qprobe/config.toml`
//! 4. Additional config file (via `--config` flag)
//! 5. CLI flags and `OS_*` environment variables (highest priority)
//!
//! Missing system and user files are skipped. A field set by a later source
//! replaces the earlier value; unset fields leave it alone.

mod error;
mod loader;
mod schema;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{AgentSection, AuthConfig, Config};
