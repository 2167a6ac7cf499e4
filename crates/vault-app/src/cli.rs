//! CLI argument definitions for the vault binary.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

use vault_core::config::VaultConfig;

/// Secure Data Vault: a small record store with a menu and a REST API.
#[derive(Parser, Debug, Default)]
#[command(name = "vault", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// API server port.
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// Directory for the SQLite database file.
    #[arg(short = 'd', long = "data-dir")]
    pub data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Serve the HTTP API even when attached to a terminal.
    #[arg(long = "serve", conflicts_with = "interactive")]
    pub serve: bool,

    /// Run the interactive menu even when stdin is not a terminal.
    #[arg(long = "interactive")]
    pub interactive: bool,
}

/// How the process talks to its user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Interactive,
    Server,
}

impl Mode {
    /// Filter used when neither `RUST_LOG` nor a level override is set.
    pub fn default_log_level(&self) -> &'static str {
        match self {
            Mode::Interactive => "warn",
            Mode::Server => "info",
        }
    }
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > VAULT_CONFIG env var > `vault.toml`.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("VAULT_CONFIG") {
            if !p.trim().is_empty() {
                return PathBuf::from(p);
            }
        }
        PathBuf::from("vault.toml")
    }

    /// Pick the run mode.
    ///
    /// Explicit flags win, then a container marker forces the server, then
    /// a terminal on stdin selects the menu.
    pub fn resolve_mode(&self, stdin_is_terminal: bool, in_container: bool) -> Mode {
        if self.serve {
            return Mode::Server;
        }
        if self.interactive {
            return Mode::Interactive;
        }
        if in_container || !stdin_is_terminal {
            return Mode::Server;
        }
        Mode::Interactive
    }

    /// Resolve the log filter.
    ///
    /// Priority: --log-level flag > VAULT_LOG_LEVEL env var > mode default.
    pub fn resolve_log_level(&self, mode: Mode) -> String {
        if let Some(ref level) = self.log_level {
            return level.clone();
        }
        match std::env::var("VAULT_LOG_LEVEL") {
            Ok(level) if !level.trim().is_empty() => level,
            _ => mode.default_log_level().to_string(),
        }
    }

    /// Apply flag overrides on top of file and environment values.
    pub fn apply_overrides(&self, config: &mut VaultConfig) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(ref dir) = self.data_dir {
            config.general.data_dir = dir.to_string_lossy().to_string();
        }
    }
}
