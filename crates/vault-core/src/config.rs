use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, VaultError};

/// Top-level configuration for the vault.
///
/// Loaded from `vault.toml` by default, then overridden by environment
/// variables and finally by command-line flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VaultConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub backup: BackupConfig,
}

/// Where the record database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    File(PathBuf),
    Memory,
}

impl VaultConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: VaultConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// Empty values are ignored. `MONGO_URI` and `PORT` are honored as
    /// fallbacks for deployments that still export the legacy names; a
    /// `MONGO_URI` naming a non-SQLite server is skipped with a warning.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(uri) = get("VAULT_DB_URI") {
            self.database.uri = Some(uri);
        } else if let Some(uri) = get("MONGO_URI") {
            if foreign_scheme(&uri).is_some() {
                warn!(
                    uri = %uri,
                    "Ignoring MONGO_URI: only SQLite connection strings are supported"
                );
            } else {
                self.database.uri = Some(uri);
            }
        }
        if let Some(name) = get("VAULT_DB_NAME") {
            self.database.name = name;
        }
        if let Some(table) = get("VAULT_TABLE") {
            self.database.table = table;
        }
        if let Some(port) = get("VAULT_PORT").or_else(|| get("PORT")) {
            match port.trim().parse::<u16>() {
                Ok(p) => self.server.port = p,
                Err(_) => warn!(value = %port, "Ignoring invalid port from environment"),
            }
        }
        if let Some(dir) = get("VAULT_BACKUP_DIR") {
            self.backup.dir = dir;
        }
        if let Some(path) = get("VAULT_EXPORT_PATH") {
            self.backup.export_path = path;
        }
    }

    /// Check values that would otherwise fail deep inside the store.
    pub fn validate(&self) -> Result<()> {
        if !is_sql_identifier(&self.database.table) {
            return Err(VaultError::Config(format!(
                "table name '{}' must match [A-Za-z_][A-Za-z0-9_]*",
                self.database.table
            )));
        }
        if let Some(scheme) = self.database.uri.as_deref().and_then(foreign_scheme) {
            return Err(VaultError::Config(format!(
                "unsupported database scheme '{}://', expected a path, sqlite://<path> or :memory:",
                scheme
            )));
        }
        if self.database.name.trim().is_empty() {
            return Err(VaultError::Config(
                "database name must not be empty".to_string(),
            ));
        }
        if self.server.port == 0 {
            return Err(VaultError::Config("port must be non-zero".to_string()));
        }
        Ok(())
    }

    /// Resolve the database location from the connection string, or from the
    /// data directory and database name when no connection string is set.
    pub fn database_location(&self) -> DatabaseLocation {
        match self.database.uri.as_deref().map(str::trim) {
            Some(":memory:") | Some("sqlite::memory:") => DatabaseLocation::Memory,
            Some(uri) if !uri.is_empty() => {
                let path = uri.strip_prefix("sqlite://").unwrap_or(uri);
                DatabaseLocation::File(PathBuf::from(path))
            }
            _ => DatabaseLocation::File(
                PathBuf::from(&self.general.data_dir).join(format!("{}.db", self.database.name)),
            ),
        }
    }

    /// Socket address string the HTTP listener binds to.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// The scheme of a `<scheme>://` connection string other than `sqlite`.
fn foreign_scheme(uri: &str) -> Option<&str> {
    let (scheme, _) = uri.trim().split_once("://")?;
    if scheme.eq_ignore_ascii_case("sqlite") {
        None
    } else {
        Some(scheme)
    }
}

/// True for a plain SQL identifier: `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_sql_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory holding the database file when no connection string is set.
    pub data_dir: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
        }
    }
}

/// Record database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection string: a file path, `sqlite://<path>` or `:memory:`.
    pub uri: Option<String>,
    /// Database name, used for the file name when `uri` is unset.
    pub name: String,
    /// Table holding the records.
    pub table: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            uri: None,
            name: "vaultdb".to_string(),
            table: "records".to_string(),
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// Snapshot and export output locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    /// Directory receiving one snapshot file per mutation.
    pub dir: String,
    /// Export file, overwritten on every export.
    pub export_path: String,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            dir: "backups".to_string(),
            export_path: "export.txt".to_string(),
        }
    }
}
