//! Server registry
//!
//! The registry maps a server name to where it lives on disk and how to reach
//! it. It is persisted as a JSON object (`servers.json`):
//!
//! ```json
//! {
//!   "survival": {
//!     "path": "/srv/minecraft/survival",
//!     "script": "start.sh",
//!     "address": "localhost:25565",
//!     "rcon_host": "localhost",
//!     "rcon_port": 25575
//!   }
//! }
//! ```
//!
//! Every key except `path` is optional on disk. Defaults are filled in when
//! the file is loaded so the rest of the system only ever sees complete
//! [`ServerDescriptor`]s.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::ServerName;

/// Script name used when an entry does not specify one
#[cfg(windows)]
pub const DEFAULT_SCRIPT: &str = "start.bat";
/// Script name used when an entry does not specify one
#[cfg(not(windows))]
pub const DEFAULT_SCRIPT: &str = "start.sh";

/// Game address used when an entry does not specify one
pub const DEFAULT_ADDRESS: &str = "localhost:25565";

/// RCON host used when an entry does not specify one
pub const DEFAULT_RCON_HOST: &str = "localhost";

/// RCON port used when an entry does not specify one
pub const DEFAULT_RCON_PORT: u16 = 25575;

/// Where a server's remote console listens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RconEndpoint {
    pub host: String,
    pub port: u16,
}

impl RconEndpoint {
    /// Create an endpoint
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// `host:port` form for connecting
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for RconEndpoint {
    fn default() -> Self {
        Self::new(DEFAULT_RCON_HOST, DEFAULT_RCON_PORT)
    }
}

/// Fully resolved description of a registered server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerDescriptor {
    pub name: ServerName,
    /// Working directory the start script runs in
    pub path: PathBuf,
    /// Start script file name, relative to `path`
    pub script: String,
    /// Game listener (`host:port`) used for status pings
    pub address: String,
    pub rcon: RconEndpoint,
    /// Per-server RCON secret; the daemon-wide secret is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rcon_password: Option<String>,
}

impl ServerDescriptor {
    /// Descriptor with every optional field at its default
    pub fn new(name: impl Into<ServerName>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            script: DEFAULT_SCRIPT.to_string(),
            address: DEFAULT_ADDRESS.to_string(),
            rcon: RconEndpoint::default(),
            rcon_password: None,
        }
    }

    /// Absolute path of the start script
    pub fn script_path(&self) -> PathBuf {
        self.path.join(&self.script)
    }

    /// The secret to authenticate with: this entry's, else `fallback`
    ///
    /// An empty secret counts as unset on either side.
    pub fn effective_secret<'a>(&'a self, fallback: Option<&'a str>) -> Option<&'a str> {
        self.rcon_password
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| fallback.filter(|s| !s.is_empty()))
    }

    fn from_entry(name: ServerName, entry: RegistryEntry) -> Self {
        Self {
            name,
            path: entry.path,
            script: entry.script.unwrap_or_else(|| DEFAULT_SCRIPT.to_string()),
            address: entry.address.unwrap_or_else(|| DEFAULT_ADDRESS.to_string()),
            rcon: RconEndpoint::new(
                entry
                    .rcon_host
                    .unwrap_or_else(|| DEFAULT_RCON_HOST.to_string()),
                entry.rcon_port.unwrap_or(DEFAULT_RCON_PORT),
            ),
            rcon_password: entry.rcon_password,
        }
    }

    fn to_entry(&self) -> RegistryEntry {
        RegistryEntry {
            path: self.path.clone(),
            script: Some(self.script.clone()),
            address: Some(self.address.clone()),
            rcon_host: Some(self.rcon.host.clone()),
            rcon_port: Some(self.rcon.port),
            rcon_password: self.rcon_password.clone(),
        }
    }
}

/// On-disk shape of one registry entry
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RegistryEntry {
    path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    script: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rcon_host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rcon_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rcon_password: Option<String>,
}

/// In-memory registry of servers, ordered by name
#[derive(Debug, Clone, Default)]
pub struct Registry {
    servers: BTreeMap<ServerName, ServerDescriptor>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a registry file, resolving defaults
    ///
    /// A missing file is an empty registry, not an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(Self::new());
        }

        let raw: BTreeMap<String, RegistryEntry> = serde_json::from_str(&content)?;
        let servers = raw
            .into_iter()
            .map(|(name, entry)| {
                let name = ServerName::new(name);
                (name.clone(), ServerDescriptor::from_entry(name, entry))
            })
            .collect();

        Ok(Self { servers })
    }

    /// Write the registry as pretty-printed JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let raw: BTreeMap<&str, RegistryEntry> = self
            .servers
            .iter()
            .map(|(name, desc)| (name.as_str(), desc.to_entry()))
            .collect();
        let content = serde_json::to_string_pretty(&raw)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, content)?;
        Ok(())
    }

    /// Look up a server
    pub fn get(&self, name: &ServerName) -> Option<&ServerDescriptor> {
        self.servers.get(name)
    }

    /// Insert or replace a server, returning the previous descriptor
    pub fn insert(&mut self, descriptor: ServerDescriptor) -> Option<ServerDescriptor> {
        self.servers.insert(descriptor.name.clone(), descriptor)
    }

    /// Remove a server
    pub fn remove(&mut self, name: &ServerName) -> Option<ServerDescriptor> {
        self.servers.remove(name)
    }

    /// Iterate descriptors in name order
    pub fn iter(&self) -> impl Iterator<Item = &ServerDescriptor> {
        self.servers.values()
    }

    /// Whether a name is registered
    pub fn contains(&self, name: &ServerName) -> bool {
        self.servers.contains_key(name)
    }

    /// Number of registered servers
    pub fn len(&self) -> usize {
        self.servers.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}
