//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/quill/config.toml, or `QUILL_CONFIG`)
//! 3. Environment variables (`PUBLIC_ADDR`, `ADMIN_ADDR`, `DATA_DIR`, ...)
//!
//! Environment variables take precedence over config file values. Base URLs
//! left empty after all layers are derived from the bind addresses.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::session::Credentials;

/// Environment variable naming the config file
const CONFIG_ENV: &str = "QUILL_CONFIG";

/// Which post store implementation to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Embedded SQLite database
    #[default]
    Sqlite,
    /// Single JSON document
    Json,
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackend::Sqlite => write!(f, "sqlite"),
            StoreBackend::Json => write!(f, "json"),
        }
    }
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(StoreBackend::Sqlite),
            "json" => Ok(StoreBackend::Json),
            other => bail!("Unknown store backend '{}' (expected sqlite or json)", other),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default = "Config::unresolved")]
pub struct Config {
    /// Bind address of the public site
    pub public_addr: String,

    /// Bind address of the admin surface
    pub admin_addr: String,

    pub admin_user: String,
    pub admin_pass: String,

    /// Public base URL, no trailing slash
    pub site_base_url: String,

    /// Admin base URL, no trailing slash
    pub admin_base_url: String,

    /// Directory holding posts.json, blog.db and site.json
    pub data_dir: PathBuf,

    pub store_backend: StoreBackend,
}

impl Default for Config {
    fn default() -> Self {
        let mut config = Self::unresolved();
        config.resolve_base_urls();
        config
    }
}

impl Config {
    /// Load configuration from default location and environment
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring an explicit file path when given
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => {
                if !path.exists() {
                    bail!("Config file not found: {:?}", path);
                }
                Self::load_from_path(path)
            }
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::unresolved()
        };

        config.apply_env_overrides()?;
        config.resolve_base_urls();
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides()?;
        config.resolve_base_urls();
        Ok(config)
    }

    /// Defaults with base URLs still empty, so later layers decide them
    fn unresolved() -> Self {
        Self {
            public_addr: ":8084".to_string(),
            admin_addr: ":8085".to_string(),
            admin_user: "admin".to_string(),
            admin_pass: "admin".to_string(),
            site_base_url: String::new(),
            admin_base_url: String::new(),
            data_dir: PathBuf::from("data"),
            store_backend: StoreBackend::default(),
        }
    }

    /// Apply environment variable overrides
    ///
    /// A variable that is set wins even when empty.
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var("PUBLIC_ADDR") {
            self.public_addr = val;
        }
        if let Ok(val) = std::env::var("ADMIN_ADDR") {
            self.admin_addr = val;
        }
        if let Ok(val) = std::env::var("ADMIN_USER") {
            self.admin_user = val;
        }
        if let Ok(val) = std::env::var("ADMIN_PASS") {
            self.admin_pass = val;
        }
        if let Ok(val) = std::env::var("SITE_BASE_URL") {
            self.site_base_url = val;
        }
        if let Ok(val) = std::env::var("ADMIN_BASE_URL") {
            self.admin_base_url = val;
        }
        if let Ok(val) = std::env::var("DATA_DIR") {
            self.data_dir = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("STORE_BACKEND") {
            self.store_backend = val.parse().context("Invalid STORE_BACKEND")?;
        }
        Ok(())
    }

    /// Trim trailing slashes and fill empty base URLs from the bind addresses
    fn resolve_base_urls(&mut self) {
        self.site_base_url = self.site_base_url.trim_end_matches('/').to_string();
        if self.site_base_url.is_empty() {
            self.site_base_url = base_url_from_addr(&self.public_addr);
        }

        self.admin_base_url = self.admin_base_url.trim_end_matches('/').to_string();
        if self.admin_base_url.is_empty() {
            self.admin_base_url = if self.site_base_url.is_empty() {
                base_url_from_addr(&self.admin_addr)
            } else {
                format!("{}/admin", self.site_base_url)
            };
        }
    }

    /// Ensure data directory exists
    pub fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with QUILL_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("quill")
            .join("config.toml")
    }

    /// Get the path to the JSON post document
    pub fn posts_json_path(&self) -> PathBuf {
        self.data_dir.join("posts.json")
    }

    /// Get the path to the SQLite database
    pub fn sqlite_path(&self) -> PathBuf {
        self.data_dir.join("blog.db")
    }

    /// Get the path to the site profile document
    pub fn site_json_path(&self) -> PathBuf {
        self.data_dir.join("site.json")
    }

    /// The configured admin login, checked by exact comparison
    pub fn admin_credentials(&self) -> Credentials {
        Credentials::new(&self.admin_user, &self.admin_pass)
    }
}

/// Derive a browsable base URL from a listen address
///
/// `:8084` becomes `http://localhost:8084`; wildcard hosts map to localhost;
/// values that already carry a scheme are kept.
pub fn base_url_from_addr(addr: &str) -> String {
    let addr = addr.trim();
    if addr.is_empty() {
        return String::new();
    }
    if addr.starts_with("http://") || addr.starts_with("https://") {
        return addr.trim_end_matches('/').to_string();
    }

    let (host, port) = match addr.strip_prefix(':') {
        Some(port) => ("localhost", port),
        None => split_host_port(addr).unwrap_or((addr, "")),
    };

    let host = match host {
        "" | "0.0.0.0" | "::" => "localhost",
        other => other,
    };

    if port.is_empty() {
        format!("http://{}", host)
    } else {
        format!("http://{}:{}", host, port)
    }
}

/// Split `host:port` or `[v6]:port`; bare IPv6 literals don't split
fn split_host_port(addr: &str) -> Option<(&str, &str)> {
    if let Some(rest) = addr.strip_prefix('[') {
        let (host, tail) = rest.split_once(']')?;
        let port = tail.strip_prefix(':')?;
        return Some((host, port));
    }

    let (host, port) = addr.rsplit_once(':')?;
    if host.contains(':') {
        return None;
    }
    Some((host, port))
}
