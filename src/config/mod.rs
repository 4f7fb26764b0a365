//! Configuration management
//!
//! This module provides YAML-based configuration management with support for:
//! - Environment variable overrides
//! - Multiple configuration file locations
//! - Default values for all settings

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub puppetdb: PuppetDbConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// PuppetDB SSL configuration (nested format from Puppet module)
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct PuppetDbSslConfig {
    /// Path to client certificate
    pub cert_path: Option<PathBuf>,
    /// Path to client private key
    pub key_path: Option<PathBuf>,
    /// Path to CA certificate
    pub ca_path: Option<PathBuf>,
    /// Verify SSL certificates
    #[serde(default = "default_ssl_verify")]
    pub verify: bool,
}

/// PuppetDB connection configuration
/// Supports both flat format (ssl_cert, ssl_key, ssl_ca) and nested format (ssl.cert_path, etc.)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PuppetDbConfig {
    #[serde(default = "default_puppetdb_url")]
    pub url: String,
    /// Takes precedence over `url` when set
    #[serde(default)]
    pub url_override: Option<String>,
    /// Request timeout in seconds; no client-side timeout when absent
    #[serde(default, alias = "timeout")]
    pub timeout_secs: Option<u64>,
    #[serde(default = "default_ssl_verify")]
    pub ssl_verify: bool,
    /// Flat format: ssl_cert path
    #[serde(default)]
    pub ssl_cert: Option<PathBuf>,
    /// Flat format: ssl_key path
    #[serde(default)]
    pub ssl_key: Option<PathBuf>,
    /// Flat format: ssl_ca path
    #[serde(default)]
    pub ssl_ca: Option<PathBuf>,
    /// Nested format: ssl configuration block (from Puppet module)
    #[serde(default)]
    pub ssl: Option<PuppetDbSslConfig>,
}

impl Default for PuppetDbConfig {
    fn default() -> Self {
        Self {
            url: default_puppetdb_url(),
            url_override: None,
            timeout_secs: None,
            ssl_verify: default_ssl_verify(),
            ssl_cert: None,
            ssl_key: None,
            ssl_ca: None,
            ssl: None,
        }
    }
}

impl PuppetDbConfig {
    /// Base URL in use: the override when present, otherwise `url`
    pub fn effective_url(&self) -> &str {
        self.url_override
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or(self.url.as_str())
    }

    /// Get the effective SSL cert path (checks nested config first, then flat)
    pub fn effective_ssl_cert(&self) -> Option<&PathBuf> {
        self.ssl
            .as_ref()
            .and_then(|s| s.cert_path.as_ref())
            .or(self.ssl_cert.as_ref())
    }

    /// Get the effective SSL key path (checks nested config first, then flat)
    pub fn effective_ssl_key(&self) -> Option<&PathBuf> {
        self.ssl
            .as_ref()
            .and_then(|s| s.key_path.as_ref())
            .or(self.ssl_key.as_ref())
    }

    /// Get the effective SSL CA path (checks nested config first, then flat)
    pub fn effective_ssl_ca(&self) -> Option<&PathBuf> {
        self.ssl
            .as_ref()
            .and_then(|s| s.ca_path.as_ref())
            .or(self.ssl_ca.as_ref())
    }

    /// Get the effective SSL verify setting (checks nested config first, then flat)
    pub fn effective_ssl_verify(&self) -> bool {
        self.ssl.as_ref().map(|s| s.verify).unwrap_or(self.ssl_verify)
    }
}

fn default_puppetdb_url() -> String {
    "http://localhost:8082".to_string()
}

fn default_ssl_verify() -> bool {
    true
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    /// Log output target (console or file)
    #[serde(default = "default_log_target")]
    pub target: LogTarget,
    /// Directory for log files (used when target is "file" or "both")
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// Log file name prefix
    #[serde(default = "default_log_prefix")]
    pub log_prefix: String,
    /// Enable daily log rotation
    #[serde(default = "default_log_rotation")]
    pub daily_rotation: bool,
}

/// Log output target
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    /// Log to stderr
    #[default]
    Console,
    /// Log to file with optional rotation
    File,
    /// Log to both console and file
    Both,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

fn default_log_target() -> LogTarget {
    LogTarget::Console
}

fn default_log_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|p| p.join("puppetdb-browser/logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

fn default_log_prefix() -> String {
    "puppetdb-browser".to_string()
}

fn default_log_rotation() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            target: default_log_target(),
            log_dir: default_log_dir(),
            log_prefix: default_log_prefix(),
            daily_rotation: default_log_rotation(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values
    /// 2. Configuration file (YAML)
    /// 3. Environment variables
    pub fn load() -> Result<Self> {
        // Try to load .env file if it exists
        let _ = dotenvy::dotenv();

        let explicit = std::env::var("PUPPETDB_BROWSER_CONFIG")
            .ok()
            .map(PathBuf::from);

        let mut config = match Self::resolve_config_path(explicit)? {
            Some(ref path) => Self::from_file(path)?,
            None => AppConfig::default(),
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Parse a YAML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        serde_norway::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// An explicitly named file must exist; otherwise search the standard locations
    fn resolve_config_path(explicit: Option<PathBuf>) -> Result<Option<PathBuf>> {
        match explicit {
            Some(path) if path.exists() => Ok(Some(path)),
            Some(path) => anyhow::bail!(
                "Config file set in PUPPETDB_BROWSER_CONFIG does not exist: {:?}",
                path
            ),
            None => Ok(Self::find_config_file()),
        }
    }

    /// Find the configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let paths = [
            // Current directory
            PathBuf::from("config.yaml"),
            PathBuf::from("config/config.yaml"),
            // System config directory
            PathBuf::from("/etc/puppetdb-browser/config.yaml"),
            // User config directory
            dirs::config_dir()
                .map(|p| p.join("puppetdb-browser/config.yaml"))
                .unwrap_or_default(),
        ];

        paths.into_iter().find(|p| p.exists())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from `lookup`, keyed by environment variable name
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // Logging overrides
        if let Some(level) = lookup("RUST_LOG") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("PUPPETDB_BROWSER_LOG_FORMAT") {
            self.logging.format = match format.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "compact" => LogFormat::Compact,
                _ => LogFormat::Pretty,
            };
        }
        if let Some(target) = lookup("PUPPETDB_BROWSER_LOG_TARGET") {
            self.logging.target = match target.to_lowercase().as_str() {
                "file" => LogTarget::File,
                "both" => LogTarget::Both,
                _ => LogTarget::Console,
            };
        }
        if let Some(dir) = lookup("PUPPETDB_BROWSER_LOG_DIR") {
            self.logging.log_dir = PathBuf::from(dir);
        }

        // PuppetDB overrides
        let puppetdb = &mut self.puppetdb;
        if let Some(url) = lookup("PUPPETDB_URL") {
            puppetdb.url_override = Some(url);
        }
        if let Some(timeout) = lookup("PUPPETDB_TIMEOUT") {
            match timeout.trim().parse() {
                Ok(secs) => puppetdb.timeout_secs = Some(secs),
                Err(e) => warn!(
                    "Ignoring PUPPETDB_TIMEOUT={:?}: not a number of seconds ({})",
                    timeout, e
                ),
            }
        }

        // Written to both formats so the nested block cannot shadow the environment
        if let Some(cert) = lookup("PUPPETDB_SSL_CERT").map(PathBuf::from) {
            if let Some(ref mut ssl) = puppetdb.ssl {
                ssl.cert_path = Some(cert.clone());
            }
            puppetdb.ssl_cert = Some(cert);
        }
        if let Some(key) = lookup("PUPPETDB_SSL_KEY").map(PathBuf::from) {
            if let Some(ref mut ssl) = puppetdb.ssl {
                ssl.key_path = Some(key.clone());
            }
            puppetdb.ssl_key = Some(key);
        }
        if let Some(ca) = lookup("PUPPETDB_SSL_CA").map(PathBuf::from) {
            if let Some(ref mut ssl) = puppetdb.ssl {
                ssl.ca_path = Some(ca.clone());
            }
            puppetdb.ssl_ca = Some(ca);
        }
        if let Some(verify) = lookup("PUPPETDB_SSL_VERIFY") {
            let verify = !matches!(verify.to_lowercase().as_str(), "false" | "0" | "no");
            if let Some(ref mut ssl) = puppetdb.ssl {
                ssl.verify = verify;
            }
            puppetdb.ssl_verify = verify;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let url = self.puppetdb.effective_url();
        if url.trim().is_empty() {
            anyhow::bail!("PuppetDB URL cannot be empty");
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            anyhow::bail!(
                "PuppetDB URL must start with http:// or https://, got: {}",
                url
            );
        }

        if self.puppetdb.effective_ssl_cert().is_some() != self.puppetdb.effective_ssl_key().is_some()
        {
            anyhow::bail!("PuppetDB SSL client certificate and key must be configured together");
        }

        Ok(())
    }
}
