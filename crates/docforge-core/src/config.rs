//! Configuration management for docforge
//!
//! Loads configuration with priority:
//! 1. config.toml (or specified config file)
//! 2. Environment variables (overrides and `${VAR}` references)
//! 3. Defaults

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// docforge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocforgeConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub downloads: DownloadConfig,

    #[serde(default)]
    pub upstream: UpstreamConfig,
}

/// Bind address configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

/// Token signing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Shared HS256 signing secret (can reference env var with ${VAR_NAME})
    #[serde(default = "default_secret")]
    pub secret: String,

    /// Lifetime of issued access tokens, in seconds
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: u64,
}

/// Artifact storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory; the per-kind export directories live directly below it
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,

    /// Age past which the retention sweeper deletes an artifact, in seconds
    #[serde(default = "default_retention")]
    pub retention_secs: u64,
}

/// Download link construction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Public base URL prepended to generated download paths
    #[serde(default = "default_base_url")]
    pub public_base_url: String,
}

/// Outbound API call configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Timeout applied to every outbound request, in seconds
    #[serde(default = "default_upstream_timeout")]
    pub timeout_secs: u64,

    /// Fallback Notion integration key when a request carries none
    pub notion_api_key: Option<String>,

    /// Fallback Stability key when a request carries none
    pub stability_api_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: default_secret(),
            token_ttl_secs: default_token_ttl(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
            retention_secs: default_retention(),
        }
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            public_base_url: default_base_url(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_upstream_timeout(),
            notion_api_key: None,
            stability_api_key: None,
        }
    }
}

impl DocforgeConfig {
    /// Load configuration, falling back to defaults when no config.toml is
    /// found anywhere up the directory tree.
    pub fn load() -> Result<Self> {
        match Self::find_config_file() {
            Some(path) => Self::load_from(&path),
            None => {
                tracing::debug!("no config.toml found, using defaults");
                let mut config = Self::defaults();
                config.apply_env_overrides();
                Ok(config)
            }
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        tracing::debug!("Loading configuration from: {:?}", path);

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let mut config: DocforgeConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        config.resolve_env_refs();
        config.apply_env_overrides();

        Ok(config)
    }

    fn defaults() -> Self {
        Self {
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            storage: StorageConfig::default(),
            downloads: DownloadConfig::default(),
            upstream: UpstreamConfig::default(),
        }
    }

    /// Find config.toml by searching current directory and parents
    fn find_config_file() -> Option<PathBuf> {
        let mut current = env::current_dir().ok()?;

        loop {
            let config_path = current.join("config.toml");
            if config_path.exists() {
                return Some(config_path);
            }

            if !current.pop() {
                break;
            }
        }

        None
    }

    /// Resolve `${VAR_NAME}` references against the environment
    fn resolve_env_refs(&mut self) {
        if let Some(resolved) = Self::resolve_env_ref(&self.auth.secret) {
            self.auth.secret = resolved;
        }
        if let Some(key) = self.upstream.notion_api_key.clone() {
            self.upstream.notion_api_key = Self::resolve_env_ref(&key);
        }
        if let Some(key) = self.upstream.stability_api_key.clone() {
            self.upstream.stability_api_key = Self::resolve_env_ref(&key);
        }
    }

    /// Resolve a single `${VAR_NAME}` reference; plain values pass through
    fn resolve_env_ref(value: &str) -> Option<String> {
        if value.starts_with("${") && value.ends_with('}') {
            let var_name = &value[2..value.len() - 1];
            env::var(var_name).ok()
        } else {
            Some(value.to_string())
        }
    }

    /// Environment variables recognized on top of the config file
    fn apply_env_overrides(&mut self) {
        if let Ok(secret) = env::var("DOCFORGE_JWT_SECRET") {
            self.auth.secret = secret;
        }
        if let Ok(ttl) = env::var("DOCFORGE_TOKEN_TTL_SECS") {
            if let Ok(secs) = ttl.parse() {
                self.auth.token_ttl_secs = secs;
            }
        }
        if let Ok(retention) = env::var("DOCFORGE_RETENTION_SECS") {
            if let Ok(secs) = retention.parse() {
                self.storage.retention_secs = secs;
            }
        }
        if let Ok(url) = env::var("DOCFORGE_PUBLIC_BASE_URL") {
            self.downloads.public_base_url = url;
        }
        if let Ok(host) = env::var("DOCFORGE_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = env::var("DOCFORGE_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
    }

    /// Create test-friendly defaults
    pub fn test_defaults() -> Self {
        let mut config = Self::defaults();
        config.auth.secret = "test-signing-secret".to_string();
        config.downloads.public_base_url = "http://localhost:8080".to_string();
        config
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_secret() -> String {
    // Development fallback only; deployments set DOCFORGE_JWT_SECRET.
    "fallback-dev-secret".to_string()
}

fn default_token_ttl() -> u64 {
    3600
}

fn default_storage_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_retention() -> u64 {
    3600
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_upstream_timeout() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DocforgeConfig::test_defaults();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.auth.token_ttl_secs, 3600);
        assert_eq!(config.storage.retention_secs, 3600);
        assert_eq!(config.storage.root, PathBuf::from("."));
    }

    #[test]
    fn test_resolve_env_ref() {
        unsafe {
            env::set_var("DOCFORGE_TEST_VAR", "resolved_value");
        }

        let resolved = DocforgeConfig::resolve_env_ref("${DOCFORGE_TEST_VAR}");
        assert_eq!(resolved, Some("resolved_value".to_string()));

        let not_ref = DocforgeConfig::resolve_env_ref("plain_value");
        assert_eq!(not_ref, Some("plain_value".to_string()));

        unsafe {
            env::remove_var("DOCFORGE_TEST_VAR");
        }
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[server]
port = 9090

[auth]
secret = "file-secret"
token_ttl_secs = 120

[storage]
retention_secs = 600
"#,
        )
        .unwrap();

        let config = DocforgeConfig::load_from(&path).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.auth.secret, "file-secret");
        assert_eq!(config.auth.token_ttl_secs, 120);
        assert_eq!(config.storage.retention_secs, 600);
        // Sections absent from the file keep their defaults
        assert_eq!(config.downloads.public_base_url, "http://localhost:8080");
    }
}
