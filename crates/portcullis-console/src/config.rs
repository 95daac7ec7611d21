//! Console configuration loaded from TOML.
//!
//! ```toml
//! [api]
//! base_url = "http://127.0.0.1:8080"
//! prefix = "/api/v1"
//! timeout_secs = 10
//!
//! [storage]
//! path = ".portcullis/session.json"
//!
//! [fixture]
//! path = "config/fixture.toml"
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use portcullis_client::HttpIdentitySource;
use portcullis_contracts::error::{PortcullisError, PortcullisResult};
use portcullis_core::{traits::IdentitySource, AuthzSession};
use portcullis_store::FileStore;

use crate::fixture::FixtureIdentitySource;

fn default_prefix() -> String {
    portcullis_policy::key::API_PREFIX.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_storage_path() -> PathBuf {
    PathBuf::from(".portcullis/session.json")
}

/// Where the admin REST API lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Server origin, e.g. `https://shop.example.com`.
    pub base_url: String,
    /// Versioned path prefix in front of every endpoint.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

/// Offline identity source; replaces the HTTP API when present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureConfig {
    pub path: PathBuf,
}

/// The top-level structure deserialized from the console config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleConfig {
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub fixture: Option<FixtureConfig>,
}

impl ConsoleConfig {
    /// Parse `s` as TOML.
    ///
    /// Returns `PortcullisError::ConfigError` if the TOML is malformed or
    /// `api.base_url` is blank.
    pub fn from_toml_str(s: &str) -> PortcullisResult<Self> {
        let config: ConsoleConfig = toml::from_str(s).map_err(|e| PortcullisError::ConfigError {
            reason: format!("failed to parse console config TOML: {}", e),
        })?;
        if config.api.base_url.trim().is_empty() {
            return Err(PortcullisError::ConfigError {
                reason: "api.base_url must not be empty".to_string(),
            });
        }
        Ok(config)
    }

    /// Read and parse the config file at `path`.
    ///
    /// Relative storage and fixture paths are resolved against the config
    /// file's directory.
    pub fn from_file(path: &Path) -> PortcullisResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| PortcullisError::ConfigError {
            reason: format!("failed to read config file '{}': {}", path.display(), e),
        })?;
        let mut config = Self::from_toml_str(&contents)?;

        if let Some(dir) = path.parent() {
            config.storage.path = dir.join(&config.storage.path);
            if let Some(fixture) = config.fixture.as_mut() {
                fixture.path = dir.join(&fixture.path);
            }
        }
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    /// Build the identity source this configuration selects.
    pub fn identity_source(&self) -> PortcullisResult<Arc<dyn IdentitySource>> {
        match &self.fixture {
            Some(fixture) => {
                info!(path = %fixture.path.display(), "using fixture identity source");
                Ok(Arc::new(FixtureIdentitySource::from_file(&fixture.path)?))
            }
            None => {
                info!(base_url = %self.api.base_url, "using HTTP identity source");
                Ok(Arc::new(HttpIdentitySource::new(
                    &self.api.base_url,
                    &self.api.prefix,
                    self.timeout(),
                )?))
            }
        }
    }

    /// Assemble a session over the configured source and file store, and
    /// hydrate it from whatever a previous run persisted.
    pub fn open_session(&self) -> PortcullisResult<AuthzSession> {
        let source = self.identity_source()?;
        let store = Arc::new(FileStore::open(&self.storage.path)?);
        let session = AuthzSession::new(source, store);
        session.hydrate();
        Ok(session)
    }
}
