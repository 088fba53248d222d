//! Storage configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::CoreError;
use crate::Result;

/// Suffix appended to the namespace to form the change-event topic
const TOPIC_MARKER: &str = "__storage__";

/// Thirty minutes
const DEFAULT_TTL_MS: u64 = 30 * 60 * 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Prefix of the change-event topic, usually the embedding application's name
    pub namespace: String,
    /// TTL applied by `set_with_default_ttl`
    pub default_ttl_ms: u64,
    /// Byte quota for stores created from this config, `None` for unlimited
    pub quota_bytes: Option<usize>,
    /// SQLite file backing the store; in-memory when unset
    pub database_path: Option<PathBuf>,
}

impl Config {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    /// Read overrides from `STASH_NAMESPACE`, `STASH_DEFAULT_TTL_MS`,
    /// `STASH_QUOTA_BYTES` and `STASH_DATABASE_PATH`
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(namespace) = std::env::var("STASH_NAMESPACE") {
            config.namespace = namespace;
        }
        if let Ok(ttl) = std::env::var("STASH_DEFAULT_TTL_MS") {
            config.default_ttl_ms = ttl
                .parse()
                .map_err(|_| CoreError::Config(format!("invalid STASH_DEFAULT_TTL_MS: {}", ttl)))?;
        }
        if let Ok(quota) = std::env::var("STASH_QUOTA_BYTES") {
            config.quota_bytes = match quota.as_str() {
                "" | "unlimited" => None,
                _ => Some(quota.parse().map_err(|_| {
                    CoreError::Config(format!("invalid STASH_QUOTA_BYTES: {}", quota))
                })?),
            };
        }
        if let Ok(path) = std::env::var("STASH_DATABASE_PATH") {
            config.database_path = Some(PathBuf::from(path));
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_quota(mut self, quota_bytes: Option<usize>) -> Self {
        self.quota_bytes = quota_bytes;
        self
    }

    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Topic on which change events are published, `<namespace>:__storage__`
    pub fn event_topic(&self) -> String {
        format!("{}:{}", self.namespace, TOPIC_MARKER)
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_millis(self.default_ttl_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.namespace.trim().is_empty() {
            return Err(CoreError::Config("namespace cannot be empty".to_string()));
        }
        if self.default_ttl_ms == 0 {
            return Err(CoreError::Config("default TTL must be positive".to_string()));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: "stash".to_string(),
            default_ttl_ms: DEFAULT_TTL_MS,
            quota_bytes: Some(stash_storage::DEFAULT_QUOTA_BYTES),
            database_path: None,
        }
    }
}
