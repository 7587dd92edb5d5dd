//! Backend connection settings, resolved at startup.
//!
//! Credentials and the tenant path come from the environment (or a JSON
//! document), never from constants compiled into the core.

use serde::Deserialize;

use crate::collection::CollectionPath;
use crate::error::ConfigError;

pub const DEFAULT_APP_ID: &str = "default-app-id";
pub const DEFAULT_COLLECTION: &str = "trackhub_inventory";

/// Connection settings for the managed document store.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackendConfig {
    pub api_key: String,
    pub auth_domain: String,
    pub project_id: String,
    /// Tenant scope segment of the collection path.
    pub app_id: String,
    pub collection: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            auth_domain: String::new(),
            project_id: String::new(),
            app_id: DEFAULT_APP_ID.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
        }
    }
}

impl core::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("api_key", &if self.api_key.is_empty() { "" } else { "<redacted>" })
            .field("auth_domain", &self.auth_domain)
            .field("project_id", &self.project_id)
            .field("app_id", &self.app_id)
            .field("collection", &self.collection)
            .finish()
    }
}

impl BackendConfig {
    /// Read `TRACKHUB_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve settings through `lookup`, falling back to defaults with a warning.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let read = |key: &str, default: String| match lookup(key) {
            Some(value) => value,
            None => {
                tracing::warn!(key, "not set; using default");
                default
            }
        };

        let config = Self {
            api_key: read("TRACKHUB_API_KEY", defaults.api_key),
            auth_domain: read("TRACKHUB_AUTH_DOMAIN", defaults.auth_domain),
            project_id: read("TRACKHUB_PROJECT_ID", defaults.project_id),
            app_id: read("TRACKHUB_APP_ID", defaults.app_id),
            collection: read("TRACKHUB_COLLECTION", defaults.collection),
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON config document (camelCase keys, all optional).
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [("appId", &self.app_id), ("collection", &self.collection)] {
            if value.trim().is_empty() {
                return Err(ConfigError::invalid(key, "must not be empty"));
            }
            if value.contains('/') {
                return Err(ConfigError::invalid(key, "must be a single path segment"));
            }
        }
        Ok(())
    }

    /// `artifacts/{app_id}/public/data/{collection}`
    pub fn collection_path(&self) -> CollectionPath {
        CollectionPath::new([
            "artifacts",
            self.app_id.as_str(),
            "public",
            "data",
            self.collection.as_str(),
        ])
    }
}
