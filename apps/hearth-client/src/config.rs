//! # Client Configuration
//!
//! ## Load Order (later overrides earlier)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Defaults                                                            │
//! │  2. hearth.toml (explicit path, or the platform config dir)            │
//! │       Linux:   ~/.config/hearth/hearth.toml                             │
//! │       macOS:   ~/Library/Application Support/app.hearth.hearth/...      │
//! │  3. Environment                                                         │
//! │       HEARTH_DATA_DIR, HEARTH_NAMESPACE, HEARTH_GEOCODER_URL,           │
//! │       HEARTH_PLATFORM, HEARTH_USER_ID                                   │
//! │  4. validate()                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```toml
//! [storage]
//! namespace = "hearth"
//! file_name = "hearth.db"
//!
//! [geocoding]
//! base_url = "https://nominatim.openstreetmap.org"
//! timeout_secs = 10
//! result_limit = 5
//!
//! [notifications]
//! platform = "mobile"
//!
//! [user]
//! id = "cust-42"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use hearth_geo::{GeocoderConfig, DEFAULT_BASE_URL};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::platform::PlatformKind;

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Directory holding the database. Defaults to the platform data dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Prefix for every storage key.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    #[serde(default = "default_file_name")]
    pub file_name: String,
}

fn default_namespace() -> String {
    "hearth".to_string()
}

fn default_file_name() -> String {
    "hearth.db".to_string()
}

impl Default for StorageSettings {
    fn default() -> Self {
        StorageSettings {
            data_dir: None,
            namespace: default_namespace(),
            file_name: default_file_name(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodingSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Candidates requested per address search.
    #[serde(default = "default_result_limit")]
    pub result_limit: usize,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_user_agent() -> String {
    format!("hearth-client/{}", env!("CARGO_PKG_VERSION"))
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_result_limit() -> usize {
    5
}

impl Default for GeocodingSettings {
    fn default() -> Self {
        GeocodingSettings {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            result_limit: default_result_limit(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationsSection {
    #[serde(default)]
    pub platform: PlatformKind,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserSettings {
    /// Signed-in user. Messaging and verification need it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

// =============================================================================
// Client Config
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub geocoding: GeocodingSettings,

    #[serde(default)]
    pub notifications: NotificationsSection,

    #[serde(default)]
    pub user: UserSettings,
}

impl ClientConfig {
    /// Loads configuration from file, environment, and defaults.
    pub fn load(config_path: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading client config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load client config: {}. Using defaults.", e);
            Self::default()
        })
    }

    pub fn save(&self, config_path: Option<PathBuf>) -> AppResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| AppError::Config("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Client config saved");
        Ok(())
    }

    pub fn validate(&self) -> AppResult<()> {
        let namespace = &self.storage.namespace;
        if namespace.trim().is_empty() || namespace.contains(':') {
            return Err(AppError::Config(format!(
                "namespace must be non-empty and contain no ':', got '{}'",
                namespace
            )));
        }

        if self.storage.file_name.trim().is_empty() {
            return Err(AppError::Config("file_name must not be empty".into()));
        }

        let url = &self.geocoding.base_url;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(AppError::Config(format!(
                "Geocoder URL must start with http:// or https://, got: {}",
                url
            )));
        }

        if self.geocoding.timeout_secs == 0 {
            return Err(AppError::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if !(1..=50).contains(&self.geocoding.result_limit) {
            return Err(AppError::Config(
                "result_limit must be between 1 and 50".into(),
            ));
        }

        if let Some(id) = &self.user.id {
            if id.trim().is_empty() {
                return Err(AppError::Config("user id must not be blank".into()));
            }
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup("HEARTH_DATA_DIR") {
            debug!(data_dir = %dir, "Overriding data dir from environment");
            self.storage.data_dir = Some(PathBuf::from(dir));
        }

        if let Some(namespace) = lookup("HEARTH_NAMESPACE") {
            self.storage.namespace = namespace;
        }

        if let Some(url) = lookup("HEARTH_GEOCODER_URL") {
            debug!(url = %url, "Overriding geocoder URL from environment");
            self.geocoding.base_url = url;
        }

        if let Some(platform) = lookup("HEARTH_PLATFORM") {
            match platform.parse() {
                Ok(kind) => self.notifications.platform = kind,
                Err(_) => warn!(platform = %platform, "Unknown platform in environment"),
            }
        }

        if let Some(id) = lookup("HEARTH_USER_ID") {
            self.user.id = Some(id);
        }
    }

    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("app", "hearth", "hearth")
    }

    fn default_config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join("hearth.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Full path of the SQLite file.
    pub fn database_path(&self) -> PathBuf {
        let dir = self
            .storage
            .data_dir
            .clone()
            .or_else(|| Self::project_dirs().map(|dirs| dirs.data_dir().to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."));
        dir.join(&self.storage.file_name)
    }

    pub fn geocoder_config(&self) -> GeocoderConfig {
        GeocoderConfig {
            base_url: self.geocoding.base_url.clone(),
            user_agent: self.geocoding.user_agent.clone(),
            timeout: Duration::from_secs(self.geocoding.timeout_secs),
            result_limit: self.geocoding.result_limit,
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user.id.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.storage.namespace, "hearth");
        assert_eq!(config.notifications.platform, PlatformKind::Mobile);
        assert!(config.user_id().is_none());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ClientConfig::default();

        config.storage.namespace = "a:b".to_string();
        assert!(config.validate().is_err());
        config.storage.namespace = "hearth".to_string();

        config.geocoding.base_url = "ftp://geo".to_string();
        assert!(config.validate().is_err());
        config.geocoding.base_url = "http://localhost:8080".to_string();
        assert!(config.validate().is_ok());

        config.geocoding.result_limit = 0;
        assert!(config.validate().is_err());
        config.geocoding.result_limit = 5;

        config.user.id = Some("  ".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("HEARTH_DATA_DIR", "/tmp/hearth-data"),
            ("HEARTH_PLATFORM", "web"),
            ("HEARTH_USER_ID", "cust-42"),
            ("HEARTH_GEOCODER_URL", "http://geo.local"),
        ]
        .into_iter()
        .collect();

        let mut config = ClientConfig::default();
        config.apply_overrides_from(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.notifications.platform, PlatformKind::Web);
        assert_eq!(config.user_id(), Some("cust-42"));
        assert_eq!(config.geocoding.base_url, "http://geo.local");
        assert_eq!(
            config.database_path(),
            PathBuf::from("/tmp/hearth-data/hearth.db")
        );
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("hearth.toml");

        let mut config = ClientConfig::default();
        config.user.id = Some("cook-7".to_string());
        config.geocoding.result_limit = 3;
        config.save(Some(path.clone())).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let loaded: ClientConfig = toml::from_str(&contents).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: ClientConfig = toml::from_str("[notifications]\nplatform = \"web\"\n").unwrap();
        assert_eq!(config.notifications.platform, PlatformKind::Web);
        assert_eq!(config.storage.file_name, "hearth.db");
        assert_eq!(config.geocoding.timeout_secs, 10);
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hearth.toml");
        std::fs::write(&path, "[geocoding]\nresult_limit = 0\n").unwrap();

        assert!(ClientConfig::load(Some(path.clone())).is_err());
        let config = ClientConfig::load_or_default(Some(path));
        assert_eq!(config.geocoding.result_limit, 5);
    }
}
