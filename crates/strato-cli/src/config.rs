//! Persistent CLI configuration.
//!
//! The config file records the target endpoint, the auth token and the
//! current tenant and project. It is TOML, stored at `$STRATO_CONFIG` or
//! `<config dir>/strato/config.toml`.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CliError;

/// A named resource selected as the current one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRef {
    /// Resource name.
    pub name: String,
    /// Resource id.
    pub id: String,
}

impl NamedRef {
    /// Create a reference.
    #[must_use]
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
        }
    }
}

/// Contents of the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Controller endpoint, e.g. `https://controller:9000`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Bearer token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Current tenant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<NamedRef>,
    /// Current project.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<NamedRef>,
}

impl Config {
    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn from_toml(content: &str) -> Result<Self, CliError> {
        toml::from_str(content).map_err(|e| CliError::Config(format!("invalid TOML: {e}")))
    }

    /// Render as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, CliError> {
        toml::to_string(self).map_err(|e| CliError::Config(format!("cannot encode config: {e}")))
    }
}

/// Loads the config once and writes it back on every update.
#[derive(Debug)]
pub struct ConfigStore {
    path: Option<PathBuf>,
    config: Mutex<Config>,
}

impl ConfigStore {
    /// Default location of the config file.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("strato").join("config.toml"))
    }

    /// Load the config at `path`. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, CliError> {
        let path = path.into();
        let config = match std::fs::read_to_string(&path) {
            Ok(content) => Config::from_toml(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No config file, using defaults");
                Config::default()
            }
            Err(e) => {
                return Err(CliError::Config(format!(
                    "failed to read config file '{}': {e}",
                    path.display()
                )));
            }
        };
        Ok(Self {
            path: Some(path),
            config: Mutex::new(config),
        })
    }

    /// A store that never touches the disk.
    #[must_use]
    pub fn in_memory(config: Config) -> Self {
        Self {
            path: None,
            config: Mutex::new(config),
        }
    }

    /// Location of the backing file, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Snapshot of the current config.
    #[must_use]
    pub fn get(&self) -> Config {
        self.config.lock().clone()
    }

    /// Apply `change` and persist the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn update(&self, change: impl FnOnce(&mut Config)) -> Result<(), CliError> {
        let mut config = self.config.lock();
        change(&mut config);
        self.save(&config)
    }

    fn save(&self, config: &Config) -> Result<(), CliError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, config.to_toml()?)?;
        debug!(path = %path.display(), "Saved config");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::load(dir.path().join("config.toml")).unwrap();
        assert_eq!(store.get(), Config::default());
    }

    #[test]
    fn update_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let store = ConfigStore::load(&path).unwrap();
        store
            .update(|c| {
                c.endpoint = Some("https://controller:9000".into());
                c.tenant = Some(NamedRef::new("acme", "t-1"));
            })
            .unwrap();

        let reloaded = ConfigStore::load(&path).unwrap().get();
        assert_eq!(reloaded.endpoint.as_deref(), Some("https://controller:9000"));
        assert_eq!(reloaded.tenant, Some(NamedRef::new("acme", "t-1")));
        assert!(reloaded.project.is_none());
    }

    #[test]
    fn invalid_toml_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "endpoint = [").unwrap();
        let err = ConfigStore::load(&path).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn parses_full_file() {
        let config = Config::from_toml(
            r#"
            endpoint = "https://controller:9000"
            token = "secret"

            [tenant]
            name = "acme"
            id = "t-1"

            [project]
            name = "web"
            id = "p-1"
            "#,
        )
        .unwrap();
        assert_eq!(config.project, Some(NamedRef::new("web", "p-1")));
        assert_eq!(config.token.as_deref(), Some("secret"));
    }

    #[test]
    fn in_memory_store_skips_disk() {
        let store = ConfigStore::in_memory(Config::default());
        store.update(|c| c.token = Some("x".into())).unwrap();
        assert!(store.path().is_none());
        assert_eq!(store.get().token.as_deref(), Some("x"));
    }
}
