//! Persisted user settings (`neodapps.toml`)

use neodapps_express::ExpressSettings;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::debug;

use crate::error::{Result, SessionError};

pub const SETTINGS_FILE: &str = "neodapps.toml";

const DEFAULT_RPC_TIMEOUT_SECS: u64 = 5;
const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
const DEFAULT_COMPLETION_TIMEOUT_SECS: u64 = 600;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Path of the neo-express executable.
    pub neo_express_location: Option<PathBuf>,
    /// Value passed to neo-express as `DOTNET_ROOT`.
    pub dotnet_root: Option<PathBuf>,
    pub rpc_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub completion_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            neo_express_location: None,
            dotnet_root: None,
            rpc_timeout_secs: DEFAULT_RPC_TIMEOUT_SECS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            completion_timeout_secs: DEFAULT_COMPLETION_TIMEOUT_SECS,
        }
    }
}

impl Settings {
    /// Reads `path` and applies `NEO_EXPRESS_LOCATION` / `DOTNET_ROOT` from the
    /// environment. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let mut settings = Self::from_file(path)?;
        settings.apply_overrides(|key| std::env::var(key).ok());
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no settings file, using defaults");
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path).map_err(|e| SessionError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&text).map_err(|e| SessionError::Settings {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(location) = lookup("NEO_EXPRESS_LOCATION").filter(|v| !v.is_empty()) {
            self.neo_express_location = Some(location.into());
        }
        if let Some(root) = lookup("DOTNET_ROOT").filter(|v| !v.is_empty()) {
            self.dotnet_root = Some(root.into());
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let text = toml::to_string_pretty(self).map_err(|e| SessionError::Settings {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        fs::write(path, text).map_err(|e| SessionError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Sets one field by its file key.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let number = || {
            value.parse::<u64>().map_err(|e| SessionError::InvalidSetting {
                key: key.to_string(),
                reason: e.to_string(),
            })
        };
        match key {
            "neo_express_location" => self.neo_express_location = optional_path(value),
            "dotnet_root" => self.dotnet_root = optional_path(value),
            "rpc_timeout_secs" => self.rpc_timeout_secs = number()?,
            "poll_interval_ms" => self.poll_interval_ms = number()?,
            "completion_timeout_secs" => self.completion_timeout_secs = number()?,
            _ => return Err(SessionError::UnknownSetting(key.to_string())),
        }
        Ok(())
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    pub fn completion_timeout(&self) -> Duration {
        Duration::from_secs(self.completion_timeout_secs)
    }

    pub fn express_settings(&self) -> ExpressSettings {
        ExpressSettings {
            neo_express_location: self.neo_express_location.clone(),
            dotnet_root: self.dotnet_root.clone(),
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(1)),
        }
    }
}

fn optional_path(value: &str) -> Option<PathBuf> {
    (!value.is_empty()).then(|| PathBuf::from(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::from_file(&dir.path().join(SETTINGS_FILE)).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.rpc_timeout(), Duration::from_secs(5));
        assert_eq!(settings.express_settings().poll_interval, Duration::from_millis(500));
        assert!(settings.express_settings().executable().is_err());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);

        let mut settings = Settings::default();
        settings.set("neo_express_location", "/opt/neoxp/neoxp").unwrap();
        settings.set("poll_interval_ms", "250").unwrap();
        settings.save(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("neo_express_location = \"/opt/neoxp/neoxp\""));
        assert!(!text.contains("dotnet_root"));

        let loaded = Settings::from_file(&path).unwrap();
        assert_eq!(loaded, settings);
        assert_eq!(loaded.poll_interval_ms, 250);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, "dotnet_root = \"/usr/share/dotnet\"\n").unwrap();

        let settings = Settings::from_file(&path).unwrap();
        assert_eq!(settings.dotnet_root, Some(PathBuf::from("/usr/share/dotnet")));
        assert_eq!(settings.completion_timeout_secs, 600);
    }

    #[test]
    fn invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, "rpc_timeout_secs = \"soon\"").unwrap();
        assert!(matches!(
            Settings::from_file(&path),
            Err(SessionError::Settings { .. })
        ));
    }

    #[test]
    fn environment_overrides_the_file() {
        let mut settings = Settings::default();
        settings.set("dotnet_root", "/from/file").unwrap();
        settings.apply_overrides(|key| match key {
            "DOTNET_ROOT" => Some("/from/env".to_string()),
            "NEO_EXPRESS_LOCATION" => Some(String::new()),
            _ => None,
        });
        assert_eq!(settings.dotnet_root, Some(PathBuf::from("/from/env")));
        assert_eq!(settings.neo_express_location, None);
    }

    #[test]
    fn set_rejects_unknown_keys_and_bad_numbers() {
        let mut settings = Settings::default();
        assert!(matches!(
            settings.set("colour", "blue"),
            Err(SessionError::UnknownSetting(_))
        ));
        assert!(matches!(
            settings.set("rpc_timeout_secs", "-1"),
            Err(SessionError::InvalidSetting { .. })
        ));
        settings.set("neo_express_location", "").unwrap();
        assert_eq!(settings.neo_express_location, None);
    }
}
