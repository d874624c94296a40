use crate::lifecycle::Timing;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const SETTINGS_FILE: &str = "settings.json";

/// Lower bound on the status poll interval.
const MIN_POLL_INTERVAL_MS: u64 = 100;

/// User-tunable settings, stored as JSON at `~/.autovpn/settings.json`.
///
/// Every field has a default so a partial file is fine.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the Pritunl client service.
    pub service_url: String,
    /// File holding the service's `Auth-Key`.
    pub auth_key_path: PathBuf,
    /// `pritunl-client` binary: an absolute path or a name looked up on `PATH`.
    pub client_path: String,
    /// Directory containing `<id>.conf` / `<id>.ovpn` profile files.
    pub profiles_dir: Option<PathBuf>,
    pub settle_ms: u64,
    pub poll_interval_ms: u64,
    pub connect_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            service_url: "http://127.0.0.1:9770".to_string(),
            auth_key_path: default_auth_key_path(),
            client_path: "pritunl-client".to_string(),
            profiles_dir: None,
            settle_ms: 1000,
            poll_interval_ms: 500,
            connect_timeout_secs: 30,
        }
    }
}

#[cfg(target_os = "macos")]
fn default_auth_key_path() -> PathBuf {
    PathBuf::from("/Applications/Pritunl.app/Contents/Resources/auth")
}

#[cfg(not(target_os = "macos"))]
fn default_auth_key_path() -> PathBuf {
    PathBuf::from("/var/run/pritunl.auth")
}

impl Settings {
    pub fn timing(&self) -> Timing {
        Timing {
            settle: Duration::from_millis(self.settle_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(MIN_POLL_INTERVAL_MS)),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
        }
    }

    /// Loads `~/.autovpn/settings.json`, falling back to defaults.
    pub fn load() -> Self {
        match crate::utils::config_dir() {
            Ok(dir) => Self::load_from(&dir.join(SETTINGS_FILE)),
            Err(e) => {
                log::warn!("Using default settings: {:#}", e);
                Self::default()
            }
        }
    }

    /// Loads settings from `path`. A missing or malformed file yields the defaults.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            log::debug!("No settings file at {:?}, using defaults", path);
            return Self::default();
        }
        match fs::read_to_string(path)
            .map_err(anyhow::Error::from)
            .and_then(|content| serde_json::from_str(&content).map_err(anyhow::Error::from))
        {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Ignoring unreadable settings file {:?}: {}", path, e);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults_for_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, r#"{"connect_timeout_secs": 45}"#).unwrap();

        let settings = Settings::load_from(&path);
        assert_eq!(settings.connect_timeout_secs, 45);
        assert_eq!(settings.poll_interval_ms, 500);
        assert_eq!(settings.timing().connect_timeout, Duration::from_secs(45));
    }

    #[test]
    fn malformed_or_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        assert_eq!(Settings::load_from(&path), Settings::default());

        fs::write(&path, "not json").unwrap();
        assert_eq!(Settings::load_from(&path), Settings::default());
    }

    #[test]
    fn extreme_timing_values_are_usable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(
            &path,
            r#"{"poll_interval_ms": 0, "connect_timeout_secs": 18446744073709551615}"#,
        )
        .unwrap();

        let timing = Settings::load_from(&path).timing();
        assert_eq!(
            timing.poll_interval,
            Duration::from_millis(MIN_POLL_INTERVAL_MS)
        );
        assert_eq!(timing.connect_timeout, Duration::from_secs(u64::MAX));
    }
}
