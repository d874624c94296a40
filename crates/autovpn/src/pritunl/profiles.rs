use crate::model::{Profile, ProfileOrigin};
use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Platform-relative path from the home directory to the client's profile store.
#[cfg(target_os = "macos")]
const PROFILES_SUBPATH: &str = "Library/Application Support/pritunl/profiles";

#[cfg(target_os = "windows")]
const PROFILES_SUBPATH: &str = "AppData/Roaming/pritunl/profiles";

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const PROFILES_SUBPATH: &str = ".config/pritunl/profiles";

/// The JSON blob stored in `<id>.conf`. Only the fields we display are read.
#[derive(Debug, Deserialize)]
struct ProfileConf {
    #[serde(default)]
    server: String,
    #[serde(default)]
    user: String,
}

pub fn default_profiles_dir() -> anyhow::Result<PathBuf> {
    Ok(crate::utils::home_dir()?.join(PROFILES_SUBPATH))
}

/// Reads every `<id>.conf` in `dir`. A missing directory is an empty store.
pub fn read_profiles(dir: &Path) -> anyhow::Result<Vec<Profile>> {
    if !dir.is_dir() {
        log::debug!("Profile directory {:?} does not exist", dir);
        return Ok(Vec::new());
    }

    let mut profiles = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.display()))? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("conf") {
            continue;
        }
        let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };

        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read profile config for ID {}", id))?;
        let conf: ProfileConf = serde_json::from_str(&content)
            .with_context(|| format!("failed to unmarshal profile config for ID {}", id))?;

        profiles.push(Profile {
            id: id.to_string(),
            path: Some(dir.join(format!("{}.ovpn", id))),
            server: conf.server,
            user: conf.user,
            origin: ProfileOrigin::Library,
            auto_start: false,
        });
    }
    Ok(profiles)
}

/// Contents of the profile's `.ovpn` file, sent to the service on connect.
pub fn read_ovpn(profile: &Profile) -> anyhow::Result<String> {
    let path = profile
        .path
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("profile {} has no configuration file", profile.id))?;
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_conf_files_and_ignores_others() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("abc.conf"),
            r#"{"name": "office", "server": "OFFICE", "user": "alice", "extra": 1}"#,
        )
        .unwrap();
        fs::write(dir.path().join("abc.ovpn"), "client\nremote 10.0.0.1\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignore me").unwrap();

        let profiles = read_profiles(dir.path()).unwrap();
        assert_eq!(profiles.len(), 1);
        let profile = &profiles[0];
        assert_eq!(profile.id, "abc");
        assert_eq!(profile.server, "OFFICE");
        assert_eq!(profile.user, "alice");
        assert_eq!(profile.origin, ProfileOrigin::Library);
        assert_eq!(read_ovpn(profile).unwrap(), "client\nremote 10.0.0.1\n");
    }

    #[test]
    fn bad_conf_names_the_profile() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("xyz.conf"), "{not json").unwrap();

        let err = read_profiles(dir.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("xyz"));
    }

    #[test]
    fn missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_profiles(&dir.path().join("absent")).unwrap().is_empty());
    }
}
