//! Pritunl backend.
//!
//! Profiles come from two places: the client's profile directory (driven
//! through the background service) and the `pritunl-client list` table
//! (system profiles, driven through the binary). Live connections always come
//! from the service.

pub mod cli;
pub mod profiles;
pub mod service;

use crate::error::VpnError;
use crate::manager::VpnManager;
use crate::model::{Connections, Profile};
use crate::settings::Settings;
use cli::PritunlCli;
use service::ServiceClient;
use std::collections::HashSet;
use std::path::PathBuf;

pub struct PritunlManager {
    service: ServiceClient,
    cli: Option<PritunlCli>,
    profiles_dir: PathBuf,
}

impl PritunlManager {
    pub fn new(settings: &Settings) -> Result<Self, VpnError> {
        let service = ServiceClient::new(&settings.service_url, &settings.auth_key_path)
            .map_err(|e| VpnError::ClientUnreachable {
                message: format!("{:#}", e),
            })?;

        let cli = PritunlCli::locate(&settings.client_path);
        match &cli {
            Some(cli) => log::info!("pritunl-client located at: {}", cli.path().display()),
            None => log::warn!(
                "Cannot locate pritunl-client (checked '{}', PATH and the default install location); system profiles are unavailable",
                settings.client_path
            ),
        }

        let profiles_dir = match &settings.profiles_dir {
            Some(dir) => dir.clone(),
            None => profiles::default_profiles_dir()?,
        };

        Ok(Self {
            service,
            cli,
            profiles_dir,
        })
    }

    fn system_profiles(&self) -> Vec<Profile> {
        let Some(cli) = &self.cli else {
            return Vec::new();
        };
        match cli.list() {
            Ok(profiles) => profiles,
            Err(e) => {
                log::warn!("Skipping system profiles: {:#}", e);
                Vec::new()
            }
        }
    }

    fn require_cli(&self, profile: &Profile) -> anyhow::Result<&PritunlCli> {
        self.cli.as_ref().ok_or_else(|| {
            anyhow::anyhow!(
                "{} is a system profile but pritunl-client was not found",
                profile.id
            )
        })
    }

    fn connect_profile(&self, profile: &Profile, passcode: &str) -> anyhow::Result<()> {
        if profile.is_system() {
            self.require_cli(profile)?.start(&profile.id, passcode)
        } else {
            let ovpn = profiles::read_ovpn(profile)?;
            self.service
                .connect(&profile.id, &profile.user, passcode, &ovpn)
        }
    }

    fn disconnect_profile(&self, profile: &Profile) -> anyhow::Result<()> {
        if profile.is_system() {
            self.require_cli(profile)?.stop(&profile.id)
        } else {
            self.service.disconnect(&profile.id)
        }
    }
}

/// Merges both profile sources. Library profiles win when an id appears in
/// both. The result is sorted by server name, then id.
pub fn merge_profiles(library: Vec<Profile>, system: Vec<Profile>) -> Vec<Profile> {
    let mut known: HashSet<String> = library.iter().map(|p| p.id.clone()).collect();
    let mut merged = library;

    for profile in system {
        if !known.insert(profile.id.clone()) {
            log::debug!(
                "Profile {} is listed by both sources; keeping the library entry",
                profile.id
            );
            continue;
        }
        merged.push(profile);
    }

    merged.sort_by(|a, b| {
        a.server
            .to_lowercase()
            .cmp(&b.server.to_lowercase())
            .then_with(|| a.id.cmp(&b.id))
    });
    merged
}

fn client_error(err: anyhow::Error) -> VpnError {
    if service::is_unreachable(&err) {
        VpnError::ClientUnreachable {
            message: format!("{:#}", err),
        }
    } else {
        VpnError::from(err)
    }
}

impl VpnManager for PritunlManager {
    fn profiles(&self) -> Result<Vec<Profile>, VpnError> {
        let library = profiles::read_profiles(&self.profiles_dir).map_err(client_error)?;
        let system = self.system_profiles();
        log::debug!(
            "Found {} library and {} system profile(s)",
            library.len(),
            system.len()
        );
        Ok(merge_profiles(library, system))
    }

    fn connections(&self) -> Result<Connections, VpnError> {
        self.service.connections().map_err(|e| {
            if service::is_unreachable(&e) {
                return client_error(e);
            }
            VpnError::StatusFetchFailed {
                message: format!("{:#}", e),
            }
        })
    }

    fn connect(&self, profile: &Profile, passcode: &str) -> Result<(), VpnError> {
        self.connect_profile(profile, passcode)
            .map_err(|e| VpnError::ConnectFailed {
                server: profile.server.clone(),
                message: format!("{:#}", e),
            })
    }

    fn disconnect(&self, profile: &Profile) -> Result<(), VpnError> {
        self.disconnect_profile(profile)
            .map_err(|e| VpnError::DisconnectFailed {
                server: profile.server.clone(),
                message: format!("{:#}", e),
            })
    }

    fn disconnect_all(&self) -> Result<(), VpnError> {
        self.service.stop_all().map_err(client_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProfileOrigin;

    fn profile(id: &str, server: &str, origin: ProfileOrigin) -> Profile {
        Profile {
            id: id.to_string(),
            path: None,
            server: server.to_string(),
            user: "u".to_string(),
            origin,
            auto_start: false,
        }
    }

    #[test]
    fn library_profile_wins_on_id_collision() {
        let merged = merge_profiles(
            vec![profile("a", "Lib", ProfileOrigin::Library)],
            vec![
                profile("a", "Sys", ProfileOrigin::System),
                profile("b", "Other", ProfileOrigin::System),
            ],
        );

        assert_eq!(merged.len(), 2);
        let a = merged.iter().find(|p| p.id == "a").unwrap();
        assert_eq!(a.server, "Lib");
        assert_eq!(a.origin, ProfileOrigin::Library);
    }

    #[test]
    fn merged_profiles_are_sorted_by_server_then_id() {
        let merged = merge_profiles(
            vec![
                profile("z", "beta", ProfileOrigin::Library),
                profile("y", "Alpha", ProfileOrigin::Library),
            ],
            vec![profile("x", "beta", ProfileOrigin::System)],
        );

        let ids: Vec<&str> = merged.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["y", "x", "z"]);
    }

    #[test]
    fn manager_reads_profile_directory_without_cli() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("abc.conf"),
            r#"{"name": "n", "server": "S", "user": "alice"}"#,
        )
        .unwrap();
        let settings = Settings {
            client_path: "/nonexistent/pritunl-client".to_string(),
            auth_key_path: dir.path().join("missing.auth"),
            profiles_dir: Some(dir.path().to_path_buf()),
            ..Settings::default()
        };

        let manager = PritunlManager {
            cli: None,
            ..PritunlManager::new(&settings).unwrap()
        };
        let profiles = manager.profiles().unwrap();

        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].user, "alice");
    }

    #[test]
    fn system_profile_without_cli_fails_to_connect() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            auth_key_path: dir.path().join("missing.auth"),
            profiles_dir: Some(dir.path().to_path_buf()),
            ..Settings::default()
        };
        let manager = PritunlManager {
            cli: None,
            ..PritunlManager::new(&settings).unwrap()
        };

        let err = manager
            .connect(&profile("s", "Sys", ProfileOrigin::System), "000000")
            .unwrap_err();

        assert!(matches!(err, VpnError::ConnectFailed { .. }));
    }
}
