//! Per-profile OTP secrets.
//!
//! Each profile id gets its own JSON file under `~/.autovpn/pritunl/`, holding
//! the base32 TOTP key and an optional PIN. Missing files are created on first
//! use by prompting through a [`CredentialsProvider`].

use crate::error::VpnError;
use crate::utils::CredentialsProvider;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use totp_rs::{Algorithm, Secret, TOTP};

/// Sub-directory of the config dir that holds the Pritunl credential files.
pub const CREDENTIALS_SUBDIR: &str = "pritunl";

const TOTP_DIGITS: usize = 6;
const TOTP_STEP: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct StoredCredential {
    key: String,
    #[serde(default)]
    pin: String,
}

/// The OTP secret of one profile.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub profile_id: String,
    key: String,
    pin: Option<String>,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("profile_id", &self.profile_id)
            .field("key", &"<redacted>")
            .field("pin", &self.pin.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Credential {
    pub fn new(profile_id: &str, key: &str, pin: Option<&str>) -> Self {
        Self {
            profile_id: profile_id.to_string(),
            key: key.to_string(),
            pin: pin.filter(|p| !p.is_empty()).map(str::to_string),
        }
    }

    /// TOTP code for the given unix time.
    pub fn code_at(&self, unix_secs: u64) -> Result<String, VpnError> {
        Ok(self.totp()?.generate(unix_secs))
    }

    /// Password sent with a connect: the PIN (if any), the profile id, then the
    /// current TOTP code.
    pub fn passcode(&self) -> Result<String, VpnError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| VpnError::Credentials {
                message: format!("system clock is before the unix epoch: {}", e),
            })?
            .as_secs();
        self.passcode_at(now)
    }

    pub fn passcode_at(&self, unix_secs: u64) -> Result<String, VpnError> {
        let code = self.code_at(unix_secs)?;
        Ok(format!(
            "{}{}{}",
            self.pin.as_deref().unwrap_or_default(),
            self.profile_id,
            code
        ))
    }

    fn totp(&self) -> Result<TOTP, VpnError> {
        let normalized: String = self
            .key
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '=')
            .collect::<String>()
            .to_ascii_uppercase();
        let bytes = Secret::Encoded(normalized)
            .to_bytes()
            .map_err(|e| VpnError::Credentials {
                message: format!("OTP key for {} is not valid base32: {:?}", self.profile_id, e),
            })?;
        // Short keys are accepted: authenticator apps issue them and the client only checks the code.
        Ok(TOTP::new_unchecked(
            Algorithm::SHA1,
            TOTP_DIGITS,
            1,
            TOTP_STEP,
            bytes,
        ))
    }
}

/// Reads and writes credential files in one directory.
pub struct CredentialStore<'a> {
    dir: PathBuf,
    provider: &'a dyn CredentialsProvider,
}

impl<'a> CredentialStore<'a> {
    pub fn new(dir: impl Into<PathBuf>, provider: &'a dyn CredentialsProvider) -> Self {
        Self {
            dir: dir.into(),
            provider,
        }
    }

    /// Store rooted at `~/.autovpn/pritunl`.
    pub fn open_default(provider: &'a dyn CredentialsProvider) -> Result<Self, VpnError> {
        let dir = crate::utils::config_dir()?.join(CREDENTIALS_SUBDIR);
        Ok(Self::new(dir, provider))
    }

    pub fn path_for(&self, profile_id: &str) -> PathBuf {
        self.dir.join(profile_id)
    }

    /// Returns the stored credential, prompting for and saving a new one if absent.
    pub fn get(&self, profile_id: &str) -> Result<Credential, VpnError> {
        let path = self.path_for(profile_id);
        if path.exists() {
            return read_credential(&path, profile_id);
        }
        log::warn!("OTP config not found for profile {}", profile_id);
        self.configure(profile_id)
    }

    /// Prompts for a new credential and overwrites any stored one.
    pub fn update(&self, profile_id: &str) -> Result<Credential, VpnError> {
        self.configure(profile_id)
    }

    fn configure(&self, profile_id: &str) -> Result<Credential, VpnError> {
        let key = self
            .provider
            .request_password("Enter OTP key")
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| VpnError::Credentials {
                message: "no OTP key entered".to_string(),
            })?;
        let pin = self
            .provider
            .request_password("Enter PIN (leave empty for none)")
            .unwrap_or_default();

        let credential = Credential::new(profile_id, &key, Some(pin.trim()));
        // Reject keys that can never produce a code before writing them out.
        credential.code_at(0)?;

        let path = self.path_for(profile_id);
        write_credential(&path, &credential).map_err(|e| VpnError::Credentials {
            message: format!("failed to save {}: {:#}", path.display(), e),
        })?;
        log::info!("OTP config saved to {}", path.display());
        Ok(credential)
    }
}

fn read_credential(path: &Path, profile_id: &str) -> Result<Credential, VpnError> {
    let content = fs::read_to_string(path).map_err(|e| VpnError::Credentials {
        message: format!("failed to read {}: {}", path.display(), e),
    })?;
    let stored: StoredCredential =
        serde_json::from_str(&content).map_err(|e| VpnError::Credentials {
            message: format!("failed to parse {}: {}", path.display(), e),
        })?;
    Ok(Credential::new(profile_id, &stored.key, Some(&stored.pin)))
}

fn write_credential(path: &Path, credential: &Credential) -> anyhow::Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let stored = StoredCredential {
        key: credential.key.clone(),
        pin: credential.pin.clone().unwrap_or_default(),
    };
    fs::write(path, serde_json::to_string_pretty(&stored)?)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    /// RFC 6238 appendix B SHA-1 seed ("12345678901234567890") in base32.
    const RFC_KEY: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";

    struct ScriptedProvider {
        answers: RefCell<Vec<String>>,
        prompts: Cell<usize>,
    }

    impl ScriptedProvider {
        fn new(answers: &[&str]) -> Self {
            Self {
                answers: RefCell::new(answers.iter().rev().map(|s| s.to_string()).collect()),
                prompts: Cell::new(0),
            }
        }
    }

    impl CredentialsProvider for ScriptedProvider {
        fn request_text(&self, msg: &str) -> Option<String> {
            self.request_password(msg)
        }

        fn request_password(&self, _msg: &str) -> Option<String> {
            self.prompts.set(self.prompts.get() + 1);
            self.answers.borrow_mut().pop()
        }
    }

    #[test]
    fn rfc_6238_sha1_vector() {
        let cred = Credential::new("p1", RFC_KEY, None);
        // 94287082 truncated to six digits.
        assert_eq!(cred.code_at(59).unwrap(), "287082");
        assert_eq!(cred.code_at(1111111109).unwrap(), "081804");
    }

    #[test]
    fn passcode_is_profile_id_then_code() {
        let cred = Credential::new("prof123", RFC_KEY, None);
        assert_eq!(cred.passcode_at(59).unwrap(), "prof123287082");
    }

    #[test]
    fn passcode_prefixes_pin() {
        let cred = Credential::new("p1", RFC_KEY, Some("4321"));
        assert_eq!(cred.passcode_at(59).unwrap(), "4321p1287082");
    }

    #[test]
    fn key_is_normalized_before_decoding() {
        let cred = Credential::new("p1", "gezd gnbv gy3t qojq gezd gnbv gy3t qojq", None);
        assert_eq!(cred.code_at(59).unwrap(), "287082");
    }

    #[test]
    fn first_get_prompts_once_and_second_get_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let provider = ScriptedProvider::new(&[RFC_KEY, "99"]);
        let store = CredentialStore::new(dir.path(), &provider);

        let first = store.get("abc").unwrap();
        assert_eq!(provider.prompts.get(), 2);
        assert!(store.path_for("abc").exists());

        let second = store.get("abc").unwrap();
        assert_eq!(provider.prompts.get(), 2);
        assert_eq!(first, second);
        assert_eq!(second.pin.as_deref(), Some("99"));
    }

    #[test]
    fn update_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let provider = ScriptedProvider::new(&[RFC_KEY, "", "JBSWY3DPEHPK3PXP", "7"]);
        let store = CredentialStore::new(dir.path(), &provider);

        store.get("abc").unwrap();
        let updated = store.update("abc").unwrap();
        assert_eq!(provider.prompts.get(), 4);
        assert_eq!(store.get("abc").unwrap(), updated);
        assert_eq!(updated.pin.as_deref(), Some("7"));
    }

    #[test]
    fn empty_key_is_rejected_and_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let provider = ScriptedProvider::new(&["  "]);
        let store = CredentialStore::new(dir.path(), &provider);

        let err = store.get("abc").unwrap_err();
        assert!(matches!(err, VpnError::Credentials { .. }));
        assert!(!store.path_for("abc").exists());
    }

    #[test]
    fn invalid_base32_is_rejected_and_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let provider = ScriptedProvider::new(&["not*base32!", ""]);
        let store = CredentialStore::new(dir.path(), &provider);

        assert!(store.get("abc").is_err());
        assert!(!store.path_for("abc").exists());
    }

    #[test]
    fn reads_files_without_pin() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("abc"), format!(r#"{{"key": "{}"}}"#, RFC_KEY)).unwrap();
        let provider = ScriptedProvider::new(&[]);
        let store = CredentialStore::new(dir.path(), &provider);

        let cred = store.get("abc").unwrap();
        assert_eq!(cred.pin, None);
        assert_eq!(provider.prompts.get(), 0);
    }

    #[test]
    fn debug_output_hides_secrets() {
        let cred = Credential::new("abc", RFC_KEY, Some("1234"));
        let out = format!("{:?}", cred);
        assert!(!out.contains(RFC_KEY));
        assert!(!out.contains("1234"));
    }
}
