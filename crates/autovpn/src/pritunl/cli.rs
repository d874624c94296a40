//! The `pritunl-client` command-line binary.
//!
//! Profiles imported through the client's own UI on some installs are only
//! visible here, not in the profile directory. Those are listed by parsing
//! the human-readable `list` table and are started/stopped through the binary.

use crate::model::{Profile, ProfileOrigin};
use anyhow::Context;
use std::path::{Path, PathBuf};
use std::process::Command;
use which::which;

/// Border, header, border.
const HEADER_LINES: usize = 3;
/// `| ID | NAME | STATE | AUTOSTART | ONLINE FOR | SERVER ADDRESS | CLIENT ADDRESS |`
/// split on `|` with the remainder folded into the last field.
const TABLE_FIELDS: usize = 8;

pub struct PritunlCli {
    path: PathBuf,
}

impl PritunlCli {
    /// Locates the binary: `user_path` as a file, then on `PATH`, then the
    /// platform's default install location.
    pub fn locate(user_path: &str) -> Option<Self> {
        let candidate = Path::new(user_path);
        if candidate.is_file() {
            return Some(Self::at(candidate));
        }

        if let Ok(found) = which(user_path) {
            return Some(Self::at(&found));
        }

        platform_fallback().map(|p| Self::at(&p))
    }

    pub fn at(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn list(&self) -> anyhow::Result<Vec<Profile>> {
        let output = self.run(&["list"])?;
        Ok(parse_profile_table(&output))
    }

    pub fn start(&self, profile_id: &str, passcode: &str) -> anyhow::Result<()> {
        self.run(&["start", profile_id, "-p", passcode])?;
        Ok(())
    }

    pub fn stop(&self, profile_id: &str) -> anyhow::Result<()> {
        self.run(&["stop", profile_id])?;
        Ok(())
    }

    fn run(&self, args: &[&str]) -> anyhow::Result<String> {
        // The passcode is an argument of `start`; keep it out of the logs.
        log::debug!("Running {} {}", self.path.display(), args[0]);
        let output = Command::new(&self.path)
            .args(args)
            .output()
            .with_context(|| format!("error running {}", self.path.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "{} {} exited with {}: {}",
                self.path.display(),
                args[0],
                output.status,
                stderr.trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(target_os = "macos")]
fn platform_fallback() -> Option<PathBuf> {
    let bundled = Path::new("/Applications/Pritunl.app/Contents/Resources/pritunl-client");
    bundled.is_file().then(|| bundled.to_path_buf())
}

#[cfg(target_os = "windows")]
fn platform_fallback() -> Option<PathBuf> {
    [
        "C:\\Program Files (x86)\\Pritunl\\pritunl-client.exe",
        "C:\\Program Files\\Pritunl\\pritunl-client.exe",
    ]
    .iter()
    .map(Path::new)
    .find(|p| p.is_file())
    .map(|p| p.to_path_buf())
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn platform_fallback() -> Option<PathBuf> {
    ["/usr/bin/pritunl-client", "/usr/local/bin/pritunl-client"]
        .iter()
        .map(Path::new)
        .find(|p| p.is_file())
        .map(|p| p.to_path_buf())
}

/// Parses the table printed by `pritunl-client list` into system profiles.
///
/// Blank lines, `+---` borders and rows with too few fields are skipped.
pub fn parse_profile_table(output: &str) -> Vec<Profile> {
    output
        .lines()
        .skip(HEADER_LINES)
        .filter(|line| !line.trim().is_empty() && !line.trim_start().starts_with('+'))
        .filter_map(parse_row)
        .collect()
}

fn parse_row(line: &str) -> Option<Profile> {
    let fields: Vec<&str> = line.splitn(TABLE_FIELDS, '|').collect();
    if fields.len() < TABLE_FIELDS {
        log::trace!("Skipping malformed row: {:?}", line);
        return None;
    }

    let id = fields[1].trim();
    if id.is_empty() {
        return None;
    }
    let (user, server) = split_name(fields[2]);
    let auto_start = matches!(
        fields[4].trim().to_ascii_lowercase().as_str(),
        "true" | "yes" | "on"
    );

    Some(Profile {
        id: id.to_string(),
        path: None,
        server,
        user,
        origin: ProfileOrigin::System,
        auto_start,
    })
}

/// `"alice (vpn.example.com)"` → `("alice", "vpn.example.com")`.
fn split_name(name: &str) -> (String, String) {
    match name.split_once(" (") {
        Some((user, server)) => (user.trim().to_string(), strip_paren(server)),
        None => (String::new(), strip_paren(name)),
    }
}

fn strip_paren(server: &str) -> String {
    let server = server.trim();
    server.strip_suffix(')').unwrap_or(server).trim().to_string()
}
