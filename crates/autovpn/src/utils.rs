use console::Term;
use dialoguer::{Input, Password};
use std::env;
use std::path::PathBuf;

/// Directory under the home directory that holds settings and per-profile OTP files.
pub const CONFIG_SUBPATH: &str = ".autovpn";

/// Trait for collecting secrets from the user.
///
/// Both methods return `None` when the prompt could not be shown or was aborted.
pub trait CredentialsProvider {
    fn request_text(&self, msg: &str) -> Option<String>;
    fn request_password(&self, msg: &str) -> Option<String>;
}

/// Prompts on the controlling terminal.
pub struct TerminalCredentialsProvider;

impl CredentialsProvider for TerminalCredentialsProvider {
    fn request_text(&self, msg: &str) -> Option<String> {
        let term = Term::stderr();
        let _ = term.clear_line();
        Input::<String>::new()
            .with_prompt(msg)
            .allow_empty(true)
            .interact_text()
            .ok()
    }

    fn request_password(&self, msg: &str) -> Option<String> {
        let term = Term::stderr();
        let _ = term.clear_line();
        Password::new()
            .with_prompt(msg)
            .allow_empty_password(true)
            .interact()
            .ok()
    }
}

/// Returns the user's home directory from `HOME` (or `USERPROFILE` on Windows).
pub fn home_dir() -> anyhow::Result<PathBuf> {
    let home = env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map_err(|_| anyhow::anyhow!("cannot determine home directory (HOME is not set)"))?;
    Ok(PathBuf::from(home))
}

/// Returns `~/.autovpn`. The directory is not created here.
pub fn config_dir() -> anyhow::Result<PathBuf> {
    Ok(home_dir()?.join(CONFIG_SUBPATH))
}
