use crate::error::VpnError;
use crate::model::{Connections, Profile};
use crate::pritunl::PritunlManager;
use crate::settings::Settings;
use std::fmt;

/// Operations the lifecycle driver needs from a VPN client backend.
///
/// Implementations translate every failure of the external client into a
/// [`VpnError`]; nothing below this trait is allowed to panic the process.
pub trait VpnManager {
    /// Every profile the client knows, in a stable display order.
    fn profiles(&self) -> Result<Vec<Profile>, VpnError>;
    fn connections(&self) -> Result<Connections, VpnError>;
    fn connect(&self, profile: &Profile, passcode: &str) -> Result<(), VpnError>;
    fn disconnect(&self, profile: &Profile) -> Result<(), VpnError>;
    fn disconnect_all(&self) -> Result<(), VpnError>;
}

/// Supported VPN client backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    #[default]
    Pritunl,
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tool::Pritunl => f.write_str("pritunl"),
        }
    }
}

/// Builds the manager for `tool`. The caller owns it for the rest of the invocation.
pub fn manager_for(tool: Tool, settings: &Settings) -> Result<Box<dyn VpnManager>, VpnError> {
    log::debug!("Initializing {} manager", tool);
    match tool {
        Tool::Pritunl => Ok(Box::new(PritunlManager::new(settings)?)),
    }
}
