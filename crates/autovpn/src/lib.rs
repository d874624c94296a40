//! # Automatic VPN Profile Switching
//!
//! This library lists the profiles of an external VPN client (Pritunl), tears
//! down active sessions, and connects a chosen profile with a TOTP passcode,
//! polling the client until the connection settles.

pub mod credentials;
pub mod error;
pub mod lifecycle;
pub mod logger;
pub mod manager;
pub mod model;
pub mod pritunl;
pub mod settings;
pub mod utils;

// Re-export commonly used items
pub use credentials::{Credential, CredentialStore};
pub use error::{ErrorCategory, VpnError};
pub use lifecycle::{LifecycleDriver, LifecycleEvents, Outcome, Timing};
pub use logger::init_logger;
pub use manager::{manager_for, Tool, VpnManager};
pub use model::{Connection, ConnectionStatus, Connections, Profile, ProfileOrigin};
pub use settings::Settings;
