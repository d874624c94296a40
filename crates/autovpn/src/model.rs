use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

/// Where a profile was discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileOrigin {
    /// Read from the client's profile directory; driven through the local service.
    Library,
    /// Only visible in the `pritunl-client list` table; driven through the binary.
    System,
}

/// A VPN endpoint known to the client. Identity is `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub id: String,
    /// Path of the profile's `.ovpn` file. `None` for system profiles.
    pub path: Option<PathBuf>,
    pub server: String,
    pub user: String,
    pub origin: ProfileOrigin,
    pub auto_start: bool,
}

impl Profile {
    pub fn is_system(&self) -> bool {
        self.origin == ProfileOrigin::System
    }
}

/// Live session status as reported by the client.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    /// The client knows the session but has not reported anything yet.
    #[default]
    Empty,
    Connecting,
    Connected,
    Disconnecting,
    Disconnected,
    /// Anything else, `"error"` included.
    Other(String),
}

impl ConnectionStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "" => ConnectionStatus::Empty,
            "connecting" => ConnectionStatus::Connecting,
            "connected" => ConnectionStatus::Connected,
            "disconnecting" => ConnectionStatus::Disconnecting,
            "disconnected" => ConnectionStatus::Disconnected,
            _ => ConnectionStatus::Other(raw.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ConnectionStatus::Empty => "",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Disconnecting => "disconnecting",
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Other(raw) => raw,
        }
    }
}

impl From<String> for ConnectionStatus {
    fn from(raw: String) -> Self {
        ConnectionStatus::parse(&raw)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the service's `GET /profile` response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Connection {
    #[serde(default)]
    pub id: String,
    #[serde(default, deserialize_with = "status_from_str")]
    pub status: ConnectionStatus,
    /// Unix seconds of the last status change; `0` when unknown.
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub server_addr: String,
    #[serde(default)]
    pub client_addr: String,
}

fn status_from_str<'de, D>(deserializer: D) -> Result<ConnectionStatus, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.map(ConnectionStatus::from).unwrap_or_default())
}

/// Live connections keyed by profile id. A missing key means disconnected.
pub type Connections = HashMap<String, Connection>;

/// Status of `profile_id`, treating a missing entry as [`ConnectionStatus::Empty`].
pub fn status_of(connections: &Connections, profile_id: &str) -> ConnectionStatus {
    connections
        .get(profile_id)
        .map(|c| c.status.clone())
        .unwrap_or_default()
}
