/// High-level error category for terminal display purposes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The user did not pick a usable profile
    Selection,
    /// The external VPN client (service, binary or profile store) misbehaved
    Client,
    /// Connect/disconnect/status phase errors
    Connection,
    /// OTP secret loading or prompting
    Credentials,
}

/// Error types returned by the profile switching flow.
#[derive(Debug, Clone)]
pub enum VpnError {
    /// The Pritunl service or command-line client could not be reached at all
    ClientUnreachable {
        message: String,
    },
    /// Neither the profile directory nor the client listed any profile
    NoProfiles,
    /// The selector prompt was left empty
    NoSelection,
    ProfileNotFound {
        selector: String,
    },

    DisconnectFailed {
        server: String,
        message: String,
    },
    ConnectFailed {
        server: String,
        message: String,
    },
    StatusFetchFailed {
        message: String,
    },
    ConnectTimeout {
        server: String,
        seconds: u64,
    },
    /// The client reported a status that can never turn into "connected"
    ConnectRejected {
        server: String,
        status: String,
    },

    Credentials {
        message: String,
    },

    Unknown {
        message: String,
    },
}

impl VpnError {
    /// Returns the high-level category of this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            VpnError::NoSelection | VpnError::ProfileNotFound { .. } => ErrorCategory::Selection,
            VpnError::ClientUnreachable { .. } | VpnError::NoProfiles | VpnError::Unknown { .. } => {
                ErrorCategory::Client
            }
            VpnError::DisconnectFailed { .. }
            | VpnError::ConnectFailed { .. }
            | VpnError::StatusFetchFailed { .. }
            | VpnError::ConnectTimeout { .. }
            | VpnError::ConnectRejected { .. } => ErrorCategory::Connection,
            VpnError::Credentials { .. } => ErrorCategory::Credentials,
        }
    }

    /// Returns true when the user simply chose nothing; callers treat this as a clean exit.
    pub fn is_user_abort(&self) -> bool {
        matches!(self, VpnError::NoSelection)
    }

    /// Returns the user-facing error message
    pub fn user_message(&self) -> String {
        match self {
            VpnError::ClientUnreachable { message } => {
                format!("Pritunl client is not reachable: {}", message)
            }
            VpnError::NoProfiles => "No profile found in Pritunl".to_string(),
            VpnError::NoSelection => "No profile selected".to_string(),
            VpnError::ProfileNotFound { selector } => {
                format!("Profile does not exist: {}", selector)
            }
            VpnError::DisconnectFailed { server, message } => {
                format!("Failed to disconnect from {}: {}", server, message)
            }
            VpnError::ConnectFailed { server, message } => {
                format!("Failed to connect to {}: {}", server, message)
            }
            VpnError::StatusFetchFailed { message } => {
                format!("Failed to fetch connection status: {}", message)
            }
            VpnError::ConnectTimeout { server, seconds } => {
                format!("Connection to {} timed out after {}s", server, seconds)
            }
            VpnError::ConnectRejected { server, status } => {
                format!("Failed to connect to {}: {}", server, status)
            }
            VpnError::Credentials { message } => format!("OTP configuration error: {}", message),
            VpnError::Unknown { message } => format!("An error occurred: {}", message),
        }
    }

    /// Returns troubleshooting hints for errors that are not self-explanatory
    pub fn troubleshooting_steps(&self) -> Vec<String> {
        let mut steps = Vec::new();

        match self.category() {
            ErrorCategory::Client => {
                steps.push("Make sure the Pritunl client is installed and running".to_string());
                steps.push(
                    "Check service_url and auth_key_path in ~/.autovpn/settings.json".to_string(),
                );
            }
            ErrorCategory::Credentials => {
                steps.push("Re-enter the OTP key with --reset-otp".to_string());
            }
            ErrorCategory::Connection => {
                if matches!(
                    self,
                    VpnError::ConnectTimeout { .. } | VpnError::ConnectRejected { .. }
                ) {
                    steps.push(
                        "Verify the OTP key and PIN; reset them with --reset-otp".to_string(),
                    );
                }
            }
            ErrorCategory::Selection => {}
        }

        steps
    }

    /// Returns the message followed by numbered troubleshooting steps, if any
    pub fn full_message(&self) -> String {
        let mut msg = self.user_message();
        let steps = self.troubleshooting_steps();

        if !steps.is_empty() {
            msg.push_str("\n\nTroubleshooting steps:");
            for (i, step) in steps.iter().enumerate() {
                msg.push_str(&format!("\n{}. {}", i + 1, step));
            }
        }

        msg
    }
}

impl std::fmt::Display for VpnError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

impl std::error::Error for VpnError {}

impl From<anyhow::Error> for VpnError {
    fn from(err: anyhow::Error) -> Self {
        VpnError::Unknown {
            message: format!("{:#}", err),
        }
    }
}
