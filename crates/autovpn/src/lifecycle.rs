//! Profile selection and the connect/disconnect lifecycle.
//!
//! The driver works against any [`VpnManager`]. It runs on the calling thread:
//! prior sessions are torn down one at a time with a settle delay between
//! them, and the connect is followed by a bounded status poll.

use crate::error::VpnError;
use crate::manager::VpnManager;
use crate::model::{status_of, ConnectionStatus, Connections, Profile};
use std::thread;
use std::time::{Duration, Instant};

/// Delays used by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Pause after each prior-session disconnect.
    pub settle: Duration,
    pub poll_interval: Duration,
    /// Overall budget for the target to reach `connected`.
    pub connect_timeout: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            settle: Duration::from_secs(1),
            poll_interval: Duration::from_millis(500),
            connect_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Target is already connected: just drop it.
    Disconnect,
    /// Tear down every live session, then connect the target.
    Connect,
}

/// Successful end of a [`LifecycleDriver::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Disconnected,
    Connected,
}

/// State of the post-connect status poll. Only `Polling` is non-terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollState {
    Polling,
    Connected,
    Failed(ConnectionStatus),
    TimedOut,
}

impl PollState {
    /// Classifies one observed status. Never yields `TimedOut`; that is decided by the clock.
    pub fn from_status(status: &ConnectionStatus) -> Self {
        match status {
            ConnectionStatus::Connected => PollState::Connected,
            ConnectionStatus::Empty | ConnectionStatus::Connecting => PollState::Polling,
            ConnectionStatus::Disconnecting
            | ConnectionStatus::Disconnected
            | ConnectionStatus::Other(_) => PollState::Failed(status.clone()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PollState::Polling)
    }
}

/// Finds the profile named by `token`: a 1-based index into `profiles` or a
/// case-insensitive server name. The first match in list order wins.
pub fn resolve_profile<'p>(profiles: &'p [Profile], token: &str) -> Result<&'p Profile, VpnError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(VpnError::NoSelection);
    }
    let wanted = token.to_uppercase();

    profiles
        .iter()
        .enumerate()
        .find(|(i, profile)| (i + 1).to_string() == token || profile.server.to_uppercase() == wanted)
        .map(|(_, profile)| profile)
        .ok_or_else(|| VpnError::ProfileNotFound {
            selector: token.to_string(),
        })
}

pub fn decide_action(profile: &Profile, connections: &Connections) -> Action {
    match connections.get(&profile.id) {
        Some(conn) if conn.status == ConnectionStatus::Connected => Action::Disconnect,
        _ => Action::Connect,
    }
}

/// Progress notifications. All methods default to doing nothing.
pub trait LifecycleEvents {
    fn disconnecting(&self, _profile: &Profile) {}
    fn disconnect_failed(&self, _profile: &Profile, _error: &VpnError) {}
    fn disconnected(&self, _profile: &Profile) {}
    fn connecting(&self, _profile: &Profile) {}
    fn status_polled(&self, _profile: &Profile, _status: &ConnectionStatus) {}
    fn connected(&self, _profile: &Profile) {}
    fn connect_failed(&self, _profile: &Profile, _error: &VpnError) {}
}

/// Ignores every event.
pub struct NoEvents;

impl LifecycleEvents for NoEvents {}

/// Drives one disconnect-or-connect decision against a [`VpnManager`].
pub struct LifecycleDriver<'a> {
    manager: &'a dyn VpnManager,
    timing: Timing,
    events: &'a dyn LifecycleEvents,
}

impl<'a> LifecycleDriver<'a> {
    pub fn new(manager: &'a dyn VpnManager, timing: Timing) -> Self {
        Self {
            manager,
            timing,
            events: &NoEvents,
        }
    }

    pub fn with_events(mut self, events: &'a dyn LifecycleEvents) -> Self {
        self.events = events;
        self
    }

    /// Resolves `token` and either disconnects the target or switches to it.
    ///
    /// `passcode` is only invoked on the connect path, after prior sessions
    /// have been torn down.
    pub fn run<F>(
        &self,
        profiles: &[Profile],
        connections: &Connections,
        token: &str,
        passcode: F,
    ) -> Result<Outcome, VpnError>
    where
        F: FnOnce(&Profile) -> Result<String, VpnError>,
    {
        let target = resolve_profile(profiles, token)?;
        log::info!("Selected profile {} ({})", target.id, target.server);

        match decide_action(target, connections) {
            Action::Disconnect => self.disconnect_target(target),
            Action::Connect => {
                let cleared = self.clear_sessions(profiles, connections);
                log::debug!("Cleared {} prior session(s)", cleared);
                let code = passcode(target)?;
                self.connect_and_wait(target, &code)
            }
        }
    }

    pub fn disconnect_target(&self, profile: &Profile) -> Result<Outcome, VpnError> {
        self.events.disconnecting(profile);
        self.manager.disconnect(profile)?;
        self.events.disconnected(profile);
        Ok(Outcome::Disconnected)
    }

    /// Disconnects, in list order, every profile that appears in `connections`.
    /// Failures are reported and skipped. Returns the number of disconnect calls made.
    pub fn clear_sessions(&self, profiles: &[Profile], connections: &Connections) -> usize {
        let mut calls = 0;
        for profile in profiles.iter().filter(|p| connections.contains_key(&p.id)) {
            self.events.disconnecting(profile);
            calls += 1;
            match self.manager.disconnect(profile) {
                Ok(()) => self.events.disconnected(profile),
                Err(e) => {
                    log::debug!("Disconnect of {} failed: {:?}", profile.id, e);
                    self.events.disconnect_failed(profile, &e);
                }
            }
            thread::sleep(self.timing.settle);
        }
        calls
    }

    /// Issues the connect and polls until the target is connected, rejected or timed out.
    pub fn connect_and_wait(&self, profile: &Profile, passcode: &str) -> Result<Outcome, VpnError> {
        self.events.connecting(profile);
        let result = self
            .manager
            .connect(profile, passcode)
            .and_then(|()| self.poll_status(profile))
            .and_then(|state| match state {
                PollState::Connected => Ok(Outcome::Connected),
                PollState::Failed(status) => Err(VpnError::ConnectRejected {
                    server: profile.server.clone(),
                    status: status.to_string(),
                }),
                PollState::TimedOut | PollState::Polling => Err(VpnError::ConnectTimeout {
                    server: profile.server.clone(),
                    seconds: self.timing.connect_timeout.as_secs(),
                }),
            });

        match &result {
            Ok(_) => self.events.connected(profile),
            Err(e) => self.events.connect_failed(profile, e),
        }
        result
    }

    /// Polls the live connection set until a terminal [`PollState`] is reached.
    pub fn poll_status(&self, profile: &Profile) -> Result<PollState, VpnError> {
        // A timeout too large to represent never expires.
        let deadline = Instant::now().checked_add(self.timing.connect_timeout);

        loop {
            let connections = self.manager.connections().map_err(|e| match e {
                VpnError::StatusFetchFailed { .. } => e,
                other => VpnError::StatusFetchFailed {
                    message: other.to_string(),
                },
            })?;
            let status = status_of(&connections, &profile.id);
            log::trace!("Status of {}: {:?}", profile.id, status);
            self.events.status_polled(profile, &status);

            let state = PollState::from_status(&status);
            if state.is_terminal() {
                return Ok(state);
            }

            let mut pause = self.timing.poll_interval;
            if let Some(deadline) = deadline {
                let now = Instant::now();
                if now >= deadline {
                    return Ok(PollState::TimedOut);
                }
                pause = pause.min(deadline - now);
            }
            thread::sleep(pause);
        }
    }
}
