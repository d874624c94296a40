use autovpn::{ConnectionStatus, LifecycleEvents, Profile, VpnError};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::cell::RefCell;
use std::time::Duration;

/// Prints lifecycle progress to the terminal, with a spinner while waiting for the tunnel.
#[derive(Default)]
pub(crate) struct TerminalReporter {
    spinner: RefCell<Option<ProgressBar>>,
}

impl TerminalReporter {
    fn start_spinner(&self, server: &str) {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.yellow} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message(format!("Waiting for {}", server));
        spinner.enable_steady_tick(Duration::from_millis(100));
        *self.spinner.borrow_mut() = Some(spinner);
    }

    fn clear_spinner(&self) {
        if let Some(spinner) = self.spinner.borrow_mut().take() {
            spinner.finish_and_clear();
        }
    }
}

impl LifecycleEvents for TerminalReporter {
    fn disconnecting(&self, profile: &Profile) {
        println!("Disconnecting from {}...", profile.server);
    }

    fn disconnect_failed(&self, _profile: &Profile, error: &VpnError) {
        eprintln!("{}", error.to_string().red());
    }

    fn disconnected(&self, profile: &Profile) {
        log::info!("Disconnected from {}", profile.server);
    }

    fn connecting(&self, profile: &Profile) {
        println!("{}", format!("Connecting to {}...", profile.server).yellow());
        self.start_spinner(&profile.server);
    }

    fn status_polled(&self, profile: &Profile, status: &ConnectionStatus) {
        if let Some(spinner) = self.spinner.borrow().as_ref() {
            let shown = match status {
                ConnectionStatus::Empty => "waiting",
                other => other.as_str(),
            };
            spinner.set_message(format!("{} ({})", profile.server, shown));
        }
    }

    fn connected(&self, profile: &Profile) {
        self.clear_spinner();
        println!(
            "{}",
            format!("Successfully connected to {}!", profile.server)
                .green()
                .bold()
        );
    }

    fn connect_failed(&self, _profile: &Profile, _error: &VpnError) {
        // The error itself is printed once by main.
        self.clear_spinner();
    }
}

impl Drop for TerminalReporter {
    fn drop(&mut self) {
        self.clear_spinner();
    }
}
