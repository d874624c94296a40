//! # Automatic VPN Switching Tool
//!
//! Lists the Pritunl profiles with their live status, asks which one to use,
//! and either disconnects it (if it is already up) or switches to it with a
//! freshly generated TOTP passcode.

mod args;
mod reporter;
mod table;

use args::Args;
use autovpn::utils::{CredentialsProvider, TerminalCredentialsProvider};
use autovpn::{
    init_logger, manager_for, CredentialStore, LifecycleDriver, Outcome, Settings, VpnError,
    VpnManager,
};
use clap::Parser;
use colored::Colorize;
use log::{debug, info};
use reporter::TerminalReporter;
use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};

/// The main entry point of the application.
fn main() -> ExitCode {
    let args = Args::parse();
    init_logger(args.level.into());
    info!("Parsed arguments: {:?}", args);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_user_abort() => {
            println!("{}", e.to_string().yellow());
            ExitCode::SUCCESS
        }
        Err(e) => {
            debug!("{:?}", e);
            eprintln!("{}", e.full_message().red());
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), VpnError> {
    let settings = Settings::load();
    let manager: Box<dyn VpnManager> = manager_for(args.tool.into(), &settings)?;

    if args.stop_all {
        manager.disconnect_all()?;
        println!("{}", "All connections stopped.".green());
        return Ok(());
    }

    let profiles = manager.profiles()?;
    let connections = manager.connections()?;
    print!("{}", table::render(&profiles, &connections, unix_now())?);

    if args.list {
        return Ok(());
    }

    let provider = TerminalCredentialsProvider;
    let token = match &args.select {
        Some(token) => token.clone(),
        None => read_selection(&provider)?,
    };

    let store = CredentialStore::open_default(&provider)?;
    let reporter = TerminalReporter::default();
    let driver = LifecycleDriver::new(&*manager, settings.timing()).with_events(&reporter);

    let outcome = driver.run(&profiles, &connections, &token, |profile| {
        let credential = if args.reset_otp {
            store.update(&profile.id)?
        } else {
            store.get(&profile.id)?
        };
        credential.passcode()
    })?;

    if outcome == Outcome::Disconnected {
        println!("{}", "Disconnected.".green());
    }
    Ok(())
}

fn read_selection(provider: &dyn CredentialsProvider) -> Result<String, VpnError> {
    provider
        .request_text("Enter ID or Server")
        .ok_or_else(|| VpnError::Unknown {
            message: "Error reading input".to_string(),
        })
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}
