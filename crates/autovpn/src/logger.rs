use colored::Colorize;
use env_logger::Env;
use log::{Level, LevelFilter};
use std::io::Write;

/// Environment variable that overrides the per-module filter, e.g. `AUTOVPN_LOG=autovpn::pritunl=trace`.
pub const LOG_ENV: &str = "AUTOVPN_LOG";

/// Installs the global logger. Diagnostics go to stderr so they never mix with the profile table.
pub fn init_logger(level: LevelFilter) {
    let verbose = level >= LevelFilter::Debug;

    env_logger::Builder::new()
        .filter_level(level)
        .parse_env(Env::new().filter(LOG_ENV))
        .format(move |buf, record| {
            let tag = match record.level() {
                Level::Error => "ERROR".red(),
                Level::Warn => "WARN".yellow(),
                Level::Info => "INFO".green(),
                Level::Debug => "DEBUG".blue(),
                Level::Trace => "TRACE".purple(),
            };
            if verbose {
                writeln!(
                    buf,
                    "[{}] {} - {}",
                    tag,
                    record.target().dimmed(),
                    record.args()
                )
            } else {
                writeln!(buf, "[{}] - {}", tag, record.args())
            }
        })
        .init();
}
