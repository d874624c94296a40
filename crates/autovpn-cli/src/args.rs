use clap::{Parser, ValueEnum};
use log::LevelFilter;

/// Automatically connect to a VPN server
#[derive(Parser, Debug)]
#[command(name = "autovpn", version)]
pub struct Args {
    /// VPN tool to use
    #[arg(short, long, value_enum, default_value_t = ToolArg::Pritunl)]
    pub tool: ToolArg,

    /// Log level
    #[arg(short, long, value_enum, default_value_t = LogLevel::Warn)]
    pub level: LogLevel,

    /// Profile ID (1-based row) or server name; skips the prompt
    #[arg(short, long)]
    pub select: Option<String>,

    /// Re-enter the OTP key and PIN of the selected profile before connecting
    #[arg(long)]
    pub reset_otp: bool,

    /// Print the profile table and exit
    #[arg(long, conflicts_with_all = ["select", "reset_otp"])]
    pub list: bool,

    /// Stop every active connection and exit
    #[arg(long, conflicts_with_all = ["select", "reset_otp", "list"])]
    pub stop_all: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ToolArg {
    Pritunl,
}

impl From<ToolArg> for autovpn::Tool {
    fn from(tool: ToolArg) -> Self {
        match tool {
            ToolArg::Pritunl => autovpn::Tool::Pritunl,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn args_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn defaults_to_pritunl_and_warn() {
        let args = Args::try_parse_from(["autovpn"]).unwrap();
        assert_eq!(args.tool, ToolArg::Pritunl);
        assert_eq!(LevelFilter::from(args.level), LevelFilter::Warn);
        assert!(args.select.is_none());
    }

    #[test]
    fn rejects_unknown_tool() {
        assert!(Args::try_parse_from(["autovpn", "--tool", "openvpn"]).is_err());
    }

    #[test]
    fn stop_all_conflicts_with_select() {
        assert!(Args::try_parse_from(["autovpn", "--stop-all", "-s", "1"]).is_err());
    }
}
