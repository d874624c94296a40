use autovpn::{ConnectionStatus, Connections, Profile, VpnError};
use colored::Colorize;
use console::{measure_text_width, pad_str, Alignment};

const HEADERS: [&str; 7] = [
    "ID",
    "Server",
    "User",
    "Status",
    "Connected",
    "Client IP",
    "Server IP",
];
const COLUMN_GAP: &str = "   ";

/// Format a duration in seconds as "1d 2h 3m 4s", omitting leading zero units.
pub(crate) fn format_duration(total_secs: u64) -> String {
    let days = total_secs / 86_400;
    let hours = (total_secs % 86_400) / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if days > 0 {
        format!("{}d {}h {}m {}s", days, hours, minutes, seconds)
    } else if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Colored status cell. A profile without a live entry is shown as disconnected.
pub(crate) fn format_status(status: Option<&ConnectionStatus>) -> String {
    match status {
        None | Some(ConnectionStatus::Disconnected) => "DISCONNECTED".bright_black().bold(),
        Some(ConnectionStatus::Connected) => "CONNECTED".green().bold(),
        Some(ConnectionStatus::Connecting) => "CONNECTING...".yellow().bold(),
        Some(ConnectionStatus::Disconnecting) => "DISCONNECTING...".bright_black().bold(),
        Some(ConnectionStatus::Empty) => "UNKNOWN".bright_black().bold(),
        Some(ConnectionStatus::Other(raw)) => raw.to_uppercase().red().bold(),
    }
    .to_string()
}

fn row(index: usize, profile: &Profile, connections: &Connections, now: i64) -> Vec<String> {
    let conn = connections.get(&profile.id);
    let uptime = conn
        .filter(|c| c.timestamp > 0 && now >= c.timestamp)
        .map(|c| format_duration((now - c.timestamp) as u64))
        .unwrap_or_default();

    vec![
        (index + 1).to_string(),
        profile.server.clone(),
        profile.user.clone(),
        format_status(conn.map(|c| &c.status)),
        uptime,
        conn.map(|c| c.client_addr.clone()).unwrap_or_default(),
        conn.map(|c| c.server_addr.clone()).unwrap_or_default(),
    ]
}

/// Renders the borderless, left-aligned profile table. `now` is unix seconds.
pub fn render(profiles: &[Profile], connections: &Connections, now: i64) -> Result<String, VpnError> {
    if profiles.is_empty() {
        return Err(VpnError::NoProfiles);
    }

    let rows: Vec<Vec<String>> = profiles
        .iter()
        .enumerate()
        .map(|(i, p)| row(i, p, connections, now))
        .collect();

    let mut widths: Vec<usize> = HEADERS.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(measure_text_width(cell));
        }
    }

    let mut out = String::new();
    let header: Vec<String> = HEADERS.iter().map(|h| h.to_uppercase()).collect();
    for cells in std::iter::once(&header).chain(rows.iter()) {
        let line: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| pad_str(cell, *width, Alignment::Left, None).into_owned())
            .collect();
        out.push_str(line.join(COLUMN_GAP).trim_end());
        out.push('\n');
    }
    Ok(out)
}
