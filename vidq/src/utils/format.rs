//! Human-readable formatting for the dashboard.

use std::time::Duration;

/// Format bytes into human-readable string.
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Format a wait as `"{h} h {m} min"`.
pub fn format_hours_minutes(duration: Duration) -> String {
    let total_minutes = duration.as_secs() / 60;
    format!("{} h {} min", total_minutes / 60, total_minutes % 60)
}
