/// Helper utilities for docker-backup

use std::path::Path;
use std::time::Duration;

/// Format bytes to human-readable size
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

/// Format an operation duration; sub-minute durations keep one decimal
pub fn format_elapsed(elapsed: Duration) -> String {
    let seconds = elapsed.as_secs();
    if seconds < 60 {
        return format!("{:.1}s", elapsed.as_secs_f64());
    }
    format_duration(seconds)
}

/// Format duration to human-readable string
pub fn format_duration(seconds: u64) -> String {
    let days = seconds / 86400;
    let hours = (seconds % 86400) / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Truncate string with ellipsis
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Check if a file exists and can be opened for reading
pub fn is_file_readable<P: AsRef<Path>>(path: P) -> bool {
    let path = path.as_ref();
    path.is_file() && std::fs::File::open(path).is_ok()
}

/// Check if a directory exists and is writable.
///
/// Permission bits lie for root and on read-only mounts, so this probes by
/// creating (and removing) a temporary file.
pub fn is_dir_writable<P: AsRef<Path>>(path: P) -> bool {
    let path = path.as_ref();
    path.is_dir() && tempfile::tempfile_in(path).is_ok()
}
