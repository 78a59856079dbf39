//! Utility functions and helpers

pub mod log;
pub mod spawn;

use std::path::Path;

/// Get relative path from base to target, using forward slashes
pub fn relative_path(from: &Path, to: &Path) -> Option<String> {
    pathdiff::diff_paths(to, from).map(|p| to_posix(&p))
}

/// Render a path with forward slashes regardless of platform
pub fn to_posix(path: &Path) -> String {
    path.display().to_string().replace('\\', "/")
}

/// Join URL-style path segments, skipping empty ones
pub fn posix_join(parts: &[&str]) -> String {
    parts
        .iter()
        .flat_map(|part| part.split('/'))
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Format bytes as human-readable size
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Format duration as human-readable string
pub fn format_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs_f64();

    if secs >= 60.0 {
        let mins = (secs / 60.0).floor() as u64;
        let remaining_secs = secs - (mins as f64 * 60.0);
        format!("{}m {:.2}s", mins, remaining_secs)
    } else if secs >= 1.0 {
        format!("{:.2}s", secs)
    } else {
        format!("{:.0}ms", secs * 1000.0)
    }
}
