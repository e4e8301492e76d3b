//! Shared naming, time and formatting helpers.

use chrono::{DateTime, TimeZone, Utc};
use std::path::Path;
use std::time::SystemTime;

/// Separator between the timestamp prefix and the original base name.
pub const TRASHED_NAME_SEPARATOR: &str = "__";

/// Suffix inserted before the extension when a restore target is occupied.
pub const RESTORED_SUFFIX: &str = "_restored";

/// Date format used when printing timestamps.
pub const DISPLAY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Returns a user-safe, trimmed path string that can be used in logs and messages.
pub fn sanitize_user_path(path: &Path) -> String {
    path.display().to_string().trim().to_string()
}

/// Final path component as UTF-8, if there is one.
pub fn base_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|name| name.to_str())
}

/// Builds `<timestamp>__<base>`, or `<timestamp>_<n>__<base>` for the n-th
/// same-second collision.
pub fn build_trashed_name(timestamp: i64, disambiguator: u32, base: &str) -> String {
    if disambiguator == 0 {
        format!("{timestamp}{TRASHED_NAME_SEPARATOR}{base}")
    } else {
        format!("{timestamp}_{disambiguator}{TRASHED_NAME_SEPARATOR}{base}")
    }
}

/// Splits a trashed name into its prefix and original base name.
///
/// The prefix must be `<digits>` or `<digits>_<digits>`; anything else is not
/// a name this tool produced.
pub fn split_trashed_name(name: &str) -> Option<(&str, &str)> {
    let (prefix, base) = name.split_once(TRASHED_NAME_SEPARATOR)?;
    let (stamp, counter) = match prefix.split_once('_') {
        Some((stamp, counter)) => (stamp, Some(counter)),
        None => (prefix, None),
    };
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !digits(stamp) || !counter.map_or(true, digits) || base.is_empty() {
        return None;
    }
    Some((prefix, base))
}

/// Candidate file name for the n-th restore attempt into an occupied spot:
/// `notes.txt` becomes `notes_restored.txt`, then `notes_restored_2.txt`.
pub fn restored_file_name(file_name: &str, attempt: u32, is_dir: bool) -> String {
    let suffix = if attempt <= 1 {
        RESTORED_SUFFIX.to_string()
    } else {
        format!("{RESTORED_SUFFIX}_{attempt}")
    };

    let split = if is_dir { None } else { file_name.rfind('.') };
    match split {
        // A leading dot marks a dotfile, not an extension.
        Some(idx) if idx > 0 => format!("{}{}{}", &file_name[..idx], suffix, &file_name[idx..]),
        _ => format!("{file_name}{suffix}"),
    }
}

/// Seconds since the unix epoch.
pub fn unix_timestamp(time: SystemTime) -> i64 {
    DateTime::<Utc>::from(time).timestamp()
}

/// Renders unix seconds as a UTC date; out-of-range values get a placeholder.
pub fn format_timestamp(timestamp: i64) -> String {
    Utc.timestamp_opt(timestamp, 0)
        .single()
        .map(|dt| dt.format(DISPLAY_TIME_FORMAT).to_string())
        .unwrap_or_else(|| "????-??-?? ??:??:??".to_string())
}

/// Serializes a system time into the display format (UTC).
pub fn serialize_system_time(time: SystemTime) -> String {
    let dt = DateTime::<Utc>::from(time);
    dt.format(DISPLAY_TIME_FORMAT).to_string()
}

/// Human readable size rendering shared across commands.
pub fn print_size(bytes: u64) -> String {
    const SUFFIXES: [&str; 5] = ["B", "K", "M", "G", "T"];
    let mut value = bytes as f64;
    let mut idx = 0usize;

    while value >= 1024.0 && idx < SUFFIXES.len() - 1 {
        value /= 1024.0;
        idx += 1;
    }

    if idx == 0 {
        format!("{:.0} {}", value, SUFFIXES[idx])
    } else {
        format!("{:.1} {}", value, SUFFIXES[idx])
    }
}
