//! Naming, path and formatting helpers shared by the store and the command layer.

use crate::errors::TrashError;
use chrono::{DateTime, Utc};
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

/// Suffix of every metadata record in the info area.
pub const METADATA_EXTENSION: &str = ".json";

/// Timestamp prefix of trash names. Second resolution, sorts lexicographically.
pub const TRASH_NAME_TIME_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Display format for deletion dates.
pub const DISPLAY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Builds the trash name for `base_name` deleted at `stamp`; `probe` 0 is the bare name.
pub fn build_trash_name(stamp: &str, base_name: &str, probe: u64) -> String {
    if probe == 0 {
        format!("{stamp}_{base_name}")
    } else {
        format!("{stamp}_{base_name}_{probe}")
    }
}

/// Formats the trash-name timestamp prefix for a moment in time.
pub fn trash_name_stamp(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).format(TRASH_NAME_TIME_FORMAT).to_string()
}

/// Name of the metadata record belonging to a trash name.
pub fn metadata_file_name(trash_name: &str) -> String {
    format!("{trash_name}{METADATA_EXTENSION}")
}

/// Recovers the trash name from a metadata file name, if it has the expected suffix.
pub fn trash_name_of_record(file_name: &str) -> Option<&str> {
    file_name
        .strip_suffix(METADATA_EXTENSION)
        .filter(|name| !name.is_empty())
}

/// A trash name must be a single plain path component.
pub fn is_valid_trash_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains(std::path::MAIN_SEPARATOR)
}

/// Makes `path` absolute against the current directory and removes `.` and `..`
/// lexically. Symlinks are not resolved.
pub fn absolutize(path: &Path) -> crate::Result<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(TrashError::unresolvable(path, "empty path"));
    }
    let absolute = std::path::absolute(path)
        .map_err(|err| TrashError::unresolvable(path, err.to_string()))?;

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    Ok(normalized)
}

/// Human readable size rendering shared across commands (1024 based).
pub fn format_size(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    const PREFIXES: [char; 6] = ['K', 'M', 'G', 'T', 'P', 'E'];

    if bytes < UNIT {
        return format!("{bytes} B");
    }
    let mut div = UNIT;
    let mut exp = 0usize;
    let mut n = bytes / UNIT;
    while n >= UNIT && exp < PREFIXES.len() - 1 {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }
    format!("{:.1} {}B", bytes as f64 / div as f64, PREFIXES[exp])
}

/// Shortens `value` to at most `max_chars` characters, marking the cut with "...".
pub fn truncate(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut out: String = value.chars().take(keep).collect();
    out.push_str("...");
    out
}
