//! Raw page snapshots for days that could not be extracted.

use std::fs::{File, create_dir_all};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::error::AppError;

/// Snapshots are cut to this many characters.
pub const MAX_SNAPSHOT_CHARS: usize = 300_000;

pub fn snapshot_path(dir: &Path, day: NaiveDate) -> PathBuf {
    dir.join(format!("forexfactory_debug_{}.html", day.format("%Y%m%d")))
}

/// First `MAX_SNAPSHOT_CHARS` characters of `content`.
pub fn truncate_snapshot(content: &str) -> &str {
    match content.char_indices().nth(MAX_SNAPSHOT_CHARS) {
        Some((byte, _)) => &content[..byte],
        None => content,
    }
}

/// Write the page markup of a failed day into `dir`.
pub fn write_page_snapshot(dir: &Path, day: NaiveDate, content: &str) -> Result<PathBuf, AppError> {
    create_dir_all(dir).map_err(|e| AppError::new(2, format!("Failed to create debug dir: {e}")))?;

    let path = snapshot_path(dir, day);
    let mut file = File::create(&path)
        .map_err(|e| AppError::new(2, format!("Failed to create debug file '{}': {e}", path.display())))?;
    file.write_all(truncate_snapshot(content).as_bytes())
        .map_err(|e| AppError::new(2, format!("Failed to write debug file '{}': {e}", path.display())))?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_is_named_by_day_and_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let day = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        let content = "é".repeat(MAX_SNAPSHOT_CHARS + 10);

        let path = write_page_snapshot(&dir.path().join("debug"), day, &content).unwrap();
        assert!(path.ends_with("forexfactory_debug_20250307.html"));

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written.chars().count(), MAX_SNAPSHOT_CHARS);
    }

    #[test]
    fn short_content_is_kept_whole() {
        assert_eq!(truncate_snapshot("<html></html>"), "<html></html>");
    }
}
