//! Destination conflict detection and backup naming.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::migration::duplicate::files_are_identical;
use crate::migration::locator::is_existing_file;

/// Timestamp format used in backup file names.
const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// State of the destination before moving a file there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conflict {
    /// Nothing exists at the target.
    NoConflict,
    /// The target exists with the same content as the source.
    Identical,
    /// The target exists with different content.
    Different,
}

/// Determine whether moving `source` to `target` would collide with an existing file.
///
/// # Errors
/// Returns an error if the files cannot be read for comparison.
pub async fn resolve_conflict(source: &Path, target: &Path) -> io::Result<Conflict> {
    if !is_existing_file(target).await {
        return Ok(Conflict::NoConflict);
    }
    if files_are_identical(source, target).await? {
        Ok(Conflict::Identical)
    } else {
        Ok(Conflict::Different)
    }
}

/// Backup path for an existing file using the current local time.
///
/// Pattern: `<stem>_backup_<YYYYMMDD_HHMMSS><.ext>` in the same directory.
/// Two backups of the same file within one second get the same name.
#[must_use]
pub fn backup_path(path: &Path) -> PathBuf {
    backup_path_at(path, Local::now())
}

/// Backup path for an existing file using the given time.
#[must_use]
pub fn backup_path_at(path: &Path, time: DateTime<Local>) -> PathBuf {
    let stem = crate::path_to_file_stem_string(path);
    let extension = crate::path_to_file_extension_string(path);
    let timestamp = time.format(BACKUP_TIMESTAMP_FORMAT);

    let file_name = if extension.is_empty() {
        format!("{stem}_backup_{timestamp}")
    } else {
        format!("{stem}_backup_{timestamp}.{extension}")
    };
    path.with_file_name(file_name)
}

#[cfg(test)]
mod conflict_tests {
    use super::*;

    use std::fs;

    use chrono::TimeZone;

    #[tokio::test]
    async fn missing_target_is_no_conflict() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let source = dir.path().join("source.pdf");
        fs::write(&source, b"data").expect("Failed to write file");

        let conflict = resolve_conflict(&source, &dir.path().join("target.pdf"))
            .await
            .expect("should resolve");
        assert_eq!(conflict, Conflict::NoConflict);
    }

    #[tokio::test]
    async fn identical_target() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let source = dir.path().join("source.pdf");
        let target = dir.path().join("target.pdf");
        fs::write(&source, b"data").expect("Failed to write file");
        fs::write(&target, b"data").expect("Failed to write file");

        let conflict = resolve_conflict(&source, &target).await.expect("should resolve");
        assert_eq!(conflict, Conflict::Identical);
    }

    #[tokio::test]
    async fn different_target() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let source = dir.path().join("source.pdf");
        let target = dir.path().join("target.pdf");
        fs::write(&source, b"new data").expect("Failed to write file");
        fs::write(&target, b"old").expect("Failed to write file");

        let conflict = resolve_conflict(&source, &target).await.expect("should resolve");
        assert_eq!(conflict, Conflict::Different);
    }

    #[tokio::test]
    async fn unreadable_source_is_an_error() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let target = dir.path().join("target.pdf");
        fs::write(&target, b"old").expect("Failed to write file");

        let result = resolve_conflict(&dir.path().join("gone.pdf"), &target).await;
        assert!(result.is_err());
    }

    #[test]
    fn backup_name_pattern() {
        let time = Local
            .with_ymd_and_hms(2024, 3, 9, 14, 5, 7)
            .single()
            .expect("valid local time");
        let backup = backup_path_at(Path::new("/pdfs/Author/Book.pdf"), time);
        assert_eq!(backup, PathBuf::from("/pdfs/Author/Book_backup_20240309_140507.pdf"));
    }

    #[test]
    fn backup_name_without_extension() {
        let time = Local
            .with_ymd_and_hms(2024, 12, 31, 23, 59, 59)
            .single()
            .expect("valid local time");
        let backup = backup_path_at(Path::new("/pdfs/README"), time);
        assert_eq!(backup, PathBuf::from("/pdfs/README_backup_20241231_235959"));
    }

    #[test]
    fn backup_name_keeps_extension_case() {
        let time = Local
            .with_ymd_and_hms(2024, 1, 2, 3, 4, 5)
            .single()
            .expect("valid local time");
        let backup = backup_path_at(Path::new("/pdfs/Book.PDF"), time);
        assert_eq!(backup, PathBuf::from("/pdfs/Book_backup_20240102_030405.PDF"));
    }
}
