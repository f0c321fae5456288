//! Artifact path resolution.
//!
//! The naming rules for files and folders belong to the library application.
//! The migration engine only needs the resulting paths, through the [`PathResolver`] trait.

use std::path::{Path, PathBuf};

use crate::migration::LibraryEntry;
use crate::migration::artifact_file_path;

/// Computes where the artifact of an entry is, or should be, stored.
///
/// Implementations must be pure functions of the entry and their configured roots.
pub trait PathResolver: Send + Sync {
    /// Path of the artifact next to the entry's primary artifact.
    /// Returns `None` when the entry has no primary artifact location.
    fn resolve_legacy_path(&self, entry: &LibraryEntry, extension: &str) -> Option<PathBuf>;

    /// Path of the artifact under the base storage root.
    fn resolve_fallback_path(&self, entry: &LibraryEntry, extension: &str) -> PathBuf;

    /// Path of the artifact under the configured target root.
    fn resolve_target_path(&self, entry: &LibraryEntry, extension: &str) -> PathBuf;
}

/// Resolver that mirrors the relative folder of each entry below a different root.
///
/// - legacy: `<dir of primary artifact>/<file_stem>.<ext>`
/// - fallback: `<books_root>/<folder>/<file_stem>.<ext>`
/// - target: `<target_root>/<folder>/<file_stem>.<ext>`
///
/// Without a target root the artifacts stay under the books root.
#[derive(Debug, Clone)]
pub struct LayoutPathResolver {
    books_root: PathBuf,
    target_root: Option<PathBuf>,
}

impl LayoutPathResolver {
    #[must_use]
    pub const fn new(books_root: PathBuf, target_root: Option<PathBuf>) -> Self {
        Self {
            books_root,
            target_root,
        }
    }

    #[must_use]
    pub fn target_root(&self) -> &Path {
        self.target_root.as_deref().unwrap_or(&self.books_root)
    }

    /// Keep only the normal components of the stored folder,
    /// so a folder can never point outside of the root it is joined to.
    fn relative_folder(entry: &LibraryEntry) -> PathBuf {
        entry
            .folder
            .components()
            .filter(|component| matches!(component, std::path::Component::Normal(_)))
            .collect()
    }
}

impl PathResolver for LayoutPathResolver {
    fn resolve_legacy_path(&self, entry: &LibraryEntry, extension: &str) -> Option<PathBuf> {
        let directory = entry.primary_artifact.as_deref()?.parent()?;
        Some(artifact_file_path(directory, &entry.file_stem, extension))
    }

    fn resolve_fallback_path(&self, entry: &LibraryEntry, extension: &str) -> PathBuf {
        let directory = self.books_root.join(Self::relative_folder(entry));
        artifact_file_path(&directory, &entry.file_stem, extension)
    }

    fn resolve_target_path(&self, entry: &LibraryEntry, extension: &str) -> PathBuf {
        let directory = self.target_root().join(Self::relative_folder(entry));
        artifact_file_path(&directory, &entry.file_stem, extension)
    }
}
