//! Find where the sidecar artifact of an entry currently lives.

use std::path::{Path, PathBuf};

use crate::migration::LibraryEntry;
use crate::paths::PathResolver;

/// Looks up the current on-disk location of sidecar artifacts.
///
/// Only performs read-only existence checks.
pub struct ArtifactLocator<'a, R: PathResolver + ?Sized> {
    resolver: &'a R,
    extensions: &'a [String],
}

impl<'a, R: PathResolver + ?Sized> ArtifactLocator<'a, R> {
    /// Create a locator probing the given extension variants in order.
    pub const fn new(resolver: &'a R, extensions: &'a [String]) -> Self {
        Self { resolver, extensions }
    }

    /// Find the artifact next to the primary artifact, or in the fallback root.
    ///
    /// Returns the first existing file, trying every extension variant for the
    /// legacy location before moving on to the fallback location.
    pub async fn locate(&self, entry: &LibraryEntry) -> Option<PathBuf> {
        for extension in self.extensions {
            if let Some(path) = self.resolver.resolve_legacy_path(entry, extension)
                && is_existing_file(&path).await
            {
                return Some(path);
            }
        }

        for extension in self.extensions {
            let path = self.resolver.resolve_fallback_path(entry, extension);
            if is_existing_file(&path).await {
                return Some(path);
            }
        }

        None
    }

    /// Find an artifact that already exists at the target location.
    pub async fn locate_at_target(&self, entry: &LibraryEntry) -> Option<PathBuf> {
        for extension in self.extensions {
            let path = self.resolver.resolve_target_path(entry, extension);
            if is_existing_file(&path).await {
                return Some(path);
            }
        }
        None
    }
}

/// Check that the path exists and is a regular file.
/// Any error while reading metadata counts as not existing.
pub(crate) async fn is_existing_file(path: &Path) -> bool {
    tokio::fs::metadata(path).await.is_ok_and(|metadata| metadata.is_file())
}
