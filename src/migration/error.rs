use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while relocating sidecar artifacts.
///
/// Only `ConfigurationMissing` and `Catalog` end a batch early.
/// Everything else is recorded against a single entry.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Target directory is not configured. Configure it before migrating.")]
    ConfigurationMissing,

    #[error("Failed to query catalog: {0:#}")]
    Catalog(anyhow::Error),

    #[error("Failed to {operation} {}: {source}", path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to compare {} with {}: {source}", source_path.display(), target_path.display())]
    Comparison {
        source_path: PathBuf,
        target_path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to remove empty directory {}: {source}", path.display())]
    Prune {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl MigrationError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}
