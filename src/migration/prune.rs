//! Removal of directories left empty after moving a file out of them.

use std::io;
use std::path::{Path, PathBuf};

use crate::migration::MigrationError;

/// Directories removed by a prune, and the error that stopped it early, if any.
#[derive(Debug, Default)]
pub struct PruneResult {
    pub removed: Vec<PathBuf>,
    pub error: Option<MigrationError>,
}

/// Remove empty directories starting from the parent of `vacated_file`, walking upwards.
///
/// Stops at the first directory that is not empty, is the boundary root itself,
/// or lies outside the boundary root. Paths are compared ignoring case.
/// This is best-effort cleanup: errors end the walk and are returned for logging,
/// they never fail the move that preceded it.
pub async fn prune_empty_directories(vacated_file: &Path, boundary_root: &Path) -> PruneResult {
    let mut result = PruneResult::default();
    let mut current = vacated_file.parent().map(Path::to_path_buf);

    while let Some(directory) = current {
        if !crate::is_strictly_inside_ignore_case(&directory, boundary_root) {
            break;
        }

        match is_directory_empty(&directory).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(error) => {
                if error.kind() != io::ErrorKind::NotFound {
                    result.error = Some(MigrationError::Prune {
                        path: directory,
                        source: error,
                    });
                }
                break;
            }
        }

        if let Err(error) = tokio::fs::remove_dir(&directory).await {
            result.error = Some(MigrationError::Prune {
                path: directory,
                source: error,
            });
            break;
        }

        current = directory.parent().map(Path::to_path_buf);
        result.removed.push(directory);
    }

    result
}

/// Check if directory contains no files or subdirectories.
async fn is_directory_empty(directory: &Path) -> io::Result<bool> {
    let mut entries = tokio::fs::read_dir(directory).await?;
    Ok(entries.next_entry().await?.is_none())
}
