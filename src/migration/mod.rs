//! Bulk relocation of sidecar artifacts.
//!
//! Moves the sidecar files of every catalog entry from the legacy location
//! next to the primary artifact into a separately configured target root,
//! keeping the relative folder structure of the library.

mod conflict;
mod duplicate;
mod error;
mod locator;
mod orchestrator;
mod prune;
mod types;

pub use conflict::{Conflict, backup_path, backup_path_at, resolve_conflict};
pub use duplicate::{COMPARE_CHUNK_SIZE, files_are_identical};
pub use error::MigrationError;
pub use locator::ArtifactLocator;
pub use orchestrator::{DEFAULT_EXTENSIONS, MigrationConfig, MigrationOrchestrator};
pub use prune::{PruneResult, prune_empty_directories};
pub use types::{
    BatchState, EntryOutcome, LibraryEntry, MigrateAction, MigrationCandidate, MigrationOutcome, MigrationReport,
    ProgressObserver, ProgressSnapshot, SkipReason,
};

pub(crate) use types::{artifact_file_path, entry_label};
