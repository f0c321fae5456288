use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use colored::Colorize;
use serde::Serialize;

/// One catalog item that may own a sidecar artifact.
///
/// Entries are read from the catalog and never modified during a migration run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibraryEntry {
    /// Stable product identifier.
    pub product_id: String,
    /// Display title used in progress and error messages.
    pub title: String,
    /// Folder of the book relative to the library root, for example `Author/Title`.
    pub folder: PathBuf,
    /// Artifact file name without extension.
    pub file_stem: String,
    /// Absolute path of the primary artifact (the audio file), if it is on disk.
    pub primary_artifact: Option<PathBuf>,
    /// The entry is expected to have a sidecar artifact.
    pub has_artifact: bool,
    /// The sidecar artifact has previously been verified to be present.
    pub artifact_verified: bool,
}

/// Per-entry view built by the orchestrator while processing one candidate.
#[derive(Debug, Clone)]
pub struct MigrationCandidate<'a> {
    pub entry: &'a LibraryEntry,
    /// Where the artifact currently is. `None` means it was not found and the entry is skipped.
    pub current_path: Option<PathBuf>,
    pub target_path: Option<PathBuf>,
}

/// Why a candidate was left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No artifact exists at any of the legacy locations.
    NotFound,
    /// The current location already is the target location.
    AlreadyInPlace,
    /// The artifact only exists at the target location.
    AlreadyMigrated,
}

/// What happened to the artifact of a migrated entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum MigrateAction {
    /// Moved to an unoccupied target.
    Moved,
    /// Target already had identical content so the source was removed.
    RemovedDuplicate,
    /// Target had different content which was renamed to the backup path before moving.
    ReplacedWithBackup { backup: PathBuf },
}

/// Result of processing a single candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum MigrationOutcome {
    Migrated {
        action: MigrateAction,
        source: PathBuf,
        target: PathBuf,
    },
    Skipped {
        reason: SkipReason,
    },
    Failed {
        error: String,
    },
}

/// Outcome of one entry, in processing order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryOutcome {
    pub product_id: String,
    pub title: String,
    pub outcome: MigrationOutcome,
}

/// Statistics and error details for a whole batch run.
///
/// Only the orchestrator can modify a report.
/// Once returned from a run it is a read-only value.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MigrationReport {
    total: usize,
    migrated: usize,
    skipped: usize,
    failed: usize,
    errors: Vec<String>,
    outcomes: Vec<EntryOutcome>,
    dryrun: bool,
    duration: Duration,
}

/// Point-in-time progress of a batch run sent to observers after every candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    pub total: usize,
    pub processed: usize,
    pub current_item: Option<String>,
    pub errors_so_far: usize,
}

/// Lifecycle of one orchestrator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchState {
    #[default]
    NotStarted,
    Running,
    Completed,
}

/// Receives progress snapshots while a batch is running.
///
/// Called synchronously on the task running the batch,
/// so implementations must return quickly and hand the snapshot off to their own thread if needed.
pub trait ProgressObserver: Send {
    fn on_progress(&self, snapshot: &ProgressSnapshot);
}

impl LibraryEntry {
    /// Create an entry that expects a previously verified sidecar artifact.
    #[must_use]
    pub fn new(
        product_id: impl Into<String>,
        title: impl Into<String>,
        folder: impl Into<PathBuf>,
        file_stem: impl Into<String>,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            title: title.into(),
            folder: folder.into(),
            file_stem: file_stem.into(),
            primary_artifact: None,
            has_artifact: true,
            artifact_verified: true,
        }
    }

    /// Set the path of the primary artifact the sidecar was stored next to.
    #[must_use]
    pub fn with_primary_artifact(mut self, path: impl Into<PathBuf>) -> Self {
        self.primary_artifact = Some(path.into());
        self
    }

    /// True if this entry should be considered for relocation.
    #[must_use]
    pub const fn is_migration_candidate(&self) -> bool {
        self.has_artifact && self.artifact_verified
    }
}

impl<'a> MigrationCandidate<'a> {
    pub(crate) const fn new(entry: &'a LibraryEntry) -> Self {
        Self {
            entry,
            current_path: None,
            target_path: None,
        }
    }

    /// Current and target path once the artifact has been found and its target computed.
    #[must_use]
    pub fn resolved_paths(&self) -> Option<(&Path, &Path)> {
        Some((self.current_path.as_deref()?, self.target_path.as_deref()?))
    }
}

impl MigrationOutcome {
    #[must_use]
    pub const fn is_migrated(&self) -> bool {
        matches!(self, Self::Migrated { .. })
    }

    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }

    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Human-readable description of the outcome.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::Migrated { action, source, target } => match action {
                MigrateAction::Moved => format!("moved {} -> {}", source.display(), target.display()),
                MigrateAction::RemovedDuplicate => format!(
                    "identical file already at {}, removed {}",
                    target.display(),
                    source.display()
                ),
                MigrateAction::ReplacedWithBackup { backup } => format!(
                    "moved {} -> {}, previous file kept as {}",
                    source.display(),
                    target.display(),
                    backup.display()
                ),
            },
            Self::Skipped { reason } => reason.to_string(),
            Self::Failed { error } => error.clone(),
        }
    }
}

impl MigrationReport {
    pub(crate) fn new(dryrun: bool) -> Self {
        Self {
            dryrun,
            ..Self::default()
        }
    }

    pub(crate) const fn set_total(&mut self, total: usize) {
        self.total = total;
    }

    pub(crate) const fn set_duration(&mut self, duration: Duration) {
        self.duration = duration;
    }

    /// Record the outcome for one entry and update the counters.
    pub(crate) fn record(&mut self, entry: &LibraryEntry, outcome: MigrationOutcome) {
        match &outcome {
            MigrationOutcome::Migrated { .. } => self.migrated += 1,
            MigrationOutcome::Skipped { .. } => self.skipped += 1,
            MigrationOutcome::Failed { error } => {
                self.failed += 1;
                self.errors.push(error.clone());
            }
        }
        self.outcomes.push(EntryOutcome {
            product_id: entry.product_id.clone(),
            title: entry.title.clone(),
            outcome,
        });
    }

    /// Add a batch-level error that is not tied to a single entry.
    pub(crate) fn add_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    /// Number of candidates considered.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.total
    }

    #[must_use]
    pub const fn migrated(&self) -> usize {
        self.migrated
    }

    #[must_use]
    pub const fn skipped(&self) -> usize {
        self.skipped
    }

    #[must_use]
    pub const fn failed(&self) -> usize {
        self.failed
    }

    /// All error messages in the order they occurred.
    #[must_use]
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Per-entry outcomes in catalog order.
    #[must_use]
    pub fn outcomes(&self) -> &[EntryOutcome] {
        &self.outcomes
    }

    #[must_use]
    pub const fn is_dryrun(&self) -> bool {
        self.dryrun
    }

    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }

    /// Product ids of the entries whose artifact now lives at the target location.
    pub fn migrated_product_ids(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.outcome.is_migrated())
            .map(|outcome| outcome.product_id.as_str())
    }

    /// Error lines for display: the first `limit` errors and a count of the rest.
    #[must_use]
    pub fn error_summary(&self, limit: usize) -> Vec<String> {
        let mut lines: Vec<String> = self.errors.iter().take(limit).cloned().collect();
        if self.errors.len() > limit {
            lines.push(format!("... and {} more", self.errors.len() - limit));
        }
        lines
    }

    pub fn print_summary(&self, error_limit: usize) {
        let title = if self.dryrun {
            "\n--- Migration Summary (dry run) ---"
        } else {
            "\n--- Migration Summary ---"
        };
        println!("{}", title.bold().magenta());
        println!("Total:                  {}", self.total);
        println!("Successfully migrated:  {}", self.migrated);
        println!("Skipped:                {}", self.skipped);
        println!(
            "Failed:                 {}",
            if self.failed > 0 {
                self.failed.to_string().red()
            } else {
                "0".normal()
            }
        );
        println!("Total time:             {}", crate::format_duration(self.duration));

        if !self.errors.is_empty() {
            println!("\n{}", "Errors:".red().bold());
            for line in self.error_summary(error_limit) {
                println!("  {line}");
            }
        }
    }
}

impl ProgressSnapshot {
    pub(crate) const fn new(total: usize) -> Self {
        Self {
            total,
            processed: 0,
            current_item: None,
            errors_so_far: 0,
        }
    }
}

impl ProgressObserver for tokio::sync::mpsc::UnboundedSender<ProgressSnapshot> {
    fn on_progress(&self, snapshot: &ProgressSnapshot) {
        // Receiver dropped means nobody is listening anymore
        let _ = self.send(snapshot.clone());
    }
}

impl ProgressObserver for std::sync::mpsc::Sender<ProgressSnapshot> {
    fn on_progress(&self, snapshot: &ProgressSnapshot) {
        let _ = self.send(snapshot.clone());
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not found on disk"),
            Self::AlreadyInPlace => write!(f, "already in correct location"),
            Self::AlreadyMigrated => write!(f, "already migrated to target location"),
        }
    }
}

impl fmt::Display for MigrationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self {
            Self::Migrated { .. } => "MIGRATED",
            Self::Skipped { .. } => "SKIPPED",
            Self::Failed { .. } => "FAILED",
        };
        write!(f, "{status}: {}", self.detail())
    }
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not started"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// Display label for an entry, falling back to the product id for untitled entries.
pub(crate) fn entry_label(entry: &LibraryEntry) -> String {
    if entry.title.trim().is_empty() {
        entry.product_id.clone()
    } else {
        entry.title.clone()
    }
}

/// Join a file stem and extension into a file name inside `dir`.
pub(crate) fn artifact_file_path(dir: &Path, file_stem: &str, extension: &str) -> PathBuf {
    let extension = extension.trim_start_matches('.');
    if extension.is_empty() {
        dir.join(file_stem)
    } else {
        dir.join(format!("{file_stem}.{extension}"))
    }
}
