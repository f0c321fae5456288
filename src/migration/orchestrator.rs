use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::catalog::Catalog;
use crate::logger::FileLogger;
use crate::migration::conflict::{Conflict, backup_path, resolve_conflict};
use crate::migration::{
    ArtifactLocator, BatchState, LibraryEntry, MigrateAction, MigrationCandidate, MigrationError, MigrationOutcome,
    MigrationReport, ProgressObserver, ProgressSnapshot, PruneResult, SkipReason, entry_label, prune_empty_directories,
};
use crate::paths::PathResolver;

/// Extension variants probed for each entry, in order.
pub const DEFAULT_EXTENSIONS: [&str; 2] = ["pdf", "PDF"];

/// Suffix of the temporary file used when a move has to copy across filesystems.
const PARTIAL_SUFFIX: &str = "partial";

/// Settings for one migration batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationConfig {
    /// Root the artifacts are moved into. `None` or blank means not configured.
    pub target_root: Option<PathBuf>,
    /// Library root. Directories are never pruned at or above this path.
    pub boundary_root: PathBuf,
    /// File extension variants to look for.
    pub extensions: Vec<String>,
    /// Compute every decision without touching the filesystem.
    pub dryrun: bool,
}

impl MigrationConfig {
    #[must_use]
    pub fn new(boundary_root: PathBuf, target_root: Option<PathBuf>) -> Self {
        Self {
            target_root,
            boundary_root,
            extensions: DEFAULT_EXTENSIONS.iter().map(ToString::to_string).collect(),
            dryrun: false,
        }
    }

    /// Use the given extension variants instead of the defaults.
    /// An empty list keeps the current extensions.
    #[must_use]
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        let extensions: Vec<String> = extensions
            .into_iter()
            .map(|extension| extension.trim().trim_start_matches('.').to_string())
            .filter(|extension| !extension.is_empty())
            .collect();
        if !extensions.is_empty() {
            self.extensions = extensions;
        }
        self
    }

    #[must_use]
    pub const fn with_dryrun(mut self, dryrun: bool) -> Self {
        self.dryrun = dryrun;
        self
    }

    /// Target root if one is configured.
    #[must_use]
    pub fn configured_target_root(&self) -> Option<&Path> {
        self.target_root
            .as_deref()
            .filter(|path| !crate::path_to_string(path).trim().is_empty())
    }
}

/// Drives a migration batch over all catalog entries with a verified sidecar artifact.
///
/// Entries are processed one at a time in catalog order.
/// A failure for one entry is recorded in the report and the batch continues with the next entry.
pub struct MigrationOrchestrator<C: Catalog, R: PathResolver> {
    catalog: C,
    resolver: R,
    config: MigrationConfig,
    observer: Option<Box<dyn ProgressObserver>>,
    logger: Option<FileLogger>,
    state: BatchState,
}

impl<C: Catalog, R: PathResolver> MigrationOrchestrator<C, R> {
    pub const fn new(catalog: C, resolver: R, config: MigrationConfig) -> Self {
        Self {
            catalog,
            resolver,
            config,
            observer: None,
            logger: None,
            state: BatchState::NotStarted,
        }
    }

    /// Send a progress snapshot to the observer after each processed entry.
    #[must_use]
    pub fn with_observer(mut self, observer: impl ProgressObserver + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Write an audit log of the run.
    #[must_use]
    pub fn with_logger(mut self, logger: FileLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    #[must_use]
    pub const fn state(&self) -> BatchState {
        self.state
    }

    /// Consume the orchestrator and return the catalog.
    /// Drops the observer, which closes a progress channel.
    #[must_use]
    pub fn into_catalog(self) -> C {
        self.catalog
    }

    /// Run the whole batch and return the final report.
    ///
    /// Never fails: a missing target configuration or a catalog error ends the batch early
    /// with the error recorded in the report.
    ///
    /// The catalog query is synchronous and runs on the calling task before the first entry.
    /// File operations await on `tokio::fs` one entry at a time.
    pub async fn run(&mut self) -> MigrationReport {
        let start = Instant::now();
        self.state = BatchState::Running;

        let mut report = MigrationReport::new(self.config.dryrun);
        if let Some(logger) = self.logger.as_mut() {
            logger.log_init(&self.config);
        }

        match self.run_batch(&mut report).await {
            Ok(()) => {}
            Err(error @ MigrationError::ConfigurationMissing) => {
                self.log_warning(&error.to_string());
                report.add_error(error.to_string());
            }
            Err(error) => {
                let message = format!("Migration failed: {error}");
                self.log_warning(&message);
                report.add_error(message);
            }
        }

        report.set_duration(start.elapsed());
        if let Some(logger) = self.logger.as_mut() {
            logger.log_report(&report);
        }
        self.state = BatchState::Completed;
        report
    }

    async fn run_batch(&mut self, report: &mut MigrationReport) -> Result<(), MigrationError> {
        if self.config.configured_target_root().is_none() {
            return Err(MigrationError::ConfigurationMissing);
        }

        let entries: Vec<LibraryEntry> = self
            .catalog
            .list_entries_with_verified_artifact()
            .map_err(MigrationError::Catalog)?
            .into_iter()
            .filter(LibraryEntry::is_migration_candidate)
            .collect();

        report.set_total(entries.len());
        let mut snapshot = ProgressSnapshot::new(entries.len());

        for entry in &entries {
            snapshot.current_item = Some(entry_label(entry));

            let outcome = self.migrate_entry(entry).await;
            if let Some(logger) = self.logger.as_mut() {
                logger.log_outcome(entry, &outcome);
            }
            report.record(entry, outcome);

            snapshot.processed += 1;
            snapshot.errors_so_far = report.failed();
            if let Some(observer) = &self.observer {
                observer.on_progress(&snapshot);
            }
        }

        Ok(())
    }

    /// Process a single entry, converting any error to a failed outcome.
    async fn migrate_entry(&mut self, entry: &LibraryEntry) -> MigrationOutcome {
        match self.try_migrate_entry(entry).await {
            Ok(outcome) => outcome,
            Err(error) => MigrationOutcome::Failed {
                error: format!("Failed to migrate '{}': {error}", entry_label(entry)),
            },
        }
    }

    async fn try_migrate_entry(&mut self, entry: &LibraryEntry) -> Result<MigrationOutcome, MigrationError> {
        let locator = ArtifactLocator::new(&self.resolver, &self.config.extensions);

        let mut candidate = MigrationCandidate::new(entry);
        candidate.current_path = locator.locate(entry).await;
        // Keep the extension variant the file actually has
        candidate.target_path = candidate.current_path.as_deref().map(|source| {
            self.resolver
                .resolve_target_path(entry, &crate::path_to_file_extension_string(source))
        });

        let Some((source, target)) = candidate.resolved_paths() else {
            let reason = if locator.locate_at_target(entry).await.is_some() {
                SkipReason::AlreadyMigrated
            } else {
                SkipReason::NotFound
            };
            return Ok(MigrationOutcome::Skipped { reason });
        };

        if crate::paths_equal_ignore_case(source, target) {
            return Ok(MigrationOutcome::Skipped {
                reason: SkipReason::AlreadyInPlace,
            });
        }

        let action = self.relocate(&candidate, source, target).await?;
        if !self.config.dryrun {
            self.prune_vacated(source).await;
        }

        Ok(MigrationOutcome::Migrated {
            action,
            source: source.to_path_buf(),
            target: target.to_path_buf(),
        })
    }

    /// Move the artifact to the target, resolving an occupied destination first.
    ///
    /// Target directories are only created when the destination is free,
    /// and the ones created here are removed again if the move fails.
    async fn relocate(
        &mut self,
        candidate: &MigrationCandidate<'_>,
        source: &Path,
        target: &Path,
    ) -> Result<MigrateAction, MigrationError> {
        let dryrun = self.config.dryrun;

        let conflict = resolve_conflict(source, target)
            .await
            .map_err(|error| MigrationError::Comparison {
                source_path: source.to_path_buf(),
                target_path: target.to_path_buf(),
                source: error,
            })?;

        match conflict {
            Conflict::NoConflict => {
                if !dryrun {
                    let created = create_parent_directory(target).await?;
                    if let Err(error) = move_file(source, target).await {
                        if let Some(created) = created {
                            self.remove_created_directories(target, &created).await;
                        }
                        return Err(error);
                    }
                }
                Ok(MigrateAction::Moved)
            }
            Conflict::Identical => {
                if !dryrun {
                    tokio::fs::remove_file(source)
                        .await
                        .map_err(|error| MigrationError::io("delete", source, error))?;
                }
                Ok(MigrateAction::RemovedDuplicate)
            }
            Conflict::Different => {
                let backup = backup_path(target);
                if !dryrun {
                    replace_with_backup(source, target, &backup, self.logger.as_mut()).await?;
                    self.log_warning(&format!(
                        "Existing file for '{}' kept as backup: {}",
                        entry_label(candidate.entry),
                        backup.display()
                    ));
                }
                Ok(MigrateAction::ReplacedWithBackup { backup })
            }
        }
    }

    /// Remove the empty directories between `target` and the topmost directory created for it.
    async fn remove_created_directories(&mut self, target: &Path, created: &Path) {
        let Some(existing) = created.parent() else {
            return;
        };
        let result = prune_empty_directories(target, existing).await;
        self.log_prune_result(&result);
    }

    /// Remove the directories left empty by moving the artifact out of them.
    async fn prune_vacated(&mut self, source: &Path) {
        let result = prune_empty_directories(source, &self.config.boundary_root).await;
        self.log_prune_result(&result);
    }

    /// Prune failures are only logged, they never fail the entry.
    fn log_prune_result(&mut self, result: &PruneResult) {
        if let Some(logger) = self.logger.as_mut() {
            for directory in &result.removed {
                logger.log_prune(directory);
            }
            if let Some(error) = &result.error {
                logger.log_warning(&error.to_string());
            }
        }
    }

    fn log_warning(&mut self, message: &str) {
        if let Some(logger) = self.logger.as_mut() {
            logger.log_warning(message);
        }
    }
}

/// Create the parent directory of `target`.
///
/// Returns the topmost directory that did not exist before, if any.
async fn create_parent_directory(target: &Path) -> Result<Option<PathBuf>, MigrationError> {
    let Some(parent) = target.parent() else {
        return Ok(None);
    };

    let mut created = None;
    let mut current = Some(parent);
    while let Some(directory) = current {
        if tokio::fs::try_exists(directory).await.unwrap_or(false) {
            break;
        }
        created = Some(directory.to_path_buf());
        current = directory.parent();
    }

    tokio::fs::create_dir_all(parent)
        .await
        .map_err(|error| MigrationError::io("create directory", parent, error))?;

    Ok(created)
}

/// Rename the existing target to `backup` and move the source into its place.
///
/// If the move fails the backup is renamed back to the target.
async fn replace_with_backup(
    source: &Path,
    target: &Path,
    backup: &Path,
    logger: Option<&mut FileLogger>,
) -> Result<(), MigrationError> {
    tokio::fs::rename(target, backup)
        .await
        .map_err(|error| MigrationError::io("back up", target, error))?;

    if let Err(error) = move_file(source, target).await {
        if let Err(restore_error) = tokio::fs::rename(backup, target).await
            && let Some(logger) = logger
        {
            logger.log_warning(&format!(
                "Failed to restore backup {} to {}: {restore_error}",
                backup.display(),
                target.display()
            ));
        }
        return Err(error);
    }

    Ok(())
}

/// Move a file, copying it when source and target are on different filesystems.
pub(crate) async fn move_file(source: &Path, target: &Path) -> Result<(), MigrationError> {
    match tokio::fs::rename(source, target).await {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == io::ErrorKind::CrossesDevices => copy_and_remove(source, target).await,
        Err(error) => Err(MigrationError::io("move", source, error)),
    }
}

/// Copy to a temporary file next to the target, rename it into place, then remove the source.
/// A partially written copy is removed on failure.
async fn copy_and_remove(source: &Path, target: &Path) -> Result<(), MigrationError> {
    let partial = partial_path(target);

    if let Err(error) = tokio::fs::copy(source, &partial).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(MigrationError::io("copy", source, error));
    }

    if let Err(error) = tokio::fs::rename(&partial, target).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(MigrationError::io("move", &partial, error));
    }

    tokio::fs::remove_file(source)
        .await
        .map_err(|error| MigrationError::io("delete", source, error))
}

fn partial_path(target: &Path) -> PathBuf {
    let name = crate::path_to_filename_string(target);
    target.with_file_name(format!("{name}.{PARTIAL_SUFFIX}"))
}

#[cfg(test)]
mod orchestrator_tests {
    use super::*;

    use std::fs;
    use std::sync::mpsc;

    use tempfile::TempDir;

    use crate::paths::LayoutPathResolver;

    struct Library {
        _temp_dir: TempDir,
        books: PathBuf,
        pdfs: PathBuf,
    }

    impl Library {
        fn new() -> Self {
            let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
            let books = temp_dir.path().join("Books");
            let pdfs = temp_dir.path().join("PDFs");
            fs::create_dir_all(&books).expect("Failed to create books dir");
            Self {
                _temp_dir: temp_dir,
                books,
                pdfs,
            }
        }

        /// Entry with the audio and the artifact stored in `Books/<folder>`.
        fn add_book(&self, id: &str, folder: &str, stem: &str, content: &[u8]) -> LibraryEntry {
            let directory = self.books.join(folder);
            fs::create_dir_all(&directory).expect("Failed to create book dir");
            fs::write(directory.join(format!("{stem}.m4b")), b"audio").expect("Failed to write audio");
            fs::write(directory.join(format!("{stem}.pdf")), content).expect("Failed to write pdf");
            LibraryEntry::new(id, stem, folder, stem).with_primary_artifact(directory.join(format!("{stem}.m4b")))
        }

        fn orchestrator(
            &self,
            entries: Vec<LibraryEntry>,
        ) -> MigrationOrchestrator<Vec<LibraryEntry>, LayoutPathResolver> {
            let resolver = LayoutPathResolver::new(self.books.clone(), Some(self.pdfs.clone()));
            let config = MigrationConfig::new(self.books.clone(), Some(self.pdfs.clone()));
            MigrationOrchestrator::new(entries, resolver, config)
        }
    }

    struct FailingCatalog;

    impl Catalog for FailingCatalog {
        fn list_entries_with_verified_artifact(&self) -> anyhow::Result<Vec<LibraryEntry>> {
            anyhow::bail!("database is locked")
        }
    }

    #[tokio::test]
    async fn moves_artifact_to_target() {
        let library = Library::new();
        let entry = library.add_book("B1", "Author/Title", "Book", b"pdf content");
        let mut orchestrator = library.orchestrator(vec![entry]);

        assert_eq!(orchestrator.state(), BatchState::NotStarted);
        let report = orchestrator.run().await;

        assert_eq!(orchestrator.state(), BatchState::Completed);
        assert_eq!((report.migrated(), report.skipped(), report.failed()), (1, 0, 0));
        let target = library.pdfs.join("Author/Title/Book.pdf");
        assert_eq!(fs::read(&target).expect("target should exist"), b"pdf content");
        assert!(!library.books.join("Author/Title/Book.pdf").exists());
        // Audio file keeps the directory alive
        assert!(library.books.join("Author/Title/Book.m4b").exists());
    }

    #[tokio::test]
    async fn keeps_uppercase_extension() {
        let library = Library::new();
        let directory = library.books.join("Author/Title");
        fs::create_dir_all(&directory).expect("Failed to create dir");
        fs::write(directory.join("Book.PDF"), b"pdf").expect("Failed to write pdf");
        let entry = LibraryEntry::new("B1", "Book", "Author/Title", "Book");

        let report = library.orchestrator(vec![entry]).run().await;

        assert_eq!(report.migrated(), 1);
        assert!(library.pdfs.join("Author/Title/Book.PDF").exists());
    }

    #[tokio::test]
    async fn not_found_is_skipped() {
        let library = Library::new();
        let entry = LibraryEntry::new("B1", "Missing", "Author/Missing", "Missing");

        let report = library.orchestrator(vec![entry]).run().await;

        assert_eq!((report.migrated(), report.skipped(), report.failed()), (0, 1, 0));
        assert_eq!(
            report.outcomes()[0].outcome,
            MigrationOutcome::Skipped {
                reason: SkipReason::NotFound
            }
        );
        assert!(!library.pdfs.exists());
    }

    #[tokio::test]
    async fn same_location_is_skipped() {
        let library = Library::new();
        let entry = library.add_book("B1", "Author/Title", "Book", b"pdf");
        let resolver = LayoutPathResolver::new(library.books.clone(), Some(library.books.clone()));
        let config = MigrationConfig::new(library.books.clone(), Some(library.books.clone()));
        let mut orchestrator = MigrationOrchestrator::new(vec![entry], resolver, config);

        let report = orchestrator.run().await;

        assert_eq!(
            report.outcomes()[0].outcome,
            MigrationOutcome::Skipped {
                reason: SkipReason::AlreadyInPlace
            }
        );
        assert!(library.books.join("Author/Title/Book.pdf").exists());
    }

    #[tokio::test]
    async fn identical_target_removes_source() {
        let library = Library::new();
        let entry = library.add_book("B1", "Author/Title", "Book", b"same");
        let target = library.pdfs.join("Author/Title/Book.pdf");
        fs::create_dir_all(target.parent().expect("parent")).expect("Failed to create dir");
        fs::write(&target, b"same").expect("Failed to write target");

        let report = library.orchestrator(vec![entry]).run().await;

        assert_eq!(report.migrated(), 1);
        assert!(matches!(
            &report.outcomes()[0].outcome,
            MigrationOutcome::Migrated {
                action: MigrateAction::RemovedDuplicate,
                ..
            }
        ));
        assert!(!library.books.join("Author/Title/Book.pdf").exists());
        let files: Vec<_> = fs::read_dir(target.parent().expect("parent"))
            .expect("read dir")
            .collect();
        assert_eq!(files.len(), 1, "no backup should be created");
    }

    #[tokio::test]
    async fn different_target_is_backed_up() {
        let library = Library::new();
        let entry = library.add_book("B1", "Author/Title", "Book", b"new content");
        let target = library.pdfs.join("Author/Title/Book.pdf");
        fs::create_dir_all(target.parent().expect("parent")).expect("Failed to create dir");
        fs::write(&target, b"old").expect("Failed to write target");

        let report = library.orchestrator(vec![entry]).run().await;

        let MigrationOutcome::Migrated {
            action: MigrateAction::ReplacedWithBackup { backup },
            ..
        } = &report.outcomes()[0].outcome
        else {
            panic!("unexpected outcome: {:?}", report.outcomes()[0].outcome);
        };
        assert_eq!(fs::read(&target).expect("target"), b"new content");
        assert_eq!(fs::read(backup).expect("backup"), b"old");
        assert!(crate::path_to_filename_string(backup).starts_with("Book_backup_"));
        assert!(!library.books.join("Author/Title/Book.pdf").exists());
    }

    #[tokio::test]
    async fn failure_is_recorded_and_batch_continues() {
        let library = Library::new();
        let broken = library.add_book("B1", "Broken/Title", "Broken", b"pdf");
        let working = library.add_book("B2", "Author/Title", "Working", b"pdf");
        // A file where the target directory should be created
        fs::create_dir_all(&library.pdfs).expect("Failed to create dir");
        fs::write(library.pdfs.join("Broken"), b"not a directory").expect("Failed to write file");

        let report = library.orchestrator(vec![broken, working]).run().await;

        assert_eq!((report.migrated(), report.skipped(), report.failed()), (1, 0, 1));
        assert_eq!(report.errors().len(), 1);
        assert!(
            report.errors()[0].starts_with("Failed to migrate 'Broken': Failed to create directory"),
            "unexpected error: {}",
            report.errors()[0]
        );
        assert!(library.books.join("Broken/Title/Broken.pdf").exists());
        assert!(library.pdfs.join("Author/Title/Working.pdf").exists());
    }

    #[tokio::test]
    async fn unconfigured_target_returns_single_error() {
        let library = Library::new();
        let entry = library.add_book("B1", "Author/Title", "Book", b"pdf");
        let resolver = LayoutPathResolver::new(library.books.clone(), None);
        let config = MigrationConfig::new(library.books.clone(), Some(PathBuf::from("  ")));
        let mut orchestrator = MigrationOrchestrator::new(vec![entry], resolver, config);

        let report = orchestrator.run().await;

        assert_eq!(report.total(), 0);
        assert_eq!(
            report.errors(),
            ["Target directory is not configured. Configure it before migrating.".to_string()]
        );
        assert_eq!(orchestrator.state(), BatchState::Completed);
        assert!(library.books.join("Author/Title/Book.pdf").exists());
    }

    #[tokio::test]
    async fn catalog_failure_is_reported() {
        let library = Library::new();
        let resolver = LayoutPathResolver::new(library.books.clone(), Some(library.pdfs.clone()));
        let config = MigrationConfig::new(library.books.clone(), Some(library.pdfs.clone()));
        let mut orchestrator = MigrationOrchestrator::new(FailingCatalog, resolver, config);

        let report = orchestrator.run().await;

        assert_eq!(report.total(), 0);
        assert_eq!(report.errors().len(), 1);
        assert!(report.errors()[0].starts_with("Migration failed: "));
        assert!(report.errors()[0].contains("database is locked"));
    }

    #[tokio::test]
    async fn dryrun_does_not_touch_filesystem() {
        let library = Library::new();
        let moved = library.add_book("B1", "Author/Title", "Book", b"pdf");
        let replaced = library.add_book("B2", "Author/Other", "Other", b"new");
        let existing = library.pdfs.join("Author/Other/Other.pdf");
        fs::create_dir_all(existing.parent().expect("parent")).expect("Failed to create dir");
        fs::write(&existing, b"old").expect("Failed to write target");

        let mut orchestrator = library.orchestrator(vec![moved, replaced]);
        orchestrator.config.dryrun = true;
        let report = orchestrator.run().await;

        assert!(report.is_dryrun());
        assert_eq!(report.migrated(), 2);
        assert!(library.books.join("Author/Title/Book.pdf").exists());
        assert!(library.books.join("Author/Other/Other.pdf").exists());
        assert!(!library.pdfs.join("Author/Title").exists());
        assert_eq!(fs::read(&existing).expect("target"), b"old");
        assert_eq!(
            fs::read_dir(existing.parent().expect("parent")).expect("read dir").count(),
            1
        );
    }

    #[tokio::test]
    async fn second_run_reports_already_migrated() {
        let library = Library::new();
        let entry = library.add_book("B1", "Author/Title", "Book", b"pdf");

        let first = library.orchestrator(vec![entry.clone()]).run().await;
        let second = library.orchestrator(vec![entry]).run().await;

        assert_eq!(first.migrated(), 1);
        assert_eq!((second.migrated(), second.skipped()), (0, second.total()));
        assert_eq!(
            second.outcomes()[0].outcome,
            MigrationOutcome::Skipped {
                reason: SkipReason::AlreadyMigrated
            }
        );
    }

    #[tokio::test]
    async fn emits_progress_after_each_entry() {
        let library = Library::new();
        let first = library.add_book("B1", "A/One", "One", b"1");
        let second = LibraryEntry::new("B2", "Two", "A/Two", "Two");
        let (sender, receiver) = mpsc::channel();

        let mut orchestrator = library.orchestrator(vec![first, second]).with_observer(sender);
        orchestrator.run().await;
        drop(orchestrator);

        let snapshots: Vec<ProgressSnapshot> = receiver.iter().collect();
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].processed, 1);
        assert_eq!(snapshots[0].current_item.as_deref(), Some("One"));
        assert_eq!(snapshots[1].processed, 2);
        assert_eq!(snapshots[1].total, 2);
        assert_eq!(snapshots[1].errors_so_far, 0);
    }

    #[tokio::test]
    async fn writes_audit_log() {
        let library = Library::new();
        let entry = library.add_book("B1", "Author/Title", "Book", b"pdf");
        fs::remove_file(library.books.join("Author/Title/Book.m4b")).expect("Failed to remove audio");
        let log_dir = library.books.parent().expect("parent").join("logs");
        let logger = FileLogger::new_in(&log_dir).expect("Failed to create logger");
        let log_path = logger.path().to_path_buf();

        let mut orchestrator = library.orchestrator(vec![entry]).with_logger(logger);
        orchestrator.run().await;
        drop(orchestrator);

        let content = fs::read_to_string(log_path).expect("Failed to read log");
        assert!(content.contains("MIGRATED B1"));
        assert!(content.contains("PRUNE"));
        assert!(content.contains("] END"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn prune_failure_is_logged_and_entry_still_migrated() {
        let library = Library::new();
        let linked = library.books.parent().expect("parent").join("Linked");
        fs::create_dir_all(&linked).expect("Failed to create dir");
        fs::write(linked.join("Book.pdf"), b"pdf").expect("Failed to write pdf");
        // A symlinked folder is emptied by the move but cannot be removed with `remove_dir`
        let folder = library.books.join("Author").join("Link");
        fs::create_dir_all(library.books.join("Author")).expect("Failed to create dir");
        std::os::unix::fs::symlink(&linked, &folder).expect("Failed to create symlink");
        let entry =
            LibraryEntry::new("B1", "Book", "Author/Title", "Book").with_primary_artifact(folder.join("Book.m4b"));

        let log_dir = library.books.parent().expect("parent").join("logs");
        let logger = FileLogger::new_in(&log_dir).expect("Failed to create logger");
        let log_path = logger.path().to_path_buf();

        let mut orchestrator = library.orchestrator(vec![entry]).with_logger(logger);
        let report = orchestrator.run().await;
        drop(orchestrator);

        assert_eq!((report.migrated(), report.skipped(), report.failed()), (1, 0, 0));
        assert!(report.errors().is_empty());
        assert!(matches!(
            &report.outcomes()[0].outcome,
            MigrationOutcome::Migrated {
                action: MigrateAction::Moved,
                ..
            }
        ));
        assert!(library.pdfs.join("Author/Title/Book.pdf").exists());
        assert!(folder.exists());

        let content = fs::read_to_string(log_path).expect("Failed to read log");
        let warning = content
            .lines()
            .find(|line| line.contains("WARN"))
            .expect("prune failure should be logged");
        assert!(
            warning.contains(&format!("Failed to remove empty directory {}", folder.display())),
            "unexpected warning: {warning}"
        );
        assert!(content.contains("MIGRATED B1"));
    }

    #[tokio::test]
    async fn failed_move_removes_created_target_directories() {
        let library = Library::new();
        fs::create_dir_all(&library.pdfs).expect("Failed to create dir");
        let entry = LibraryEntry::new("B1", "Book", "Author/Title", "Book");
        let mut candidate = MigrationCandidate::new(&entry);
        candidate.current_path = Some(library.books.join("Author/Title/Book.pdf"));
        candidate.target_path = Some(library.pdfs.join("Author/Title/Book.pdf"));
        let (source, target) = candidate.resolved_paths().expect("paths are set");

        let mut orchestrator = library.orchestrator(Vec::new());
        let result = orchestrator.relocate(&candidate, source, target).await;

        let error = result.expect_err("moving a missing file should fail");
        assert!(error.to_string().starts_with("Failed to move"), "unexpected error: {error}");
        assert!(!library.pdfs.join("Author").exists());
        assert!(library.pdfs.exists(), "existing target root must be kept");
    }

    #[tokio::test]
    async fn failed_move_restores_backup() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let target = dir.path().join("Book.pdf");
        let backup = dir.path().join("Book_backup.pdf");
        fs::write(&target, b"old").expect("Failed to write target");

        let result = replace_with_backup(&dir.path().join("gone.pdf"), &target, &backup, None).await;

        assert!(result.is_err());
        assert_eq!(fs::read(&target).expect("target"), b"old");
        assert!(!backup.exists());
    }

    #[tokio::test]
    async fn copy_and_remove_moves_file() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let source = dir.path().join("source.pdf");
        let target = dir.path().join("target.pdf");
        fs::write(&source, b"content").expect("Failed to write source");

        copy_and_remove(&source, &target).await.expect("copy should succeed");

        assert!(!source.exists());
        assert_eq!(fs::read(&target).expect("target"), b"content");
        assert!(!partial_path(&target).exists());
    }

    #[tokio::test]
    async fn copy_failure_leaves_no_partial_file() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let target = dir.path().join("target.pdf");

        let result = copy_and_remove(&dir.path().join("missing.pdf"), &target).await;

        assert!(result.is_err());
        assert!(!target.exists());
        assert!(!partial_path(&target).exists());
    }

    #[test]
    fn config_extensions() {
        let config = MigrationConfig::new(PathBuf::from("/books"), None);
        assert_eq!(config.extensions, vec!["pdf", "PDF"]);

        let config = config.with_extensions(vec![".epub".to_string(), " ".to_string()]);
        assert_eq!(config.extensions, vec!["epub"]);

        let config = config.with_extensions(Vec::new());
        assert_eq!(config.extensions, vec!["epub"]);
    }

    #[test]
    fn blank_target_is_not_configured() {
        assert!(
            MigrationConfig::new(PathBuf::from("/books"), Some(PathBuf::new()))
                .configured_target_root()
                .is_none()
        );
        assert!(
            MigrationConfig::new(PathBuf::from("/books"), Some(PathBuf::from("/pdfs")))
                .configured_target_root()
                .is_some()
        );
    }
}
