use std::fs;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;

use crate::migration::{LibraryEntry, MigrationConfig, MigrationOutcome, MigrationReport};

/// Audit log for migration runs with buffered writes.
///
/// Every entry is flushed immediately so the log stays useful if the process is interrupted.
/// Write failures are ignored since logging must never fail a migration.
pub struct FileLogger {
    writer: BufWriter<File>,
    path: PathBuf,
}

impl FileLogger {
    /// Create a new file logger, writing to `~/logs/sidecar-relocate/pdfmigrate_<timestamp>.log`
    pub fn new() -> Result<Self> {
        let log_dir = crate::config::LOG_DIR
            .as_deref()
            .context("Failed to get home directory")?;
        Self::new_in(log_dir)
    }

    /// Create a new file logger in the given directory.
    pub fn new_in(log_dir: &Path) -> Result<Self> {
        if !log_dir.exists() {
            fs::create_dir_all(log_dir).context("Failed to create log directory")?;
        }

        let path = log_dir.join(format!("pdfmigrate_{}.log", Local::now().format("%Y-%m-%d_%H-%M-%S")));

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to create log file: {}", path.display()))?;

        Ok(Self {
            writer: BufWriter::new(file),
            path,
        })
    }

    /// Path of the log file being written.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn timestamp() -> String {
        Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
    }

    /// Log the configuration at the start of a run.
    pub fn log_init(&mut self, config: &MigrationConfig) {
        let _ = writeln!(
            self.writer,
            "[{}] INIT \"{}\"",
            Self::timestamp(),
            config.boundary_root.display()
        );
        let _ = writeln!(
            self.writer,
            "  target: {}",
            config
                .configured_target_root()
                .map_or_else(|| "<not configured>".to_string(), |path| path.display().to_string())
        );
        let _ = writeln!(self.writer, "  extensions: {:?}", config.extensions);
        let _ = writeln!(self.writer, "  dryrun: {}", config.dryrun);
        let _ = self.writer.flush();
    }

    /// Log the outcome of one entry.
    pub fn log_outcome(&mut self, entry: &LibraryEntry, outcome: &MigrationOutcome) {
        let level = match outcome {
            MigrationOutcome::Migrated { .. } => "MIGRATED",
            MigrationOutcome::Skipped { .. } => "SKIPPED ",
            MigrationOutcome::Failed { .. } => "FAILED  ",
        };
        let _ = writeln!(
            self.writer,
            "[{}] {level} {} \"{}\" | {}",
            Self::timestamp(),
            entry.product_id,
            entry.title,
            outcome.detail()
        );
        let _ = self.writer.flush();
    }

    /// Log a directory removed after its last file was moved out.
    pub fn log_prune(&mut self, directory: &Path) {
        let _ = writeln!(
            self.writer,
            "[{}] PRUNE    \"{}\"",
            Self::timestamp(),
            directory.display()
        );
        let _ = self.writer.flush();
    }

    pub fn log_warning(&mut self, message: &str) {
        let _ = writeln!(self.writer, "[{}] WARN     {message}", Self::timestamp());
        let _ = self.writer.flush();
    }

    /// Log final statistics.
    pub fn log_report(&mut self, report: &MigrationReport) {
        let _ = writeln!(self.writer, "[{}] STATISTICS", Self::timestamp());
        let _ = writeln!(self.writer, "  Total:    {}", report.total());
        let _ = writeln!(self.writer, "  Migrated: {}", report.migrated());
        let _ = writeln!(self.writer, "  Skipped:  {}", report.skipped());
        let _ = writeln!(self.writer, "  Failed:   {}", report.failed());
        for error in report.errors() {
            let _ = writeln!(self.writer, "  Error: {error}");
        }
        let _ = writeln!(
            self.writer,
            "  Total time: {}",
            crate::format_duration(report.duration())
        );
        let _ = writeln!(self.writer, "[{}] END", Self::timestamp());
        let _ = self.writer.flush();
    }
}
