use std::io::{IsTerminal, Write};

use anyhow::{Context, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};

use sidecar_relocate::catalog::LibraryDatabase;
use sidecar_relocate::logger::FileLogger;
use sidecar_relocate::migration::{
    MigrationConfig, MigrationOrchestrator, MigrationOutcome, MigrationReport, ProgressSnapshot,
};
use sidecar_relocate::paths::LayoutPathResolver;
use sidecar_relocate::{print_bold, print_error, print_warning};

use crate::PdfMigrateArgs;
use crate::config::Config;

const PROGRESS_BAR_CHARS: &str = "=>-";
const PROGRESS_BAR_TEMPLATE: &str = "[{elapsed_precise}] {bar:60.magenta/blue} {pos}/{len} {percent}% {wide_msg}";

#[derive(Debug)]
pub struct PdfMigrate {
    config: Config,
}

impl PdfMigrate {
    pub fn new(args: PdfMigrateArgs) -> Self {
        let config = Config::from_args(args);
        if config.verbose {
            eprintln!("Config: {config:#?}");
        }
        Self { config }
    }

    pub async fn run(self) -> Result<()> {
        let Some(target_directory) = self.config.target_directory.clone() else {
            print_warning!(
                "PDFs directory is not configured. Set it with --target or `target_directory` in the [pdfmigrate] section of {}",
                sidecar_relocate::config::CONFIG_PATH
                    .as_deref()
                    .map_or_else(|| "the config file".to_string(), |path| path.display().to_string())
            );
            return Ok(());
        };

        let database = LibraryDatabase::open(&self.config.database)?;

        if !self.config.json {
            print_bold!("Migrate PDFs");
            println!("Books:    {}", self.config.books_directory.display());
            println!("Target:   {}", target_directory.display());
            println!("Database: {}", self.config.database.display());
            if self.config.dryrun {
                println!("{}", "Dry run: no files will be changed".yellow());
            }
        }

        if !self.config.auto && !self.config.dryrun && !Self::confirm(&target_directory.display().to_string())? {
            println!("Cancelled");
            return Ok(());
        }

        let resolver = LayoutPathResolver::new(self.config.books_directory.clone(), Some(target_directory.clone()));
        let migration_config = MigrationConfig::new(self.config.books_directory.clone(), Some(target_directory))
            .with_extensions(self.config.extensions.clone())
            .with_dryrun(self.config.dryrun);

        let (sender, receiver) = unbounded_channel();
        let hide_progress = self.config.json || !std::io::stderr().is_terminal();
        let progress_task = tokio::spawn(show_progress(receiver, hide_progress));

        let mut orchestrator = MigrationOrchestrator::new(database, resolver, migration_config).with_observer(sender);
        if self.config.log {
            match FileLogger::new() {
                Ok(logger) => {
                    if self.config.verbose {
                        println!("Logging to {}", logger.path().display());
                    }
                    orchestrator = orchestrator.with_logger(logger);
                }
                Err(error) => print_warning!("Failed to create log file: {error:#}"),
            }
        }

        let report = orchestrator.run().await;

        // Closes the progress channel so the progress task can finish
        let database = orchestrator.into_catalog();
        progress_task.await.context("Progress task failed")?;

        if self.config.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("Failed to serialize report")?
            );
        } else {
            if self.config.verbose {
                Self::print_outcomes(&report);
            }
            report.print_summary(self.config.error_limit);
        }

        if !self.config.dryrun {
            self.write_back(&database, &report);
        }

        Ok(())
    }

    /// Confirm the liberated flag of migrated entries in the library database.
    ///
    /// Only liberated entries are migrated, so this normally leaves the flags unchanged.
    /// It restores the flag for entries that were changed while the batch was running.
    fn write_back(&self, database: &LibraryDatabase, report: &MigrationReport) {
        match database.mark_artifacts_liberated(report.migrated_product_ids()) {
            Ok(updated) => {
                let missing = report.migrated().saturating_sub(updated);
                if missing > 0 {
                    print_warning!("{missing} migrated entries were not found in the library database");
                }
                if self.config.verbose && !self.config.json {
                    println!("Updated {updated} library entries");
                }
            }
            Err(error) => print_error!("{error:#}"),
        }
    }

    fn print_outcomes(report: &MigrationReport) {
        for entry in report.outcomes() {
            let status = match &entry.outcome {
                MigrationOutcome::Migrated { .. } => "MIGRATED".green(),
                MigrationOutcome::Skipped { .. } => "SKIPPED ".yellow(),
                MigrationOutcome::Failed { .. } => "FAILED  ".red(),
            };
            println!("{status} {}: {}", entry.title, entry.outcome.detail());
        }
    }

    /// Ask the user to confirm moving all files.
    fn confirm(target: &str) -> Result<bool> {
        print!(
            "{}",
            format!("This will move all existing PDFs to {target}. Proceed? (y/n): ").magenta()
        );
        std::io::stdout().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
        Ok(input.trim().eq_ignore_ascii_case("y"))
    }
}

/// Update a progress bar from the snapshots sent by the orchestrator until the channel closes.
async fn show_progress(mut receiver: UnboundedReceiver<ProgressSnapshot>, hidden: bool) {
    let progress_bar = if hidden {
        ProgressBar::hidden()
    } else {
        let progress_bar = ProgressBar::new(0);
        if let Ok(style) = ProgressStyle::default_bar().template(PROGRESS_BAR_TEMPLATE) {
            progress_bar.set_style(style.progress_chars(PROGRESS_BAR_CHARS));
        }
        progress_bar
    };

    while let Some(snapshot) = receiver.recv().await {
        progress_bar.set_length(snapshot.total as u64);
        progress_bar.set_position(snapshot.processed as u64);
        if let Some(item) = snapshot.current_item {
            progress_bar.set_message(item);
        }
    }

    progress_bar.finish_and_clear();
}
