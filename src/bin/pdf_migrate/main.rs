//! pdfmigrate - Move the PDFs of an audiobook library into a separate directory.
//!
//! PDFs were previously stored next to the audio files.
//! This tool moves every PDF the library database knows about into the configured target directory,
//! keeping the `Author/Title` folder structure and removing the folders left empty behind.

mod config;
mod pdf_migrate;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::Shell;

use crate::pdf_migrate::PdfMigrate;

/// Move the PDFs of an audiobook library into a separate directory.
///
/// Looks for each PDF next to the audio file first, then in the matching folder under the books directory.
/// Existing files at the target are compared byte-for-byte:
/// identical copies are de-duplicated and different files are kept as a timestamped backup.
#[derive(Parser)]
#[command(
    author,
    version,
    name = env!("CARGO_BIN_NAME"),
    about = "Move the PDFs of an audiobook library into a separate directory"
)]
pub struct PdfMigrateArgs {
    /// Books directory containing the audio files
    #[arg(short = 'b', long, name = "BOOKS", value_hint = clap::ValueHint::DirPath)]
    books: Option<String>,

    /// Target directory for the PDFs
    #[arg(short = 't', long, name = "TARGET", value_hint = clap::ValueHint::DirPath)]
    target: Option<String>,

    /// Library database file
    #[arg(short = 'd', long, name = "DATABASE", value_hint = clap::ValueHint::FilePath)]
    database: Option<String>,

    /// File extension to look for, can be given multiple times
    #[arg(short = 'e', long = "extension", num_args = 1, action = clap::ArgAction::Append, name = "EXTENSION")]
    extensions: Vec<String>,

    /// Auto-confirm all prompts without asking
    #[arg(short, long)]
    auto: bool,

    /// Only print what would be done without moving files
    #[arg(short, long)]
    print: bool,

    /// Print the report as JSON
    #[arg(short, long)]
    json: bool,

    /// Maximum number of errors to show in the summary
    #[arg(short = 'n', long = "limit", name = "COUNT")]
    error_limit: Option<usize>,

    /// Do not write a log file
    #[arg(long)]
    no_log: bool,

    /// Generate shell completion
    #[arg(short = 'l', long, name = "SHELL")]
    completion: Option<Shell>,

    /// Print verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = PdfMigrateArgs::parse();
    if let Some(ref shell) = args.completion {
        sidecar_relocate::generate_shell_completion(*shell, PdfMigrateArgs::command(), true, env!("CARGO_BIN_NAME"))
    } else {
        PdfMigrate::new(args).run().await
    }
}
