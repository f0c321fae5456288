use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use itertools::Itertools;
use serde::Deserialize;

use sidecar_relocate::migration::DEFAULT_EXTENSIONS;
use sidecar_relocate::print_error;

use crate::PdfMigrateArgs;

/// Number of errors shown in the summary by default.
pub const DEFAULT_ERROR_LIMIT: usize = 5;

/// Final config combined from CLI arguments and user config file.
#[derive(Debug)]
pub struct Config {
    pub(crate) auto: bool,
    pub(crate) books_directory: PathBuf,
    pub(crate) database: PathBuf,
    pub(crate) dryrun: bool,
    pub(crate) error_limit: usize,
    pub(crate) extensions: Vec<String>,
    pub(crate) json: bool,
    pub(crate) log: bool,
    pub(crate) target_directory: Option<PathBuf>,
    pub(crate) verbose: bool,
}

/// Config from the user config file
#[derive(Debug, Default, Deserialize)]
struct PdfMigrateConfig {
    #[serde(default)]
    auto: bool,
    #[serde(default)]
    books_directory: Option<String>,
    #[serde(default)]
    database: Option<String>,
    #[serde(default)]
    dryrun: bool,
    #[serde(default)]
    error_limit: Option<usize>,
    #[serde(default)]
    extensions: Vec<String>,
    #[serde(default)]
    json: bool,
    #[serde(default)]
    log: Option<bool>,
    #[serde(default)]
    target_directory: Option<String>,
    #[serde(default)]
    verbose: bool,
}

/// Wrapper needed for parsing the user config file section.
#[derive(Debug, Default, Deserialize)]
struct UserConfig {
    #[serde(default)]
    pdfmigrate: PdfMigrateConfig,
}

impl PdfMigrateConfig {
    /// Try to read user config from the file if it exists.
    /// Otherwise, fall back to default config.
    fn get_user_config() -> Self {
        sidecar_relocate::config::CONFIG_PATH
            .as_deref()
            .filter(|path| path.exists())
            .and_then(|path| {
                fs::read_to_string(path)
                    .map_err(|e| {
                        print_error!("Error reading config file {}: {e}", path.display());
                    })
                    .ok()
            })
            .and_then(|config_string| {
                Self::from_toml_str(&config_string)
                    .map_err(|e| print_error!("{e}"))
                    .ok()
            })
            .unwrap_or_default()
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    /// Returns an error if the TOML string is invalid.
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        toml::from_str::<UserConfig>(toml_str)
            .map(|config| config.pdfmigrate)
            .map_err(|e| anyhow::anyhow!("Failed to parse config: {e}"))
    }
}

impl Config {
    /// Create config from given command line args and user config file.
    pub fn from_args(args: PdfMigrateArgs) -> Self {
        Self::from_parts(args, PdfMigrateConfig::get_user_config())
    }

    /// Combine command line args with the user config.
    /// Arguments take priority, list values from both sources are merged.
    fn from_parts(args: PdfMigrateArgs, user_config: PdfMigrateConfig) -> Self {
        let books_directory =
            sidecar_relocate::resolve_directory(args.books.as_deref().or(user_config.books_directory.as_deref()))
                .unwrap_or_else(|| sidecar_relocate::absolute_path(Path::new(".")));

        let target_directory =
            sidecar_relocate::resolve_directory(args.target.as_deref().or(user_config.target_directory.as_deref()));

        let database = sidecar_relocate::resolve_directory(args.database.as_deref().or(user_config.database.as_deref()))
            .unwrap_or_else(|| sidecar_relocate::config::DATABASE_PATH.clone());

        let mut extensions: Vec<String> = user_config
            .extensions
            .into_iter()
            .chain(args.extensions)
            .map(|extension| extension.trim().trim_start_matches('.').to_string())
            .filter(|extension| !extension.is_empty())
            .unique()
            .collect();
        if extensions.is_empty() {
            extensions = DEFAULT_EXTENSIONS.iter().map(ToString::to_string).collect();
        }

        Self {
            auto: args.auto || user_config.auto,
            books_directory,
            database,
            dryrun: args.print || user_config.dryrun,
            error_limit: args
                .error_limit
                .or(user_config.error_limit)
                .unwrap_or(DEFAULT_ERROR_LIMIT),
            extensions,
            json: args.json || user_config.json,
            log: !args.no_log && user_config.log.unwrap_or(true),
            target_directory,
            verbose: args.verbose || user_config.verbose,
        }
    }
}
