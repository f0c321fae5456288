pub mod catalog;
pub mod config;
pub mod logger;
pub mod migration;
pub mod paths;

use std::env;
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use clap::Command;
use clap_complete::Shell;
use colored::Colorize;

/// Resolves an optional directory argument to an absolute path.
///
/// Empty or whitespace-only values count as not configured and return `None`.
/// A leading `~` is expanded to the home directory.
/// Unlike input paths, the directory does not need to exist yet.
///
/// ```rust
/// use std::path::Path;
/// use sidecar_relocate::resolve_directory;
///
/// assert!(resolve_directory(Some("  ")).is_none());
/// assert!(resolve_directory(None).is_none());
/// assert!(resolve_directory(Some("pdfs")).is_some_and(|path| path.is_absolute()));
/// ```
#[must_use]
pub fn resolve_directory(path: Option<&str>) -> Option<PathBuf> {
    let path = path.map(str::trim).filter(|p| !p.is_empty())?;
    Some(absolute_path(&expand_tilde(path)))
}

/// Replace a leading `~` with the home directory.
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(home) = dirs::home_dir() {
        if path == "~" {
            return home;
        }
        if let Some(rest) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Make the path absolute and lexically normalized without touching the filesystem.
///
/// `.` components are dropped and `..` components pop the previous component.
/// Relative paths are joined to the current working directory first.
///
/// ```rust
/// use std::path::Path;
/// use sidecar_relocate::absolute_path;
///
/// assert_eq!(absolute_path(Path::new("/books/./Author/../Title")), Path::new("/books/Title"));
/// ```
#[must_use]
pub fn absolute_path(path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    dunce::simplified(&normalized).to_path_buf()
}

/// Compare two paths for equality ignoring case, after making both absolute.
///
/// ```rust
/// use std::path::Path;
/// use sidecar_relocate::paths_equal_ignore_case;
///
/// assert!(paths_equal_ignore_case(Path::new("/Books/Title/Book.PDF"), Path::new("/books/title/book.pdf")));
/// assert!(!paths_equal_ignore_case(Path::new("/books/a.pdf"), Path::new("/pdfs/a.pdf")));
/// ```
#[must_use]
pub fn paths_equal_ignore_case(a: &Path, b: &Path) -> bool {
    path_to_string(&absolute_path(a)).to_lowercase() == path_to_string(&absolute_path(b)).to_lowercase()
}

/// Check if `path` is located strictly inside `root`, comparing path components ignoring case.
///
/// The root itself is not considered to be inside the root.
/// Matching is done per component so that `/books2` is not inside `/books`.
///
/// ```rust
/// use std::path::Path;
/// use sidecar_relocate::is_strictly_inside_ignore_case;
///
/// let root = Path::new("/Books");
/// assert!(is_strictly_inside_ignore_case(Path::new("/books/Author"), root));
/// assert!(!is_strictly_inside_ignore_case(Path::new("/books"), root));
/// assert!(!is_strictly_inside_ignore_case(Path::new("/books2/Author"), root));
/// ```
#[must_use]
pub fn is_strictly_inside_ignore_case(path: &Path, root: &Path) -> bool {
    let path = absolute_path(path);
    let root = absolute_path(root);
    let path_components: Vec<String> = path
        .components()
        .map(|c| os_str_to_string(c.as_os_str()).to_lowercase())
        .collect();
    let root_components: Vec<String> = root
        .components()
        .map(|c| os_str_to_string(c.as_os_str()).to_lowercase())
        .collect();

    path_components.len() > root_components.len() && path_components.starts_with(&root_components)
}

/// Convert `OsStr` to String with invalid Unicode handling.
pub fn os_str_to_string(name: &OsStr) -> String {
    name.to_str().map_or_else(
        || name.to_string_lossy().replace('\u{FFFD}', ""),
        std::string::ToString::to_string,
    )
}

/// Convert given path to string with invalid Unicode handling.
pub fn path_to_string(path: &Path) -> String {
    path.to_str().map_or_else(
        || path.to_string_lossy().to_string().replace('\u{FFFD}', ""),
        std::string::ToString::to_string,
    )
}

/// Convert given path to filename string with invalid Unicode handling.
#[must_use]
pub fn path_to_filename_string(path: &Path) -> String {
    os_str_to_string(path.file_name().unwrap_or_default())
}

/// Convert given path to file stem string with invalid Unicode handling.
#[must_use]
pub fn path_to_file_stem_string(path: &Path) -> String {
    os_str_to_string(path.file_stem().unwrap_or_default())
}

/// Convert given path to file extension string with invalid Unicode handling.
/// The original case is kept since it is part of the file name on disk.
#[must_use]
pub fn path_to_file_extension_string(path: &Path) -> String {
    os_str_to_string(path.extension().unwrap_or_default())
}

#[inline]
pub fn print_error(message: &str) {
    eprintln!("{}", format!("Error: {message}").red());
}

#[macro_export]
macro_rules! print_error {
    ($($arg:tt)*) => {
        $crate::print_error(&format!($($arg)*))
    };
}

#[inline]
pub fn print_warning(message: &str) {
    eprintln!("{}", message.yellow());
}

#[macro_export]
macro_rules! print_warning {
    ($($arg:tt)*) => {
        $crate::print_warning(&format!($($arg)*))
    };
}

#[inline]
pub fn print_bold(message: &str) {
    println!("{}", message.bold());
}

#[macro_export]
macro_rules! print_bold {
    ($($arg:tt)*) => {
        $crate::print_bold(&format!($($arg)*))
    };
}

/// Format duration as a human-readable string
#[must_use]
pub fn format_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 {
        format!("{}h {:02}m {:02}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    } else if secs >= 60 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else {
        format!("{:.1}s", duration.as_secs_f64())
    }
}

/// Generate a shell completion script for the given shell.
pub fn generate_shell_completion(shell: Shell, mut command: Command, install: bool, command_name: &str) -> Result<()> {
    if install {
        let out_dir = get_shell_completion_dir(shell, command_name)?;
        let path = clap_complete::generate_to(shell, &mut command, command_name, out_dir)?;
        println!("Completion file generated to: {}", path.display());
    } else {
        clap_complete::generate(shell, &mut command, command_name, &mut std::io::stdout());
    }
    Ok(())
}

/// Determine the appropriate directory for storing shell completions.
///
/// First checks if the user-specific directory exists,
/// then checks for the global directory.
/// If neither exist, creates and uses the user-specific dir.
fn get_shell_completion_dir(shell: Shell, name: &str) -> Result<PathBuf> {
    let home = dirs::home_dir().context("Failed to get home directory")?;

    // Special handling for oh-my-zsh.
    // Create custom "plugin", which will then have to be loaded in .zshrc
    if shell == Shell::Zsh {
        let omz_plugins = home.join(".oh-my-zsh/custom/plugins");
        if omz_plugins.exists() {
            let plugin_dir = omz_plugins.join(name);
            std::fs::create_dir_all(&plugin_dir)?;
            return Ok(plugin_dir);
        }
    }

    let user_dir = match shell {
        Shell::PowerShell => {
            if cfg!(windows) {
                home.join(r"Documents\PowerShell\completions")
            } else {
                home.join(".config/powershell/completions")
            }
        }
        Shell::Bash => home.join(".bash_completion.d"),
        Shell::Elvish => home.join(".elvish"),
        Shell::Fish => home.join(".config/fish/completions"),
        Shell::Zsh => home.join(".zsh/completions"),
        _ => anyhow::bail!("Unsupported shell"),
    };

    if user_dir.exists() {
        return Ok(user_dir);
    }

    let global_dir = match shell {
        Shell::PowerShell => {
            if cfg!(windows) {
                home.join(r"Documents\PowerShell\completions")
            } else {
                home.join(".config/powershell/completions")
            }
        }
        Shell::Bash => PathBuf::from("/etc/bash_completion.d"),
        Shell::Fish => PathBuf::from("/usr/share/fish/completions"),
        Shell::Zsh => PathBuf::from("/usr/share/zsh/site-functions"),
        _ => anyhow::bail!("Unsupported shell"),
    };

    if global_dir.exists() {
        return Ok(global_dir);
    }

    std::fs::create_dir_all(&user_dir)?;
    Ok(user_dir)
}
