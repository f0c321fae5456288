use std::path::PathBuf;
use std::sync::LazyLock;

pub const PROJECT_NAME: &str = env!("CARGO_PKG_NAME");

/// Path to the user config file: `$HOME/.config/sidecar-relocate.toml`
///
/// Returns `None` if the home directory cannot be determined.
pub static CONFIG_PATH: LazyLock<Option<PathBuf>> = LazyLock::new(|| {
    let home_dir = dirs::home_dir()?;
    Some(home_dir.join(".config").join(format!("{PROJECT_NAME}.toml")))
});

/// Default location of the library catalog database.
///
/// Uses the platform-specific local data directory:
/// - Windows: `%LOCALAPPDATA%\sidecar-relocate\library.db`
/// - macOS: `~/Library/Application Support/sidecar-relocate/library.db`
/// - Linux: `~/.local/share/sidecar-relocate/library.db`
pub static DATABASE_PATH: LazyLock<PathBuf> = LazyLock::new(|| {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(PROJECT_NAME)
        .join("library.db")
});

/// Directory for audit log files: `$HOME/logs/sidecar-relocate`
///
/// Returns `None` if the home directory cannot be determined.
pub static LOG_DIR: LazyLock<Option<PathBuf>> = LazyLock::new(|| {
    let home_dir = dirs::home_dir()?;
    Some(home_dir.join("logs").join(PROJECT_NAME))
});
