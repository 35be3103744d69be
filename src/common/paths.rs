//! Configuration and log file locations
//!
//! The properties file is looked up next to the working directory first,
//! matching how the application is launched by the platform. The platform
//! config directory comes from the directories crate:
//! - Linux: `~/.config/training-bridge/`
//! - macOS: `~/Library/Application Support/training-bridge/`
//! - Windows: `%APPDATA%\training-bridge\`

use std::path::{Path, PathBuf};

const APP_NAME: &str = "training-bridge";

/// Name of the properties file read from the working directory
pub const PROPERTIES_FILENAME: &str = "application.properties";

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the TOML configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the path to the log directory
pub fn log_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.data_dir().join("logs"))
}

/// Pick the configuration file to load
///
/// An explicit path always wins, even if it does not exist (the caller
/// reports the read error). Otherwise `./application.properties`, then the
/// platform `config.toml`.
pub fn resolve_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    let local = PathBuf::from(PROPERTIES_FILENAME);
    if local.exists() {
        return Some(local);
    }

    config_path().filter(|path| path.exists())
}
