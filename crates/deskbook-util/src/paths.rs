//! Default paths for deskbook
//!
//! Paths are user-writable by default:
//! - Config: `$XDG_CONFIG_HOME/deskbook/config.toml` or `~/.config/deskbook/config.toml`
//! - Data: `$XDG_DATA_HOME/deskbook` or `~/.local/share/deskbook`

use std::path::PathBuf;

/// Environment variable for overriding the data directory
pub const DESKBOOK_DATA_DIR_ENV: &str = "DESKBOOK_DATA_DIR";

/// Environment variable for overriding the config file path
pub const DESKBOOK_CONFIG_ENV: &str = "DESKBOOK_CONFIG";

/// Database filename used when the config does not name one
pub const DEFAULT_DATABASE_FILE: &str = "deskbook.db";

const CONFIG_FILENAME: &str = "config.toml";

/// Application subdirectory name
const APP_DIR: &str = "deskbook";

/// Get the default config file path.
///
/// Order of precedence:
/// 1. `$DESKBOOK_CONFIG` (if set)
/// 2. `$XDG_CONFIG_HOME/deskbook/config.toml` (if XDG_CONFIG_HOME is set)
/// 3. `~/.config/deskbook/config.toml`
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(DESKBOOK_CONFIG_ENV) {
        return PathBuf::from(path);
    }

    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join(APP_DIR).join(CONFIG_FILENAME);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join(CONFIG_FILENAME);
    }

    PathBuf::from(CONFIG_FILENAME)
}

/// Default data directory.
///
/// `DESKBOOK_DATA_DIR` is not consulted here; the command line reads it
/// together with `--data-dir` so it can win over the config file.
pub fn default_data_dir() -> PathBuf {
    if let Ok(data_home) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(data_home).join(APP_DIR);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR);
    }

    // Last resort
    PathBuf::from("/tmp").join(APP_DIR).join("data")
}
