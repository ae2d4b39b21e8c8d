//! Path constants for configuration and downloaded song resources.

use std::path::PathBuf;

/// The name of the configuration directory under ~/.config/
pub const CONFIG_DIR_NAME: &str = "karasync";

/// The name of the main configuration file
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// The name of the directory song resolvers download media/lyrics into
pub const SONG_CACHE_DIR_NAME: &str = "songs";

/// Get the configuration directory path (~/.config/karasync/)
#[must_use]
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join(CONFIG_DIR_NAME)
}

/// Get the config file path (~/.config/karasync/config.toml)
#[must_use]
pub fn config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}

/// Get the song resource cache directory (~/.config/karasync/songs/)
#[must_use]
pub fn song_cache_dir() -> PathBuf {
    config_dir().join(SONG_CACHE_DIR_NAME)
}
