use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    // Precondition errors: rejected synchronously, no engine call is made
    #[error("current role is not host, cannot start playback")]
    NotHost,

    #[error("a playback session is already open ({status})")]
    SessionBusy { status: String },

    #[error("a remote lyric-display session is active, cannot open local playback")]
    DisplayActive,

    #[error("media file not found at {path}")]
    MissingMediaFile { path: PathBuf },

    #[error("lyric file not found at {path}")]
    MissingLyricFile { path: PathBuf },

    // Engine errors
    #[error("media engine failed to open file (engine code {code})")]
    EngineOpenFailed { code: i32 },

    #[error("media engine rejected command: {reason}")]
    EngineCommand { reason: String },

    // Lyric errors
    #[error("failed to parse lyrics: {reason}")]
    LrcParse { reason: String },

    // Channel errors
    #[error("malformed channel message: {reason}")]
    MalformedMessage { reason: String },

    // Resolver errors
    #[error("failed to prepare song resource for {song_id}: {reason}")]
    PrepareFailed { song_id: String, reason: String },

    // Configuration errors
    #[error("failed to parse config file: {0}")]
    ConfigParseError(#[from] toml::de::Error),

    // IO errors
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
