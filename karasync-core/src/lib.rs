//! Core timing and parsing for synchronized karaoke playback: LRC lyric
//! parsing, line/word location, the jitter-smoothing virtual clock, the JSON
//! wire messages, and configuration. Runtime-free; the async session layer
//! lives in `karasync-session`.

pub mod clock;
pub mod config;
pub mod error;
pub mod locate;
pub mod lrc;
pub mod message;
pub mod paths;
pub mod time;

pub use clock::{SyncSnapshot, VirtualClock, DEFAULT_FRESHNESS_THRESHOLD};
pub use config::SyncConfig;
pub use error::{CoreError, Result};
pub use locate::{LineMatch, SegmentProgress};
pub use lrc::{LyricLine, LyricSegment, LyricTrack};
pub use message::SyncMessage;
pub use paths::{config_dir, config_path, song_cache_dir, CONFIG_DIR_NAME, CONFIG_FILE_NAME};
pub use time::DurationExt;
