//! Media engine boundary.
//!
//! Decoding and mixing live behind this trait; the session only issues
//! commands and consumes the engine's asynchronous callbacks, delivered as
//! [`EngineEvent`]s on an mpsc channel in the order the engine produced them.

use async_trait::async_trait;
use karasync_core::Result;
use std::path::Path;

/// Audio channel selection: full original mix or accompaniment only.
///
/// The deployed catalog carries the vocal and accompaniment mixes on the two
/// stereo channels, so this maps to a dual-mono mode on the engine side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelMode {
    #[default]
    Original,
    Accompaniment,
}

impl ChannelMode {
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Original => Self::Accompaniment,
            Self::Accompaniment => Self::Original,
        }
    }
}

/// Asynchronous engine callbacks, in engine delivery order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    Opening,
    OpenCompleted,
    /// Open failed; carries the engine's numeric error code, mapped to a
    /// closed error at the state machine boundary
    OpenError(i32),
    Playing,
    Paused,
    Stopped,
    Completed,
    /// Periodic authoritative position report in milliseconds
    PositionChanged(u64),
}

/// Command surface of the local media-decoding engine.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Open a local media file; completion arrives as
    /// [`EngineEvent::OpenCompleted`] or [`EngineEvent::OpenError`].
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the command outright.
    async fn open(&self, path: &Path, start_position_ms: u64) -> Result<()>;

    /// Start playback of the opened file.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the command.
    async fn play(&self) -> Result<()>;

    /// Pause playback.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the command.
    async fn pause(&self) -> Result<()>;

    /// Resume paused playback.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the command.
    async fn resume(&self) -> Result<()>;

    /// Stop playback; completion arrives as [`EngineEvent::Stopped`].
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the command.
    async fn stop(&self) -> Result<()>;

    /// Seek to a position in milliseconds.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the command.
    async fn seek(&self, position_ms: u64) -> Result<()>;

    /// Select the audible channel mix.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the command.
    async fn set_channel_mode(&self, mode: ChannelMode) -> Result<()>;

    /// Total duration of the opened media in milliseconds.
    ///
    /// # Errors
    ///
    /// Returns an error when no media is open.
    async fn duration_ms(&self) -> Result<u64>;

    /// Current authoritative playback position in milliseconds.
    ///
    /// # Errors
    ///
    /// Returns an error when no media is open.
    async fn position_ms(&self) -> Result<u64>;
}
