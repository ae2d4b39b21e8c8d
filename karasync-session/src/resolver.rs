//! Song resource resolution boundary.

use async_trait::async_trait;
use karasync_core::{LyricTrack, Result};
use std::path::PathBuf;

/// Local files for a song, ready for the engine and the lyric parser.
#[derive(Debug, Clone)]
pub struct LocalSong {
    pub song_id: String,
    pub audio_path: PathBuf,
    pub lyric_path: PathBuf,
    /// Second-language lyric file for bilingual display, when available
    pub secondary_lyric_path: Option<PathBuf>,
}

impl LocalSong {
    #[must_use]
    pub fn new(
        song_id: impl Into<String>,
        audio_path: impl Into<PathBuf>,
        lyric_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            song_id: song_id.into(),
            audio_path: audio_path.into(),
            lyric_path: lyric_path.into(),
            secondary_lyric_path: None,
        }
    }

    #[must_use]
    pub fn with_secondary_lyrics(mut self, path: impl Into<PathBuf>) -> Self {
        self.secondary_lyric_path = Some(path.into());
        self
    }

    /// Read and parse the song's lyric files, then stretch line timings to
    /// the engine-reported `total_duration_ms`.
    ///
    /// # Errors
    ///
    /// Returns an error when a lyric file cannot be read or parsed.
    pub async fn load_lyric_track(&self, total_duration_ms: u64) -> Result<LyricTrack> {
        let primary = tokio::fs::read_to_string(&self.lyric_path).await?;
        let secondary = match &self.secondary_lyric_path {
            Some(path) => Some(tokio::fs::read_to_string(path).await?),
            None => None,
        };
        let mut track = LyricTrack::parse(&primary, secondary.as_deref())?;
        track.set_total_duration(total_duration_ms);
        Ok(track)
    }
}

/// Materializes an announced song id into local files. Listeners call this
/// when the host announces a song they have not prepared yet; downloads land
/// under [`karasync_core::paths::song_cache_dir`] by convention.
#[async_trait]
pub trait SongResolver: Send + Sync {
    /// Fetch or locate the media and lyric files for `song_id`.
    ///
    /// # Errors
    ///
    /// Returns an error when the resource cannot be materialized.
    async fn prepare(&self, song_id: &str) -> Result<LocalSong>;
}
