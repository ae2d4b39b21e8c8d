//! Virtual playback clock.
//!
//! Both roles drive lyric display from an extrapolated estimate of the
//! playback position: the host anchors it from engine position callbacks,
//! listeners from received sync messages. Between anchors the clock advances
//! with wall time, but only within a freshness window; a stalled channel
//! freezes the estimate rather than letting lyrics run ahead of audio.

use crate::time::DurationExt;
use std::time::{Duration, Instant};

/// Default maximum anchor age before extrapolation freezes.
pub const DEFAULT_FRESHNESS_THRESHOLD: Duration = Duration::from_millis(1000);

/// A point-in-time observation of the authoritative playback position.
#[derive(Debug, Clone)]
pub struct SyncSnapshot {
    pub song_id: String,
    pub total_duration_ms: u64,
    pub position_ms: u64,
    pub observed_at: Instant,
}

impl SyncSnapshot {
    /// Snapshot observed now.
    #[must_use]
    pub fn new(song_id: impl Into<String>, total_duration_ms: u64, position_ms: u64) -> Self {
        Self {
            song_id: song_id.into(),
            total_duration_ms,
            position_ms,
            observed_at: Instant::now(),
        }
    }
}

/// Pure position estimator; it knows nothing of pause/resume. Pausing stops
/// the periodic observations, which freezes the estimate once the freshness
/// window elapses.
#[derive(Debug, Default)]
pub struct VirtualClock {
    anchor: Option<SyncSnapshot>,
    freshness: Option<Duration>,
}

impl VirtualClock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clock with a non-default freshness threshold.
    #[must_use]
    pub const fn with_freshness(freshness: Duration) -> Self {
        Self {
            anchor: None,
            freshness: Some(freshness),
        }
    }

    fn freshness(&self) -> Duration {
        self.freshness.unwrap_or(DEFAULT_FRESHNESS_THRESHOLD)
    }

    /// Store a new anchor. Returns `true` when the snapshot announces a
    /// different song than the current anchor: the old anchor is discarded
    /// and the consumer must treat the track as changed.
    pub fn observe(&mut self, snapshot: SyncSnapshot) -> bool {
        let song_changed = self
            .anchor
            .as_ref()
            .map_or(true, |anchor| anchor.song_id != snapshot.song_id);
        self.anchor = Some(snapshot);
        song_changed
    }

    /// Song id of the current anchor, if any.
    #[must_use]
    pub fn song_id(&self) -> Option<&str> {
        self.anchor.as_ref().map(|anchor| anchor.song_id.as_str())
    }

    /// Drop the anchor entirely (track stopped or changed away).
    pub fn reset(&mut self) {
        self.anchor = None;
    }

    /// Estimated playback position at this instant, or `None` before the
    /// first observation.
    #[must_use]
    pub fn estimate_now_ms(&self) -> Option<u64> {
        self.estimate_at(Instant::now())
    }

    /// Estimate at an explicit instant. The anchor position is extrapolated
    /// by the elapsed wall time, capped at the freshness threshold so a late
    /// channel freezes the estimate instead of running ahead.
    #[must_use]
    pub fn estimate_at(&self, now: Instant) -> Option<u64> {
        let anchor = self.anchor.as_ref()?;
        let elapsed = now.saturating_duration_since(anchor.observed_at);
        let advance = elapsed.min(self.freshness());
        Some(anchor.position_ms.saturating_add(advance.as_millis_u64()))
    }
}
