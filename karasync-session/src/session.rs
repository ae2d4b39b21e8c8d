//! Shared session state: the virtual clock anchor and the current lyric
//! track, each with a single owner behind this type, plus the event seam to
//! the rendering collaborator.

use karasync_core::{LineMatch, LyricTrack, SegmentProgress, SyncSnapshot, VirtualClock};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};

/// Events forwarded to whatever owns presentation. Rendering is out of
/// scope here; consumers subscribe and draw.
#[derive(Debug, Clone)]
pub enum DisplayEvent {
    /// A new lyric track is ready for display
    TrackLoaded {
        song_id: String,
        track: Arc<LyricTrack>,
    },
    /// Periodic display tick with the active line and highlight progress
    Tick {
        line: LineMatch,
        segment: Option<SegmentProgress>,
    },
    /// Display state cleared; no active line
    Reset,
}

struct CurrentTrack {
    song_id: String,
    track: Arc<LyricTrack>,
}

/// Owns the clock anchor and current track for one live session.
///
/// The track swap on song change is a single `Option` replacement under the
/// write lock, so a display tick reading under the read lock sees either the
/// old or the new track in full, never a partial update.
pub struct LyricSession {
    clock: RwLock<VirtualClock>,
    track: RwLock<Option<CurrentTrack>>,
    event_tx: broadcast::Sender<DisplayEvent>,
}

impl LyricSession {
    #[must_use]
    pub fn new(freshness_threshold: Duration) -> Arc<Self> {
        let (event_tx, _) = broadcast::channel(64);
        Arc::new(Self {
            clock: RwLock::new(VirtualClock::with_freshness(freshness_threshold)),
            track: RwLock::new(None),
            event_tx,
        })
    }

    /// Subscribe to display events.
    pub fn subscribe(&self) -> broadcast::Receiver<DisplayEvent> {
        self.event_tx.subscribe()
    }

    /// Anchor the clock with a fresh position observation.
    pub async fn observe(&self, snapshot: SyncSnapshot) {
        self.clock.write().await.observe(snapshot);
    }

    /// Estimated playback position, or `None` before the first anchor.
    pub async fn estimate_now_ms(&self) -> Option<u64> {
        self.clock.read().await.estimate_now_ms()
    }

    /// Swap in the track for a newly loaded song.
    pub async fn load_track(&self, song_id: impl Into<String>, track: LyricTrack) {
        let song_id = song_id.into();
        let track = Arc::new(track);
        *self.track.write().await = Some(CurrentTrack {
            song_id: song_id.clone(),
            track: Arc::clone(&track),
        });
        let _ = self.event_tx.send(DisplayEvent::TrackLoaded { song_id, track });
    }

    /// Drop the clock anchor and current track; display resets to "no
    /// active line".
    pub async fn clear(&self) {
        self.clock.write().await.reset();
        *self.track.write().await = None;
        let _ = self.event_tx.send(DisplayEvent::Reset);
    }

    /// Song id of the currently displayed track.
    pub async fn current_song_id(&self) -> Option<String> {
        self.track
            .read()
            .await
            .as_ref()
            .map(|current| current.song_id.clone())
    }

    /// Whether a track is currently displayed.
    pub async fn has_track(&self) -> bool {
        self.track.read().await.is_some()
    }

    /// The currently displayed track.
    pub async fn current_track(&self) -> Option<Arc<LyricTrack>> {
        self.track
            .read()
            .await
            .as_ref()
            .map(|current| Arc::clone(&current.track))
    }

    /// One display tick: estimate the position, locate the active line and
    /// segment, and emit. A no-op without an anchor or a track.
    pub(crate) async fn tick_display(&self) {
        let Some(at_ms) = self.estimate_now_ms().await else {
            return;
        };
        let Some(track) = self.current_track().await else {
            return;
        };
        let Some(line) = track.locate(at_ms) else {
            return;
        };
        let segment = track
            .lines
            .get(line.index)
            .and_then(|l| l.segment_progress(line.elapsed_in_line_ms));
        let _ = self.event_tx.send(DisplayEvent::Tick { line, segment });
    }
}
