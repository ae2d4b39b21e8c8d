//! Listener-side sync message handling.
//!
//! Consumes the inbound channel payload stream: position messages anchor the
//! virtual clock once the displayed track matches, a new song id triggers an
//! asynchronous resource fetch (coalesced per song id), and a stopped
//! message clears display state immediately. Fetch completions that arrive
//! after the session moved on are discarded, never displayed.

use crate::resolver::SongResolver;
use crate::session::LyricSession;
use karasync_core::{SyncMessage, SyncSnapshot};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Progress notifications for song preparation, mirrored to the UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiverEvent {
    Preparing { song_id: String },
    Prepared { song_id: String },
    PrepareFailed { song_id: String },
}

struct ReceiverState {
    /// Song id with a resource fetch in flight, if any
    in_flight: Option<String>,
    /// Bumped on stop and on newer announcements; stale fetches compare
    /// against it and discard themselves
    generation: u64,
}

pub struct SyncReceiver {
    session: Arc<LyricSession>,
    resolver: Arc<dyn SongResolver>,
    state: Mutex<ReceiverState>,
    event_tx: broadcast::Sender<ReceiverEvent>,
    cancel_token: CancellationToken,
}

impl SyncReceiver {
    #[must_use]
    pub fn new(
        session: Arc<LyricSession>,
        resolver: Arc<dyn SongResolver>,
        cancel_token: Option<CancellationToken>,
    ) -> Arc<Self> {
        let (event_tx, _) = broadcast::channel(64);
        Arc::new(Self {
            session,
            resolver,
            state: Mutex::new(ReceiverState {
                in_flight: None,
                generation: 0,
            }),
            event_tx,
            cancel_token: cancel_token.unwrap_or_default(),
        })
    }

    /// Subscribe to preparation progress events.
    pub fn subscribe(&self) -> broadcast::Receiver<ReceiverEvent> {
        self.event_tx.subscribe()
    }

    /// Get a clone of the cancellation token.
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Start consuming inbound channel payloads in a background task.
    #[must_use]
    pub fn start(self: Arc<Self>, mut payloads: mpsc::Receiver<Vec<u8>>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("sync receiver starting");
            loop {
                tokio::select! {
                    () = self.cancel_token.cancelled() => break,
                    payload = payloads.recv() => match payload {
                        Some(payload) => Arc::clone(&self).handle_payload(&payload).await,
                        None => break,
                    },
                }
            }
            info!("sync receiver shutting down");
        })
    }

    async fn handle_payload(self: Arc<Self>, payload: &[u8]) {
        // Malformed payloads are logged and dropped, never fatal
        let message = match SyncMessage::from_bytes(payload) {
            Ok(message) => message,
            Err(err) => {
                warn!("ignoring channel payload: {err}");
                return;
            }
        };

        match message {
            SyncMessage::SetLrcTime {
                lrc_id,
                duration,
                time,
            } => self.on_position(lrc_id, duration, time).await,
            SyncMessage::MusicStopped { lrc_id } => self.on_stopped(&lrc_id).await,
        }
    }

    async fn on_position(self: Arc<Self>, song_id: String, duration: u64, time: u64) {
        if self.session.current_song_id().await.as_deref() == Some(song_id.as_str()) {
            self.session
                .observe(SyncSnapshot::new(song_id, duration, time))
                .await;
            return;
        }

        // New song announced. The position is not applied against the stale
        // track; display resumes once the resource is ready and the next
        // position message arrives.
        let generation = {
            let mut state = self.state.lock().await;
            if state.in_flight.as_deref() == Some(song_id.as_str()) {
                // A fetch for this song is already in flight
                return;
            }
            state.generation += 1;
            state.in_flight = Some(song_id.clone());
            state.generation
        };

        info!(song_id = %song_id, "new song announced, preparing resources");
        self.session.clear().await;
        self.emit(ReceiverEvent::Preparing {
            song_id: song_id.clone(),
        });

        let this = Arc::clone(&self);
        tokio::spawn(async move {
            this.prepare_song(song_id, duration, generation).await;
        });
    }

    async fn prepare_song(self: Arc<Self>, song_id: String, duration: u64, generation: u64) {
        let loaded = match self.resolver.prepare(&song_id).await {
            Ok(song) => song.load_lyric_track(duration).await,
            Err(err) => Err(err),
        };

        // The lock is held across the track swap: a concurrent stop either
        // bumps the generation before this (fetch discarded) or clears the
        // session after it, never interleaved with the swap.
        let mut state = self.state.lock().await;
        if state.generation != generation {
            // The session stopped or a newer song was announced while we
            // were fetching; discard silently
            debug!(song_id = %song_id, "discarding stale song resource");
            return;
        }
        state.in_flight = None;

        match loaded {
            Ok(track) => {
                self.session.load_track(&song_id, track).await;
                self.emit(ReceiverEvent::Prepared { song_id });
            }
            Err(err) => {
                warn!(song_id = %song_id, "failed to prepare song: {err}");
                self.emit(ReceiverEvent::PrepareFailed { song_id });
            }
        }
    }

    async fn on_stopped(&self, song_id: &str) {
        info!(song_id = %song_id, "host stopped playback");
        {
            let mut state = self.state.lock().await;
            state.generation += 1;
            state.in_flight = None;
        }
        // Display stops immediately, regardless of in-flight fetches
        self.session.clear().await;
    }

    fn emit(&self, event: ReceiverEvent) {
        let _ = self.event_tx.send(event);
    }
}
