//! Host-side position sync broadcasting.
//!
//! While playback is started, a snapshot of the engine's authoritative
//! position goes out over the reliable channel once per interval. On
//! shutdown the loop emits exactly one stopped message so listeners stop
//! display deterministically instead of timing out.

use crate::channel::MessageChannel;
use crate::engine::MediaEngine;
use crate::player::PlaybackStatus;
use karasync_core::SyncMessage;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub struct SyncBroadcaster {
    engine: Arc<dyn MediaEngine>,
    channel: Arc<dyn MessageChannel>,
    song_id: String,
    total_duration_ms: u64,
    interval: Duration,
    status_rx: watch::Receiver<PlaybackStatus>,
    cancel_token: CancellationToken,
}

/// Running broadcaster; [`shutdown`](Self::shutdown) is a bounded cancel +
/// join, guaranteed to have sent the stopped message when it returns.
pub struct BroadcastHandle {
    cancel_token: CancellationToken,
    handle: JoinHandle<()>,
}

impl BroadcastHandle {
    pub async fn shutdown(self) {
        self.cancel_token.cancel();
        let _ = self.handle.await;
    }
}

impl SyncBroadcaster {
    /// Spawn the broadcast loop for one started song.
    #[must_use]
    pub fn spawn(
        engine: Arc<dyn MediaEngine>,
        channel: Arc<dyn MessageChannel>,
        song_id: String,
        total_duration_ms: u64,
        interval: Duration,
        status_rx: watch::Receiver<PlaybackStatus>,
    ) -> BroadcastHandle {
        let cancel_token = CancellationToken::new();
        let broadcaster = Self {
            engine,
            channel,
            song_id,
            total_duration_ms,
            interval,
            status_rx,
            cancel_token: cancel_token.clone(),
        };
        let handle = tokio::spawn(broadcaster.run());
        BroadcastHandle {
            cancel_token,
            handle,
        }
    }

    async fn run(self) {
        info!(song_id = %self.song_id, "sync broadcaster starting");
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => break,
                _ = interval.tick() => {
                    // Silent while paused; the loop itself keeps running
                    if *self.status_rx.borrow() != PlaybackStatus::Started {
                        continue;
                    }
                    match self.engine.position_ms().await {
                        Ok(position_ms) => {
                            // The host engine is the source of truth, not the
                            // extrapolated virtual clock
                            self.send(&SyncMessage::SetLrcTime {
                                lrc_id: self.song_id.clone(),
                                duration: self.total_duration_ms,
                                time: position_ms,
                            })
                            .await;
                        }
                        Err(err) => warn!("engine position unavailable: {err}"),
                    }
                }
            }
        }

        self.send(&SyncMessage::MusicStopped {
            lrc_id: self.song_id.clone(),
        })
        .await;
        info!(song_id = %self.song_id, "sync broadcaster stopped");
    }

    async fn send(&self, message: &SyncMessage) {
        match message.to_bytes() {
            Ok(bytes) => {
                if let Err(err) = self.channel.send(&bytes).await {
                    warn!("failed to send sync message: {err}");
                }
            }
            Err(err) => warn!("failed to encode sync message: {err}"),
        }
    }
}
