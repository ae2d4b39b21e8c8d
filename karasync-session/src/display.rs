//! Periodic display loop.
//!
//! Ticks on both roles for the life of a session: reads the virtual clock,
//! locates the active lyric line, and emits a display event. Ticks are no-ops
//! until an anchor and a track exist, so the loop can run continuously across
//! song changes; teardown is a bounded cancel + join.

use crate::session::LyricSession;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub struct DisplayLoop {
    session: Arc<LyricSession>,
    tick_interval: Duration,
    cancel_token: CancellationToken,
}

impl DisplayLoop {
    #[must_use]
    pub fn new(
        session: Arc<LyricSession>,
        tick_interval: Duration,
        cancel_token: Option<CancellationToken>,
    ) -> Self {
        Self {
            session,
            tick_interval,
            cancel_token: cancel_token.unwrap_or_default(),
        }
    }

    /// Get a clone of the cancellation token.
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Start ticking in a background task. Await the returned handle after
    /// cancelling to guarantee the loop has fully exited.
    #[must_use]
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(&self) {
        debug!("display loop starting ({:?} tick)", self.tick_interval);
        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    debug!("display loop shutting down");
                    break;
                }
                _ = interval.tick() => {
                    self.session.tick_display().await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::DisplayEvent;
    use karasync_core::{LyricTrack, SyncSnapshot};

    #[tokio::test(start_paused = true)]
    async fn test_loop_ticks_and_joins_on_cancel() {
        let session = LyricSession::new(Duration::from_millis(1000));
        let track = LyricTrack::parse("[00:01.00]hello\n[00:03.50]world", None).unwrap();
        session.load_track("song1", track).await;
        session.observe(SyncSnapshot::new("song1", 180_000, 1500)).await;

        let mut events = session.subscribe();
        let display = Arc::new(DisplayLoop::new(
            Arc::clone(&session),
            Duration::from_millis(50),
            None,
        ));
        let cancel = display.cancel_token();
        let handle = Arc::clone(&display).start();

        tokio::time::sleep(Duration::from_millis(120)).await;

        let mut saw_tick = false;
        while let Ok(event) = events.try_recv() {
            if let DisplayEvent::Tick { line, .. } = event {
                assert_eq!(line.index, 0);
                saw_tick = true;
            }
        }
        assert!(saw_tick);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_is_noop_before_first_anchor() {
        let session = LyricSession::new(Duration::from_millis(1000));
        let mut events = session.subscribe();
        let display = Arc::new(DisplayLoop::new(
            Arc::clone(&session),
            Duration::from_millis(50),
            None,
        ));
        let cancel = display.cancel_token();
        let handle = Arc::clone(&display).start();

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(events.try_recv().is_err());

        cancel.cancel();
        handle.await.unwrap();
    }
}
