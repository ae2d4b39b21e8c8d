//! Playback state machine.
//!
//! Owns the media engine lifecycle for the host role and translates engine
//! callbacks into state transitions and outward notifications. All mutation
//! runs through one lock-guarded inner state, and engine events are applied
//! by a single pump task in delivery order, so UI-triggered calls and the
//! engine's concurrent callback delivery cannot race.

use crate::broadcast::{BroadcastHandle, SyncBroadcaster};
use crate::channel::MessageChannel;
use crate::engine::{ChannelMode, EngineEvent, MediaEngine};
use crate::resolver::LocalSong;
use crate::session::LyricSession;
use karasync_core::{CoreError, Result, SyncConfig, SyncSnapshot};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Playback lifecycle states, ordered by progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PlaybackStatus {
    Idle,
    Opening,
    Opened,
    Started,
    Paused,
    Stopped,
}

impl PlaybackStatus {
    #[must_use]
    pub fn is_at_least(self, other: Self) -> bool {
        self >= other
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Opening => "opening",
            Self::Opened => "opened",
            Self::Started => "started",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
        }
    }
}

/// Session role: the host's engine is the source of truth for position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Host,
    Audience,
}

/// Outward notifications mirroring the state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    Opening,
    OpenCompleted,
    OpenError(i32),
    Playing,
    Paused,
    Stopped,
    Completed,
}

struct PlayerInner {
    role: Role,
    status: PlaybackStatus,
    channel_mode: ChannelMode,
    /// Song handed to the engine, promoted to `current` on open-complete
    opening: Option<LocalSong>,
    current: Option<LocalSong>,
    total_duration_ms: u64,
    broadcaster: Option<BroadcastHandle>,
    stop_waiters: Vec<oneshot::Sender<()>>,
}

pub struct MusicPlayer {
    engine: Arc<dyn MediaEngine>,
    channel: Arc<dyn MessageChannel>,
    session: Arc<LyricSession>,
    config: SyncConfig,
    inner: Mutex<PlayerInner>,
    status_tx: watch::Sender<PlaybackStatus>,
    event_tx: broadcast::Sender<PlayerEvent>,
}

impl MusicPlayer {
    #[must_use]
    pub fn new(
        engine: Arc<dyn MediaEngine>,
        channel: Arc<dyn MessageChannel>,
        session: Arc<LyricSession>,
        config: SyncConfig,
        role: Role,
    ) -> Arc<Self> {
        let (status_tx, _) = watch::channel(PlaybackStatus::Idle);
        let (event_tx, _) = broadcast::channel(64);
        Arc::new(Self {
            engine,
            channel,
            session,
            config,
            inner: Mutex::new(PlayerInner {
                role,
                status: PlaybackStatus::Idle,
                channel_mode: ChannelMode::default(),
                opening: None,
                current: None,
                total_duration_ms: 0,
                broadcaster: None,
                stop_waiters: Vec::new(),
            }),
            status_tx,
            event_tx,
        })
    }

    /// Subscribe to player notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.event_tx.subscribe()
    }

    /// Watch the playback status.
    #[must_use]
    pub fn status_watch(&self) -> watch::Receiver<PlaybackStatus> {
        self.status_tx.subscribe()
    }

    /// Current playback status.
    pub async fn status(&self) -> PlaybackStatus {
        self.inner.lock().await.status
    }

    /// Change the session role. The broadcaster only ever starts for a host.
    pub async fn set_role(&self, role: Role) {
        self.inner.lock().await.role = role;
    }

    /// Currently selected audio channel mix.
    pub async fn channel_mode(&self) -> ChannelMode {
        self.inner.lock().await.channel_mode
    }

    /// Start consuming engine callbacks. Events are applied strictly in
    /// delivery order; the task exits when the engine closes its stream.
    #[must_use]
    pub fn start(self: Arc<Self>, mut events: mpsc::Receiver<EngineEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                self.handle_event(event).await;
            }
            debug!("engine event stream closed");
        })
    }

    /// Open a local song for host playback. Fails fast, with no engine call,
    /// when the caller is not the host, a session is already open, a remote
    /// lyric-display session is active, or the local files are missing.
    ///
    /// # Errors
    ///
    /// Returns the distinct precondition error, or the engine's rejection.
    pub async fn open(&self, song: &LocalSong) -> Result<()> {
        {
            let mut inner = self.inner.lock().await;
            if inner.role != Role::Host {
                return Err(CoreError::NotHost);
            }
            if inner.status != PlaybackStatus::Idle {
                return Err(CoreError::SessionBusy {
                    status: inner.status.as_str().to_string(),
                });
            }
            if self.session.has_track().await {
                return Err(CoreError::DisplayActive);
            }
            if !song.audio_path.exists() {
                return Err(CoreError::MissingMediaFile {
                    path: song.audio_path.clone(),
                });
            }
            if !song.lyric_path.exists() {
                return Err(CoreError::MissingLyricFile {
                    path: song.lyric_path.clone(),
                });
            }

            info!(song_id = %song.song_id, "opening local song");
            inner.status = PlaybackStatus::Opening;
            inner.channel_mode = ChannelMode::default();
            inner.opening = Some(song.clone());
            self.status_tx.send_replace(PlaybackStatus::Opening);
        }

        if let Err(err) = self.engine.open(&song.audio_path, 0).await {
            let mut inner = self.inner.lock().await;
            self.reset_locked(&mut inner);
            return Err(err);
        }
        Ok(())
    }

    /// Request playback stop. The engine stop is asynchronous: this resolves
    /// only once the engine's stopped callback has been processed. A no-op
    /// when nothing is playing.
    ///
    /// # Errors
    ///
    /// Returns an error when the engine rejects the stop command.
    pub async fn stop(&self) -> Result<()> {
        let waiter = {
            let mut inner = self.inner.lock().await;
            if inner.status == PlaybackStatus::Idle {
                return Ok(());
            }
            let (tx, rx) = oneshot::channel();
            inner.stop_waiters.push(tx);
            rx
        };

        self.engine.stop().await?;
        // Resolved by the Stopped callback; a closed sender means the
        // session was torn down, which also counts as stopped.
        let _ = waiter.await;
        Ok(())
    }

    /// Toggle between playing and paused. A no-op in any other state.
    ///
    /// # Errors
    ///
    /// Returns an error when the engine rejects the command.
    pub async fn toggle_play(&self) -> Result<()> {
        let status = self.inner.lock().await.status;
        match status {
            PlaybackStatus::Started => self.engine.pause().await,
            PlaybackStatus::Paused => self.engine.resume().await,
            _ => Ok(()),
        }
    }

    /// Select the audible channel mix. Permitted in any state; the engine
    /// command is only issued once playback has started, otherwise the
    /// selection is applied when it does.
    ///
    /// # Errors
    ///
    /// Returns an error when the engine rejects the command.
    pub async fn select_track(&self, mode: ChannelMode) -> Result<()> {
        let audible = {
            let mut inner = self.inner.lock().await;
            inner.channel_mode = mode;
            inner.status.is_at_least(PlaybackStatus::Started)
                && inner.status != PlaybackStatus::Stopped
        };
        if audible {
            self.engine.set_channel_mode(mode).await?;
        }
        Ok(())
    }

    /// Toggle between the original mix and the accompaniment.
    ///
    /// # Errors
    ///
    /// Returns an error when the engine rejects the command.
    pub async fn toggle_track(&self) -> Result<()> {
        let mode = self.inner.lock().await.channel_mode.toggled();
        self.select_track(mode).await
    }

    /// Seek the engine to a position in milliseconds.
    ///
    /// # Errors
    ///
    /// Returns an error when the engine rejects the command.
    pub async fn seek(&self, position_ms: u64) -> Result<()> {
        self.engine.seek(position_ms).await
    }

    async fn handle_event(&self, event: EngineEvent) {
        match event {
            EngineEvent::Opening => self.on_opening().await,
            EngineEvent::OpenCompleted => self.on_open_completed().await,
            EngineEvent::OpenError(code) => self.on_open_error(code).await,
            EngineEvent::Playing => self.on_playing().await,
            EngineEvent::Paused => self.on_paused().await,
            EngineEvent::Stopped => self.on_stopped().await,
            EngineEvent::Completed => self.on_completed().await,
            EngineEvent::PositionChanged(position_ms) => self.on_position(position_ms).await,
        }
    }

    async fn on_opening(&self) {
        let inner = self.inner.lock().await;
        if inner.opening.is_none() {
            debug!("opening callback without a pending open, ignoring");
            return;
        }
        drop(inner);
        self.emit(PlayerEvent::Opening);
    }

    async fn on_open_completed(&self) {
        let mut inner = self.inner.lock().await;
        let Some(song) = inner.opening.take() else {
            // Late open-complete after a stop; the session has moved on
            debug!("stale open-complete callback, ignoring");
            return;
        };

        inner.status = PlaybackStatus::Opened;
        self.status_tx.send_replace(PlaybackStatus::Opened);

        // The engine's reported duration is authoritative from here on
        let total_duration_ms = match self.engine.duration_ms().await {
            Ok(duration) => duration,
            Err(err) => {
                warn!("engine did not report a duration: {err}");
                0
            }
        };
        inner.total_duration_ms = total_duration_ms;

        match song.load_lyric_track(total_duration_ms).await {
            Ok(track) => self.session.load_track(&song.song_id, track).await,
            Err(err) => {
                // Partial display beats aborting playback
                warn!(song_id = %song.song_id, "failed to load lyrics: {err}");
            }
        }

        inner.current = Some(song);
        if let Err(err) = self.engine.play().await {
            warn!("engine rejected play after open: {err}");
        }
        drop(inner);
        self.emit(PlayerEvent::OpenCompleted);
    }

    async fn on_open_error(&self, code: i32) {
        warn!("engine open failed with code {code}");
        let mut inner = self.inner.lock().await;
        self.reset_locked(&mut inner);
        drop(inner);
        self.session.clear().await;
        self.emit(PlayerEvent::OpenError(code));
    }

    async fn on_playing(&self) {
        let mut inner = self.inner.lock().await;
        let resumed = inner.status == PlaybackStatus::Paused;
        let already_started = inner.status == PlaybackStatus::Started;
        inner.status = PlaybackStatus::Started;
        self.status_tx.send_replace(PlaybackStatus::Started);

        if !already_started && !resumed {
            // First frame: the recorded channel selection becomes audible now
            let mode = inner.channel_mode;
            if let Err(err) = self.engine.set_channel_mode(mode).await {
                warn!("engine rejected channel mode: {err}");
            }
        }

        // Exactly one broadcaster per Started session, duplicate playing
        // callbacks included
        if inner.role == Role::Host && inner.broadcaster.is_none() {
            if let Some(song) = &inner.current {
                inner.broadcaster = Some(SyncBroadcaster::spawn(
                    Arc::clone(&self.engine),
                    Arc::clone(&self.channel),
                    song.song_id.clone(),
                    inner.total_duration_ms,
                    self.config.broadcast_interval(),
                    self.status_tx.subscribe(),
                ));
            }
        }
        drop(inner);
        self.emit(PlayerEvent::Playing);
    }

    async fn on_paused(&self) {
        let mut inner = self.inner.lock().await;
        if inner.status != PlaybackStatus::Started {
            debug!("paused callback in {}, ignoring", inner.status.as_str());
            return;
        }
        inner.status = PlaybackStatus::Paused;
        self.status_tx.send_replace(PlaybackStatus::Paused);
        drop(inner);
        self.emit(PlayerEvent::Paused);
    }

    async fn on_stopped(&self) {
        let mut inner = self.inner.lock().await;
        let waiters = std::mem::take(&mut inner.stop_waiters);
        if inner.status == PlaybackStatus::Idle {
            // Stop callback after the session already reset (e.g. following
            // natural completion); resolve waiters and move on
            debug!("stopped callback after reset, ignoring");
            drop(inner);
            for waiter in waiters {
                let _ = waiter.send(());
            }
            return;
        }

        info!("playback stopped");
        inner.status = PlaybackStatus::Stopped;
        self.status_tx.send_replace(PlaybackStatus::Stopped);
        let broadcaster = inner.broadcaster.take();
        self.reset_locked(&mut inner);
        drop(inner);

        if let Some(broadcaster) = broadcaster {
            broadcaster.shutdown().await;
        }
        self.session.clear().await;
        for waiter in waiters {
            let _ = waiter.send(());
        }
        self.emit(PlayerEvent::Stopped);
    }

    async fn on_completed(&self) {
        let mut inner = self.inner.lock().await;
        if !inner.status.is_at_least(PlaybackStatus::Started)
            || inner.status == PlaybackStatus::Stopped
        {
            debug!("completed callback in {}, ignoring", inner.status.as_str());
            return;
        }

        info!("playback completed");
        if let Err(err) = self.engine.stop().await {
            warn!("engine rejected stop after completion: {err}");
        }
        let waiters = std::mem::take(&mut inner.stop_waiters);
        let broadcaster = inner.broadcaster.take();
        self.reset_locked(&mut inner);
        drop(inner);

        if let Some(broadcaster) = broadcaster {
            broadcaster.shutdown().await;
        }
        self.session.clear().await;
        for waiter in waiters {
            let _ = waiter.send(());
        }
        self.emit(PlayerEvent::Completed);
    }

    async fn on_position(&self, position_ms: u64) {
        let snapshot = {
            let inner = self.inner.lock().await;
            if inner.role != Role::Host {
                return;
            }
            inner.current.as_ref().map(|song| {
                SyncSnapshot::new(song.song_id.clone(), inner.total_duration_ms, position_ms)
            })
        };
        if let Some(snapshot) = snapshot {
            self.session.observe(snapshot).await;
        }
    }

    /// Full reset back to Idle: track selection, pending songs, and the
    /// status watch. Any pending stop futures resolve here, so every path
    /// that resets the machine also releases its stop callers. Role
    /// survives; broadcaster teardown is the caller's job.
    fn reset_locked(&self, inner: &mut PlayerInner) {
        inner.status = PlaybackStatus::Idle;
        inner.channel_mode = ChannelMode::default();
        inner.opening = None;
        inner.current = None;
        inner.total_duration_ms = 0;
        for waiter in std::mem::take(&mut inner.stop_waiters) {
            let _ = waiter.send(());
        }
        self.status_tx.send_replace(PlaybackStatus::Idle);
    }

    fn emit(&self, event: PlayerEvent) {
        let _ = self.event_tx.send(event);
    }
}
