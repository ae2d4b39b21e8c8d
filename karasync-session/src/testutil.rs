//! Shared test doubles for the session crate.

use crate::channel::MessageChannel;
use crate::engine::{ChannelMode, MediaEngine};
use crate::resolver::{LocalSong, SongResolver};
use async_trait::async_trait;
use karasync_core::{Result, SyncMessage};
use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Recording media engine with a scripted duration and settable position.
pub struct MockEngine {
    duration_ms: u64,
    position_ms: AtomicU64,
    commands: Mutex<Vec<String>>,
}

impl MockEngine {
    pub fn new(duration_ms: u64) -> Arc<Self> {
        Arc::new(Self {
            duration_ms,
            position_ms: AtomicU64::new(0),
            commands: Mutex::new(Vec::new()),
        })
    }

    pub fn set_position(&self, position_ms: u64) {
        self.position_ms.store(position_ms, Ordering::SeqCst);
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    fn record(&self, command: impl Into<String>) {
        self.commands.lock().unwrap().push(command.into());
    }
}

#[async_trait]
impl MediaEngine for MockEngine {
    async fn open(&self, path: &Path, start_position_ms: u64) -> Result<()> {
        self.record(format!("open:{}:{start_position_ms}", path.display()));
        Ok(())
    }

    async fn play(&self) -> Result<()> {
        self.record("play");
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        self.record("pause");
        Ok(())
    }

    async fn resume(&self) -> Result<()> {
        self.record("resume");
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.record("stop");
        Ok(())
    }

    async fn seek(&self, position_ms: u64) -> Result<()> {
        self.record(format!("seek:{position_ms}"));
        Ok(())
    }

    async fn set_channel_mode(&self, mode: ChannelMode) -> Result<()> {
        let name = match mode {
            ChannelMode::Original => "original",
            ChannelMode::Accompaniment => "accompaniment",
        };
        self.record(format!("channel_mode:{name}"));
        Ok(())
    }

    async fn duration_ms(&self) -> Result<u64> {
        Ok(self.duration_ms)
    }

    async fn position_ms(&self) -> Result<u64> {
        Ok(self.position_ms.load(Ordering::SeqCst))
    }
}

/// Message channel that records every sent payload.
#[derive(Default)]
pub struct MockChannel {
    payloads: Mutex<Vec<Vec<u8>>>,
}

impl MockChannel {
    /// Sent payloads decoded back into sync messages.
    pub fn messages(&self) -> Vec<SyncMessage> {
        self.payloads
            .lock()
            .unwrap()
            .iter()
            .map(|payload| SyncMessage::from_bytes(payload).unwrap())
            .collect()
    }
}

#[async_trait]
impl MessageChannel for MockChannel {
    async fn send(&self, payload: &[u8]) -> Result<()> {
        self.payloads.lock().unwrap().push(payload.to_vec());
        Ok(())
    }
}

/// Resolver that materializes a temp song after a fixed delay, recording
/// every prepare call.
pub struct MockResolver {
    delay: Duration,
    calls: Mutex<Vec<String>>,
}

impl MockResolver {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SongResolver for MockResolver {
    async fn prepare(&self, song_id: &str) -> Result<LocalSong> {
        self.calls.lock().unwrap().push(song_id.to_string());
        tokio::time::sleep(self.delay).await;
        Ok(temp_song(song_id))
    }
}

static SONG_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Create a real audio stub and lyric file on disk so open checks pass.
pub fn temp_song(name: &str) -> LocalSong {
    let seq = SONG_COUNTER.fetch_add(1, Ordering::SeqCst);
    let dir = std::env::temp_dir().join(format!(
        "karasync-test-{}-{name}-{seq}",
        std::process::id()
    ));
    std::fs::create_dir_all(&dir).unwrap();

    let audio_path = dir.join("song.mp3");
    std::fs::write(&audio_path, b"stub audio").unwrap();

    let lyric_path = dir.join("song.lrc");
    std::fs::write(&lyric_path, "[00:01.00]hello\n[00:03.50]world\n").unwrap();

    LocalSong::new(name, audio_path, lyric_path)
}
