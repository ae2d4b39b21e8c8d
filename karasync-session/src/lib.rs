//! Synchronized karaoke playback sessions.
//!
//! A host drives a [`player::MusicPlayer`] over a [`engine::MediaEngine`]
//! and announces progress through a [`channel::MessageChannel`]; listeners
//! feed the same channel into a [`receiver::SyncReceiver`]. Both roles share
//! a [`session::LyricSession`] that a [`display::DisplayLoop`] polls to emit
//! per-line and per-word display updates.

pub mod broadcast;
pub mod channel;
pub mod display;
pub mod engine;
pub mod player;
pub mod receiver;
pub mod resolver;
pub mod session;

#[cfg(test)]
mod testutil;

pub use broadcast::{BroadcastHandle, SyncBroadcaster};
pub use channel::MessageChannel;
pub use display::DisplayLoop;
pub use engine::{ChannelMode, EngineEvent, MediaEngine};
pub use player::{MusicPlayer, PlaybackStatus, PlayerEvent, Role};
pub use receiver::{ReceiverEvent, SyncReceiver};
pub use resolver::{LocalSong, SongResolver};
pub use session::{DisplayEvent, LyricSession};
