//! Wire messages carried over the reliable ordered channel.
//!
//! The payload shape is fixed by the deployed protocol:
//! `{"cmd":"setLrcTime","lrcId":...,"duration":...,"time":...}` for position
//! sync and `{"cmd":"musicStopped","lrcId":...}` when the host stops.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd")]
pub enum SyncMessage {
    /// Periodic position snapshot from the host.
    #[serde(rename = "setLrcTime")]
    SetLrcTime {
        #[serde(rename = "lrcId")]
        lrc_id: String,
        /// Total media duration in milliseconds
        duration: u64,
        /// Authoritative playback position in milliseconds
        time: u64,
    },
    /// The host stopped playback; listeners stop display deterministically.
    #[serde(rename = "musicStopped")]
    MusicStopped {
        #[serde(rename = "lrcId")]
        lrc_id: String,
    },
}

impl SyncMessage {
    /// Serialize for the channel.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MalformedMessage`] if serialization fails, which
    /// does not happen for well-formed messages.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|err| CoreError::MalformedMessage {
            reason: err.to_string(),
        })
    }

    /// Parse an inbound payload.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MalformedMessage`] on invalid JSON or an unknown
    /// schema; receivers log and drop these rather than crashing.
    pub fn from_bytes(payload: &[u8]) -> Result<Self> {
        serde_json::from_slice(payload).map_err(|err| CoreError::MalformedMessage {
            reason: err.to_string(),
        })
    }

    /// The song id this message refers to.
    #[must_use]
    pub fn lrc_id(&self) -> &str {
        match self {
            Self::SetLrcTime { lrc_id, .. } | Self::MusicStopped { lrc_id } => lrc_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_lrc_time_wire_shape() {
        let message = SyncMessage::SetLrcTime {
            lrc_id: "song1".to_string(),
            duration: 180_000,
            time: 1000,
        };
        let bytes = message.to_bytes().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["cmd"], "setLrcTime");
        assert_eq!(value["lrcId"], "song1");
        assert_eq!(value["duration"], 180_000);
        assert_eq!(value["time"], 1000);
    }

    #[test]
    fn test_music_stopped_wire_shape() {
        let message = SyncMessage::MusicStopped {
            lrc_id: "song1".to_string(),
        };
        let bytes = message.to_bytes().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["cmd"], "musicStopped");
        assert_eq!(value["lrcId"], "song1");
    }

    #[test]
    fn test_parse_position_message() {
        let payload = br#"{"cmd":"setLrcTime","lrcId":"song1","duration":180000,"time":0}"#;
        let message = SyncMessage::from_bytes(payload).unwrap();
        assert_eq!(
            message,
            SyncMessage::SetLrcTime {
                lrc_id: "song1".to_string(),
                duration: 180_000,
                time: 0,
            }
        );
    }

    #[test]
    fn test_malformed_payloads_are_errors() {
        assert!(SyncMessage::from_bytes(b"not json").is_err());
        assert!(SyncMessage::from_bytes(br#"{"cmd":"unknown"}"#).is_err());
        assert!(SyncMessage::from_bytes(br#"{"cmd":"setLrcTime"}"#).is_err());
    }

    #[test]
    fn test_lrc_id_accessor() {
        let message = SyncMessage::MusicStopped {
            lrc_id: "abc".to_string(),
        };
        assert_eq!(message.lrc_id(), "abc");
    }
}
