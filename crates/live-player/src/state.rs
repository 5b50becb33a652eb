//! Observable player state.
//!
//! The embedding page only ever sees a [`PlayerSnapshot`]; it never mutates
//! playback directly.

use serde::{Deserialize, Serialize};

/// Playback status as rendered by the embedding page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackStatus {
    /// No live broadcast expected.
    #[default]
    Offline,
    /// URL present, decoder attaching.
    Loading,
    /// Broadcast expected but the stream is not (yet) reachable.
    WaitingHls,
    /// Media is decoding and rendering.
    Playing,
    /// Unrecoverable until the user acts.
    Error,
    /// Hard failure, reconnect scheduled.
    Reconnecting,
}

impl PlaybackStatus {
    /// Returns the status as a string for logs and metric labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            PlaybackStatus::Offline => "offline",
            PlaybackStatus::Loading => "loading",
            PlaybackStatus::WaitingHls => "waiting_hls",
            PlaybackStatus::Playing => "playing",
            PlaybackStatus::Error => "error",
            PlaybackStatus::Reconnecting => "reconnecting",
        }
    }
}

impl std::fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the embedding page renders.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub status: PlaybackStatus,
    pub error_message: Option<String>,
    pub needs_user_interaction: bool,
    /// Hard reconnects consumed in this session.
    pub reconnect_attempts: u32,
    /// Soft waits consumed in this session.
    pub waiting_attempts: u32,
}

impl PlayerSnapshot {
    /// Indicator text for the overlay.
    ///
    /// Every non-playing status maps to a distinct label so the viewer knows
    /// whether to wait or act.
    #[must_use]
    pub fn status_label(&self, reconnect_max: u32) -> String {
        match self.status {
            PlaybackStatus::Offline => "Offline".to_string(),
            PlaybackStatus::Loading => "Loading...".to_string(),
            PlaybackStatus::WaitingHls => "Waiting for the broadcast to start...".to_string(),
            PlaybackStatus::Playing if self.needs_user_interaction => {
                "Tap to unmute".to_string()
            }
            PlaybackStatus::Playing => "Live".to_string(),
            PlaybackStatus::Reconnecting => format!(
                "Reconnecting (attempt {}/{reconnect_max})...",
                self.reconnect_attempts
            ),
            PlaybackStatus::Error => "Playback error - try again".to_string(),
        }
    }
}

/// Playback paths available in the runtime, probed once from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// The media element plays HLS by itself.
    pub native_hls: bool,
    /// A software adaptive-streaming decoder is available.
    pub software_hls: bool,
}

impl Capabilities {
    /// Only native element playback is possible (mobile / native webview).
    #[must_use]
    pub const fn native_only(&self) -> bool {
        self.native_hls && !self.software_hls
    }
}

/// Which path the current session attached through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackPath {
    #[default]
    Detached,
    Native,
    Decoder,
}

/// Whether `url` ends in `extension`, ignoring any query string or fragment.
#[must_use]
pub fn has_playlist_extension(url: &str, extension: &str) -> bool {
    let path = url
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    path.len() > extension.len() && path.ends_with(extension)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&PlaybackStatus::WaitingHls).unwrap(),
            "\"waiting_hls\""
        );
        assert_eq!(PlaybackStatus::Reconnecting.as_str(), "reconnecting");
        assert_eq!(PlaybackStatus::default(), PlaybackStatus::Offline);
    }

    #[test]
    fn test_snapshot_json_contract() {
        let snapshot = PlayerSnapshot {
            status: PlaybackStatus::Playing,
            needs_user_interaction: true,
            ..PlayerSnapshot::default()
        };
        let json = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(json["status"], "playing");
        assert_eq!(json["error_message"], serde_json::Value::Null);
        assert_eq!(json["needs_user_interaction"], true);
    }

    #[test]
    fn test_playlist_extension() {
        assert!(has_playlist_extension("https://cdn.example.com/live/index.m3u8", ".m3u8"));
        assert!(has_playlist_extension(
            "https://cdn.example.com/live/index.m3u8?token=abc#t=10",
            ".m3u8"
        ));
        assert!(!has_playlist_extension("https://cdn.example.com/live.mp4", ".m3u8"));
        assert!(!has_playlist_extension("https://cdn.example.com/?f=a.m3u8", ".m3u8"));
        assert!(!has_playlist_extension(".m3u8", ".m3u8"));
        assert!(!has_playlist_extension("", ".m3u8"));
    }

    #[test]
    fn test_status_labels_are_distinct() {
        let statuses = [
            PlaybackStatus::Offline,
            PlaybackStatus::Loading,
            PlaybackStatus::WaitingHls,
            PlaybackStatus::Playing,
            PlaybackStatus::Error,
            PlaybackStatus::Reconnecting,
        ];
        let labels: std::collections::HashSet<String> = statuses
            .iter()
            .map(|status| {
                PlayerSnapshot {
                    status: *status,
                    ..PlayerSnapshot::default()
                }
                .status_label(5)
            })
            .collect();

        assert_eq!(labels.len(), statuses.len());
    }

    #[test]
    fn test_reconnecting_label_shows_attempts() {
        let snapshot = PlayerSnapshot {
            status: PlaybackStatus::Reconnecting,
            reconnect_attempts: 2,
            ..PlayerSnapshot::default()
        };
        assert_eq!(snapshot.status_label(5), "Reconnecting (attempt 2/5)...");
    }

    #[test]
    fn test_native_only() {
        let caps = Capabilities {
            native_hls: true,
            software_hls: false,
        };
        assert!(caps.native_only());
        let caps = Capabilities {
            native_hls: true,
            software_hls: true,
        };
        assert!(!caps.native_only());
    }
}
