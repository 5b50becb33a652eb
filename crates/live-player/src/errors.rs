//! Live player error types.
//!
//! `PlayerError` is what the embedding page can end up seeing, always through
//! [`PlayerError::client_message`]. Backend failures never escape the
//! controller; they are translated into state machine events.

use thiserror::Error;

/// Terminal playback errors.
///
/// Each variant corresponds to a reason the controller entered the `error`
/// status:
/// - `InvalidStreamUrl`: input error, no retry
/// - `Unsupported`: capability error, no retry
/// - `ReconnectExhausted`: hard-reconnect budget used up
/// - `PlaybackFailed`: non-recoverable decoder error (manifest/level load exhausted)
/// - `MediaElement`: native element error surfaced to the caller
/// - `Internal`: the decoder or element could not be set up
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlayerError {
    /// The stream URL does not reference a playlist.
    #[error("Invalid stream URL: {0}")]
    InvalidStreamUrl(String),

    /// No playable codec path exists in this runtime.
    #[error("Live video is not supported by this runtime")]
    Unsupported,

    /// Hard-reconnect attempts exhausted.
    #[error("Reconnect budget exhausted after {attempts} attempts")]
    ReconnectExhausted { attempts: u32 },

    /// The decoder gave up with a fatal, non-retryable error.
    #[error("Playback failed: {0}")]
    PlaybackFailed(String),

    /// The native media element reported a fatal error.
    #[error("Media element error: {0}")]
    MediaElement(String),

    /// Internal setup failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlayerError {
    /// Returns the message rendered by the embedding page.
    ///
    /// Decoder and setup details stay in the logs.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            PlayerError::InvalidStreamUrl(_) => {
                "Invalid stream URL: expected an HLS playlist (.m3u8)".to_string()
            }
            PlayerError::Unsupported => "This browser does not support live video".to_string(),
            PlayerError::ReconnectExhausted { .. } => {
                "Could not reconnect to the live stream. Please reload the page.".to_string()
            }
            PlayerError::PlaybackFailed(_) | PlayerError::Internal(_) => {
                "Live stream playback failed".to_string()
            }
            PlayerError::MediaElement(detail) => format!("Video playback error: {detail}"),
        }
    }

    /// Bounded label for metrics.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            PlayerError::InvalidStreamUrl(_) => "invalid_stream_url",
            PlayerError::Unsupported => "unsupported",
            PlayerError::ReconnectExhausted { .. } => "reconnect_exhausted",
            PlayerError::PlaybackFailed(_) => "playback_failed",
            PlayerError::MediaElement(_) => "media_element",
            PlayerError::Internal(_) => "internal",
        }
    }
}

/// Errors reported by media backends (element or decoder).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// The decoder could not be constructed.
    #[error("Decoder construction failed: {0}")]
    DecoderConstruction(String),

    /// Attaching a source or binding to the element failed.
    #[error("Attach failed: {0}")]
    Attach(String),

    /// In-place media error recovery threw.
    #[error("Media recovery failed: {0}")]
    Recovery(String),
}
