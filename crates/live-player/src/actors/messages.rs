//! Message types for the controller mailbox.
//!
//! Requests that need an answer carry a `tokio::sync::oneshot` sender.

use crate::state::PlayerSnapshot;
use tokio::sync::oneshot;

/// Messages sent to `PlayerController`.
#[derive(Debug)]
pub enum ControllerMessage {
    /// New inputs from the embedding page.
    SetSource {
        stream_url: Option<String>,
        is_live: bool,
    },

    /// Tap-to-unmute gesture.
    UserTap,

    /// "Try again" from the error overlay.
    Retry,

    /// Read the current snapshot.
    GetSnapshot {
        respond_to: oneshot::Sender<PlayerSnapshot>,
    },

    /// Tear everything down and stop the actor.
    Shutdown {
        /// Fires once teardown has completed.
        respond_to: oneshot::Sender<()>,
    },
}

impl ControllerMessage {
    /// Message name for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            ControllerMessage::SetSource { .. } => "set_source",
            ControllerMessage::UserTap => "user_tap",
            ControllerMessage::Retry => "retry",
            ControllerMessage::GetSnapshot { .. } => "get_snapshot",
            ControllerMessage::Shutdown { .. } => "shutdown",
        }
    }
}
