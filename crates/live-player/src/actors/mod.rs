//! Actor wrapper around the playback state machine.
//!
//! ```text
//! PlayerControllerHandle ──mpsc──► PlayerController (one per player)
//!                                   ├── owns PlayerMachine
//!                                   ├── owns the media element and at most one decoder
//!                                   └── spawns session timers (child CancellationToken)
//! backends ──EventSink (unbounded)──┘
//! ```
//!
//! # Modules
//!
//! - [`controller`] - `PlayerController` actor and its handle
//! - [`messages`] - Message types for the controller mailbox

pub mod controller;
pub mod messages;

pub use controller::{PlayerController, PlayerControllerHandle};
pub use messages::ControllerMessage;
