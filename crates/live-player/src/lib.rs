//! Live Player Library
//!
//! Playback controller for a live-broadcast viewer. Given a stream URL and an
//! "is live" flag from the embedding page, it attaches the stream to a single
//! media element, keeps it playing across transient failures, and reports a
//! [`PlayerSnapshot`] the page renders.
//!
//! # Architecture
//!
//! ```text
//! embedding page ──set_source/tap/retry──► PlayerControllerHandle
//!                                               │ mpsc
//!                                               ▼
//!                                  PlayerController (actor task)
//!                                    ├── PlayerMachine (pure transitions)
//!                                    ├── MediaElement
//!                                    └── HlsDecoder (at most one live)
//!
//! PerfMonitor (independent task) ──► Option<PerfSample>
//! ```
//!
//! # Key Design Decisions
//!
//! - **Pure state machine**: every policy decision lives in [`machine`] and
//!   returns effects; the actor only performs them
//! - **Two retry budgets**: soft waits reuse the decoder, hard reconnects
//!   rebuild the pipeline ([`policy`])
//! - **Generation fencing**: teardown bumps a generation so late callbacks and
//!   timers from an old session are ignored
//!
//! # Modules
//!
//! - [`actors`] - Controller actor and handle
//! - [`backend`] - Media element and decoder traits
//! - [`config`] - Configuration and host overrides
//! - [`errors`] - Error types
//! - [`machine`] - Playback state machine
//! - [`observability`] - Metrics
//! - [`perf`] - Frame-rate sampler
//! - [`policy`] - Retry counters
//! - [`state`] - Observable state

pub mod actors;
pub mod backend;
pub mod config;
pub mod errors;
pub mod machine;
pub mod observability;
pub mod perf;
pub mod policy;
pub mod state;

pub use actors::{PlayerController, PlayerControllerHandle};
pub use backend::{EventSink, HlsDecoder, HlsDecoderFactory, MediaElement, NativeOnly};
pub use config::{HlsTuning, PlayerConfig};
pub use errors::{BackendError, PlayerError};
pub use machine::{BackendEvent, FatalError};
pub use perf::{FrameStats, FrameStatsSource, PerfMonitor, PerfSample, StressLevel};
pub use policy::RetryPolicy;
pub use state::{PlaybackStatus, PlayerSnapshot};
