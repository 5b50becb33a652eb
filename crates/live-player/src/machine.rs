//! Playback state machine.
//!
//! [`PlayerMachine::handle`] is the whole controller policy written as a
//! transition function: it takes one [`PlayerEvent`], updates the session and
//! returns the [`Effect`]s the caller must carry out. It performs no I/O and
//! reads no clock, so every transition can be tested without a media element.
//!
//! # States
//!
//! ```text
//!            set_source(live, None)          soft budget left
//! offline ─────────────────────────► waiting_hls ◄──────────────┐
//!    │  set_source(live, url)             │ url / StartLoad      │ fatal network
//!    └──────────────► loading ◄───────────┘                      │
//!                        │ ready + play settled                   │
//!                        ▼                                        │
//!                     playing ───────────────────────────────────┘
//!                        │ soft budget spent / decode recovery failed
//!                        ▼
//!                   reconnecting ──(3s)──► loading     (budget spent ──► error)
//! ```
//!
//! # Generations
//!
//! Every teardown bumps the session generation. Effects carry the generation
//! their callbacks must be stamped with; stamped events from an older
//! generation are ignored. This makes timers and decoder callbacks that fire
//! after teardown harmless.

use crate::config::PlayerConfig;
use crate::errors::{BackendError, PlayerError};
use crate::policy::RetryCounter;
use crate::state::{has_playlist_extension, Capabilities, PlaybackPath, PlaybackStatus, PlayerSnapshot};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Volume applied by the tap-to-unmute gesture.
pub const UNMUTE_VOLUME: f32 = 1.0;

/// Fatal error classes reported by the decoder or element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FatalError {
    /// Manifest or segment fetch failed after the decoder's own retries.
    Network(String),
    /// Media decode error.
    Media(String),
    /// Anything else the decoder considers fatal (manifest/level load exhausted, ...).
    Other(String),
    /// The native media element failed.
    Element(String),
}

/// Events reported by backends through an `EventSink`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendEvent {
    ManifestParsed,
    LoadedMetadata,
    CanPlay,
    PlayResolved,
    PlayRejected { reason: String },
    Fatal(FatalError),
    /// In-place decode recovery threw.
    MediaRecoveryFailed { reason: String },
    /// The decoder could not be constructed or bound.
    AttachFailed(BackendError),
}

/// Timers the machine can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Live but no URL yet; re-check after the soft-wait delay.
    WaitForSource,
    /// Re-request the manifest on the same decoder.
    SoftRetry,
    /// Tear down and reload the whole pipeline.
    Reconnect,
}

impl TimerKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            TimerKind::WaitForSource => "wait_for_source",
            TimerKind::SoftRetry => "soft_retry",
            TimerKind::Reconnect => "reconnect",
        }
    }
}

/// Inputs to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    /// The embedding page supplied new inputs.
    SourceChanged {
        stream_url: Option<String>,
        is_live: bool,
    },
    /// Tap-to-unmute gesture.
    UserTap,
    /// "Try again" control in the error state.
    RetryRequested,
    /// Unmount.
    Shutdown,
    /// Decoder or element callback.
    Backend { generation: u64, event: BackendEvent },
    /// A scheduled timer elapsed.
    TimerFired { generation: u64, timer: TimerKind },
}

/// Work the caller must perform after a transition, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Cancel timers, destroy the decoder, reset the element. Idempotent.
    Teardown,
    /// Assign the URL to the element directly.
    AttachNative { generation: u64, url: String },
    /// Construct a software decoder and attach it to the element.
    AttachDecoder { generation: u64, url: String },
    /// Re-request the manifest on the current decoder.
    StartLoad { generation: u64 },
    /// In-place decoder recovery.
    RecoverMediaError { generation: u64 },
    /// Start playback on the element.
    Play { generation: u64, muted: bool },
    /// Unmute and set the volume.
    Unmute { volume: f32 },
    /// Fire `TimerFired { generation, timer }` after `delay`.
    ScheduleTimer {
        generation: u64,
        timer: TimerKind,
        delay: Duration,
    },
}

/// One playback session plus the policy that drives it.
#[derive(Debug)]
pub struct PlayerMachine {
    capabilities: Capabilities,
    playlist_extension: String,

    stream_url: Option<String>,
    is_live: bool,
    has_source: bool,

    status: PlaybackStatus,
    error: Option<PlayerError>,
    needs_user_interaction: bool,
    path: PlaybackPath,
    awaiting_play: bool,
    shut_down: bool,

    generation: u64,
    waiting: RetryCounter,
    reconnect: RetryCounter,
}

impl PlayerMachine {
    #[must_use]
    pub fn new(config: &PlayerConfig, capabilities: Capabilities) -> Self {
        Self {
            capabilities,
            playlist_extension: config.playlist_extension.clone(),
            stream_url: None,
            is_live: false,
            has_source: false,
            status: PlaybackStatus::Offline,
            error: None,
            needs_user_interaction: false,
            path: PlaybackPath::Detached,
            awaiting_play: false,
            shut_down: false,
            generation: 0,
            waiting: RetryCounter::new(config.waiting),
            reconnect: RetryCounter::new(config.reconnect),
        }
    }

    #[must_use]
    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    #[must_use]
    pub fn error(&self) -> Option<&PlayerError> {
        self.error.as_ref()
    }

    #[must_use]
    pub fn needs_user_interaction(&self) -> bool {
        self.needs_user_interaction
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn path(&self) -> PlaybackPath {
        self.path
    }

    #[must_use]
    pub fn waiting_attempts(&self) -> u32 {
        self.waiting.attempts()
    }

    #[must_use]
    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect.attempts()
    }

    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// The output contract rendered by the embedding page.
    #[must_use]
    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            status: self.status,
            error_message: self.error.as_ref().map(PlayerError::client_message),
            needs_user_interaction: self.needs_user_interaction,
            reconnect_attempts: self.reconnect.attempts(),
            waiting_attempts: self.waiting.attempts(),
        }
    }

    /// Apply one event and return the effects to perform.
    pub fn handle(&mut self, event: PlayerEvent) -> Vec<Effect> {
        if self.shut_down {
            return Vec::new();
        }

        match event {
            PlayerEvent::SourceChanged {
                stream_url,
                is_live,
            } => self.on_source_changed(stream_url, is_live),
            PlayerEvent::UserTap => self.on_user_tap(),
            PlayerEvent::RetryRequested => self.on_retry_requested(),
            PlayerEvent::Shutdown => self.on_shutdown(),
            PlayerEvent::Backend { generation, event } => {
                if generation != self.generation {
                    debug!(
                        target: "live_player.machine",
                        stale = generation,
                        current = self.generation,
                        ?event,
                        "Ignoring event from torn-down session"
                    );
                    return Vec::new();
                }
                self.on_backend_event(event)
            }
            PlayerEvent::TimerFired { generation, timer } => {
                if generation != self.generation {
                    debug!(
                        target: "live_player.machine",
                        stale = generation,
                        current = self.generation,
                        timer = timer.as_str(),
                        "Ignoring timer from torn-down session"
                    );
                    return Vec::new();
                }
                self.on_timer(timer)
            }
        }
    }

    // ------------------------------------------------------------------
    // Caller inputs
    // ------------------------------------------------------------------

    fn on_source_changed(&mut self, stream_url: Option<String>, is_live: bool) -> Vec<Effect> {
        let stream_url = stream_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());

        if self.has_source && self.stream_url == stream_url && self.is_live == is_live {
            return Vec::new();
        }

        info!(
            target: "live_player.machine",
            stream_url = stream_url.as_deref().unwrap_or(""),
            is_live,
            "Source changed"
        );

        self.has_source = true;
        self.stream_url = stream_url;
        self.is_live = is_live;
        self.waiting.reset();
        self.reconnect.reset();

        self.begin_session()
    }

    fn on_user_tap(&mut self) -> Vec<Effect> {
        if self.status != PlaybackStatus::Playing || !self.needs_user_interaction {
            return Vec::new();
        }

        self.needs_user_interaction = false;
        self.awaiting_play = true;
        vec![
            Effect::Unmute {
                volume: UNMUTE_VOLUME,
            },
            Effect::Play {
                generation: self.generation,
                muted: false,
            },
        ]
    }

    fn on_retry_requested(&mut self) -> Vec<Effect> {
        if self.status != PlaybackStatus::Error {
            return Vec::new();
        }

        info!(target: "live_player.machine", "User requested retry");
        self.waiting.reset();
        self.reconnect.reset();
        self.begin_session()
    }

    fn on_shutdown(&mut self) -> Vec<Effect> {
        info!(target: "live_player.machine", "Shutting down");
        let effects = self.teardown();
        self.shut_down = true;
        self.status = PlaybackStatus::Offline;
        self.error = None;
        effects
    }

    // ------------------------------------------------------------------
    // Backend events
    // ------------------------------------------------------------------

    fn on_backend_event(&mut self, event: BackendEvent) -> Vec<Effect> {
        match event {
            BackendEvent::ManifestParsed | BackendEvent::LoadedMetadata | BackendEvent::CanPlay => {
                self.on_ready()
            }
            BackendEvent::PlayResolved => self.on_play_settled(false),
            BackendEvent::PlayRejected { reason } => {
                info!(
                    target: "live_player.machine",
                    reason = %reason,
                    "Autoplay blocked, waiting for user gesture"
                );
                self.on_play_settled(true)
            }
            BackendEvent::Fatal(error) => self.on_fatal(error),
            BackendEvent::MediaRecoveryFailed { reason } => {
                warn!(
                    target: "live_player.machine",
                    reason = %reason,
                    "Media error recovery failed"
                );
                self.hard_reconnect()
            }
            BackendEvent::AttachFailed(error) => {
                self.fail(PlayerError::Internal(error.to_string()))
            }
        }
    }

    fn on_ready(&mut self) -> Vec<Effect> {
        let attempting = matches!(
            self.status,
            PlaybackStatus::Loading | PlaybackStatus::WaitingHls
        );
        if !attempting || self.path == PlaybackPath::Detached || self.awaiting_play {
            return Vec::new();
        }

        self.awaiting_play = true;
        vec![Effect::Play {
            generation: self.generation,
            // Native webviews only allow muted autoplay
            muted: self.capabilities.native_only(),
        }]
    }

    fn on_play_settled(&mut self, blocked: bool) -> Vec<Effect> {
        // Only the outcome of an outstanding play() counts. A fatal error
        // since then has cleared it, and the recovery path owns the status.
        if !self.awaiting_play {
            debug!(
                target: "live_player.machine",
                status = %self.status,
                "Ignoring play outcome with no play outstanding"
            );
            return Vec::new();
        }
        let settles = matches!(
            self.status,
            PlaybackStatus::Loading | PlaybackStatus::WaitingHls | PlaybackStatus::Playing
        );
        if !settles || self.path == PlaybackPath::Detached {
            return Vec::new();
        }

        self.awaiting_play = false;
        self.status = PlaybackStatus::Playing;
        self.error = None;
        self.needs_user_interaction = blocked;
        self.waiting.reset();
        self.reconnect.reset();
        Vec::new()
    }

    fn on_fatal(&mut self, error: FatalError) -> Vec<Effect> {
        // The pipeline is about to be rebuilt; the old decoder has nothing left to say.
        if self.status == PlaybackStatus::Reconnecting {
            return Vec::new();
        }

        match (self.path, error) {
            (PlaybackPath::Decoder, FatalError::Network(details)) if self.is_live => {
                match self.waiting.try_consume() {
                    Some(delay) => {
                        warn!(
                            target: "live_player.machine",
                            details = %details,
                            attempt = self.waiting.attempts(),
                            max_attempts = self.waiting.policy().max_attempts,
                            "Fatal network error, waiting for stream"
                        );
                        self.status = PlaybackStatus::WaitingHls;
                        self.awaiting_play = false;
                        self.needs_user_interaction = false;
                        vec![Effect::ScheduleTimer {
                            generation: self.generation,
                            timer: TimerKind::SoftRetry,
                            delay,
                        }]
                    }
                    None => {
                        warn!(
                            target: "live_player.machine",
                            details = %details,
                            "Soft-wait budget exhausted"
                        );
                        self.hard_reconnect()
                    }
                }
            }
            (PlaybackPath::Decoder, FatalError::Media(details)) => {
                warn!(
                    target: "live_player.machine",
                    details = %details,
                    "Fatal media error, attempting in-place recovery"
                );
                vec![Effect::RecoverMediaError {
                    generation: self.generation,
                }]
            }
            (PlaybackPath::Native, error) => {
                let details = match error {
                    FatalError::Network(d)
                    | FatalError::Media(d)
                    | FatalError::Other(d)
                    | FatalError::Element(d) => d,
                };
                self.fail(PlayerError::MediaElement(details))
            }
            (_, FatalError::Element(details)) => self.fail(PlayerError::MediaElement(details)),
            (_, FatalError::Network(details))
            | (_, FatalError::Media(details))
            | (_, FatalError::Other(details)) => self.fail(PlayerError::PlaybackFailed(details)),
        }
    }

    // ------------------------------------------------------------------
    // Timers
    // ------------------------------------------------------------------

    fn on_timer(&mut self, timer: TimerKind) -> Vec<Effect> {
        match timer {
            TimerKind::WaitForSource => {
                if self.status != PlaybackStatus::WaitingHls || self.path != PlaybackPath::Detached
                {
                    return Vec::new();
                }
                match self.waiting.try_consume() {
                    Some(delay) if !self.waiting.is_exhausted() => {
                        debug!(
                            target: "live_player.machine",
                            attempt = self.waiting.attempts(),
                            "Still no stream URL"
                        );
                        vec![Effect::ScheduleTimer {
                            generation: self.generation,
                            timer: TimerKind::WaitForSource,
                            delay,
                        }]
                    }
                    _ => {
                        info!(
                            target: "live_player.machine",
                            attempts = self.waiting.attempts(),
                            "No stream URL arrived, going offline"
                        );
                        self.status = PlaybackStatus::Offline;
                        Vec::new()
                    }
                }
            }
            TimerKind::SoftRetry => {
                if self.status != PlaybackStatus::WaitingHls || self.path != PlaybackPath::Decoder {
                    return Vec::new();
                }
                debug!(
                    target: "live_player.machine",
                    attempt = self.waiting.attempts(),
                    "Re-requesting manifest"
                );
                vec![Effect::StartLoad {
                    generation: self.generation,
                }]
            }
            TimerKind::Reconnect => {
                if self.status != PlaybackStatus::Reconnecting {
                    return Vec::new();
                }
                info!(
                    target: "live_player.machine",
                    attempt = self.reconnect.attempts(),
                    "Reloading pipeline"
                );
                self.begin_session()
            }
        }
    }

    // ------------------------------------------------------------------
    // Session lifecycle
    // ------------------------------------------------------------------

    /// Tear down whatever is attached and start over from the current inputs.
    fn begin_session(&mut self) -> Vec<Effect> {
        let mut effects = self.teardown();
        self.error = None;

        if !self.is_live {
            self.status = PlaybackStatus::Offline;
            return effects;
        }

        match self.stream_url.clone() {
            None => {
                self.status = PlaybackStatus::WaitingHls;
                effects.push(Effect::ScheduleTimer {
                    generation: self.generation,
                    timer: TimerKind::WaitForSource,
                    delay: self.waiting.policy().delay,
                });
                effects
            }
            Some(url) => {
                effects.extend(self.attach(url));
                effects
            }
        }
    }

    fn attach(&mut self, url: String) -> Vec<Effect> {
        if !self.capabilities.native_only()
            && !has_playlist_extension(&url, &self.playlist_extension)
        {
            warn!(
                target: "live_player.machine",
                stream_url = %url,
                expected = %self.playlist_extension,
                "Rejecting stream URL"
            );
            return self.fail(PlayerError::InvalidStreamUrl(url));
        }

        let generation = self.generation;
        if self.capabilities.native_hls {
            self.path = PlaybackPath::Native;
            self.status = PlaybackStatus::Loading;
            vec![Effect::AttachNative { generation, url }]
        } else if self.capabilities.software_hls {
            self.path = PlaybackPath::Decoder;
            self.status = PlaybackStatus::Loading;
            vec![Effect::AttachDecoder { generation, url }]
        } else {
            self.fail(PlayerError::Unsupported)
        }
    }

    fn hard_reconnect(&mut self) -> Vec<Effect> {
        match self.reconnect.try_consume() {
            Some(delay) => {
                warn!(
                    target: "live_player.machine",
                    attempt = self.reconnect.attempts(),
                    max_attempts = self.reconnect.policy().max_attempts,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "Scheduling reconnect"
                );
                self.status = PlaybackStatus::Reconnecting;
                self.awaiting_play = false;
                self.needs_user_interaction = false;
                vec![Effect::ScheduleTimer {
                    generation: self.generation,
                    timer: TimerKind::Reconnect,
                    delay,
                }]
            }
            None => self.fail(PlayerError::ReconnectExhausted {
                attempts: self.reconnect.attempts(),
            }),
        }
    }

    /// Enter `error`, releasing the pipeline. No timers are scheduled.
    fn fail(&mut self, error: PlayerError) -> Vec<Effect> {
        warn!(
            target: "live_player.machine",
            error = %error,
            "Playback entered error state"
        );
        let effects = self.teardown();
        self.status = PlaybackStatus::Error;
        self.error = Some(error);
        effects
    }

    /// Invalidate the current generation and release the pipeline.
    fn teardown(&mut self) -> Vec<Effect> {
        self.generation += 1;
        self.path = PlaybackPath::Detached;
        self.awaiting_play = false;
        self.needs_user_interaction = false;
        vec![Effect::Teardown]
    }
}
