//! Seams between the controller and the playback runtime.
//!
//! Two collaborators sit behind traits:
//! - [`MediaElement`]: the single video-rendering surface (native HLS capable or not)
//! - [`HlsDecoderFactory`] / [`HlsDecoder`]: the software adaptive-streaming decoder
//!
//! Both report asynchronous happenings (manifest parsed, play outcome, fatal
//! errors) through an [`EventSink`] they receive when wired up. A sink is
//! stamped with the session generation it was created for, so callbacks from
//! a torn-down session are recognized and dropped by the state machine.

use crate::config::HlsTuning;
use crate::errors::BackendError;
use crate::machine::{BackendEvent, FatalError, PlayerEvent};
use tokio::sync::mpsc;

/// Callback registration handed to backends.
///
/// Cloning is cheap; dropping every clone is how a backend detaches its
/// listeners.
#[derive(Debug, Clone)]
pub struct EventSink {
    generation: u64,
    tx: mpsc::UnboundedSender<PlayerEvent>,
}

impl EventSink {
    #[must_use]
    pub fn new(generation: u64, tx: mpsc::UnboundedSender<PlayerEvent>) -> Self {
        Self { generation, tx }
    }

    /// Session generation this sink belongs to.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Report an event. Returns `false` if the controller is gone.
    pub fn emit(&self, event: BackendEvent) -> bool {
        self.tx
            .send(PlayerEvent::Backend {
                generation: self.generation,
                event,
            })
            .is_ok()
    }

    pub fn manifest_parsed(&self) -> bool {
        self.emit(BackendEvent::ManifestParsed)
    }

    pub fn loaded_metadata(&self) -> bool {
        self.emit(BackendEvent::LoadedMetadata)
    }

    pub fn can_play(&self) -> bool {
        self.emit(BackendEvent::CanPlay)
    }

    pub fn play_resolved(&self) -> bool {
        self.emit(BackendEvent::PlayResolved)
    }

    pub fn play_rejected(&self, reason: impl Into<String>) -> bool {
        self.emit(BackendEvent::PlayRejected {
            reason: reason.into(),
        })
    }

    pub fn fatal(&self, error: FatalError) -> bool {
        self.emit(BackendEvent::Fatal(error))
    }
}

/// The video-rendering surface.
///
/// The controller is its only writer. Implementations must make `reset`
/// idempotent.
pub trait MediaElement: Send + 'static {
    /// Whether the element can play HLS playlists without a software decoder.
    fn can_play_native_hls(&self) -> bool;

    /// Register listeners (metadata loaded, can play, play outcome, element
    /// errors). Replaces any previously bound sink.
    fn bind_events(&mut self, events: EventSink);

    /// Assign a playlist URL directly to the element (native path).
    fn set_source(&mut self, url: &str) -> Result<(), BackendError>;

    /// Start playback. The outcome is reported through the bound sink as
    /// `PlayResolved` or `PlayRejected`.
    fn play(&mut self);

    fn set_muted(&mut self, muted: bool);

    fn set_volume(&mut self, volume: f32);

    /// Drop listeners, clear the source and stop buffering.
    fn reset(&mut self);
}

/// Constructs software HLS decoders bound to the media element.
pub trait HlsDecoderFactory: Send + 'static {
    type Decoder: HlsDecoder;

    /// Whether a software decoder can run in this runtime.
    fn is_supported(&self) -> bool;

    /// Construct a decoder with the given buffering parameters. Decoder
    /// events (manifest parsed, fatal errors) go to `events`.
    fn create(&self, tuning: &HlsTuning, events: EventSink)
        -> Result<Self::Decoder, BackendError>;
}

/// A live software decoder instance.
pub trait HlsDecoder: Send + 'static {
    /// Point the decoder at a playlist.
    fn load_source(&mut self, url: &str) -> Result<(), BackendError>;

    /// Bind the decoder to the media element.
    fn attach_media(&mut self) -> Result<(), BackendError>;

    /// Re-request the manifest on this instance (no teardown).
    fn start_load(&mut self) -> Result<(), BackendError>;

    /// In-place recovery after a fatal decode error.
    fn recover_media_error(&mut self) -> Result<(), BackendError>;

    /// Release resources and detach from the media element.
    fn destroy(&mut self);
}

/// Factory for runtimes without a software decoder (native webviews).
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeOnly;

/// Decoder type of [`NativeOnly`]; it cannot be constructed.
#[derive(Debug)]
pub enum NoDecoder {}

impl HlsDecoderFactory for NativeOnly {
    type Decoder = NoDecoder;

    fn is_supported(&self) -> bool {
        false
    }

    fn create(
        &self,
        _tuning: &HlsTuning,
        _events: EventSink,
    ) -> Result<Self::Decoder, BackendError> {
        Err(BackendError::DecoderConstruction(
            "no software decoder in this runtime".to_string(),
        ))
    }
}

impl HlsDecoder for NoDecoder {
    fn load_source(&mut self, _url: &str) -> Result<(), BackendError> {
        match *self {}
    }

    fn attach_media(&mut self) -> Result<(), BackendError> {
        match *self {}
    }

    fn start_load(&mut self) -> Result<(), BackendError> {
        match *self {}
    }

    fn recover_media_error(&mut self) -> Result<(), BackendError> {
        match *self {}
    }

    fn destroy(&mut self) {
        match *self {}
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_stamps_generation() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = EventSink::new(7, tx);

        assert!(sink.manifest_parsed());
        assert!(sink.play_rejected("NotAllowedError"));

        match rx.try_recv().unwrap() {
            PlayerEvent::Backend { generation, event } => {
                assert_eq!(generation, 7);
                assert_eq!(event, BackendEvent::ManifestParsed);
            }
            other => panic!("unexpected event: {other:?}"),
        }
        match rx.try_recv().unwrap() {
            PlayerEvent::Backend { event, .. } => assert_eq!(
                event,
                BackendEvent::PlayRejected {
                    reason: "NotAllowedError".to_string()
                }
            ),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_sink_reports_closed_controller() {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = EventSink::new(1, tx);
        drop(rx);

        assert!(!sink.can_play());
    }

    #[test]
    fn test_native_only_factory() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let factory = NativeOnly;

        assert!(!factory.is_supported());
        assert!(factory
            .create(&HlsTuning::default(), EventSink::new(1, tx))
            .is_err());
    }
}
