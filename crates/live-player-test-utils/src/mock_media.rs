//! Scriptable media element.
//!
//! The element handed to the controller and its [`ElementProbe`] share state,
//! so a test can inspect what the controller did and inject element events
//! (metadata loaded, element errors) through the sink the controller bound.
//!
//! # Example
//!
//! ```rust,ignore
//! use live_player_test_utils::{MockMediaElement, PlayBehavior};
//!
//! let element = MockMediaElement::new().with_play_behavior(PlayBehavior::Reject);
//! let probe = element.probe();
//! // ... spawn controller with `element` ...
//! assert!(probe.emit_loaded_metadata());
//! ```

use live_player::backend::{EventSink, MediaElement};
use live_player::errors::BackendError;
use live_player::machine::FatalError;
use std::sync::{Arc, Mutex};

/// What `play()` reports back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayBehavior {
    /// Autoplay allowed.
    #[default]
    Resolve,
    /// Autoplay blocked by the browser policy.
    Reject,
    /// Stays outstanding until the test settles it through the probe.
    Pending,
}

#[derive(Debug)]
struct ElementState {
    native_hls: bool,
    sink: Option<EventSink>,
    source: Option<String>,
    muted: bool,
    volume: f32,
    play_calls: u32,
    reset_calls: u32,
    play_behavior: PlayBehavior,
    reject_sources: bool,
}

/// Mock media element.
#[derive(Debug, Clone)]
pub struct MockMediaElement {
    inner: Arc<Mutex<ElementState>>,
}

impl Default for MockMediaElement {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMediaElement {
    /// Desktop-style element: no native HLS, autoplay allowed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ElementState {
                native_hls: false,
                sink: None,
                source: None,
                muted: false,
                volume: 1.0,
                play_calls: 0,
                reset_calls: 0,
                play_behavior: PlayBehavior::Resolve,
                reject_sources: false,
            })),
        }
    }

    /// Element that plays HLS natively (mobile / webview).
    #[must_use]
    pub fn native() -> Self {
        Self::new().with_native_hls(true)
    }

    #[must_use]
    pub fn with_native_hls(self, native_hls: bool) -> Self {
        self.inner.lock().unwrap().native_hls = native_hls;
        self
    }

    #[must_use]
    pub fn with_play_behavior(self, behavior: PlayBehavior) -> Self {
        self.inner.lock().unwrap().play_behavior = behavior;
        self
    }

    /// Make `set_source` fail.
    #[must_use]
    pub fn rejecting_sources(self) -> Self {
        self.inner.lock().unwrap().reject_sources = true;
        self
    }

    /// Shared view for assertions and event injection.
    #[must_use]
    pub fn probe(&self) -> ElementProbe {
        ElementProbe {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl MediaElement for MockMediaElement {
    fn can_play_native_hls(&self) -> bool {
        self.inner.lock().unwrap().native_hls
    }

    fn bind_events(&mut self, events: EventSink) {
        self.inner.lock().unwrap().sink = Some(events);
    }

    fn set_source(&mut self, url: &str) -> Result<(), BackendError> {
        let mut state = self.inner.lock().unwrap();
        if state.reject_sources {
            return Err(BackendError::Attach(format!("element refused {url}")));
        }
        state.source = Some(url.to_string());
        Ok(())
    }

    fn play(&mut self) {
        let mut state = self.inner.lock().unwrap();
        state.play_calls += 1;

        let Some(sink) = state.sink.as_ref() else {
            return;
        };
        match state.play_behavior {
            PlayBehavior::Resolve => {
                sink.play_resolved();
            }
            PlayBehavior::Reject => {
                sink.play_rejected("NotAllowedError: play() failed because the user didn't interact");
            }
            PlayBehavior::Pending => {}
        }
    }

    fn set_muted(&mut self, muted: bool) {
        self.inner.lock().unwrap().muted = muted;
    }

    fn set_volume(&mut self, volume: f32) {
        self.inner.lock().unwrap().volume = volume;
    }

    fn reset(&mut self) {
        let mut state = self.inner.lock().unwrap();
        state.sink = None;
        state.source = None;
        state.reset_calls += 1;
    }
}

/// Test-side view of a [`MockMediaElement`].
#[derive(Debug, Clone)]
pub struct ElementProbe {
    inner: Arc<Mutex<ElementState>>,
}

impl ElementProbe {
    /// Source assigned on the native path, if any.
    pub fn source(&self) -> Option<String> {
        self.inner.lock().unwrap().source.clone()
    }

    pub fn is_muted(&self) -> bool {
        self.inner.lock().unwrap().muted
    }

    pub fn volume(&self) -> f32 {
        self.inner.lock().unwrap().volume
    }

    pub fn play_calls(&self) -> u32 {
        self.inner.lock().unwrap().play_calls
    }

    pub fn reset_calls(&self) -> u32 {
        self.inner.lock().unwrap().reset_calls
    }

    /// Whether listeners are currently bound.
    pub fn is_bound(&self) -> bool {
        self.inner.lock().unwrap().sink.is_some()
    }

    /// Generation of the currently bound sink.
    pub fn bound_generation(&self) -> Option<u64> {
        self.inner
            .lock()
            .unwrap()
            .sink
            .as_ref()
            .map(EventSink::generation)
    }

    pub fn set_play_behavior(&self, behavior: PlayBehavior) {
        self.inner.lock().unwrap().play_behavior = behavior;
    }

    /// Fire `loadedmetadata`. Returns `false` if nothing is bound.
    pub fn emit_loaded_metadata(&self) -> bool {
        self.with_sink(EventSink::loaded_metadata)
    }

    /// Fire `canplay`. Returns `false` if nothing is bound.
    pub fn emit_can_play(&self) -> bool {
        self.with_sink(EventSink::can_play)
    }

    /// Settle an outstanding `play()` as allowed.
    pub fn emit_play_resolved(&self) -> bool {
        self.with_sink(EventSink::play_resolved)
    }

    /// Fire an element `error` event.
    pub fn emit_error(&self, details: &str) -> bool {
        let details = details.to_string();
        self.with_sink(|sink| sink.fatal(FatalError::Element(details)))
    }

    fn with_sink(&self, f: impl FnOnce(&EventSink) -> bool) -> bool {
        let sink = self.inner.lock().unwrap().sink.clone();
        sink.as_ref().is_some_and(f)
    }
}
