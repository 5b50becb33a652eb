//! Mock software HLS decoder.
//!
//! Every decoder the factory constructs is recorded in a shared
//! [`DecoderLedger`]; tests use it to check the single-live-decoder
//! invariant and to inject decoder events into a specific instance.
//!
//! # Example
//!
//! ```rust,ignore
//! use live_player_test_utils::MockDecoderFactory;
//!
//! let factory = MockDecoderFactory::new();
//! let ledger = factory.ledger();
//! // ... spawn controller with `factory`, set a source ...
//! ledger.latest().manifest_parsed();
//! ledger.latest().network_error("manifestLoadError");
//! assert_eq!(ledger.max_live(), 1);
//! ```

use live_player::backend::{EventSink, HlsDecoder, HlsDecoderFactory};
use live_player::config::HlsTuning;
use live_player::errors::BackendError;
use live_player::machine::FatalError;
use std::sync::{Arc, Mutex};

#[derive(Debug)]
struct DecoderRecord {
    sink: EventSink,
    tuning: HlsTuning,
    url: Option<String>,
    attached: bool,
    destroyed: bool,
    start_load_calls: u32,
    recover_calls: u32,
}

#[derive(Debug, Default)]
struct LedgerState {
    decoders: Vec<DecoderRecord>,
    max_live: usize,
    fail_create: bool,
    fail_recover: bool,
}

impl LedgerState {
    fn live(&self) -> usize {
        self.decoders.iter().filter(|d| !d.destroyed).count()
    }
}

/// Shared record of every decoder a [`MockDecoderFactory`] built.
#[derive(Debug, Clone, Default)]
pub struct DecoderLedger {
    inner: Arc<Mutex<LedgerState>>,
}

impl DecoderLedger {
    /// Decoders constructed so far.
    pub fn created(&self) -> usize {
        self.inner.lock().unwrap().decoders.len()
    }

    /// Decoders destroyed so far.
    pub fn destroyed(&self) -> usize {
        self.inner
            .lock()
            .unwrap()
            .decoders
            .iter()
            .filter(|d| d.destroyed)
            .count()
    }

    /// Decoders constructed and not yet destroyed.
    pub fn live(&self) -> usize {
        self.inner.lock().unwrap().live()
    }

    /// Highest number of simultaneously live decoders ever observed.
    pub fn max_live(&self) -> usize {
        self.inner.lock().unwrap().max_live
    }

    /// Handle to the most recently constructed decoder.
    ///
    /// # Panics
    ///
    /// Panics if no decoder has been constructed.
    pub fn latest(&self) -> DecoderHandle {
        let state = self.inner.lock().unwrap();
        let index = state
            .decoders
            .len()
            .checked_sub(1)
            .expect("no decoder has been constructed");
        DecoderHandle {
            inner: Arc::clone(&self.inner),
            index,
        }
    }

    /// Handle to the `n`th constructed decoder (0-based).
    pub fn nth(&self, index: usize) -> Option<DecoderHandle> {
        let state = self.inner.lock().unwrap();
        (index < state.decoders.len()).then(|| DecoderHandle {
            inner: Arc::clone(&self.inner),
            index,
        })
    }
}

/// Test-side view of one decoder instance.
#[derive(Debug, Clone)]
pub struct DecoderHandle {
    inner: Arc<Mutex<LedgerState>>,
    index: usize,
}

impl DecoderHandle {
    fn read<T>(&self, f: impl FnOnce(&DecoderRecord) -> T) -> T {
        let state = self.inner.lock().unwrap();
        f(&state.decoders[self.index])
    }

    pub fn generation(&self) -> u64 {
        self.read(|d| d.sink.generation())
    }

    pub fn url(&self) -> Option<String> {
        self.read(|d| d.url.clone())
    }

    pub fn tuning(&self) -> HlsTuning {
        self.read(|d| d.tuning.clone())
    }

    pub fn is_attached(&self) -> bool {
        self.read(|d| d.attached)
    }

    pub fn is_destroyed(&self) -> bool {
        self.read(|d| d.destroyed)
    }

    pub fn start_load_calls(&self) -> u32 {
        self.read(|d| d.start_load_calls)
    }

    pub fn recover_calls(&self) -> u32 {
        self.read(|d| d.recover_calls)
    }

    /// Fire `MANIFEST_PARSED`.
    pub fn manifest_parsed(&self) -> bool {
        self.read(|d| d.sink.clone()).manifest_parsed()
    }

    /// Fire a fatal network error.
    pub fn network_error(&self, details: &str) -> bool {
        self.fatal(FatalError::Network(details.to_string()))
    }

    /// Fire a fatal media error.
    pub fn media_error(&self, details: &str) -> bool {
        self.fatal(FatalError::Media(details.to_string()))
    }

    /// Fire any other fatal error.
    pub fn other_error(&self, details: &str) -> bool {
        self.fatal(FatalError::Other(details.to_string()))
    }

    fn fatal(&self, error: FatalError) -> bool {
        self.read(|d| d.sink.clone()).fatal(error)
    }
}

/// Factory for [`MockDecoder`]s.
#[derive(Debug, Clone)]
pub struct MockDecoderFactory {
    supported: bool,
    ledger: DecoderLedger,
}

impl Default for MockDecoderFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDecoderFactory {
    #[must_use]
    pub fn new() -> Self {
        Self {
            supported: true,
            ledger: DecoderLedger::default(),
        }
    }

    /// A runtime without media source extensions.
    #[must_use]
    pub fn unsupported() -> Self {
        Self {
            supported: false,
            ledger: DecoderLedger::default(),
        }
    }

    /// Make construction fail.
    #[must_use]
    pub fn failing_create(self) -> Self {
        self.ledger.inner.lock().unwrap().fail_create = true;
        self
    }

    /// Make `recover_media_error` fail.
    #[must_use]
    pub fn failing_recovery(self) -> Self {
        self.ledger.inner.lock().unwrap().fail_recover = true;
        self
    }

    #[must_use]
    pub fn ledger(&self) -> DecoderLedger {
        self.ledger.clone()
    }
}

impl HlsDecoderFactory for MockDecoderFactory {
    type Decoder = MockDecoder;

    fn is_supported(&self) -> bool {
        self.supported
    }

    fn create(&self, tuning: &HlsTuning, events: EventSink) -> Result<MockDecoder, BackendError> {
        let mut state = self.ledger.inner.lock().unwrap();
        if state.fail_create {
            return Err(BackendError::DecoderConstruction(
                "mock decoder construction failed".to_string(),
            ));
        }

        let index = state.decoders.len();
        state.decoders.push(DecoderRecord {
            sink: events,
            tuning: tuning.clone(),
            url: None,
            attached: false,
            destroyed: false,
            start_load_calls: 0,
            recover_calls: 0,
        });
        state.max_live = state.max_live.max(state.live());

        Ok(MockDecoder {
            inner: Arc::clone(&self.ledger.inner),
            index,
        })
    }
}

/// Decoder instance owned by the controller.
#[derive(Debug)]
pub struct MockDecoder {
    inner: Arc<Mutex<LedgerState>>,
    index: usize,
}

impl MockDecoder {
    fn update<T>(&self, f: impl FnOnce(&mut DecoderRecord, &LedgerFlags) -> T) -> T {
        let mut state = self.inner.lock().unwrap();
        let flags = LedgerFlags {
            fail_recover: state.fail_recover,
        };
        let record = &mut state.decoders[self.index];
        if record.destroyed {
            panic!("decoder used after destroy()");
        }
        f(record, &flags)
    }
}

struct LedgerFlags {
    fail_recover: bool,
}

impl HlsDecoder for MockDecoder {
    fn load_source(&mut self, url: &str) -> Result<(), BackendError> {
        self.update(|d, _| d.url = Some(url.to_string()));
        Ok(())
    }

    fn attach_media(&mut self) -> Result<(), BackendError> {
        self.update(|d, _| d.attached = true);
        Ok(())
    }

    fn start_load(&mut self) -> Result<(), BackendError> {
        self.update(|d, _| d.start_load_calls += 1);
        Ok(())
    }

    fn recover_media_error(&mut self) -> Result<(), BackendError> {
        self.update(|d, flags| {
            d.recover_calls += 1;
            if flags.fail_recover {
                Err(BackendError::Recovery("mock recovery failed".to_string()))
            } else {
                Ok(())
            }
        })
    }

    fn destroy(&mut self) {
        let mut state = self.inner.lock().unwrap();
        let record = &mut state.decoders[self.index];
        record.destroyed = true;
        record.attached = false;
    }
}
