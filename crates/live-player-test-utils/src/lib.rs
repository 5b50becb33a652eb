//! # Live Player Test Utilities
//!
//! Mock backends and fixtures for driving the live player without a real
//! media runtime.
//!
//! ## Modules
//!
//! - `mock_media` - Scriptable media element with a shared probe
//! - `mock_decoder` - Software decoder factory that records every instance
//! - `fixtures` - Stream URLs and capability presets
//!
//! ## Usage
//!
//! ```rust,ignore
//! use live_player::{PlayerConfig, PlayerController};
//! use live_player_test_utils::*;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::test(start_paused = true)]
//! async fn test_example() {
//!     let element = MockMediaElement::new();
//!     let factory = MockDecoderFactory::new();
//!     let probe = element.probe();
//!     let ledger = factory.ledger();
//!
//!     let (handle, _task) = PlayerController::spawn(
//!         PlayerConfig::default(),
//!         element,
//!         factory,
//!         CancellationToken::new(),
//!     );
//!     handle.set_source(Some(TestStream::live().url), true).await.unwrap();
//!
//!     handle.snapshot().await.unwrap();
//!
//!     ledger.latest().manifest_parsed();
//!     handle.snapshot().await.unwrap();
//!     assert_eq!(probe.play_calls(), 1);
//! }
//! ```

pub mod fixtures;
pub mod mock_decoder;
pub mod mock_media;

pub use fixtures::TestStream;
pub use mock_decoder::{DecoderHandle, DecoderLedger, MockDecoder, MockDecoderFactory};
pub use mock_media::{ElementProbe, MockMediaElement, PlayBehavior};

use tracing_subscriber::EnvFilter;

/// Install a test subscriber honoring `RUST_LOG` (default `live_player=debug`).
///
/// Safe to call from every test; only the first call installs.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("live_player=debug")),
        )
        .with_test_writer()
        .try_init();
}
