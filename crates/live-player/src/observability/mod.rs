//! Observability for the live player.
//!
//! The crate only records through the `metrics` facade; installing an
//! exporter is up to the host application. Log events use `tracing` with
//! `live_player.*` targets.
//!
//! # Metrics
//!
//! | Metric | Type | Labels | Purpose |
//! |--------|------|--------|---------|
//! | `live_player_status_transitions_total` | Counter | `from`, `to` | Status changes |
//! | `live_player_soft_retries_total` | Counter | none | Manifest re-requests on the same decoder |
//! | `live_player_reconnects_total` | Counter | none | Full pipeline reloads scheduled |
//! | `live_player_errors_total` | Counter | `reason` | Terminal error entries |
//! | `live_player_decoders_total` | Counter | `event` | Decoder construction and destruction |
//! | `live_player_fps` | Gauge | none | Last sampled frame rate |
//! | `live_player_dropped_frames` | Gauge | none | Cumulative dropped frames |
//!
//! Labels are bounded by the status, error and decoder-event enums.

pub mod metrics;

pub use self::metrics::{
    record_decoder_created, record_decoder_destroyed, record_perf_sample, record_reconnect,
    record_soft_retry, record_status_transition, record_terminal_error,
};
