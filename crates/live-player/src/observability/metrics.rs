//! Metric recording functions.
//!
//! All metrics use the `live_player_` prefix; counters end in `_total`.

use crate::perf::PerfSample;
use crate::state::PlaybackStatus;
use metrics::{counter, gauge};

// ============================================================================
// State machine
// ============================================================================

/// Record a status change.
///
/// Metric: `live_player_status_transitions_total`
/// Labels: `from`, `to` (6 statuses each)
pub fn record_status_transition(from: PlaybackStatus, to: PlaybackStatus) {
    counter!(
        "live_player_status_transitions_total",
        "from" => from.as_str(),
        "to" => to.as_str()
    )
    .increment(1);
}

/// Record a manifest re-request on the existing decoder.
///
/// Metric: `live_player_soft_retries_total`
pub fn record_soft_retry() {
    counter!("live_player_soft_retries_total").increment(1);
}

/// Record a scheduled hard reconnect.
///
/// Metric: `live_player_reconnects_total`
pub fn record_reconnect() {
    counter!("live_player_reconnects_total").increment(1);
}

/// Record entry into the `error` status.
///
/// Metric: `live_player_errors_total`
/// Labels: `reason` (bounded by `PlayerError` variants)
pub fn record_terminal_error(reason: &'static str) {
    counter!("live_player_errors_total", "reason" => reason).increment(1);
}

// ============================================================================
// Decoder lifecycle
// ============================================================================

/// Metric: `live_player_decoders_total{event="created"}`
pub fn record_decoder_created() {
    counter!("live_player_decoders_total", "event" => "created").increment(1);
}

/// Metric: `live_player_decoders_total{event="destroyed"}`
pub fn record_decoder_destroyed() {
    counter!("live_player_decoders_total", "event" => "destroyed").increment(1);
}

// ============================================================================
// Perf overlay
// ============================================================================

/// Publish the latest perf sample as gauges.
///
/// Metrics: `live_player_fps`, `live_player_dropped_frames`
pub fn record_perf_sample(sample: &PerfSample) {
    gauge!("live_player_fps").set(sample.fps);
    // u64 to f64 conversion is fine for realistic frame counts (< 2^53)
    #[allow(clippy::cast_precision_loss)]
    gauge!("live_player_dropped_frames").set(sample.dropped_frames as f64);
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::perf::StressLevel;
    use metrics_util::debugging::{DebugValue, DebuggingRecorder};

    // These execute the recording functions against the no-op global
    // recorder; they only check nothing panics without an exporter.

    #[test]
    fn test_record_status_transition() {
        record_status_transition(PlaybackStatus::Offline, PlaybackStatus::Loading);
        record_status_transition(PlaybackStatus::Loading, PlaybackStatus::Playing);
        record_status_transition(PlaybackStatus::Playing, PlaybackStatus::WaitingHls);
        record_status_transition(PlaybackStatus::Reconnecting, PlaybackStatus::Error);
    }

    #[test]
    fn test_record_retries() {
        record_soft_retry();
        record_reconnect();
        record_terminal_error("reconnect_exhausted");
    }

    #[test]
    fn test_record_decoder_lifecycle() {
        record_decoder_created();
        record_decoder_destroyed();
    }

    #[test]
    fn test_record_perf_sample() {
        record_perf_sample(&PerfSample {
            fps: 29.97,
            dropped_frames: 3,
            stress_level: StressLevel::Medium,
        });
    }

    #[test]
    fn test_counters_are_recorded_with_labels() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        metrics::with_local_recorder(&recorder, || {
            record_reconnect();
            record_reconnect();
            record_terminal_error("unsupported");
            record_status_transition(PlaybackStatus::Loading, PlaybackStatus::Playing);
        });

        let metrics = snapshotter.snapshot().into_vec();

        let reconnects = metrics
            .iter()
            .find(|(key, _, _, _)| key.key().name() == "live_player_reconnects_total")
            .map(|(_, _, _, value)| value.clone())
            .expect("reconnect counter should be recorded");
        assert!(matches!(reconnects, DebugValue::Counter(2)));

        let transition = metrics
            .iter()
            .find(|(key, _, _, _)| key.key().name() == "live_player_status_transitions_total")
            .expect("transition counter should be recorded");
        let labels: Vec<(String, String)> = transition
            .0
            .key()
            .labels()
            .map(|l| (l.key().to_string(), l.value().to_string()))
            .collect();
        assert!(labels.contains(&("from".to_string(), "loading".to_string())));
        assert!(labels.contains(&("to".to_string(), "playing".to_string())));

        assert!(metrics
            .iter()
            .any(|(key, _, _, _)| key.key().name() == "live_player_errors_total"));
    }
}
