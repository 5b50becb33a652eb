//! Frame-rate sampler for the perf overlay.
//!
//! Runs as its own task, independent of the playback state machine. While
//! enabled it reads cumulative frame counters from the media element once per
//! interval and publishes a [`PerfSample`]; while disabled it publishes `None`.

use crate::config::PlayerConfig;
use crate::observability::metrics;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

/// Below this frame rate the device is struggling badly.
pub const HIGH_STRESS_FPS: f64 = 15.0;

/// Below this frame rate playback is visibly degraded.
pub const MEDIUM_STRESS_FPS: f64 = 24.0;

/// Dropped frames per second above which stress is high.
pub const HIGH_STRESS_DROPS_PER_SEC: f64 = 5.0;

/// Coarse playback health shown in the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StressLevel {
    Low,
    Medium,
    High,
}

/// Cumulative frame counters as reported by the media element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStats {
    pub rendered_frames: u64,
    pub dropped_frames: u64,
}

/// One overlay reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerfSample {
    pub fps: f64,
    /// Cumulative dropped frames.
    pub dropped_frames: u64,
    pub stress_level: StressLevel,
}

/// Where the sampler reads frame counters from.
pub trait FrameStatsSource: Send + 'static {
    /// Current cumulative counters, or `None` if nothing is rendering.
    fn frame_stats(&self) -> Option<FrameStats>;
}

/// Classify stress from the frame rate and the drop rate.
#[must_use]
pub fn classify(fps: f64, dropped_per_sec: f64) -> StressLevel {
    if fps < HIGH_STRESS_FPS || dropped_per_sec > HIGH_STRESS_DROPS_PER_SEC {
        StressLevel::High
    } else if fps < MEDIUM_STRESS_FPS || dropped_per_sec > 0.0 {
        StressLevel::Medium
    } else {
        StressLevel::Low
    }
}

/// Turns successive counter readings into samples.
#[derive(Debug, Default)]
pub struct PerfSampler {
    baseline: Option<FrameStats>,
}

impl PerfSampler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a reading taken `elapsed` after the previous one.
    ///
    /// The first reading only establishes the baseline. Counters that go
    /// backwards (the element was reset) start a new baseline too.
    pub fn observe(&mut self, stats: FrameStats, elapsed: Duration) -> Option<PerfSample> {
        let previous = self.baseline.replace(stats)?;

        if stats.rendered_frames < previous.rendered_frames
            || stats.dropped_frames < previous.dropped_frames
            || elapsed.is_zero()
        {
            return None;
        }

        let secs = elapsed.as_secs_f64();
        // Frame counts stay far below 2^53
        #[allow(clippy::cast_precision_loss)]
        let fps = (stats.rendered_frames - previous.rendered_frames) as f64 / secs;
        #[allow(clippy::cast_precision_loss)]
        let dropped_per_sec = (stats.dropped_frames - previous.dropped_frames) as f64 / secs;

        Some(PerfSample {
            fps,
            dropped_frames: stats.dropped_frames,
            stress_level: classify(fps, dropped_per_sec),
        })
    }

    pub fn reset(&mut self) {
        self.baseline = None;
    }
}

/// Handle to a running sampler task.
#[derive(Debug)]
pub struct PerfMonitor {
    enabled: watch::Sender<bool>,
    samples: watch::Receiver<Option<PerfSample>>,
}

impl PerfMonitor {
    /// Spawn the sampler, ticking every `config.perf_interval`. It starts disabled.
    pub fn spawn<S: FrameStatsSource>(
        source: S,
        config: &PlayerConfig,
        cancel_token: CancellationToken,
    ) -> (Self, JoinHandle<()>) {
        let (enabled_tx, enabled_rx) = watch::channel(false);
        let (samples_tx, samples_rx) = watch::channel(None);

        let task = tokio::spawn(run_sampler(
            source,
            config.perf_interval,
            enabled_rx,
            samples_tx,
            cancel_token,
        ));

        (
            Self {
                enabled: enabled_tx,
                samples: samples_rx,
            },
            task,
        )
    }

    /// Toggle the overlay.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.send_replace(enabled);
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        *self.enabled.borrow()
    }

    /// Most recent sample, `None` while disabled or warming up.
    #[must_use]
    pub fn latest(&self) -> Option<PerfSample> {
        *self.samples.borrow()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<PerfSample>> {
        self.samples.clone()
    }
}

#[instrument(skip_all, name = "live_player.perf", fields(interval_ms = interval.as_millis()))]
async fn run_sampler<S: FrameStatsSource>(
    source: S,
    interval: Duration,
    mut enabled: watch::Receiver<bool>,
    samples: watch::Sender<Option<PerfSample>>,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut sampler = PerfSampler::new();
    let mut last_tick = Instant::now();

    debug!(target: "live_player.perf", "Perf sampler started");

    loop {
        let is_enabled = *enabled.borrow_and_update();

        tokio::select! {
            biased;

            () = cancel_token.cancelled() => {
                break;
            }

            changed = enabled.changed() => {
                if changed.is_err() {
                    // Monitor handle dropped
                    break;
                }
                if !*enabled.borrow() {
                    sampler.reset();
                    samples.send_replace(None);
                    debug!(target: "live_player.perf", "Perf overlay disabled");
                }
            }

            now = ticker.tick(), if is_enabled => {
                let elapsed = now.duration_since(last_tick);
                last_tick = now;

                match source.frame_stats() {
                    Some(stats) => {
                        if let Some(sample) = sampler.observe(stats, elapsed) {
                            metrics::record_perf_sample(&sample);
                            samples.send_replace(Some(sample));
                        }
                    }
                    None => {
                        sampler.reset();
                        samples.send_replace(None);
                    }
                }
            }
        }
    }

    info!(target: "live_player.perf", "Perf sampler stopped");
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn stats(rendered: u64, dropped: u64) -> FrameStats {
        FrameStats {
            rendered_frames: rendered,
            dropped_frames: dropped,
        }
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify(30.0, 0.0), StressLevel::Low);
        assert_eq!(classify(23.0, 0.0), StressLevel::Medium);
        assert_eq!(classify(30.0, 1.0), StressLevel::Medium);
        assert_eq!(classify(12.0, 0.0), StressLevel::High);
        assert_eq!(classify(30.0, 6.0), StressLevel::High);
    }

    #[test]
    fn test_first_reading_is_baseline() {
        let mut sampler = PerfSampler::new();
        assert!(sampler
            .observe(stats(100, 0), Duration::from_secs(1))
            .is_none());

        let sample = sampler
            .observe(stats(130, 0), Duration::from_secs(1))
            .expect("second reading produces a sample");
        assert!((sample.fps - 30.0).abs() < f64::EPSILON);
        assert_eq!(sample.stress_level, StressLevel::Low);
    }

    #[test]
    fn test_dropped_frames_are_cumulative() {
        let mut sampler = PerfSampler::new();
        sampler.observe(stats(0, 4), Duration::from_secs(1));

        let sample = sampler
            .observe(stats(50, 14), Duration::from_secs(2))
            .unwrap();
        assert!((sample.fps - 25.0).abs() < f64::EPSILON);
        assert_eq!(sample.dropped_frames, 14);
        // 5 drops/s is not above the threshold
        assert_eq!(sample.stress_level, StressLevel::Medium);
    }

    #[test]
    fn test_counter_reset_restarts_baseline() {
        let mut sampler = PerfSampler::new();
        sampler.observe(stats(1000, 10), Duration::from_secs(1));

        assert!(sampler.observe(stats(5, 0), Duration::from_secs(1)).is_none());
        assert!(sampler.observe(stats(35, 0), Duration::from_secs(1)).is_some());
    }

    #[test]
    fn test_sample_serializes_stress_snake_case() {
        let sample = PerfSample {
            fps: 29.5,
            dropped_frames: 2,
            stress_level: StressLevel::Medium,
        };
        let json = serde_json::to_value(sample).unwrap();
        assert_eq!(json["stress_level"], "medium");
    }
}
