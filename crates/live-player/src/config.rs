//! Live player configuration.
//!
//! Everything has a default matching the production player. Hosts that keep
//! overrides as key/value pairs can build a config with
//! [`PlayerConfig::from_vars`]; the controller itself never reads the
//! environment.

use crate::policy::{
    RetryPolicy, DEFAULT_RECONNECT_DELAY, DEFAULT_RECONNECT_MAX_ATTEMPTS, DEFAULT_WAIT_DELAY,
    DEFAULT_WAIT_MAX_ATTEMPTS,
};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default playlist extension required on the decoder path.
pub const DEFAULT_PLAYLIST_EXTENSION: &str = ".m3u8";

/// Default perf sampling interval.
pub const DEFAULT_PERF_INTERVAL: Duration = Duration::from_secs(1);

/// Default back-buffer window kept behind the playhead.
pub const DEFAULT_BACK_BUFFER: Duration = Duration::from_secs(10);

/// Default forward-buffer window.
pub const DEFAULT_MAX_BUFFER: Duration = Duration::from_secs(10);

/// Default decoder-internal manifest retry count.
pub const DEFAULT_MANIFEST_MAX_RETRY: u32 = 3;

/// Default decoder-internal level playlist retry count.
pub const DEFAULT_LEVEL_MAX_RETRY: u32 = 3;

/// Default manifest load timeout.
pub const DEFAULT_MANIFEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default level playlist load timeout.
pub const DEFAULT_LEVEL_TIMEOUT: Duration = Duration::from_secs(10);

/// Default media segment load timeout.
pub const DEFAULT_FRAGMENT_TIMEOUT: Duration = Duration::from_secs(20);

/// Buffering parameters handed to the software HLS decoder.
///
/// Small windows and low-latency mode keep the player close to the live edge;
/// the retry counts bound how long the decoder tries on its own before
/// raising a fatal error to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HlsTuning {
    pub back_buffer_length: Duration,
    pub max_buffer_length: Duration,
    pub low_latency_mode: bool,
    pub manifest_loading_max_retry: u32,
    pub level_loading_max_retry: u32,
    pub manifest_loading_timeout: Duration,
    pub level_loading_timeout: Duration,
    pub fragment_loading_timeout: Duration,
}

impl Default for HlsTuning {
    fn default() -> Self {
        Self {
            back_buffer_length: DEFAULT_BACK_BUFFER,
            max_buffer_length: DEFAULT_MAX_BUFFER,
            low_latency_mode: true,
            manifest_loading_max_retry: DEFAULT_MANIFEST_MAX_RETRY,
            level_loading_max_retry: DEFAULT_LEVEL_MAX_RETRY,
            manifest_loading_timeout: DEFAULT_MANIFEST_TIMEOUT,
            level_loading_timeout: DEFAULT_LEVEL_TIMEOUT,
            fragment_loading_timeout: DEFAULT_FRAGMENT_TIMEOUT,
        }
    }
}

/// Playback controller configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerConfig {
    /// Soft-wait policy ("stream not yet available").
    pub waiting: RetryPolicy,

    /// Hard-reconnect policy (full pipeline reload).
    pub reconnect: RetryPolicy,

    /// Extension a URL must end in on the decoder path (default: ".m3u8").
    pub playlist_extension: String,

    /// Perf overlay sampling interval (default: 1s).
    pub perf_interval: Duration,

    /// Software decoder buffering parameters.
    pub hls: HlsTuning,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            waiting: RetryPolicy::waiting(),
            reconnect: RetryPolicy::reconnect(),
            playlist_extension: DEFAULT_PLAYLIST_EXTENSION.to_string(),
            perf_interval: DEFAULT_PERF_INTERVAL,
            hls: HlsTuning::default(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

impl PlayerConfig {
    /// Load configuration from host-supplied key/value overrides.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let wait_max_attempts = parse_var(
            vars,
            "LIVE_PLAYER_WAIT_MAX_ATTEMPTS",
            DEFAULT_WAIT_MAX_ATTEMPTS,
        )?;
        let wait_delay = parse_millis(vars, "LIVE_PLAYER_WAIT_DELAY_MS", DEFAULT_WAIT_DELAY)?;

        let reconnect_max_attempts = parse_var(
            vars,
            "LIVE_PLAYER_RECONNECT_MAX_ATTEMPTS",
            DEFAULT_RECONNECT_MAX_ATTEMPTS,
        )?;
        let reconnect_delay = parse_millis(
            vars,
            "LIVE_PLAYER_RECONNECT_DELAY_MS",
            DEFAULT_RECONNECT_DELAY,
        )?;

        for (key, value) in [
            ("LIVE_PLAYER_WAIT_MAX_ATTEMPTS", wait_max_attempts),
            ("LIVE_PLAYER_RECONNECT_MAX_ATTEMPTS", reconnect_max_attempts),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    reason: "must be at least 1".to_string(),
                });
            }
        }

        let playlist_extension = vars
            .get("LIVE_PLAYER_PLAYLIST_EXTENSION")
            .cloned()
            .unwrap_or_else(|| DEFAULT_PLAYLIST_EXTENSION.to_string());
        if !playlist_extension.starts_with('.') || playlist_extension.len() < 2 {
            return Err(ConfigError::InvalidValue {
                key: "LIVE_PLAYER_PLAYLIST_EXTENSION".to_string(),
                reason: format!("'{playlist_extension}' must start with '.'"),
            });
        }

        let perf_interval =
            parse_millis(vars, "LIVE_PLAYER_PERF_INTERVAL_MS", DEFAULT_PERF_INTERVAL)?;
        if perf_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "LIVE_PLAYER_PERF_INTERVAL_MS".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        let hls = HlsTuning {
            back_buffer_length: parse_secs(vars, "LIVE_PLAYER_BACK_BUFFER_SECS", DEFAULT_BACK_BUFFER)?,
            max_buffer_length: parse_secs(vars, "LIVE_PLAYER_MAX_BUFFER_SECS", DEFAULT_MAX_BUFFER)?,
            low_latency_mode: parse_bool(vars, "LIVE_PLAYER_LOW_LATENCY", true)?,
            manifest_loading_max_retry: parse_var(
                vars,
                "LIVE_PLAYER_MANIFEST_MAX_RETRY",
                DEFAULT_MANIFEST_MAX_RETRY,
            )?,
            level_loading_max_retry: parse_var(
                vars,
                "LIVE_PLAYER_LEVEL_MAX_RETRY",
                DEFAULT_LEVEL_MAX_RETRY,
            )?,
            manifest_loading_timeout: parse_millis(
                vars,
                "LIVE_PLAYER_MANIFEST_TIMEOUT_MS",
                DEFAULT_MANIFEST_TIMEOUT,
            )?,
            level_loading_timeout: parse_millis(
                vars,
                "LIVE_PLAYER_LEVEL_TIMEOUT_MS",
                DEFAULT_LEVEL_TIMEOUT,
            )?,
            fragment_loading_timeout: parse_millis(
                vars,
                "LIVE_PLAYER_FRAGMENT_TIMEOUT_MS",
                DEFAULT_FRAGMENT_TIMEOUT,
            )?,
        };

        Ok(PlayerConfig {
            waiting: RetryPolicy::new(wait_max_attempts, wait_delay),
            reconnect: RetryPolicy::new(reconnect_max_attempts, reconnect_delay),
            playlist_extension,
            perf_interval,
            hls,
        })
    }
}

fn parse_var<T: FromStr>(
    vars: &HashMap<String, String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match vars.get(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            reason: format!("'{raw}' is not a valid number"),
        }),
    }
}

fn parse_millis(
    vars: &HashMap<String, String>,
    key: &str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    match vars.get(key) {
        None => Ok(default),
        Some(_) => parse_var(vars, key, 0u64).map(Duration::from_millis),
    }
}

fn parse_secs(
    vars: &HashMap<String, String>,
    key: &str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    match vars.get(key) {
        None => Ok(default),
        Some(_) => parse_var(vars, key, 0u64).map(Duration::from_secs),
    }
}

fn parse_bool(
    vars: &HashMap<String, String>,
    key: &str,
    default: bool,
) -> Result<bool, ConfigError> {
    match vars.get(key).map(|s| s.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) if v == "true" || v == "1" => Ok(true),
        Some(v) if v == "false" || v == "0" => Ok(false),
        Some(v) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            reason: format!("'{v}' is not a boolean"),
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vars_empty_uses_defaults() {
        let config = PlayerConfig::from_vars(&HashMap::new()).expect("defaults should load");

        assert_eq!(config, PlayerConfig::default());
        assert_eq!(config.waiting, RetryPolicy::new(10, Duration::from_secs(5)));
        assert_eq!(config.reconnect, RetryPolicy::new(5, Duration::from_secs(3)));
        assert_eq!(config.playlist_extension, ".m3u8");
        assert_eq!(config.perf_interval, Duration::from_secs(1));
        assert!(config.hls.low_latency_mode);
        assert_eq!(config.hls.manifest_loading_max_retry, 3);
        assert_eq!(config.hls.fragment_loading_timeout, Duration::from_secs(20));
    }

    #[test]
    fn test_from_vars_success_with_custom_values() {
        let vars = HashMap::from([
            ("LIVE_PLAYER_WAIT_MAX_ATTEMPTS".to_string(), "4".to_string()),
            ("LIVE_PLAYER_WAIT_DELAY_MS".to_string(), "2500".to_string()),
            ("LIVE_PLAYER_RECONNECT_MAX_ATTEMPTS".to_string(), "2".to_string()),
            ("LIVE_PLAYER_RECONNECT_DELAY_MS".to_string(), "750".to_string()),
            ("LIVE_PLAYER_PLAYLIST_EXTENSION".to_string(), ".m3u".to_string()),
            ("LIVE_PLAYER_PERF_INTERVAL_MS".to_string(), "500".to_string()),
            ("LIVE_PLAYER_BACK_BUFFER_SECS".to_string(), "30".to_string()),
            ("LIVE_PLAYER_LOW_LATENCY".to_string(), "false".to_string()),
            ("LIVE_PLAYER_LEVEL_MAX_RETRY".to_string(), "6".to_string()),
        ]);

        let config = PlayerConfig::from_vars(&vars).expect("Config should load successfully");

        assert_eq!(
            config.waiting,
            RetryPolicy::new(4, Duration::from_millis(2500))
        );
        assert_eq!(
            config.reconnect,
            RetryPolicy::new(2, Duration::from_millis(750))
        );
        assert_eq!(config.playlist_extension, ".m3u");
        assert_eq!(config.perf_interval, Duration::from_millis(500));
        assert_eq!(config.hls.back_buffer_length, Duration::from_secs(30));
        assert!(!config.hls.low_latency_mode);
        assert_eq!(config.hls.level_loading_max_retry, 6);
        // Untouched values keep their defaults
        assert_eq!(config.hls.max_buffer_length, DEFAULT_MAX_BUFFER);
    }

    #[test]
    fn test_from_vars_rejects_non_numeric() {
        let vars = HashMap::from([(
            "LIVE_PLAYER_RECONNECT_DELAY_MS".to_string(),
            "soon".to_string(),
        )]);

        let result = PlayerConfig::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidValue { key, .. }) if key == "LIVE_PLAYER_RECONNECT_DELAY_MS")
        );
    }

    #[test]
    fn test_from_vars_rejects_zero_budget() {
        let vars = HashMap::from([(
            "LIVE_PLAYER_WAIT_MAX_ATTEMPTS".to_string(),
            "0".to_string(),
        )]);

        let result = PlayerConfig::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidValue { key, .. }) if key == "LIVE_PLAYER_WAIT_MAX_ATTEMPTS")
        );
    }

    #[test]
    fn test_from_vars_rejects_extension_without_dot() {
        let vars = HashMap::from([(
            "LIVE_PLAYER_PLAYLIST_EXTENSION".to_string(),
            "m3u8".to_string(),
        )]);

        assert!(PlayerConfig::from_vars(&vars).is_err());
    }

    #[test]
    fn test_from_vars_rejects_bad_bool() {
        let vars = HashMap::from([(
            "LIVE_PLAYER_LOW_LATENCY".to_string(),
            "maybe".to_string(),
        )]);

        assert!(PlayerConfig::from_vars(&vars).is_err());
    }
}
