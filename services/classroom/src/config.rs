//! services/classroom/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use classroom_core::{RouterTimings, SessionSettings};
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub log_level: Level,
    /// Backend tried first; used when its `/ping` answers.
    pub local_api_url: String,
    /// Fallback backend when the local one is unreachable.
    pub remote_api_url: Option<String>,
    /// WebSocket endpoint of the realtime service.
    pub realtime_ws_url: String,
    pub session: SessionSettings,
    pub timings: RouterTimings,
    pub poll_interval: Duration,
    pub reveal_interval: Duration,
    pub mpv_path: PathBuf,
    pub mpv_socket: PathBuf,
    pub record_command: String,
    pub playback_command: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Backend Endpoints ---
        let local_api_url = std::env::var("LOCAL_API_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8000/api".to_string());
        let remote_api_url = std::env::var("REMOTE_API_URL").ok();

        let realtime_ws_url = std::env::var("REALTIME_WS_URL")
            .unwrap_or_else(|_| "wss://api.openai.com/v1/realtime".to_string());

        // --- Session Settings ---
        let defaults = SessionSettings::default();
        let session = SessionSettings {
            model: std::env::var("REALTIME_MODEL").unwrap_or(defaults.model),
            voice: std::env::var("REALTIME_VOICE").unwrap_or(defaults.voice),
            vad_threshold: parse_var("VAD_THRESHOLD", defaults.vad_threshold)?,
            prefix_padding_ms: parse_var("VAD_PREFIX_PADDING_MS", defaults.prefix_padding_ms)?,
            silence_duration_ms: parse_var(
                "VAD_SILENCE_DURATION_MS",
                defaults.silence_duration_ms,
            )?,
        };

        // --- Timings ---
        let timing_defaults = RouterTimings::default();
        let timings = RouterTimings {
            settle_delay: millis_var("SESSION_SETTLE_MS", timing_defaults.settle_delay)?,
            followup_delay: millis_var("TOOL_FOLLOWUP_MS", timing_defaults.followup_delay)?,
            end_grace: millis_var("END_CONVERSATION_GRACE_MS", timing_defaults.end_grace)?,
        };
        let poll_interval = millis_var("PLAYER_POLL_MS", Duration::from_millis(500))?;
        if poll_interval.is_zero() {
            return Err(ConfigError::InvalidValue(
                "PLAYER_POLL_MS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }
        let reveal_interval = millis_var("REVEAL_STEP_MS", Duration::from_millis(40))?;

        // --- Local Devices ---
        let mpv_path = std::env::var("MPV_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("mpv"));
        let mpv_socket = std::env::var("MPV_SOCKET")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::temp_dir().join("classroom-mpv.sock"));
        let record_command = std::env::var("RECORD_COMMAND")
            .unwrap_or_else(|_| "arecord -q -t raw -f S16_LE -r 24000 -c 1".to_string());
        let playback_command = std::env::var("PLAYBACK_COMMAND")
            .unwrap_or_else(|_| "aplay -q -t raw -f S16_LE -r 24000 -c 1".to_string());

        Ok(Self {
            log_level,
            local_api_url,
            remote_api_url,
            realtime_ws_url,
            session,
            timings,
            poll_interval,
            reveal_interval,
            mpv_path,
            mpv_socket,
            record_command,
            playback_command,
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

fn millis_var(name: &str, default: Duration) -> Result<Duration, ConfigError> {
    let default_ms = u64::try_from(default.as_millis()).unwrap_or(u64::MAX);
    parse_var(name, default_ms).map(Duration::from_millis)
}

/// Splits a configured command line into program and arguments.
pub fn split_command(command: &str) -> Result<(String, Vec<String>), ConfigError> {
    let mut parts = command.split_whitespace().map(str::to_string);
    let program = parts
        .next()
        .ok_or_else(|| ConfigError::InvalidValue("command".to_string(), "is empty".to_string()))?;
    Ok((program, parts.collect()))
}
