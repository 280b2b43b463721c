//! Runtime configuration for the simulator, read from the environment.

use std::path::PathBuf;
use thiserror::Error;

use crate::settings::{ScheduleSettings, SettingsPatch};

const DEFAULT_ITEMS: usize = 200;
const DEFAULT_TURNS: usize = 500;
const DEFAULT_TURN_SECONDS: i64 = 20;
const DEFAULT_LOG_DIR: &str = "./logs";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings patch in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone)]
pub struct SimConfig {
    pub log_level: String,
    /// Fixed RNG seed; entropy when unset
    pub seed: Option<u64>,
    pub items: usize,
    pub turns: usize,
    /// Simulated time between two turns
    pub turn_seconds: i64,
    /// JSON settings patch applied on top of the defaults
    pub settings_path: Option<PathBuf>,
    /// Directory for the rolling log file; file logging is off when unset
    pub log_dir: Option<PathBuf>,
}

impl SimConfig {
    pub fn from_env() -> Self {
        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let seed = std::env::var("LEXI_SEED")
            .ok()
            .and_then(|value| value.parse::<u64>().ok());

        let items = std::env::var("LEXI_ITEMS")
            .ok()
            .and_then(|value| value.parse::<usize>().ok())
            .unwrap_or(DEFAULT_ITEMS);

        let turns = std::env::var("LEXI_TURNS")
            .ok()
            .and_then(|value| value.parse::<usize>().ok())
            .unwrap_or(DEFAULT_TURNS);

        let turn_seconds = std::env::var("LEXI_TURN_SECONDS")
            .ok()
            .and_then(|value| value.parse::<i64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_TURN_SECONDS);

        let settings_path = std::env::var("LEXI_SETTINGS")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        let log_dir = resolve_log_dir(
            std::env::var("ENABLE_FILE_LOGS").ok().as_deref(),
            std::env::var("LOG_DIR").ok().as_deref(),
        );

        Self {
            log_level,
            seed,
            items,
            turns,
            turn_seconds,
            settings_path,
            log_dir,
        }
    }

    /// Defaults merged with the optional settings patch file.
    pub fn schedule_settings(&self) -> Result<ScheduleSettings, ConfigError> {
        let defaults = ScheduleSettings::default();
        let Some(path) = &self.settings_path else {
            return Ok(defaults);
        };
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let patch = SettingsPatch::from_json(&raw).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        Ok(defaults.merged(&patch))
    }
}

/// `ENABLE_FILE_LOGS` accepts `true` or `1`; `LOG_DIR` falls back to `./logs`.
fn resolve_log_dir(enable: Option<&str>, dir: Option<&str>) -> Option<PathBuf> {
    let enabled = matches!(enable.map(str::trim), Some("true") | Some("1"));
    if !enabled {
        return None;
    }
    let dir = dir
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(DEFAULT_LOG_DIR);
    Some(PathBuf::from(dir))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(settings_path: Option<PathBuf>) -> SimConfig {
        SimConfig {
            log_level: "info".to_string(),
            seed: Some(7),
            items: 10,
            turns: 10,
            turn_seconds: 20,
            settings_path,
            log_dir: None,
        }
    }

    #[test]
    fn test_file_logs_off_unless_enabled() {
        assert_eq!(resolve_log_dir(None, Some("/tmp/lexi")), None);
        assert_eq!(resolve_log_dir(Some("yes"), None), None);
        assert_eq!(resolve_log_dir(Some("1"), None), Some(PathBuf::from("./logs")));
        assert_eq!(
            resolve_log_dir(Some("true"), Some("/var/log/lexi")),
            Some(PathBuf::from("/var/log/lexi"))
        );
    }

    #[test]
    fn test_no_patch_uses_defaults() {
        let settings = config(None).schedule_settings().unwrap();
        assert_eq!(settings, ScheduleSettings::default());
    }

    #[test]
    fn test_missing_patch_file_is_io_error() {
        let err = config(Some(PathBuf::from("/nonexistent/lexi-settings.json")))
            .schedule_settings()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_patch_file_is_merged() {
        let path = std::env::temp_dir().join(format!("lexi-settings-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"maxIntervalDays": 30}"#).unwrap();
        let settings = config(Some(path.clone())).schedule_settings().unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(settings.max_interval_days, 30.0);
        assert_eq!(
            settings.target_new_share,
            ScheduleSettings::default().target_new_share
        );
    }
}
