//! TOML-based application configuration.
//!
//! Stores:
//! - Milestone day numbers
//! - Timer defaults (target duration, tick interval)
//! - The gate applied to timed check-ins
//!
//! Configuration is stored at `<data_dir>/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::{ConfigError, CoreError, Result};
use crate::flow::TimedGate;
use crate::milestone::{MilestoneDays, DEFAULT_MILESTONE_DAYS};
use crate::timer::DEFAULT_TICK_INTERVAL_MS;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MilestonesConfig {
    #[serde(default = "default_milestone_days")]
    pub days: Vec<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerConfig {
    /// Target preselected when a timed check-in screen opens.
    #[serde(default = "default_target_secs")]
    pub default_target_secs: u64,
    /// Cadence of periodic `tick` calls while a session runs in the foreground.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckInConfig {
    #[serde(default)]
    pub timed_gate: TimedGate,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data_dir>/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub milestones: MilestonesConfig,
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub checkin: CheckInConfig,
}

// Default functions
fn default_milestone_days() -> Vec<u32> {
    DEFAULT_MILESTONE_DAYS.to_vec()
}
fn default_target_secs() -> u64 {
    600
}
fn default_tick_interval_ms() -> u64 {
    DEFAULT_TICK_INTERVAL_MS
}

impl Default for MilestonesConfig {
    fn default() -> Self {
        Self {
            days: default_milestone_days(),
        }
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            default_target_secs: default_target_secs(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<()> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(unknown().into());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => serde_json::Value::Number(
                        value
                            .parse::<u64>()
                            .map_err(|e| invalid(e.to_string()))?
                            .into(),
                    ),
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown().into())
    }

    fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the data directory, writing defaults on first run.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    /// Load from an explicit path, writing defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
            .into()),
        }
    }

    /// Persist to the data directory.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.milestone_days()?;
        if self.timer.tick_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "timer.tick_interval_ms".into(),
                message: "must be greater than zero".into(),
            }
            .into());
        }
        if self.timer.default_target_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "timer.default_target_secs".into(),
                message: "must be greater than zero".into(),
            }
            .into());
        }
        Ok(())
    }

    pub fn milestone_days(&self) -> Result<MilestoneDays> {
        MilestoneDays::new(self.milestones.days.iter().copied()).map_err(|e| {
            CoreError::from(ConfigError::InvalidValue {
                key: "milestones.days".into(),
                message: e.to_string(),
            })
        })
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key. The change is validated but not saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed
    /// or fails validation. `self` is left untouched on error.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.milestones.days, DEFAULT_MILESTONE_DAYS.to_vec());
        assert_eq!(parsed.timer.tick_interval_ms, 100);
        assert_eq!(parsed.checkin.timed_gate, TimedGate::CompletedOrStarted);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[checkin]\ntimed_gate = \"completed_only\"\n").unwrap();
        assert_eq!(parsed.checkin.timed_gate, TimedGate::CompletedOnly);
        assert_eq!(parsed.timer.default_target_secs, 600);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("timer.tick_interval_ms").as_deref(), Some("100"));
        assert_eq!(
            cfg.get("checkin.timed_gate").as_deref(),
            Some("completed_or_started")
        );
        assert!(cfg.get("timer.missing_key").is_none());
        assert!(cfg.get("").is_none());
    }

    #[test]
    fn set_updates_number_enum_and_list() {
        let mut cfg = Config::default();
        cfg.set("timer.default_target_secs", "900").unwrap();
        cfg.set("checkin.timed_gate", "completed_only").unwrap();
        cfg.set("milestones.days", "[5, 10]").unwrap();
        assert_eq!(cfg.timer.default_target_secs, 900);
        assert_eq!(cfg.checkin.timed_gate, TimedGate::CompletedOnly);
        assert_eq!(cfg.milestones.days, vec![5, 10]);
    }

    #[test]
    fn set_rejects_unknown_key_and_bad_values() {
        let mut cfg = Config::default();
        assert!(cfg.set("timer.nonexistent_key", "1").is_err());
        assert!(cfg.set("timer.tick_interval_ms", "fast").is_err());
        assert!(cfg.set("checkin.timed_gate", "sometimes").is_err());
        assert!(cfg.set("milestones.days", "[]").is_err());
        assert!(cfg.set("timer.tick_interval_ms", "0").is_err());
        // Nothing leaked through.
        assert_eq!(cfg.timer.tick_interval_ms, 100);
        assert_eq!(cfg.milestones.days, DEFAULT_MILESTONE_DAYS.to_vec());
    }

    #[test]
    fn load_from_writes_defaults_then_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let cfg = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(cfg.timer.default_target_secs, 600);

        let mut changed = cfg.clone();
        changed.set("timer.default_target_secs", "120").unwrap();
        changed.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().timer.default_target_secs, 120);
    }

    #[test]
    fn load_from_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[milestones]\ndays = [0]\n").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
