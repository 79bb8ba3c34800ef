//! Configuration loading for pomo
//!
//! The config file lives at ~/.config/pomo/config.toml and looks like:
//!
//! ```toml
//! [database]
//! task = "~/.local/share/pomo/tasks.db"
//! session = "~/.local/share/pomo/session.db"
//!
//! [timers]
//! focus = "25m"
//! short = "5m"
//! long = "15m"
//! interval = 4
//! ```

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::paths::{contract_tilde, expand_tilde, Paths};

/// Pomo configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Where the stores keep their data
    #[serde(default)]
    pub database: Database,

    /// Interval lengths and long break cadence
    #[serde(default)]
    pub timers: TimerConfig,
}

/// Database locations (a leading `~/` is expanded)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Database {
    #[serde(default = "default_task_db")]
    pub task: String,
    #[serde(default = "default_session_db")]
    pub session: String,
}

impl Default for Database {
    fn default() -> Self {
        Self {
            task: default_task_db(),
            session: default_session_db(),
        }
    }
}

impl Database {
    pub fn task_path(&self) -> PathBuf {
        expand_tilde(&self.task)
    }

    pub fn session_path(&self) -> PathBuf {
        expand_tilde(&self.session)
    }
}

fn default_task_db() -> String {
    contract_tilde(&Paths::new().database("tasks"))
}

fn default_session_db() -> String {
    contract_tilde(&Paths::new().database("session"))
}

/// Timer configuration. Durations are unit-suffixed strings such as
/// `25m`, `1h30m`, `90s` or `500ms`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_focus")]
    pub focus: String,
    #[serde(default = "default_short")]
    pub short: String,
    #[serde(default = "default_long")]
    pub long: String,
    /// Number of focus intervals between long breaks
    #[serde(default = "default_interval")]
    pub interval: u32,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            focus: default_focus(),
            short: default_short(),
            long: default_long(),
            interval: default_interval(),
        }
    }
}

fn default_focus() -> String {
    "25m".to_string()
}

fn default_short() -> String {
    "5m".to_string()
}

fn default_long() -> String {
    "15m".to_string()
}

fn default_interval() -> u32 {
    4
}

impl TimerConfig {
    pub fn focus_duration(&self) -> Result<Duration> {
        parse_duration(&self.focus).with_context(|| format!("Invalid timers.focus: {:?}", self.focus))
    }

    pub fn short_break_duration(&self) -> Result<Duration> {
        parse_duration(&self.short).with_context(|| format!("Invalid timers.short: {:?}", self.short))
    }

    pub fn long_break_duration(&self) -> Result<Duration> {
        parse_duration(&self.long).with_context(|| format!("Invalid timers.long: {:?}", self.long))
    }
}

impl Config {
    /// Load configuration from `path`, or the defaults if it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Write the configuration to `path`, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }

    /// Write a default config file. Refuses to overwrite an existing one.
    pub fn init(path: &Path) -> Result<Self> {
        if path.exists() {
            bail!("config in: {} already exists", path.display());
        }

        let config = Self::default();
        config.save(path)?;
        Ok(config)
    }

    /// Reject configurations the timer could not run with
    pub fn validate(&self) -> Result<()> {
        for (key, duration) in [
            ("timers.focus", self.timers.focus_duration()?),
            ("timers.short", self.timers.short_break_duration()?),
            ("timers.long", self.timers.long_break_duration()?),
        ] {
            if duration.is_zero() {
                bail!("{} must be longer than zero", key);
            }
        }

        if self.timers.interval == 0 {
            bail!("timers.interval must be a positive integer");
        }

        Ok(())
    }

    /// Update a single `section.key` setting from its string form
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "database.task" => self.database.task = value.to_string(),
            "database.session" => self.database.session = value.to_string(),
            "timers.focus" | "timers.short" | "timers.long" => {
                let duration = parse_duration(value)
                    .with_context(|| format!("Invalid duration for {}: {:?}", key, value))?;
                if duration.is_zero() {
                    bail!("{} must be longer than zero", key);
                }
                match key {
                    "timers.focus" => self.timers.focus = value.to_string(),
                    "timers.short" => self.timers.short = value.to_string(),
                    _ => self.timers.long = value.to_string(),
                }
            }
            "timers.interval" | "timers.intervals" => {
                let interval: u32 = value
                    .parse()
                    .with_context(|| format!("Invalid interval: {:?}", value))?;
                if interval == 0 {
                    bail!("timers.interval must be a positive integer");
                }
                self.timers.interval = interval;
            }
            _ => bail!("unknown key {}", key),
        }
        Ok(())
    }

    /// All settings as `(key, value)` pairs, in file order
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        vec![
            ("database.task", self.database.task.clone()),
            ("database.session", self.database.session.clone()),
            ("timers.focus", self.timers.focus.clone()),
            ("timers.short", self.timers.short.clone()),
            ("timers.long", self.timers.long.clone()),
            ("timers.interval", self.timers.interval.to_string()),
        ]
    }
}

/// Parse a unit-suffixed duration such as `1h30m`, `25m`, `1.5s` or `250ms`.
///
/// Accepted units: `h`, `m`, `s`, `ms`, `us`, `ns`. A bare `0` is allowed.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let s = input.trim();
    if s.is_empty() {
        bail!("empty duration");
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total = 0f64;
    let mut rest = s;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_len == 0 {
            bail!("expected a number in duration {:?}", input);
        }
        let value: f64 = rest[..number_len]
            .parse()
            .with_context(|| format!("invalid number in duration {:?}", input))?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let seconds_per_unit = match &rest[..unit_len] {
            "h" => 3600.0,
            "m" => 60.0,
            "s" => 1.0,
            "ms" => 1e-3,
            "us" | "µs" => 1e-6,
            "ns" => 1e-9,
            "" => bail!("missing unit in duration {:?}", input),
            unit => bail!("unknown unit {:?} in duration {:?}", unit, input),
        };
        rest = &rest[unit_len..];

        total += value * seconds_per_unit;
    }

    Duration::try_from_secs_f64(total)
        .map_err(|_| anyhow::anyhow!("duration {:?} is out of range", input))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("25m").unwrap(), Duration::from_secs(25 * 60));
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(90 * 60));
        assert_eq!(parse_duration("5m0s").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("90s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("1.5s").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("25").is_err());
        assert!(parse_duration("m").is_err());
        assert!(parse_duration("10d").is_err());
        assert!(parse_duration("ten minutes").is_err());
        assert!(parse_duration("99999999999999999999h").is_err());
    }

    #[test]
    fn test_set_rejects_out_of_range_duration() -> Result<()> {
        let tmp = TempDir::new()?;
        let path = tmp.path().join("config.toml");
        fs::write(&path, "[timers]\nfocus = \"99999999999999999999h\"\n")?;
        assert!(Config::load(&path).is_err());

        let mut config = Config::default();
        assert!(config.set("timers.focus", "99999999999999999999h").is_err());
        assert_eq!(config.timers.focus, "25m");
        Ok(())
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.timers.focus_duration().unwrap(), Duration::from_secs(25 * 60));
        assert_eq!(config.timers.short_break_duration().unwrap(), Duration::from_secs(5 * 60));
        assert_eq!(config.timers.long_break_duration().unwrap(), Duration::from_secs(15 * 60));
        assert_eq!(config.timers.interval, 4);
        assert!(config.database.task.ends_with("tasks.db"));
        assert!(config.database.session.ends_with("session.db"));
        config.validate().unwrap();
    }

    #[test]
    fn test_load_missing_file_uses_defaults() -> Result<()> {
        let tmp = TempDir::new()?;
        let config = Config::load(&tmp.path().join("config.toml"))?;
        assert_eq!(config, Config::default());
        Ok(())
    }

    #[test]
    fn test_load_partial_file() -> Result<()> {
        let tmp = TempDir::new()?;
        let path = tmp.path().join("config.toml");
        fs::write(&path, "[timers]\nfocus = \"50m\"\ninterval = 2\n")?;

        let config = Config::load(&path)?;
        assert_eq!(config.timers.focus_duration()?, Duration::from_secs(50 * 60));
        assert_eq!(config.timers.interval, 2);
        assert_eq!(config.timers.short, "5m");
        assert_eq!(config.database, Database::default());
        Ok(())
    }

    #[test]
    fn test_load_rejects_zero_interval() -> Result<()> {
        let tmp = TempDir::new()?;
        let path = tmp.path().join("config.toml");
        fs::write(&path, "[timers]\ninterval = 0\n")?;

        assert!(Config::load(&path).is_err());
        Ok(())
    }

    #[test]
    fn test_set_and_save_roundtrip() -> Result<()> {
        let tmp = TempDir::new()?;
        let path = tmp.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.set("timers.focus", "45m")?;
        config.set("timers.intervals", "3")?;
        config.set("database.task", "/tmp/pomo-tasks.db")?;
        config.save(&path)?;

        let loaded = Config::load(&path)?;
        assert_eq!(loaded.timers.focus, "45m");
        assert_eq!(loaded.timers.interval, 3);
        assert_eq!(loaded.database.task_path(), PathBuf::from("/tmp/pomo-tasks.db"));
        Ok(())
    }

    #[test]
    fn test_set_rejects_bad_values() {
        let mut config = Config::default();
        assert!(config.set("timers.focus", "soon").is_err());
        assert!(config.set("timers.short", "0s").is_err());
        assert!(config.set("timers.interval", "0").is_err());
        assert!(config.set("timers.interval", "-1").is_err());
        assert!(config.set("colors.focus", "red").is_err());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_init_refuses_overwrite() -> Result<()> {
        let tmp = TempDir::new()?;
        let path = tmp.path().join("config.toml");

        Config::init(&path)?;
        assert!(path.exists());
        assert!(Config::init(&path).is_err());
        Ok(())
    }
}
