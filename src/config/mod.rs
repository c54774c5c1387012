//! Configuration management for rotapost
//!
//! This module handles loading and validating configuration from environment
//! variables and TOML files. The `[safety]` table is handed to the scheduler
//! unchanged after [`Config::validate`] has accepted it.

use anyhow::{Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::scheduler::{CursorSeed, SafetyConfig, TimeWindow};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Caps, cooldowns and working hours
    pub safety: SafetyConfig,

    /// Planner defaults
    #[serde(default)]
    pub planner: PlannerConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Planner defaults used by the CLI and API when a request omits them
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Assignments requested per single-day plan
    pub default_count: usize,

    /// Assignments requested per day of a weekly plan
    pub per_day_budget: usize,

    /// Working days in a weekly plan
    pub week_days: u32,

    /// Skip groups linked to an account already used that day
    pub enforce_linkage: bool,

    pub cursor_seed: CursorSeed,

    /// Where dry-run plans are written when no output path is given
    pub plan_dir: PathBuf,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            default_count: 20,
            per_day_budget: 20,
            week_days: 5,
            enforce_linkage: false,
            cursor_seed: CursorSeed::Fixed,
            plan_dir: PathBuf::from("data/plans"),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database path
    pub sqlite_path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            sqlite_path: PathBuf::from("data/rotapost.db"),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_address: String,

    /// Enable CORS
    pub enable_cors: bool,

    /// Enable request logging
    pub request_logging: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            enable_cors: true,
            request_logging: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Every value falls back to [`Config::default`]; windows are written
    /// `HH:MM-HH:MM` and `ROTAPOST_BREAK=none` disables the break.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let safety = &defaults.safety;

        let working_hours = match std::env::var("ROTAPOST_WORKING_HOURS") {
            Ok(raw) => parse_window(&raw).context("Invalid ROTAPOST_WORKING_HOURS")?,
            Err(_) => safety.working_hours,
        };

        let break_window = match std::env::var("ROTAPOST_BREAK") {
            Ok(raw) if raw.trim().eq_ignore_ascii_case("none") || raw.trim().is_empty() => None,
            Ok(raw) => Some(parse_window(&raw).context("Invalid ROTAPOST_BREAK")?),
            Err(_) => safety.break_window,
        };

        let safety = SafetyConfig {
            max_per_actor_per_day: env_or("ROTAPOST_MAX_PER_ACTOR", safety.max_per_actor_per_day),
            max_per_target_per_day: env_or("ROTAPOST_MAX_PER_TARGET", safety.max_per_target_per_day),
            target_cooldown_days: env_or("ROTAPOST_TARGET_COOLDOWN_DAYS", safety.target_cooldown_days),
            content_reuse_cooldown_days: env_or(
                "ROTAPOST_CONTENT_COOLDOWN_DAYS",
                safety.content_reuse_cooldown_days,
            ),
            slot_interval_minutes: env_or("ROTAPOST_SLOT_INTERVAL", safety.slot_interval_minutes),
            working_hours,
            break_window,
        };

        let planner = PlannerConfig {
            default_count: env_or("ROTAPOST_DEFAULT_COUNT", defaults.planner.default_count),
            per_day_budget: env_or("ROTAPOST_PER_DAY", defaults.planner.per_day_budget),
            enforce_linkage: env_or("ROTAPOST_ENFORCE_LINKAGE", defaults.planner.enforce_linkage),
            ..defaults.planner
        };

        let sqlite_path = std::env::var("ROTAPOST_SQLITE_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.database.sqlite_path);

        let bind_address =
            std::env::var("ROTAPOST_BIND").unwrap_or(defaults.server.bind_address);

        let log_level = std::env::var("ROTAPOST_LOG_LEVEL").unwrap_or_else(|_| String::from("info"));

        let log_format =
            std::env::var("ROTAPOST_LOG_FORMAT").unwrap_or_else(|_| String::from("text"));

        Ok(Self {
            safety,
            planner,
            database: DatabaseConfig { sqlite_path },
            server: ServerConfig {
                bind_address,
                ..defaults.server
            },
            logging: LoggingConfig {
                level: log_level,
                format: log_format,
            },
        })
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load from `path` when given, otherwise from the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::from_env()?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.safety
            .validate()
            .context("Invalid [safety] configuration")?;

        if self.planner.week_days == 0 || self.planner.week_days > 5 {
            anyhow::bail!("week_days must be between 1 and 5");
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            anyhow::bail!("log format must be 'text' or 'json'");
        }

        if self.server.bind_address.parse::<std::net::SocketAddr>().is_err() {
            anyhow::bail!("invalid bind address: {}", self.server.bind_address);
        }

        Ok(())
    }

    /// How far back history must be loaded to evaluate every cooldown
    #[must_use]
    pub fn history_lookback(&self) -> Duration {
        // One extra day covers cooldowns measured from late on the boundary day
        Duration::days(self.safety.lookback_days() as i64 + 1)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            safety: SafetyConfig {
                max_per_actor_per_day: 5,
                max_per_target_per_day: 1,
                target_cooldown_days: 3,
                content_reuse_cooldown_days: 7,
                slot_interval_minutes: 20,
                working_hours: default_window(9, 18),
                break_window: Some(default_window(12, 13)),
            },
            planner: PlannerConfig::default(),
            database: DatabaseConfig::default(),
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_window(start_hour: u32, end_hour: u32) -> TimeWindow {
    TimeWindow::new(
        chrono::NaiveTime::from_hms_opt(start_hour, 0, 0).unwrap_or_default(),
        chrono::NaiveTime::from_hms_opt(end_hour, 0, 0).unwrap_or_default(),
    )
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

/// Parse `HH:MM-HH:MM`
fn parse_window(raw: &str) -> Result<TimeWindow> {
    let (start, end) = raw
        .split_once('-')
        .with_context(|| format!("expected HH:MM-HH:MM, got '{raw}'"))?;
    Ok(TimeWindow::parse(start, end)?)
}
