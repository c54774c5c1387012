//! Safety configuration consumed by a scheduling run
//!
//! The scheduler treats [`SafetyConfig`] as an immutable, already-validated
//! input. Validation lives here so that callers (config loader, CLI, API)
//! can run it before handing the value over.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use super::error::{SchedulerError, SchedulerResult};

// ============================================================================
// Time Window
// ============================================================================

/// Half-open wall-clock window `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
}

impl TimeWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Build from "HH:MM" strings
    pub fn parse(start: &str, end: &str) -> SchedulerResult<Self> {
        Ok(Self {
            start: parse_time(start)?,
            end: parse_time(end)?,
        })
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        time >= self.start && time < self.end
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

/// Parse "HH:MM" (seconds optional)
pub fn parse_time(value: &str) -> SchedulerResult<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value.trim(), "%H:%M:%S"))
        .map_err(|_| SchedulerError::InvalidTime {
            value: value.to_string(),
        })
}

mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_time(&raw).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Safety Config
// ============================================================================

/// Caps, cooldowns and working hours for one scheduling run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyConfig {
    /// Maximum assignments per account per day
    pub max_per_actor_per_day: u32,

    /// Maximum assignments per group per day
    pub max_per_target_per_day: u32,

    /// Minimum days between successful posts to the same group
    pub target_cooldown_days: u32,

    /// Minimum days before an account reuses the same text+media pair
    pub content_reuse_cooldown_days: u32,

    /// Minutes between consecutive slots
    pub slot_interval_minutes: u32,

    /// Posting window
    pub working_hours: TimeWindow,

    /// Excluded window inside working hours (lunch)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub break_window: Option<TimeWindow>,
}

impl SafetyConfig {
    /// Create a new config builder
    pub fn builder() -> SafetyConfigBuilder {
        SafetyConfigBuilder::default()
    }

    /// Days of history a run needs to evaluate every cooldown
    pub fn lookback_days(&self) -> u32 {
        self.target_cooldown_days.max(self.content_reuse_cooldown_days)
    }

    /// Upper bound on slots in one working day
    pub fn slots_per_day(&self) -> usize {
        if self.slot_interval_minutes == 0 {
            return 0;
        }
        let mut minutes = self.working_hours.duration_minutes();
        if let Some(brk) = self.break_window {
            minutes -= brk.duration_minutes();
        }
        (minutes.max(0) as usize) / self.slot_interval_minutes as usize + 1
    }

    /// Validate the configuration
    pub fn validate(&self) -> SchedulerResult<()> {
        if self.max_per_actor_per_day == 0 {
            return Err(SchedulerError::invalid_safety(
                "max_per_actor_per_day",
                "must be greater than 0",
            ));
        }

        if self.max_per_target_per_day == 0 {
            return Err(SchedulerError::invalid_safety(
                "max_per_target_per_day",
                "must be greater than 0",
            ));
        }

        if self.slot_interval_minutes == 0 {
            return Err(SchedulerError::invalid_safety(
                "slot_interval_minutes",
                "must be greater than 0",
            ));
        }

        let wh = self.working_hours;
        if wh.start >= wh.end {
            return Err(SchedulerError::invalid_safety(
                "working_hours",
                format!(
                    "start {} must be before end {}",
                    wh.start.format("%H:%M"),
                    wh.end.format("%H:%M")
                ),
            ));
        }

        if let Some(brk) = self.break_window {
            if brk.start >= brk.end {
                return Err(SchedulerError::invalid_safety(
                    "break_window",
                    "start must be before end",
                ));
            }
            if brk.start < wh.start || brk.end > wh.end {
                return Err(SchedulerError::invalid_safety(
                    "break_window",
                    "must lie inside working hours",
                ));
            }
            if brk.start == wh.start && brk.end == wh.end {
                return Err(SchedulerError::invalid_safety(
                    "break_window",
                    "covers the whole working day",
                ));
            }
        }

        Ok(())
    }
}

/// Builder for SafetyConfig
///
/// Every numeric field and the working hours must be set; `build` fails
/// instead of falling back to defaults.
#[derive(Debug, Default)]
pub struct SafetyConfigBuilder {
    max_per_actor_per_day: Option<u32>,
    max_per_target_per_day: Option<u32>,
    target_cooldown_days: Option<u32>,
    content_reuse_cooldown_days: Option<u32>,
    working_hours: Option<TimeWindow>,
    break_window: Option<TimeWindow>,
    slot_interval_minutes: Option<u32>,
}

impl SafetyConfigBuilder {
    pub fn max_per_actor_per_day(mut self, value: u32) -> Self {
        self.max_per_actor_per_day = Some(value);
        self
    }

    pub fn max_per_target_per_day(mut self, value: u32) -> Self {
        self.max_per_target_per_day = Some(value);
        self
    }

    pub fn target_cooldown_days(mut self, value: u32) -> Self {
        self.target_cooldown_days = Some(value);
        self
    }

    pub fn content_reuse_cooldown_days(mut self, value: u32) -> Self {
        self.content_reuse_cooldown_days = Some(value);
        self
    }

    pub fn working_hours(mut self, window: TimeWindow) -> Self {
        self.working_hours = Some(window);
        self
    }

    pub fn break_window(mut self, window: TimeWindow) -> Self {
        self.break_window = Some(window);
        self
    }

    pub fn slot_interval_minutes(mut self, value: u32) -> Self {
        self.slot_interval_minutes = Some(value);
        self
    }

    /// Build and validate
    pub fn build(self) -> SchedulerResult<SafetyConfig> {
        let config = SafetyConfig {
            max_per_actor_per_day: self
                .max_per_actor_per_day
                .ok_or(SchedulerError::MissingSafetyField {
                    field: "max_per_actor_per_day",
                })?,
            max_per_target_per_day: self
                .max_per_target_per_day
                .ok_or(SchedulerError::MissingSafetyField {
                    field: "max_per_target_per_day",
                })?,
            target_cooldown_days: self
                .target_cooldown_days
                .ok_or(SchedulerError::MissingSafetyField {
                    field: "target_cooldown_days",
                })?,
            content_reuse_cooldown_days: self.content_reuse_cooldown_days.ok_or(
                SchedulerError::MissingSafetyField {
                    field: "content_reuse_cooldown_days",
                },
            )?,
            slot_interval_minutes: self
                .slot_interval_minutes
                .ok_or(SchedulerError::MissingSafetyField {
                    field: "slot_interval_minutes",
                })?,
            working_hours: self
                .working_hours
                .ok_or(SchedulerError::MissingSafetyField {
                    field: "working_hours",
                })?,
            break_window: self.break_window,
        };

        config.validate()?;
        Ok(config)
    }
}
