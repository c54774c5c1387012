//! Slot time arithmetic
//!
//! Slots start at the beginning of working hours (or a later start time),
//! advance by the configured interval, jump over the break window and
//! either stop or roll to the next day at the end of working hours.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use super::safety::SafetyConfig;

/// Day boundary policy for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RunWindow {
    /// Exceeding working hours ends the run
    #[default]
    SingleDay,
    /// Exceeding working hours rolls to the next day's start
    MultiDay {
        /// Total days the run may span, including the first
        days: u32,
        /// Skip Saturdays and Sundays, including a weekend first day
        weekdays_only: bool,
    },
}

impl RunWindow {
    pub fn allows_rollover(&self) -> bool {
        matches!(self, Self::MultiDay { days, .. } if *days > 1)
    }
}

pub fn is_weekend(day: NaiveDate) -> bool {
    matches!(day.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Yields monotonically increasing slot times for one run
#[derive(Debug, Clone)]
pub struct SlotClock {
    config: SafetyConfig,
    window: RunWindow,
    first_day: NaiveDate,
    start_time: Option<NaiveTime>,
    /// Day currently being filled
    day: NaiveDate,
    days_used: u32,
    /// Last committed slot
    last: Option<NaiveDateTime>,
    /// No slot before this time on its day
    not_before: Option<NaiveDateTime>,
}

impl SlotClock {
    /// Clock for a run beginning on `day`
    ///
    /// A weekday-only multi-day run that begins on a weekend starts filling
    /// on the following Monday; the start time of
    /// [`starting_at`](Self::starting_at) then no longer applies.
    pub fn new(config: &SafetyConfig, day: NaiveDate, window: RunWindow) -> Self {
        let mut first_fill = day;
        if matches!(window, RunWindow::MultiDay { weekdays_only: true, .. }) {
            while is_weekend(first_fill) {
                match first_fill.succ_opt() {
                    Some(next) => first_fill = next,
                    None => break,
                }
            }
        }

        Self {
            config: config.clone(),
            window,
            first_day: day,
            start_time: None,
            day: first_fill,
            days_used: 1,
            last: None,
            not_before: None,
        }
    }

    /// Begin the first day no earlier than `time`
    pub fn starting_at(mut self, time: Option<NaiveTime>) -> Self {
        self.start_time = time;
        self
    }

    pub fn current_day(&self) -> NaiveDate {
        self.day
    }

    /// Next slot after the last committed one, without committing it
    ///
    /// Returns `None` when the run window has no room left.
    pub fn peek(&mut self) -> Option<NaiveDateTime> {
        loop {
            let candidate = match self.last {
                Some(last) if last.date() == self.day => {
                    let next = last + Duration::minutes(self.config.slot_interval_minutes as i64);
                    next.max(self.day.and_time(self.day_start()))
                }
                _ => self.day.and_time(self.day_start()),
            };
            let candidate = match self.not_before {
                Some(floor) if floor.date() == self.day && floor > candidate => floor,
                _ => candidate,
            };

            if let Some(slot) = self.fit(candidate) {
                return Some(slot);
            }

            if !self.advance_day() {
                return None;
            }
        }
    }

    /// Accept `slot` as the latest scheduled time
    pub fn commit(&mut self, slot: NaiveDateTime) {
        debug_assert!(self.last.map_or(true, |last| slot > last));
        self.last = Some(slot);
    }

    /// Hold the next slot back until `at`
    ///
    /// Only affects the day `at` falls on.
    pub fn defer_until(&mut self, at: NaiveDateTime) {
        self.not_before = Some(at);
    }

    /// Abandon the current day and move to the next permitted one
    pub fn advance_day(&mut self) -> bool {
        let RunWindow::MultiDay { days, weekdays_only } = self.window else {
            return false;
        };

        if self.days_used >= days {
            return false;
        }

        let mut next = match self.day.succ_opt() {
            Some(d) => d,
            None => return false,
        };
        while weekdays_only && is_weekend(next) {
            next = match next.succ_opt() {
                Some(d) => d,
                None => return false,
            };
        }

        tracing::debug!(from = %self.day, to = %next, "Rolling slot clock to next day");
        self.day = next;
        self.days_used += 1;
        true
    }

    fn day_start(&self) -> NaiveTime {
        let opening = self.config.working_hours.start;
        match self.start_time {
            Some(t) if self.day == self.first_day && t > opening => t,
            _ => opening,
        }
    }

    /// Push `candidate` out of the break and check it is still inside working hours
    fn fit(&self, candidate: NaiveDateTime) -> Option<NaiveDateTime> {
        let wh = self.config.working_hours;
        if candidate.date() != self.day {
            return None;
        }

        let mut slot = candidate;
        if slot.time() < wh.start {
            slot = self.day.and_time(wh.start);
        }
        if let Some(brk) = self.config.break_window {
            if brk.contains(slot.time()) {
                slot = self.day.and_time(brk.end);
            }
        }

        if slot.time() >= wh.end {
            return None;
        }
        Some(slot)
    }
}
