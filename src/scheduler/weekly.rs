//! Week-ahead planning
//!
//! Runs the rotation once per weekday. Each day's assignments are projected
//! into the history of the following days as if they had been posted, so
//! cooldowns and content reuse carry across the week.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::SchedulerResult;
use super::plan::AssignmentPlan;
use super::rotation::RotationScheduler;
use super::safety::SafetyConfig;
use super::slots::is_weekend;
use crate::models::{Assignment, HistoryEntry, Pools};

/// Default number of working days in a weekly plan
pub const DEFAULT_WEEK_DAYS: u32 = 5;

/// Plans for consecutive working days
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyPlan {
    pub week_start: NaiveDate,
    pub days: Vec<AssignmentPlan>,
}

impl WeeklyPlan {
    pub fn total(&self) -> usize {
        self.days.iter().map(AssignmentPlan::len).sum()
    }

    pub fn shortfall(&self) -> usize {
        self.days.iter().map(AssignmentPlan::shortfall).sum()
    }

    /// Every assignment in day order
    pub fn assignments(&self) -> impl Iterator<Item = &Assignment> {
        self.days.iter().flat_map(|d| d.assignments.iter())
    }

    pub fn get(&self, day: NaiveDate) -> Option<&AssignmentPlan> {
        self.days.iter().find(|d| d.day == day)
    }

    pub fn display(&self) -> String {
        let mut output = format!("Week of {}\n", self.week_start);
        output.push_str(&format!("{:-<40}\n", ""));
        for plan in &self.days {
            output.push_str(&format!(
                "{} {}: {} / {} ({})\n",
                plan.day.format("%a"),
                plan.day,
                plan.len(),
                plan.requested,
                plan.termination.as_str()
            ));
        }
        output.push_str(&format!("Total: {}\n", self.total()));
        output
    }
}

/// Builds a [`WeeklyPlan`] from repeated single-day runs
#[derive(Debug, Clone)]
pub struct WeeklyPlanner {
    scheduler: RotationScheduler,
    days: u32,
    per_day_budget: usize,
}

impl WeeklyPlanner {
    pub fn new(per_day_budget: usize) -> Self {
        Self {
            scheduler: RotationScheduler::new().with_linkage_constraint(true),
            days: DEFAULT_WEEK_DAYS,
            per_day_budget,
        }
    }

    /// Number of working days to plan
    pub fn with_days(mut self, days: u32) -> Self {
        self.days = days;
        self
    }

    /// Replace the per-day scheduler; linkage is forced on
    pub fn with_scheduler(mut self, scheduler: RotationScheduler) -> Self {
        self.scheduler = scheduler.with_linkage_constraint(true);
        self
    }

    /// Working days covered, starting at `week_start` and skipping weekends
    pub fn days_from(&self, week_start: NaiveDate) -> Vec<NaiveDate> {
        week_start
            .iter_days()
            .filter(|d| !is_weekend(*d))
            .take(self.days as usize)
            .collect()
    }

    pub fn plan_week(
        &self,
        pools: &Pools,
        history: &[HistoryEntry],
        config: &SafetyConfig,
        week_start: NaiveDate,
    ) -> SchedulerResult<WeeklyPlan> {
        self.continue_week(pools, history, config, week_start, &[])
    }

    /// Plan the week around assignments already placed on some of its days
    ///
    /// Each day continues after its placed rows. Placed rows are projected
    /// into the following days like planned ones.
    pub fn continue_week(
        &self,
        pools: &Pools,
        history: &[HistoryEntry],
        config: &SafetyConfig,
        week_start: NaiveDate,
        placed: &[Assignment],
    ) -> SchedulerResult<WeeklyPlan> {
        let mut projected = history.to_vec();
        let mut days = Vec::with_capacity(self.days as usize);

        for day in self.days_from(week_start) {
            let placed_today: Vec<Assignment> =
                placed.iter().filter(|a| a.day() == day).cloned().collect();
            let plan = self.scheduler.continue_plan(
                pools,
                &projected,
                config,
                day,
                self.per_day_budget,
                &placed_today,
            )?;

            projected.extend(
                placed_today
                    .iter()
                    .chain(&plan.assignments)
                    .map(|a| HistoryEntry::posted(a, a.scheduled_time)),
            );
            days.push(plan);
        }

        let week = WeeklyPlan { week_start, days };
        tracing::info!(
            week_start = %week_start,
            days = week.days.len(),
            total = week.total(),
            shortfall = week.shortfall(),
            "Weekly plan generated"
        );
        Ok(week)
    }
}
