//! Planning service
//!
//! Glue between the repository and the scheduler: loads the pool snapshot
//! and the history window a run needs, runs it, and persists the result.
//! Both the CLI commands and the HTTP handlers go through this type.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

use crate::config::Config;
use crate::error::Result;
use crate::models::{Assignment, AssignmentOutcome, HistoryEntry, StoredAssignment};
use crate::scheduler::{
    audit_assignments, AssignmentPlan, RotationScheduler, Violation, WeeklyPlan, WeeklyPlanner,
};
use crate::storage::SharedRepository;

/// Parameters of a single-day plan
#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub day: NaiveDate,
    pub count: usize,
    pub start_time: Option<NaiveTime>,
    /// Generate without touching the store
    pub dry_run: bool,
}

impl PlanRequest {
    pub fn new(day: NaiveDate, count: usize) -> Self {
        Self {
            day,
            count,
            start_time: None,
            dry_run: false,
        }
    }

    pub fn starting_at(mut self, time: Option<NaiveTime>) -> Self {
        self.start_time = time;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// A generated plan and, unless dry-run, its stored rows
#[derive(Debug, Clone, Serialize)]
pub struct PlannedDay {
    pub plan: AssignmentPlan,
    pub stored: Vec<StoredAssignment>,
}

/// Loads inputs, runs the scheduler and stores its output
#[derive(Clone)]
pub struct PlanningService {
    repo: SharedRepository,
    config: Arc<Config>,
    scheduler: RotationScheduler,
}

impl PlanningService {
    pub fn new(repo: SharedRepository, config: Arc<Config>) -> Self {
        let scheduler = RotationScheduler::new()
            .with_linkage_constraint(config.planner.enforce_linkage)
            .with_cursor_seed(config.planner.cursor_seed);

        Self {
            repo,
            config,
            scheduler,
        }
    }

    pub fn repository(&self) -> &SharedRepository {
        &self.repo
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// History relevant to `day`: the cooldown lookback window up to the end of `day`
    fn history_for(&self, day: NaiveDate) -> Result<Vec<HistoryEntry>> {
        let since = day_start(day) - self.config.history_lookback();
        let mut history = self.repo.load_history(since)?;
        history.retain(|h| h.occurred_at.date() <= day);
        Ok(history)
    }

    /// Stored rows of `day` that already carry an outcome
    fn reported_on(&self, day: NaiveDate) -> Result<Vec<StoredAssignment>> {
        let mut rows = self.repo.list_assignments(day)?;
        rows.retain(|r| r.outcome != AssignmentOutcome::Pending);
        Ok(rows)
    }

    /// Generate (and unless dry-run, store) the plan for one day
    ///
    /// Still-pending assignments of the same day are replaced once the new
    /// plan exists. Rows with a reported outcome stay and the new plan
    /// continues after them.
    pub fn plan_day(&self, request: &PlanRequest) -> Result<PlannedDay> {
        let pools = self.repo.load_pools()?;
        let kept = self.reported_on(request.day)?;
        let history = exclude_kept(self.history_for(request.day)?, &kept);
        let placed: Vec<Assignment> = kept.iter().map(|r| r.assignment.clone()).collect();

        let plan = self
            .scheduler
            .clone()
            .with_start_time(request.start_time)
            .continue_plan(
                &pools,
                &history,
                &self.config.safety,
                request.day,
                request.count,
                &placed,
            )?;

        let stored = if request.dry_run {
            Vec::new()
        } else {
            self.repo.replace_pending(&[request.day], &plan.assignments)?
        };

        tracing::info!(
            day = %request.day,
            kept = kept.len(),
            produced = plan.len(),
            stored = stored.len(),
            dry_run = request.dry_run,
            "Day planned"
        );

        Ok(PlannedDay { plan, stored })
    }

    /// Plan the working week starting at `week_start`
    ///
    /// Pending rows of the covered days are replaced in a single step after
    /// every day has been planned.
    pub fn plan_week(
        &self,
        week_start: NaiveDate,
        per_day: usize,
        dry_run: bool,
    ) -> Result<WeeklyPlan> {
        let planner = WeeklyPlanner::new(per_day)
            .with_days(self.config.planner.week_days)
            .with_scheduler(self.scheduler.clone());

        let days = planner.days_from(week_start);
        let pools = self.repo.load_pools()?;

        let mut kept = Vec::new();
        for day in &days {
            kept.extend(self.reported_on(*day)?);
        }

        let last_day = days.last().copied().unwrap_or(week_start);
        let since = day_start(week_start) - self.config.history_lookback();
        let mut history = self.repo.load_history(since)?;
        history.retain(|h| h.occurred_at.date() <= last_day);
        let history = exclude_kept(history, &kept);
        let placed: Vec<Assignment> = kept.iter().map(|r| r.assignment.clone()).collect();

        let week =
            planner.continue_week(&pools, &history, &self.config.safety, week_start, &placed)?;

        if !dry_run {
            let assignments: Vec<Assignment> = week.assignments().cloned().collect();
            self.repo.replace_pending(&days, &assignments)?;
        }

        Ok(week)
    }

    /// Stored assignments of `day`
    pub fn assignments_for(&self, day: NaiveDate) -> Result<Vec<StoredAssignment>> {
        self.repo.list_assignments(day)
    }

    /// Re-check the stored assignments of `day` against earlier history
    pub fn verify_day(&self, day: NaiveDate) -> Result<Vec<Violation>> {
        let stored = self.repo.list_assignments(day)?;
        let assignments: Vec<_> = stored.into_iter().map(|s| s.assignment).collect();

        let since = day_start(day) - self.config.history_lookback();
        let mut history = self.repo.load_history(since)?;
        history.retain(|h| h.occurred_at < day_start(day));

        Ok(audit_assignments(&assignments, &history, &self.config.safety))
    }

    /// Record a real-world outcome; `false` if the id is unknown
    pub fn record_outcome(&self, id: &str, outcome: AssignmentOutcome) -> Result<bool> {
        let found = self.repo.record_outcome(id, outcome)?;
        if found {
            crate::metrics::record_outcome(outcome.as_str());
            tracing::info!(id, outcome = outcome.as_str(), "Outcome recorded");
        } else {
            tracing::warn!(id, "Outcome for unknown assignment");
        }
        Ok(found)
    }
}

fn day_start(day: NaiveDate) -> NaiveDateTime {
    day.and_time(NaiveTime::MIN)
}

/// Drop the history rows standing for `kept`; those enter a run as placed assignments
fn exclude_kept(mut history: Vec<HistoryEntry>, kept: &[StoredAssignment]) -> Vec<HistoryEntry> {
    for record in kept {
        let entry = record.to_history();
        if let Some(pos) = history.iter().position(|h| *h == entry) {
            history.remove(pos);
        }
    }
    history
}
