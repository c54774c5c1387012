//! Plan data structures
//!
//! An [`AssignmentPlan`] is the output of one scheduling run: the ordered
//! assignments plus why the run stopped. Plans serialize to JSON so an
//! operator can review them before they are persisted.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use super::error::{SchedulerError, SchedulerResult};
use crate::models::Assignment;

// ============================================================================
// Termination
// ============================================================================

/// Why a run stopped producing assignments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The requested count was reached
    Completed,
    /// Working hours ran out before the count was reached
    SlotsExhausted,
    /// Caps, cooldowns or the no-repeat rule left no feasible combination
    CapacityExhausted,
}

impl Termination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::SlotsExhausted => "slots_exhausted",
            Self::CapacityExhausted => "capacity_exhausted",
        }
    }
}

// ============================================================================
// Assignment Plan
// ============================================================================

/// Result of one scheduling run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentPlan {
    /// Target day of the run
    pub day: NaiveDate,

    /// Count the caller asked for
    pub requested: usize,

    /// Produced assignments, ordered by sequence number
    pub assignments: Vec<Assignment>,

    pub termination: Termination,

    /// When this plan was generated
    #[serde(default = "Utc::now")]
    pub generated_at: DateTime<Utc>,
}

impl AssignmentPlan {
    pub fn new(
        day: NaiveDate,
        requested: usize,
        assignments: Vec<Assignment>,
        termination: Termination,
    ) -> Self {
        Self {
            day,
            requested,
            assignments,
            termination,
            generated_at: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// How many requested assignments could not be placed
    pub fn shortfall(&self) -> usize {
        self.requested.saturating_sub(self.assignments.len())
    }

    pub fn is_complete(&self) -> bool {
        self.shortfall() == 0
    }

    /// Assignments for one actor
    pub fn for_actor<'a>(&'a self, actor_id: &'a str) -> impl Iterator<Item = &'a Assignment> + 'a {
        self.assignments.iter().filter(move |a| a.actor_id == actor_id)
    }

    /// Get summary statistics
    pub fn summary(&self) -> PlanSummary {
        let mut per_actor = BTreeMap::new();
        let mut per_target = BTreeMap::new();

        for assignment in &self.assignments {
            *per_actor.entry(assignment.actor_id.clone()).or_insert(0) += 1;
            *per_target.entry(assignment.target_id.clone()).or_insert(0) += 1;
        }

        PlanSummary {
            day: self.day,
            requested: self.requested,
            produced: self.assignments.len(),
            termination: self.termination,
            first_slot: self.assignments.first().map(|a| a.scheduled_time.format("%H:%M").to_string()),
            last_slot: self.assignments.last().map(|a| a.scheduled_time.format("%H:%M").to_string()),
            per_actor,
            per_target,
        }
    }

    /// Render as a fixed-width table
    pub fn format_table(&self) -> String {
        let mut output = format!("Plan for {} ({})\n", self.day, self.termination.as_str());
        output.push_str(&format!("{:=<78}\n", ""));
        output.push_str(&format!(
            "{:>4} | {:<16} | {:<14} | {:<14} | {:<10} | {}\n",
            "#", "Time", "Actor", "Target", "Text", "Media"
        ));
        output.push_str(&format!("{:-<78}\n", ""));

        for a in &self.assignments {
            output.push_str(&format!(
                "{:>4} | {:<16} | {:<14} | {:<14} | {:<10} | {}\n",
                a.sequence_number,
                a.scheduled_time.format("%Y-%m-%d %H:%M"),
                a.actor_id,
                a.target_id,
                a.text_id,
                a.media_id.as_deref().unwrap_or("-")
            ));
        }

        if !self.is_complete() {
            output.push_str(&format!(
                "\n{} of {} requested assignments could not be placed\n",
                self.shortfall(),
                self.requested
            ));
        }

        output
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> SchedulerResult<String> {
        serde_json::to_string_pretty(self).map_err(Into::into)
    }

    /// Deserialize from JSON
    pub fn from_json(json: &str) -> SchedulerResult<Self> {
        serde_json::from_str(json).map_err(Into::into)
    }

    /// Save to file
    pub async fn save_to_file(&self, path: impl AsRef<Path>) -> SchedulerResult<()> {
        let json = self.to_json()?;
        tokio::fs::write(path.as_ref(), json)
            .await
            .map_err(|e| SchedulerError::io_error("save_plan", e.to_string()))?;
        Ok(())
    }

    /// Load from file
    pub async fn load_from_file(path: impl AsRef<Path>) -> SchedulerResult<Self> {
        let json = tokio::fs::read_to_string(path.as_ref())
            .await
            .map_err(|e| SchedulerError::io_error("load_plan", e.to_string()))?;
        Self::from_json(&json)
    }
}

/// Plan summary statistics
#[derive(Debug, Clone, Serialize)]
pub struct PlanSummary {
    pub day: NaiveDate,
    pub requested: usize,
    pub produced: usize,
    pub termination: Termination,
    pub first_slot: Option<String>,
    pub last_slot: Option<String>,
    pub per_actor: BTreeMap<String, usize>,
    pub per_target: BTreeMap<String, usize>,
}

impl PlanSummary {
    /// Format as display string
    pub fn display(&self) -> String {
        let mut output = format!("Plan Summary for {}\n", self.day);
        output.push_str(&format!("{:-<40}\n", ""));
        output.push_str(&format!(
            "Produced: {} / {} ({})\n",
            self.produced,
            self.requested,
            self.termination.as_str()
        ));
        if let (Some(first), Some(last)) = (&self.first_slot, &self.last_slot) {
            output.push_str(&format!("Window: {first} - {last}\n"));
        }

        output.push_str("\nPer Actor:\n");
        for (actor, count) in &self.per_actor {
            output.push_str(&format!("  {actor}: {count}\n"));
        }

        output.push_str("\nPer Target:\n");
        for (target, count) in &self.per_target {
            output.push_str(&format!("  {target}: {count}\n"));
        }

        output
    }
}

// ============================================================================
// Tests
// ============================================================================
