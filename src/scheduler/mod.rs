//! Posting rotation scheduler
//!
//! This module turns four pools (accounts, groups, texts, media) plus the
//! recent posting history into an ordered list of timestamped assignments
//! for one day, or for a working week.
//!
//! # Overview
//!
//! A run is greedy and deterministic. Actors and content are visited in
//! round-robin order, groups in descending audience order from a rotating
//! offset, and every candidate is checked against:
//!
//! - per-actor and per-target daily caps (history plus the run so far)
//! - the per-target cooldown, measured from the last successful post
//! - the per-actor content cooldown (relaxed only when nothing else is left)
//! - the no-repeat rule: an (actor, target, text, media) tuple is used once
//!
//! Slots start at the beginning of working hours, advance by a fixed
//! interval and skip the break window. When the constraints leave nothing
//! feasible the run stops early and reports why.
//!
//! # Architecture
//!
//! ```text
//!   Pools ──┐
//!           │     ┌──────────────┐     ┌──────────────┐
//!  History ─┼────►│ HistoryIndex │────►│   Rotation   │────► AssignmentPlan
//!           │     └──────────────┘     │  Scheduler   │
//!  Safety ──┘                          └──────┬───────┘
//!  Config                                     │
//!                                      ┌──────▼───────┐
//!                                      │  SlotClock   │
//!                                      └──────────────┘
//! ```
//!
//! # Modules
//!
//! - [`rotation`] - Core assignment loop and cursor handling
//! - [`history`] - Usage counts and cooldown lookups
//! - [`slots`] - Slot time arithmetic and day rollover
//! - [`safety`] - Caps, cooldowns and working hours
//! - [`plan`] - Plan output, summaries and JSON persistence
//! - [`audit`] - Re-checking a list of assignments after the fact
//! - [`weekly`] - Five working days in one call
//!
//! # Quick Start
//!
//! ```ignore
//! use rotapost::scheduler::{RotationScheduler, SafetyConfig};
//!
//! let scheduler = RotationScheduler::new();
//! let plan = scheduler.generate_plan(&pools, &history, &config, day, 20)?;
//!
//! println!("{}", plan.format_table());
//! if !plan.is_complete() {
//!     println!("stopped early: {}", plan.termination.as_str());
//! }
//! ```

pub mod audit;
pub mod error;
pub mod history;
pub mod plan;
pub mod rotation;
pub mod safety;
pub mod slots;
pub mod weekly;

// Re-export main types
pub use audit::{audit_assignments, Violation};
pub use error::{PoolKind, SchedulerError, SchedulerResult};
pub use history::HistoryIndex;
pub use plan::{AssignmentPlan, PlanSummary, Termination};
pub use rotation::{CursorSeed, RotationScheduler};
pub use safety::{parse_time, SafetyConfig, SafetyConfigBuilder, TimeWindow};
pub use slots::{RunWindow, SlotClock};
pub use weekly::{WeeklyPlan, WeeklyPlanner, DEFAULT_WEEK_DAYS};
