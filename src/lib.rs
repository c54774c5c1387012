//! rotapost - Posting rotation scheduler
//!
//! Assigns accounts, groups and content to time slots so a daily posting
//! campaign stays inside per-account and per-group caps, cooldowns and
//! working hours.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`] - Pools, assignments and history records
//! - [`scheduler`] - Rotation engine, slot clock, safety settings and audit
//! - [`planner`] - Loads inputs from storage, runs the scheduler, stores results
//! - [`storage`] - Repository trait with SQLite and in-memory backends
//! - [`config`] - Configuration management and settings
//! - [`http`] - HTTP API
//! - [`metrics`] - Prometheus metrics
//! - [`error`] - Unified error type
//!
//! # Example
//!
//! ```no_run
//! use rotapost::config::Config;
//! use rotapost::models::{Actor, ContentText, Pools, Target};
//! use rotapost::scheduler::RotationScheduler;
//!
//! let config = Config::default();
//! let pools = Pools {
//!     actors: vec![Actor::new("a1", "Main account")],
//!     targets: vec![Target::new("g1", "Neighbourhood", 1200)],
//!     texts: vec![ContentText::new("x1", "Hello")],
//!     media: vec![],
//! };
//! let day = chrono::NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
//! let plan = RotationScheduler::new()
//!     .generate_plan(&pools, &[], &config.safety, day, 10)
//!     .unwrap();
//! println!("{}", plan.format_table());
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod metrics;
pub mod models;
pub mod planner;
pub mod scheduler;
pub mod storage;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorCategory, Result, RotapostErrorTrait};
    pub use crate::models::{
        Actor, Assignment, AssignmentOutcome, ContentMedia, ContentText, HistoryEntry, Pools,
        StoredAssignment, Target,
    };
    pub use crate::planner::{PlanRequest, PlanningService};
    pub use crate::scheduler::{AssignmentPlan, RotationScheduler, SafetyConfig, Termination};
    pub use crate::storage::{PostingRepository, SharedRepository};
}

// Direct re-exports for convenience
pub use models::{Assignment, AssignmentOutcome, HistoryEntry, Pools};
