pub mod import;
pub mod mark;
pub mod plan;
pub mod serve;
pub mod show;
pub mod verify;
pub mod week;

// Re-export command functions for convenience
pub use import::import;
pub use mark::mark;
pub use plan::plan;
pub use serve::serve;
pub use show::show;
pub use verify::verify;
pub use week::week;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::sync::Arc;

use rotapost::config::Config;
use rotapost::planner::PlanningService;
use rotapost::storage::{create_sqlite_repository, SharedRepository};

/// Open the configured SQLite store
pub fn open_repository(config: &Config) -> Result<SharedRepository> {
    create_sqlite_repository(&config.database.sqlite_path).with_context(|| {
        format!(
            "Failed to open database: {}",
            config.database.sqlite_path.display()
        )
    })
}

/// Planning service over the configured store
pub fn open_service(config: Arc<Config>) -> Result<PlanningService> {
    let repo = open_repository(&config)?;
    Ok(PlanningService::new(repo, config))
}

/// Parse a `YYYY-MM-DD` argument, defaulting to today
pub fn parse_day(raw: Option<&str>) -> Result<NaiveDate> {
    match raw {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .with_context(|| format!("Invalid date '{raw}'. Expected YYYY-MM-DD")),
        None => Ok(chrono::Local::now().date_naive()),
    }
}
