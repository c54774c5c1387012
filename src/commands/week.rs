use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::sync::Arc;

use rotapost::config::Config;

use super::open_service;

/// Plan the working week starting at `start`
pub async fn week(
    config: Arc<Config>,
    start: NaiveDate,
    per_day: Option<usize>,
    dry_run: bool,
) -> Result<()> {
    let per_day = per_day.unwrap_or(config.planner.per_day_budget);

    let service = open_service(config)?;
    let week = service
        .plan_week(start, per_day, dry_run)
        .with_context(|| format!("Failed to plan week of {start}"))?;

    for plan in &week.days {
        println!("{}", plan.format_table());
    }
    println!("{}", week.display());

    if week.shortfall() > 0 {
        println!("Shortfall: {} assignments", week.shortfall());
    }
    if dry_run {
        println!("Dry run: nothing stored");
    }

    Ok(())
}
