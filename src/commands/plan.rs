use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::PathBuf;
use std::sync::Arc;

use rotapost::config::Config;
use rotapost::planner::PlanRequest;
use rotapost::scheduler::parse_time;

use super::open_service;

/// Options of the `plan` command
#[derive(Debug, Clone)]
pub struct PlanParams {
    pub day: NaiveDate,
    pub count: Option<usize>,
    pub start: Option<String>,
    pub dry_run: bool,
    pub output: Option<PathBuf>,
}

/// Generate the plan for one day
pub async fn plan(config: Arc<Config>, params: PlanParams) -> Result<()> {
    let start_time = params
        .start
        .as_deref()
        .map(parse_time)
        .transpose()
        .context("Invalid --start")?;
    let count = params.count.unwrap_or(config.planner.default_count);

    let request = PlanRequest::new(params.day, count)
        .starting_at(start_time)
        .dry_run(params.dry_run);

    let service = open_service(config.clone())?;
    let planned = service
        .plan_day(&request)
        .with_context(|| format!("Failed to plan {}", params.day))?;

    println!("{}", planned.plan.format_table());
    println!("{}", planned.plan.summary().display());

    if planned.stored.is_empty() {
        println!("Dry run: nothing stored");
    } else {
        println!("Stored {} assignments", planned.stored.len());
    }

    let output = match params.output {
        Some(path) => Some(path),
        None if params.dry_run => Some(
            config
                .planner
                .plan_dir
                .join(format!("plan-{}.json", params.day)),
        ),
        None => None,
    };

    if let Some(path) = output {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        planned
            .plan
            .save_to_file(&path)
            .await
            .with_context(|| format!("Failed to write plan: {}", path.display()))?;
        println!("Plan written to {}", path.display());
    }

    Ok(())
}
