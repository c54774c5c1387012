use anyhow::{Context, Result};
use std::sync::Arc;

use rotapost::config::Config;
use rotapost::models::AssignmentOutcome;

use super::open_service;

/// Record the outcome of a stored assignment
pub async fn mark(config: Arc<Config>, id: &str, outcome: &str) -> Result<()> {
    let outcome: AssignmentOutcome = outcome.parse().map_err(anyhow::Error::msg)?;

    let service = open_service(config)?;
    let found = service
        .record_outcome(id, outcome)
        .context("Failed to record outcome")?;

    if !found {
        anyhow::bail!("Assignment not found: {id}");
    }

    println!("{id} marked {outcome}");
    Ok(())
}
