use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::sync::Arc;

use rotapost::config::Config;

use super::open_service;

/// Audit the stored assignments of a day; fails when violations are found
pub async fn verify(config: Arc<Config>, day: NaiveDate) -> Result<()> {
    let service = open_service(config)?;
    let violations = service
        .verify_day(day)
        .with_context(|| format!("Failed to verify {day}"))?;

    if violations.is_empty() {
        println!("{day}: no violations");
        return Ok(());
    }

    println!("{day}: {} violations", violations.len());
    for v in &violations {
        println!("  - {v}");
    }
    anyhow::bail!("plan for {day} violates safety limits")
}
