use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::sync::Arc;

use rotapost::config::Config;

use super::open_service;

/// Print the stored assignments of a day
pub async fn show(config: Arc<Config>, day: NaiveDate) -> Result<()> {
    let service = open_service(config)?;
    let stored = service
        .assignments_for(day)
        .with_context(|| format!("Failed to load assignments for {day}"))?;

    if stored.is_empty() {
        println!("No assignments stored for {day}");
        return Ok(());
    }

    println!("Assignments for {day}");
    println!("{:=<100}", "");
    for s in &stored {
        let a = &s.assignment;
        println!(
            "{:>4} | {} | {:<14} | {:<14} | {:<10} | {:<10} | {:<8} | {}",
            a.sequence_number,
            a.scheduled_time.format("%H:%M"),
            a.actor_id,
            a.target_id,
            a.text_id,
            a.media_id.as_deref().unwrap_or("-"),
            s.outcome,
            s.id
        );
    }

    Ok(())
}
