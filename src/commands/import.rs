use anyhow::{Context, Result};
use std::path::Path;

use rotapost::config::Config;
use rotapost::models::Pools;

use super::open_repository;

/// Load a JSON pool snapshot into the store
pub async fn import(config: &Config, input: &Path) -> Result<()> {
    let json = tokio::fs::read_to_string(input)
        .await
        .with_context(|| format!("Failed to read pools file: {}", input.display()))?;
    let pools = Pools::from_json(&json)
        .with_context(|| format!("Failed to parse pools file: {}", input.display()))?;

    let repo = open_repository(config)?;
    let stats = repo.import_pools(&pools).context("Failed to import pools")?;

    tracing::info!(total = stats.total(), "Pools imported");

    println!("Imported pools from {}", input.display());
    println!("  Actors:  {}", stats.actors);
    println!("  Targets: {}", stats.targets);
    println!("  Texts:   {}", stats.texts);
    println!("  Media:   {}", stats.media);

    let size = |p: &Pools| p.actors.len() + p.targets.len() + p.texts.len() + p.media.len();
    let ineligible = size(&pools) - size(&pools.eligible());
    if ineligible > 0 {
        println!("  ({ineligible} ineligible entries stored but excluded from planning)");
    }

    Ok(())
}
