use anyhow::{Context, Result};
use std::sync::Arc;

use rotapost::config::Config;
use rotapost::http::ApiServer;

use super::open_repository;

/// Run the HTTP API until Ctrl+C
pub async fn serve(config: Arc<Config>) -> Result<()> {
    if let Err(e) = rotapost::metrics::init_metrics() {
        tracing::warn!("Metrics initialization failed: {}", e);
    }

    let repo = open_repository(&config)?;
    let server = ApiServer::new(repo, config).context("Failed to create API server")?;

    println!("{}", server.info().display());
    println!();
    println!("API Endpoints:");
    println!("  GET  /api/health                     - Health check");
    println!("  GET  /metrics                        - Prometheus metrics endpoint");
    println!("  POST /api/plans                      - Generate a day plan");
    println!("  GET  /api/plans/{{day}}                - Stored assignments (YYYY-MM-DD)");
    println!("  GET  /api/plans/{{day}}/verify         - Audit stored assignments");
    println!("  POST /api/assignments/{{id}}/outcome   - Record an outcome");
    println!();
    println!("Press Ctrl+C to stop.\n");

    server
        .start_with_shutdown(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Shutdown signal received");
                }
                Err(e) => {
                    tracing::error!("Failed to wait for Ctrl+C: {}", e);
                }
            }
        })
        .await?;

    Ok(())
}
