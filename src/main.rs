use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rotapost::config::Config;

mod commands;

#[derive(Parser)]
#[command(
    name = "rotapost",
    version,
    about = "Posting rotation scheduler with per-account caps, cooldowns and working hours",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML); environment variables are used when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); overrides the config file
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Import actors, targets, texts and media from a JSON file
    Import {
        /// Pools file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Generate the plan for one day
    Plan {
        /// Day to plan (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        day: Option<String>,

        /// Number of assignments requested
        #[arg(short = 'n', long)]
        count: Option<usize>,

        /// Earliest slot (HH:MM)
        #[arg(long)]
        start: Option<String>,

        /// Print without storing
        #[arg(long, default_value = "false")]
        dry_run: bool,

        /// Write the plan as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Plan a working week
    Week {
        /// First day of the week (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        start: Option<String>,

        /// Assignments per day
        #[arg(long)]
        per_day: Option<usize>,

        /// Print without storing
        #[arg(long, default_value = "false")]
        dry_run: bool,
    },

    /// Record the outcome of a stored assignment
    Mark {
        /// Assignment id
        #[arg(long)]
        id: String,

        /// posted, skipped or failed
        #[arg(long)]
        outcome: String,
    },

    /// Show stored assignments of a day
    Show {
        /// Day (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        day: Option<String>,
    },

    /// Check stored assignments of a day against the safety limits
    Verify {
        /// Day (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        day: Option<String>,
    },

    /// Run the HTTP API
    Serve {
        /// Address to bind, overrides the config
        #[arg(short, long)]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }

    // Initialize tracing/logging
    setup_tracing(&config.logging.format, &config.logging.level, cli.verbose)?;

    tracing::debug!(config = ?cli.config, "Configuration loaded");

    match cli.command {
        Commands::Import { input } => {
            tracing::info!(input = %input.display(), "Starting import command");
            commands::import(&config, &input).await?;
        }

        Commands::Plan {
            day,
            count,
            start,
            dry_run,
            output,
        } => {
            let day = commands::parse_day(day.as_deref())?;
            tracing::info!(
                day = %day,
                count = ?count,
                start = ?start,
                dry_run = %dry_run,
                "Starting plan command"
            );
            commands::plan(
                Arc::new(config),
                commands::plan::PlanParams {
                    day,
                    count,
                    start,
                    dry_run,
                    output,
                },
            )
            .await?;
        }

        Commands::Week {
            start,
            per_day,
            dry_run,
        } => {
            let start = commands::parse_day(start.as_deref())?;
            tracing::info!(
                start = %start,
                per_day = ?per_day,
                dry_run = %dry_run,
                "Starting week command"
            );
            commands::week(Arc::new(config), start, per_day, dry_run).await?;
        }

        Commands::Mark { id, outcome } => {
            commands::mark(Arc::new(config), &id, &outcome).await?;
        }

        Commands::Show { day } => {
            let day = commands::parse_day(day.as_deref())?;
            commands::show(Arc::new(config), day).await?;
        }

        Commands::Verify { day } => {
            let day = commands::parse_day(day.as_deref())?;
            commands::verify(Arc::new(config), day).await?;
        }

        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind_address = bind;
                config.validate()?;
            }
            tracing::info!(bind = %config.server.bind_address, "Starting serve command");
            commands::serve(Arc::new(config)).await?;
        }
    }

    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("rotapost=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("rotapost={level},warn")))
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
