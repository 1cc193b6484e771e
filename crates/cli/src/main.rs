// crates/cli/src/main.rs
//! `fieldops`: run the automation core against JSON fixtures.

use std::path::PathBuf;

use anyhow::Result;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use fieldops_cli::commands;
use fieldops_cli::fixtures::{load_config, load_json, parse_coordinate};
use fieldops_core::{Client, Coordinate, Invoice, Job, Message, Quote};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "fieldops")]
#[command(version)]
#[command(about = "Route planning, geofence and change-alert tooling for field jobs")]
#[command(propagate_version = true)]
struct Args {
    /// TOML config file (env `FIELDOPS_*` values still apply on top)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Order jobs into a driving route
    Plan {
        /// JSON array of jobs
        #[arg(long)]
        jobs: PathBuf,
        /// JSON array of clients
        #[arg(long)]
        clients: PathBuf,
        /// Starting point as LAT,LNG (default: no start point)
        #[arg(long, value_parser = parse_coordinate)]
        start: Option<Coordinate>,
        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the geofences that would be registered for a day
    Regions {
        #[arg(long)]
        jobs: PathBuf,
        #[arg(long)]
        clients: PathBuf,
        /// Day in local time, YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Replay a JSON array of collection snapshots through the change watch
    Replay {
        #[arg(long, value_enum)]
        kind: ReplayKind,
        #[arg(long)]
        snapshots: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ReplayKind {
    Quotes,
    Invoices,
    Messages,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| fieldops_cli::DEFAULT_LOG_FILTER.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;
    tracing::debug!(?config, "Config loaded");

    let output = match args.command {
        Command::Plan {
            jobs,
            clients,
            start,
            json,
        } => {
            let jobs: Vec<Job> = load_json(&jobs)?;
            let clients: Vec<Client> = load_json(&clients)?;
            commands::plan(&jobs, clients, start, &config, json).await?
        }
        Command::Regions { jobs, clients, date } => {
            let jobs: Vec<Job> = load_json(&jobs)?;
            let clients: Vec<Client> = load_json(&clients)?;
            let day = date.unwrap_or_else(|| Local::now().date_naive());
            commands::regions(&jobs, clients, day, &Local, &config)?
        }
        Command::Replay { kind, snapshots } => {
            let notifications = match kind {
                ReplayKind::Quotes => commands::replay_quotes(&load_json::<Vec<Vec<Quote>>>(&snapshots)?, &config),
                ReplayKind::Invoices => commands::replay_invoices(&load_json::<Vec<Vec<Invoice>>>(&snapshots)?, &config),
                ReplayKind::Messages => commands::replay_messages(&load_json::<Vec<Vec<Message>>>(&snapshots)?, &config),
            };
            tracing::info!(kind = ?kind, emitted = notifications.len(), "Replay finished");
            commands::render_notifications(&notifications)?
        }
    };
    print!("{output}");
    Ok(())
}
