mod display;

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use casepulse_core::{Court, CourtSelector, MonitorKey, SearchCriteria, Settings};
use casepulse_dispatch::{Backends, Dispatcher, Monitor, RemoteBackend};
use casepulse_store::SnapshotStore;

#[derive(Parser)]
#[command(name = "casepulse", version, about = "Search and monitor court registries")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true, env = "CASEPULSE_CONFIG", default_value = casepulse_core::config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Override the snapshot directory.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Print JSON instead of cards.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search one court, or every court in `all`, for a party on a date.
    Search {
        #[arg(long)]
        party: String,
        #[arg(long, default_value = "all")]
        court: CourtSelector,
        /// Hearing date; omitted means no search is made.
        #[arg(long)]
        date: Option<String>,
    },
    /// Search a date range.
    SearchRange {
        #[arg(long)]
        party: String,
        #[arg(long, default_value = "all")]
        court: CourtSelector,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
    },
    /// Poll a monitor key and report what is new since the last poll.
    Monitor {
        #[arg(long)]
        keyword: String,
        #[arg(long, default_value = "party")]
        mode: String,
        #[arg(long, default_value = "supreme")]
        court: Court,
        #[arg(long)]
        year: Option<String>,
    },
    /// Fresh Delhi High Court case-status query.
    Status {
        #[arg(long)]
        keyword: String,
        #[arg(long, default_value = "party")]
        mode: String,
        #[arg(long)]
        year: Option<String>,
    },
    /// Regulatory-commission search by month.
    Commission {
        #[arg(long)]
        month: String,
        #[arg(long)]
        party: String,
    },
    /// List saved monitor snapshots.
    Monitors,
    /// Show configured backends.
    Health,
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
    backends: Vec<Court>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::debug!("casepulse v{}", env!("CARGO_PKG_VERSION"));

    let mut settings = Settings::load_from(&cli.config)
        .map_err(|e| anyhow!("loading {}: {e}", cli.config.display()))?;
    if let Some(dir) = cli.data_dir {
        settings.data_dir = dir;
    }

    match cli.command {
        Command::Search { party, court, date } => {
            let criteria = SearchCriteria::single(party, court, date);
            run_search(&settings, &criteria, cli.json).await
        }
        Command::SearchRange {
            party,
            court,
            start,
            end,
        } => {
            let criteria = SearchCriteria::range(party, court, start, end);
            run_search(&settings, &criteria, cli.json).await
        }
        Command::Monitor {
            keyword,
            mode,
            court,
            year,
        } => {
            let key = MonitorKey::new(court, &keyword, Some(mode.as_str()))?.with_year(year);
            let outcome = monitor(&settings)?.poll(&key).await?;
            if cli.json {
                print_json(&outcome)
            } else {
                display::print_poll(&outcome);
                Ok(())
            }
        }
        Command::Status {
            keyword,
            mode,
            year,
        } => {
            let results = monitor(&settings)?
                .status(&keyword, &mode, year.as_deref())
                .await?;
            if let Some(cause) = &results.degraded {
                eprintln!("warning: {cause}");
            }
            if cli.json {
                print_json(&results)
            } else {
                display::print_records(&results.records);
                Ok(())
            }
        }
        Command::Commission { month, party } => {
            let results = dispatcher(&settings)?
                .search_commission(&month, &party)
                .await;
            if let Some(cause) = &results.degraded {
                eprintln!("warning: {cause}");
            }
            if cli.json {
                print_json(&results)
            } else {
                display::print_records(&results.results);
                Ok(())
            }
        }
        Command::Monitors => {
            let files = monitor(&settings)?.saved().await?;
            if cli.json {
                print_json(&files)
            } else {
                for file in &files {
                    println!("{file}");
                }
                Ok(())
            }
        }
        Command::Health => {
            let health = Health {
                status: "ok",
                backends: dispatcher(&settings)?.registered(),
            };
            if cli.json {
                print_json(&health)
            } else {
                println!("status: {}", health.status);
                for court in &health.backends {
                    println!("  {court}");
                }
                Ok(())
            }
        }
    }
}

async fn run_search(settings: &Settings, criteria: &SearchCriteria, json: bool) -> Result<()> {
    let dispatch = dispatcher(settings)?.search(criteria).await?;
    display::print_failures(&dispatch.failures);
    if json {
        print_json(&dispatch.records)
    } else {
        display::print_records(&dispatch.records);
        Ok(())
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn dispatcher(settings: &Settings) -> Result<Dispatcher> {
    Ok(Dispatcher::new(build_backends(settings)?, settings.into()))
}

fn monitor(settings: &Settings) -> Result<Monitor> {
    let store = SnapshotStore::open(&settings.data_dir)
        .with_context(|| format!("opening snapshot directory {}", settings.data_dir.display()))?;
    Ok(Monitor::new(build_backends(settings)?, store, settings.into()))
}

/// One remote adapter per configured court, sharing a connection pool.
fn build_backends(settings: &Settings) -> Result<Backends> {
    let client = reqwest::Client::builder()
        .timeout(settings.backend_timeout())
        .build()
        .context("building HTTP client")?;

    let mut backends = Backends::default();
    for (name, endpoint) in &settings.backends {
        let court: Court = name
            .parse()
            .with_context(|| format!("backends.{name}"))?;
        let backend = RemoteBackend::from_endpoint(client.clone(), court, endpoint)
            .with_context(|| format!("backends.{name}"))?;
        backends.register(backend);
    }
    Ok(backends)
}
