use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use wxtrack_core::{AppError, Config, ConfigError};
use wxtrack_weather::{open_repository, LocationRecord, LocationTracker, TrackerError};

/// Location tracker for the weather fetch layer.
#[derive(Parser, Debug)]
#[command(name = "wxtrack")]
#[command(version)]
#[command(about = "Track requested locations and derive weather cache keys.", long_about = None)]
struct Cli {
    /// Config file (defaults to <config_dir>/wxtrack/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Record a request for a location
    Track { city: String, country: String },

    /// Show a tracked location without counting a request
    Show { city: String, country: String },

    /// List active locations as JSON lines
    Active,

    /// List active locations whose weather needs refreshing
    Due {
        /// Override the configured refresh interval (hours)
        #[arg(long)]
        hours: Option<u32>,
    },

    /// Deactivate locations not requested within the retention window
    Sweep {
        /// Only list what would be deactivated
        #[arg(long)]
        dry_run: bool,
    },

    /// Record a successful upstream fetch for a location
    Fetched { city: String, country: String },

    /// Print the location string and cache key for a location
    Key {
        city: String,
        country: String,

        /// Forecast horizon in days
        #[arg(long)]
        days: Option<u32>,

        /// Alerts flag, e.g. "yes" or "no"
        #[arg(long)]
        alerts: Option<String>,
    },
}

fn main() {
    if let Err(e) = run() {
        let app_err = match e.downcast::<AppError>() {
            Ok(app_err) => app_err,
            Err(other) => match other.downcast::<ConfigError>() {
                Ok(config_err) => AppError::Config(config_err),
                Err(other) => AppError::Other(other),
            },
        };
        tracing::error!("{:#}", app_err);
        eprintln!("wxtrack: {}", app_err.user_message());
        eprintln!("  caused by: {}", app_err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let (config, validation) = match &cli.config {
        Some(path) => Config::load_validated_from(path)?,
        None => Config::load_validated()?,
    };
    wxtrack_core::init(&config.logging.level)?;

    // The subscriber did not exist while loading.
    for warning in &validation.warnings {
        tracing::warn!("Config warning: {}", warning);
    }

    let repo = open_repository(&config).map_err(AppError::from)?;
    let tracker = LocationTracker::from_config(Arc::clone(&repo), &config.tracking);

    match cli.command {
        Commands::Track { city, country } => {
            let record = tracker.track_location(&city, &country).map_err(AppError::from)?;
            print_record(&record)?;
        }
        Commands::Show { city, country } => {
            match tracker.find_location(&city, &country).map_err(AppError::from)? {
                Some(record) => print_record(&record)?,
                None => println!("{},{} is not tracked", city.trim(), country.trim()),
            }
        }
        Commands::Active => {
            for record in tracker.active_locations().map_err(AppError::from)? {
                print_record(&record)?;
            }
        }
        Commands::Due { hours } => {
            let hours = hours.unwrap_or(config.tracking.refresh_hours);
            let due = tracker
                .locations_due_for_fetch(chrono_hours(hours))
                .map_err(AppError::from)?;
            for record in due {
                println!(
                    "{}\t{}",
                    tracker.location_string(&record),
                    tracker.default_cache_key(&record)
                );
            }
        }
        Commands::Sweep { dry_run: true } => {
            for record in tracker.stale_locations().map_err(AppError::from)? {
                print_record(&record)?;
            }
        }
        Commands::Sweep { dry_run: false } => {
            let changed = tracker.deactivate_old_locations().map_err(AppError::from)?;
            println!("deactivated {} location(s)", changed);
        }
        Commands::Fetched { city, country } => {
            let record = tracker
                .find_location(&city, &country)
                .map_err(AppError::from)?
                .ok_or_else(|| not_tracked(&city, &country))?;
            let record = tracker.mark_as_fetched(&record).map_err(AppError::from)?;
            print_record(&record)?;
        }
        Commands::Key {
            city,
            country,
            days,
            alerts,
        } => {
            let record = tracker
                .find_location(&city, &country)
                .map_err(AppError::from)?
                .ok_or_else(|| not_tracked(&city, &country))?;
            let key = match (days, alerts) {
                (None, None) => tracker.default_cache_key(&record),
                (days, alerts) => tracker.cache_key_with(
                    &record,
                    days.unwrap_or(config.tracking.forecast_days),
                    alerts.as_deref().unwrap_or(config.tracking.alerts_flag()),
                ),
            };
            println!("{}", tracker.location_string(&record));
            println!("{}", key);
        }
    }

    tracing::debug!("{} location(s) stored", repo.count().map_err(AppError::from)?);
    Ok(())
}

fn not_tracked(city: &str, country: &str) -> AppError {
    TrackerError::not_found(format!("{},{}", city.trim(), country.trim())).into()
}

fn chrono_hours(hours: u32) -> chrono::Duration {
    chrono::Duration::hours(i64::from(hours))
}

fn print_record(record: &LocationRecord) -> Result<()> {
    println!("{}", serde_json::to_string(record)?);
    Ok(())
}
