//! dweather CLI
//!
//! Reads dataset chains through an HTTP gateway and prints each result as JSON
//! on stdout. Logs go to stderr.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use dweather_common::parse_timestamp;
use dweather_query::{
    GriddedOptions, HistoricalOptions, QueryConfig, QueryFacade, RainfallOptions,
};
use unit_converter::UnitSystem;

#[derive(Parser, Debug)]
#[command(name = "dweather")]
#[command(about = "Query published dweather dataset chains")]
struct Args {
    /// Gateway base URL
    #[arg(long, env = "DWEATHER_GATEWAY_URL")]
    gateway: Option<String>,

    /// Dataset catalog extending the built-in definitions (YAML)
    #[arg(long, env = "DWEATHER_CATALOG")]
    catalog: Option<PathBuf>,

    /// Unit table extending the built-in units (YAML)
    #[arg(long, env = "DWEATHER_UNIT_TABLE")]
    units: Option<PathBuf>,

    /// Station alias table extending the built-in aliases (YAML)
    #[arg(long, env = "DWEATHER_ALIAS_TABLE")]
    aliases: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "warn", env = "RUST_LOG")]
    log_level: String,

    /// Per-request timeout in seconds
    #[arg(long, env = "DWEATHER_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Full series of a gridded dataset at one coordinate
    Gridded {
        dataset: String,
        #[arg(allow_negative_numbers = true)]
        lat: f64,
        #[arg(allow_negative_numbers = true)]
        lon: f64,
        /// Only use snapshots generated at or before this time
        #[arg(long, value_parser = parse_as_of)]
        as_of: Option<DateTime<Utc>>,
        /// Convert values into this unit
        #[arg(long)]
        unit: Option<String>,
    },

    /// Forecast issued for one date at one coordinate
    Forecast {
        dataset: String,
        #[arg(allow_negative_numbers = true)]
        lat: f64,
        #[arg(allow_negative_numbers = true)]
        lon: f64,
        /// Forecast date (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,
        #[arg(long)]
        unit: Option<String>,
    },

    /// Series reconciled across a revision set
    Revision {
        set: String,
        #[arg(allow_negative_numbers = true)]
        lat: f64,
        #[arg(allow_negative_numbers = true)]
        lon: f64,
        /// Stop once this date is covered
        #[arg(long)]
        desired_end: Option<NaiveDate>,
        /// Least accurate revision still considered final
        #[arg(long)]
        last_final: Option<String>,
        #[arg(long)]
        unit: Option<String>,
    },

    /// Station columns by name or alias
    Station {
        station: String,
        #[arg(required = true)]
        columns: Vec<String>,
        #[arg(long, default_value = "ghcnd")]
        dataset: String,
        /// metric or imperial
        #[arg(long, default_value = "metric")]
        system: UnitSystem,
    },

    /// Rainfall total over a period
    Rainfall {
        dataset: String,
        #[arg(allow_negative_numbers = true)]
        lat: f64,
        #[arg(allow_negative_numbers = true)]
        lon: f64,
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        end: NaiveDate,
        #[command(flatten)]
        rain: RainArgs,
    },

    /// Rainfall totals of a period in every historical year
    HistoricalRainfall {
        dataset: String,
        #[arg(allow_negative_numbers = true)]
        lat: f64,
        #[arg(allow_negative_numbers = true)]
        lon: f64,
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        end: NaiveDate,
        #[command(flatten)]
        rain: RainArgs,
        #[arg(long, default_value_t = dweather_query::HISTORICAL_START_YEAR)]
        start_year: i32,
        #[arg(long)]
        end_year: Option<i32>,
        /// Count missing days as zero instead of dropping the year
        #[arg(long)]
        ignore_missing: bool,
    },

    /// Storm track history as a GeoJSON feature collection
    Storms {
        #[arg(long, default_value = "atcf_btk-seasonal")]
        dataset: String,
        /// Keep only features of this basin
        #[arg(long)]
        basin: Option<String>,
        /// Keep only features within --radius-km of this point (lat,lon)
        #[arg(long, value_parser = parse_point, requires = "radius_km", allow_hyphen_values = true)]
        near: Option<(f64, f64)>,
        #[arg(long, requires = "near")]
        radius_km: Option<f64>,
    },

    /// Ids of the stations nearest a coordinate
    Stations {
        #[arg(allow_negative_numbers = true)]
        lat: f64,
        #[arg(allow_negative_numbers = true)]
        lon: f64,
        #[arg(long, default_value_t = 5)]
        count: usize,
        #[arg(long, default_value = "ghcnd")]
        dataset: String,
    },

    /// Snapshots of a dataset, oldest first
    Snapshots {
        dataset: String,
        #[arg(long, value_parser = parse_as_of)]
        as_of: Option<DateTime<Utc>>,
    },
}

#[derive(clap::Args, Debug)]
struct RainArgs {
    /// Largest value counted for any one day
    #[arg(long)]
    daily_cap: Option<f64>,
    /// Read the dataset name as a revision set and include preliminary data
    #[arg(long)]
    use_prelim: bool,
    /// Least accurate revision still considered final
    #[arg(long)]
    final_rev: Option<String>,
}

impl From<RainArgs> for RainfallOptions {
    fn from(args: RainArgs) -> Self {
        Self {
            daily_cap: args.daily_cap,
            use_prelim: args.use_prelim,
            final_rev: args.final_rev,
        }
    }
}

fn parse_point(s: &str) -> Result<(f64, f64), String> {
    let (lat, lon) = s
        .split_once(',')
        .ok_or_else(|| format!("expected lat,lon, got {}", s))?;
    let number = |v: &str| v.trim().parse::<f64>().map_err(|e| format!("{}: {}", v, e));
    Ok((number(lat)?, number(lon)?))
}

fn parse_as_of(s: &str) -> Result<DateTime<Utc>, String> {
    parse_timestamp(s).map_err(|e| e.to_string())
}

fn build_config(args: &Args) -> QueryConfig {
    let mut config = QueryConfig::from_env();
    if let Some(gateway) = &args.gateway {
        config.store.gateway_url = gateway.clone();
    }
    if let Some(secs) = args.timeout_secs {
        config.store.request_timeout_secs = secs;
    }
    if args.catalog.is_some() {
        config.catalog_path = args.catalog.clone();
    }
    if args.units.is_some() {
        config.unit_table_path = args.units.clone();
    }
    if args.aliases.is_some() {
        config.alias_table_path = args.aliases.clone();
    }
    config
}

async fn run(facade: &QueryFacade, command: Command) -> Result<Value> {
    let value = match command {
        Command::Gridded {
            dataset,
            lat,
            lon,
            as_of,
            unit,
        } => {
            let options = GriddedOptions { as_of, unit };
            serde_json::to_value(facade.gridded_series(&dataset, lat, lon, &options).await?)?
        }
        Command::Forecast {
            dataset,
            lat,
            lon,
            date,
            unit,
        } => serde_json::to_value(
            facade
                .forecast_series(&dataset, lat, lon, date, unit.as_deref())
                .await?,
        )?,
        Command::Revision {
            set,
            lat,
            lon,
            desired_end,
            last_final,
            unit,
        } => serde_json::to_value(
            facade
                .revision_series(
                    &set,
                    lat,
                    lon,
                    desired_end,
                    last_final.as_deref(),
                    unit.as_deref(),
                )
                .await?,
        )?,
        Command::Station {
            station,
            columns,
            dataset,
            system,
        } => serde_json::to_value(
            facade
                .station_series(&dataset, &station, columns.as_slice(), system)
                .await?,
        )?,
        Command::Rainfall {
            dataset,
            lat,
            lon,
            start,
            end,
            rain,
        } => serde_json::to_value(
            facade
                .period_rainfall(&dataset, lat, lon, start, end, &rain.into())
                .await?,
        )?,
        Command::HistoricalRainfall {
            dataset,
            lat,
            lon,
            start,
            end,
            rain,
            start_year,
            end_year,
            ignore_missing,
        } => {
            let history = HistoricalOptions {
                start_year,
                end_year,
                ignore_missing,
            };
            serde_json::to_value(
                facade
                    .historical_rainfall(&dataset, lat, lon, start, end, &rain.into(), &history)
                    .await?,
            )?
        }
        Command::Storms {
            dataset,
            basin,
            near,
            radius_km,
        } => match (near, radius_km) {
            (Some((lat, lon)), Some(radius)) => {
                facade
                    .nearby_storms(&dataset, lat, lon, radius, basin.as_deref())
                    .await?
            }
            _ => facade.storm_history(&dataset, basin.as_deref()).await?,
        },
        Command::Stations {
            lat,
            lon,
            count,
            dataset,
        } => serde_json::to_value(facade.closest_stations(&dataset, lat, lon, count).await?)?,
        Command::Snapshots { dataset, as_of } => {
            serde_json::to_value(facade.snapshots(&dataset, as_of).await?)?
        }
    };
    Ok(value)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = build_config(&args);
    let facade = QueryFacade::from_config(&config).context("Failed to initialize query facade")?;
    info!(gateway = %config.store.gateway_url, "Running query");

    let output = run(&facade, args.command).await?;
    let rendered = if args.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{}", rendered);
    Ok(())
}
