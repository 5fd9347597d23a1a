use std::fs;
use std::process::ExitCode;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};

use overpass::cache::{CachedAccessCalculator, MemoryAccessCache, DEFAULT_LIMIT};
use overpass::config::Config;
use overpass::model::{Satellite, Tle};
use overpass::predict::Access;
use overpass::time::TimeScale;
use overpass::token::AccessIdCodec;
use overpass::track::{track_points, TrackFile, TrackFileOptions};

#[derive(Parser)]
#[command(name = "overpass")]
#[command(about = "Satellite visibility windows and antenna tracks")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute visibility windows for a satellite over the configured station
    Accesses {
        /// Station config file (YAML)
        #[arg(long)]
        config: String,
        /// TLE file, two or three lines
        #[arg(long)]
        tle: String,
        /// Range start (RFC 3339), defaults to now
        #[arg(long)]
        start: Option<DateTime<Utc>>,
        /// Range end (RFC 3339), defaults to two days after the start
        #[arg(long)]
        end: Option<DateTime<Utc>>,
        #[arg(long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,
    },
    /// Antenna track for the window containing a given time
    Track {
        /// Station config file (YAML)
        #[arg(long)]
        config: String,
        /// TLE file, two or three lines
        #[arg(long)]
        tle: String,
        /// A time inside the window (RFC 3339)
        #[arg(long)]
        time: DateTime<Utc>,
        /// Sample interval, e.g. "5s" or "500ms"
        #[arg(long, default_value = "5s")]
        step: humantime::Duration,
        #[arg(long, value_enum, default_value = "json")]
        format: TrackFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TrackFormat {
    /// Ordered samples as JSON
    Json,
    /// Hardware pass-file text
    Leaf,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Accesses {
            config,
            tle,
            start,
            end,
            limit,
        } => accesses(&config, &tle, start, end, limit),
        Commands::Track {
            config,
            tle,
            time,
            step,
            format,
        } => track(&config, &tle, time, step.as_secs_f64(), format),
    }
}

fn load_satellite(path: &str) -> Result<Satellite, String> {
    let text = fs::read_to_string(path).map_err(|e| format!("error reading {path}: {e}"))?;
    let (name, tle) = Tle::parse(&text).map_err(|e| e.to_string())?;
    let hwid = name.unwrap_or_else(|| tle.catalog_number().to_string());
    Ok(Satellite::new(hwid, tle))
}

fn accesses(
    config_path: &str,
    tle_path: &str,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    limit: usize,
) -> ExitCode {
    let result = (|| -> Result<(), String> {
        let config = Config::from_file(config_path).map_err(|e| e.to_string())?;
        let station = config.groundstation().map_err(|e| e.to_string())?;
        let satellite = load_satellite(tle_path)?;

        let timescale = TimeScale::new();
        let store = MemoryAccessCache::new();
        let calculator = CachedAccessCalculator::new(&store, &timescale);
        let codec = AccessIdCodec::new();

        let found = calculator
            .accesses(
                std::slice::from_ref(&satellite),
                std::slice::from_ref(&station),
                start,
                end,
                limit,
            )
            .map_err(|e| e.to_string())?;

        let mut projections = Vec::with_capacity(found.len());
        for access in &found {
            projections.push(access.to_projection(&codec, &timescale).map_err(|e| e.to_string())?);
        }
        let json =
            serde_json::to_string_pretty(&projections).map_err(|e| e.to_string())?;
        println!("{json}");
        Ok(())
    })();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn track(
    config_path: &str,
    tle_path: &str,
    time: DateTime<Utc>,
    step_s: f64,
    format: TrackFormat,
) -> ExitCode {
    let result = (|| -> Result<(), String> {
        let config = Config::from_file(config_path).map_err(|e| e.to_string())?;
        let station = config.groundstation().map_err(|e| e.to_string())?;
        let satellite = load_satellite(tle_path)?;

        let access =
            Access::from_time(time, &satellite, &station).map_err(|e| e.to_string())?;

        match format {
            TrackFormat::Json => {
                let points = track_points(&access, step_s).map_err(|e| e.to_string())?;
                let json = serde_json::to_string_pretty(&points).map_err(|e| e.to_string())?;
                println!("{json}");
            }
            TrackFormat::Leaf => {
                let file = TrackFile::from_access(&access, TrackFileOptions::default())
                    .map_err(|e| e.to_string())?;
                println!("{file}");
            }
        }
        Ok(())
    })();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
