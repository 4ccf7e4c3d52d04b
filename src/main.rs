//! Time cold versus warm directory listings through the dircache.
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use dircache::{DirCache, DirRecord, EvictionTrigger, OpenError, alphasort};
use tracing::{debug, error, info, warn};

mod app_config;
mod trc;

use crate::app_config::{Config, ConfigError, Overrides};
use crate::trc::Trc;

#[derive(Parser)]
#[command(
    version,
    about = "Compare cold and warm directory reads through dircache."
)]
struct Args {
    #[arg(
        short,
        long,
        value_parser,
        help = "Optional path to a dircache config TOML."
    )]
    config_path: Option<PathBuf>,

    #[arg(
        short = 'n',
        long,
        help = "Number of warm passes per directory (overrides the config file)."
    )]
    iterations: Option<u32>,

    /// Directories to read.
    #[arg(required = true)]
    paths: Vec<PathBuf>,
}

struct Timing {
    entries: usize,
    cold: Duration,
    warm: Duration,
    listed: i32,
}

/// Open `path`, read every record, and close it again. Returns the number of records read.
fn read_through(cache: &DirCache, path: &Path) -> Result<usize, OpenError> {
    let mut handle = cache.open(path)?;
    let mut count = 0;
    while handle.read().is_some() {
        count += 1;
    }
    handle.close();
    Ok(count)
}

/// Count the non-dot entries of `path` through a sorted listing, the way `scandir(3)` reports
/// them: the number of records, or [`OpenError::LEGACY_STATUS`] if the listing failed.
fn scandir_count(cache: &DirCache, path: &Path) -> i32 {
    match cache.list(path, Some(&|r: &DirRecord| !r.is_dot_entry()), Some(&alphasort)) {
        Ok(listing) => i32::try_from(listing.len()).unwrap_or(i32::MAX),
        Err(e) => {
            warn!(code = i32::from(&e), "listing failed: {e}");
            OpenError::LEGACY_STATUS
        }
    }
}

fn time_path(cache: &DirCache, path: &Path, iterations: u32) -> Result<Timing, OpenError> {
    let started = Instant::now();
    let entries = read_through(cache, path)?;
    let cold = started.elapsed();

    let started = Instant::now();
    for _ in 0..iterations {
        read_through(cache, path)?;
    }
    let warm = started.elapsed() / iterations;

    let listed = scandir_count(cache, path);

    Ok(Timing {
        entries,
        cold,
        warm,
        listed,
    })
}

fn run(config: &Config, paths: &[PathBuf]) -> ExitCode {
    let cache = Arc::new(DirCache::with_config(config.cache.clone()));

    // The sweeper runs on its own worker; the timing loop itself stays synchronous.
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_time()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to start the runtime: {e}");
            return ExitCode::FAILURE;
        }
    };
    let _sweeper = if matches!(config.cache.eviction, EvictionTrigger::Interval(_)) {
        let _guard = runtime.enter();
        match cache.spawn_sweeper() {
            Ok(sweeper) => Some(sweeper),
            Err(e) => {
                error!("Failed to start the sweeper: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        None
    };

    let mut status = ExitCode::SUCCESS;
    println!("{:<40} {:>8} {:>12} {:>12} {:>8}", "path", "entries", "cold", "warm", "listed");
    for path in paths {
        match time_path(&cache, path, config.iterations) {
            Ok(t) => {
                println!(
                    "{:<40} {:>8} {:>12?} {:>12?} {:>8}",
                    path.display(),
                    t.entries,
                    t.cold,
                    t.warm,
                    t.listed
                );
                if t.listed == OpenError::LEGACY_STATUS {
                    status = ExitCode::FAILURE;
                }
            }
            Err(e) => {
                error!(code = i32::from(&e), "{e}");
                status = ExitCode::FAILURE;
            }
        }
    }

    debug!(stats = ?cache.stats(), "finished");
    cache.invalidate_all();
    status
}

/// Main entry point for the application.
fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = Trc::default().init() {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    let overrides = Overrides {
        iterations: args.iterations,
    };
    let config = match Config::load(args.config_path.as_deref(), overrides) {
        Ok(config) => config,
        Err(ConfigError::ValidationErrors(error_messages)) => {
            error!("Configuration is invalid.");
            for msg in &error_messages {
                error!(" - {msg}");
            }
            return ExitCode::FAILURE;
        }
        Err(e) => {
            error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    info!(paths = args.paths.len(), iterations = config.iterations, "starting");
    run(&config, &args.paths)
}
