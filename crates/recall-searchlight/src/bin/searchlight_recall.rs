//! `searchlight-recall` binary: one subject, one permutation.
//!
//! # Usage
//!
//! ```bash
//! # observed map for subject 1
//! searchlight-recall 1 -1 --config searchlight.json
//! # null map for subject 1, permutation 3
//! searchlight-recall 1 3 --datadir /data/sherlock --threads 8
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use recall_searchlight::config::SearchlightConfig;
use recall_searchlight::pipeline::run_subject;
use recall_searchlight::searchlight::{Searchlight, SearchlightParams};

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "searchlight-recall",
    version,
    about = "Searchlight correlation between a time-warped recall model and fMRI activity",
    long_about = None
)]
struct Args {
    /// Subject ID.
    subid: u32,

    /// Permutation index; any negative value runs the observed (unshifted)
    /// analysis.
    #[arg(allow_negative_numbers = true)]
    perm: i64,

    /// Path to a JSON configuration file.
    ///
    /// If not provided, the default `SearchlightConfig` is used.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the data root from the config.
    #[arg(long, value_name = "DIR")]
    datadir: Option<PathBuf>,

    /// Override the worker thread count (0 = all cores).
    #[arg(long, value_name = "N")]
    threads: Option<usize>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level_filter = args
        .log_level
        .parse::<tracing_subscriber::filter::LevelFilter>()
        .unwrap_or(tracing_subscriber::filter::LevelFilter::INFO);

    tracing_subscriber::fmt()
        .with_max_level(log_level_filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    info!("Recall searchlight v{}", recall_searchlight::VERSION);

    let mut config = match args.config.as_deref() {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            SearchlightConfig::from_json(path)
                .with_context(|| format!("failed to load configuration {}", path.display()))?
        }
        None => {
            info!("No configuration file provided, using defaults");
            SearchlightConfig::default()
        }
    };

    if let Some(dir) = args.datadir {
        config.datadir = dir;
    }
    if let Some(n) = args.threads {
        config.num_threads = n;
    }
    config.validate().context("configuration validation failed")?;

    info!("  datadir : {}", config.datadir.display());
    info!("  radius  : {} ({:?})", config.radius, config.shape);
    info!("  sentinel: {}", config.sentinel);
    info!("  threads : {}", if config.num_threads == 0 { "auto".to_string() } else { config.num_threads.to_string() });

    let mut engine = Searchlight::new(SearchlightParams::from(&config));
    let report = match run_subject(&config, args.subid, args.perm, &mut engine) {
        Ok(report) => report,
        Err(e) => {
            error!("Searchlight failed for subject {}: {e}", args.subid);
            return Err(e.into());
        }
    };

    info!(
        "Subject {} [{}]: {} centers evaluated, {} non-finite",
        report.subid, report.mode, report.n_centers, report.n_nan
    );
    info!("Result: {}", report.result_path.display());
    Ok(())
}
