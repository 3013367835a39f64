use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use olivetti_fetch::{config::Config, FacesFetcher};

#[derive(Parser)]
#[command(name = "olivetti-fetch")]
#[command(version)]
#[command(about = "Download, cache and normalize the Olivetti faces collection")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "olivetti.toml")]
    config: String,

    /// Cache root (overrides config file and OLIVETTI_DATA_HOME)
    #[arg(short = 'd', long, value_name = "DIR")]
    data_home: Option<PathBuf>,

    /// Shuffle samples and labels together
    #[arg(long)]
    shuffle: bool,

    /// Seed for the shuffle permutation
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Fail instead of downloading when the cache is empty
    #[arg(long)]
    no_download: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = format!("olivetti_fetch={}", cli.log_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::load_from_file(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config))?;

    // Override config with CLI arguments
    if let Some(data_home) = cli.data_home {
        config.data_home = Some(data_home);
    }
    if cli.shuffle {
        config.dataset.shuffle = true;
    }
    if let Some(seed) = cli.seed {
        config.dataset.seed = seed;
    }
    if cli.no_download {
        config.download.download_if_missing = false;
    }

    if cli.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let options = config.fetch_options();
    let faces = FacesFetcher::from_config(&config)
        .fetch(&options)
        .context("fetching the Olivetti faces")?;

    let min = faces.data().fold(f32::INFINITY, |acc, &v| acc.min(v));
    let max = faces.data().fold(f32::NEG_INFINITY, |acc, &v| acc.max(v));
    let classes = faces.labels().iter().max().map_or(0, |&m| m + 1);
    let head: Vec<usize> = faces.labels().iter().take(12).copied().collect();

    info!("images: {:?}", faces.images().shape());
    info!("data:   {:?}", faces.data().shape());
    info!("labels: {} ({} classes), first {:?}", faces.labels().len(), classes, head);
    info!("range:  [{}, {}]", min, max);

    Ok(())
}
