//! Bit Flipper - randomly corrupts a file or raw block device.
//!
//! Flips one random bit, sleeps a random number of seconds and repeats
//! until interrupted or until a flip fails.

use bit_flipper::{
    ensure_ready, signal, CancelToken, Flipper, FlipperConfig, RandomSource, Resource, Result,
    RngSource, TargetKind,
};
use clap::error::ErrorKind;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bit-flipper")]
#[command(author, version, about, long_about = None)]
#[command(
    about = "Randomly flips single bits in a file or raw block device",
    long_about = "Flips one random bit of the target, sleeps a random interval and repeats until interrupted (Ctrl+C) or until an I/O operation fails."
)]
struct Cli {
    /// File or raw block device to corrupt
    target: PathBuf,

    /// Treat the target as a raw block device (size from device geometry)
    #[arg(long, conflicts_with = "file")]
    disk: bool,

    /// Treat the target as an ordinary file (size from metadata)
    #[arg(long, conflicts_with = "disk")]
    file: bool,

    /// Stop after this many successful flips
    #[arg(short = 'n', long)]
    count: Option<u64>,

    /// Shortest pause between flips in seconds (default: 1)
    #[arg(long)]
    min_sleep: Option<u64>,

    /// Longest pause between flips in seconds (default: 1000)
    #[arg(long)]
    max_sleep: Option<u64>,

    /// Seed for reproducible offsets, bits and pauses
    #[arg(long)]
    seed: Option<u64>,

    /// JSON configuration file; command-line flags override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug diagnostics on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => libc::EINVAL,
            };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    init_tracing(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let config = build_config(cli)?;

    let cancel = CancelToken::new();
    signal::cancel_on_interrupt(&cancel)?;

    let mut target = Resource::open(&cli.target, config.kind);
    ensure_ready(&mut target, &cli.target)?;

    let rng: Box<dyn RandomSource> = match config.seed {
        Some(seed) => Box::new(RngSource::seeded(seed)),
        None => Box::new(RngSource::thread()),
    };

    let summary = Flipper::new(&mut target, rng, config)?.run(&cancel)?;
    info!(flips = summary.flips, cancelled = summary.cancelled, "done");

    Ok(())
}

fn build_config(cli: &Cli) -> Result<FlipperConfig> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => FlipperConfig::default(),
    };

    if cli.disk {
        config.kind = TargetKind::Disk;
    } else if cli.file {
        config.kind = TargetKind::File;
    }
    if let Some(count) = cli.count {
        config.max_flips = Some(count);
    }
    if let Some(secs) = cli.min_sleep {
        config.min_sleep_secs = secs;
    }
    if let Some(secs) = cli.max_sleep {
        config.max_sleep_secs = secs;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }

    config.validate()?;
    Ok(config)
}

fn load_config(path: &Path) -> Result<FlipperConfig> {
    let config = FlipperConfig::from_json_file(path)?;
    info!(path = %path.display(), "loaded configuration");
    Ok(config)
}
