//! tiersim - Tiered Storage Placement Simulator
//!
//! Replays an access pattern against a simulated tiered cluster once per
//! placement strategy and records cost, latency and availability results.

mod report;
mod simulator;
mod trace;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use report::ReportWriter;
use std::path::{Path, PathBuf};
use tiersim_common::Config;
use tiersim_placement::StrategyKind;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "tiersim")]
#[command(about = "Tiered storage placement simulator")]
#[command(version)]
struct Cli {
    /// Log level
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay an access pattern with one or more strategies
    Run(RunArgs),
    /// Generate a synthetic access pattern
    Generate(GenerateArgs),
    /// List registered placement strategies
    Strategies,
    /// Print the effective configuration as TOML
    ShowConfig(ConfigArgs),
}

/// Configuration file and the overrides that take precedence over it
#[derive(Args, Debug, Clone)]
struct ConfigArgs {
    /// Configuration file path
    #[arg(short, long, env = "TIERSIM_CONFIG", default_value = "tiersim.toml")]
    config: PathBuf,

    /// Random seed for fault injection and random placement
    #[arg(long)]
    seed: Option<u64>,

    /// Replicas per object
    #[arg(long)]
    replication: Option<usize>,

    /// Give up after this many failed attempts per operation
    #[arg(long)]
    max_retries: Option<u32>,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Access pattern (JSON lines)
    #[arg(short, long)]
    trace: PathBuf,

    /// Strategies to run, or `all`
    #[arg(short, long, num_args = 1.., default_value = "all")]
    strategy: Vec<String>,

    /// Directory receiving summary.jsonl and tiers.jsonl
    #[arg(short, long, default_value = "results")]
    out_dir: PathBuf,

    #[command(flatten)]
    config: ConfigArgs,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Output file
    #[arg(short, long, default_value = "access_pattern.jsonl")]
    out: PathBuf,

    /// Number of distinct files
    #[arg(long, default_value = "100")]
    files: usize,

    /// Maximum reads or deletes per file
    #[arg(long, default_value = "3")]
    max_followups: usize,

    /// Smallest file size (KB)
    #[arg(long, default_value = "100")]
    min_size: u64,

    /// Largest file size (KB)
    #[arg(long, default_value = "100")]
    max_size: u64,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Run(args) => run(&args),
        Commands::Generate(args) => generate(&args),
        Commands::Strategies => {
            for kind in StrategyKind::ALL {
                println!("{kind}");
            }
            Ok(())
        }
        Commands::ShowConfig(args) => {
            let config = load_config(&args)?;
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn run(args: &RunArgs) -> Result<()> {
    let config = load_config(&args.config)?;
    let strategies = parse_strategies(&args.strategy)?;
    let records = trace::load(&args.trace)?;
    let writer = ReportWriter::new(&args.out_dir)?;

    info!(
        trace = %args.trace.display(),
        records = records.len(),
        strategies = strategies.len(),
        out_dir = %writer.dir().display(),
        "starting simulation"
    );

    for kind in strategies {
        let outcome = simulator::run_strategy(&config, kind, &records)
            .with_context(|| format!("run with strategy {kind} failed"))?;
        report::log_summary(&outcome.summary, &outcome.tiers);
        writer.write_run(&outcome.summary, &outcome.tiers)?;
    }
    Ok(())
}

fn generate(args: &GenerateArgs) -> Result<()> {
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let records = trace::generate(
        args.files,
        args.max_followups,
        (args.min_size, args.max_size),
        &mut rng,
    );
    trace::save(&args.out, &records)?;
    info!(path = %args.out.display(), records = records.len(), "access pattern written");
    Ok(())
}

/// Load the configuration file if present, then apply CLI overrides
fn load_config(args: &ConfigArgs) -> Result<Config> {
    let mut config = read_config_file(&args.config)?;
    if let Some(seed) = args.seed {
        config.cluster.seed = Some(seed);
    }
    if let Some(rf) = args.replication {
        config.cluster.replication_factor = rf;
    }
    if let Some(max) = args.max_retries {
        config.retry.max_attempts = Some(max);
    }
    config.validate()?;
    Ok(config)
}

fn read_config_file(path: &Path) -> Result<Config> {
    if !path.exists() {
        warn!(path = %path.display(), "config file not found, using defaults");
        return Ok(Config::default());
    }
    let config_str = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    toml::from_str(&config_str).with_context(|| format!("failed to parse {}", path.display()))
}

/// Resolve strategy names, expanding `all`
fn parse_strategies(names: &[String]) -> Result<Vec<StrategyKind>> {
    if names.iter().any(|n| n.eq_ignore_ascii_case("all")) {
        return Ok(StrategyKind::ALL.to_vec());
    }
    let mut kinds = Vec::with_capacity(names.len());
    for name in names {
        let kind: StrategyKind = name.parse()?;
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    if kinds.is_empty() {
        bail!("no strategy selected");
    }
    Ok(kinds)
}
