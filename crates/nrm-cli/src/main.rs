use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use nrm_core::{
    CycleSummary, FixedGateway, RealityGateway, RealitySnapshot, ScriptedGateway, SwarmConfig,
    SwarmOrchestrator,
};
use nrm_host::HostGateway;
use serde::Serialize;

#[derive(Parser)]
#[command(name = "nrm", about = "Nested Resonance Memory swarm runner")]
struct Cli {
    /// TOML config file (falls back to $NRM_CONFIG, then built-in defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the config's RNG seed
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the swarm, streaming one JSON summary per cycle to stdout
    Run {
        /// Number of cycles to run
        #[arg(long, default_value_t = 100)]
        cycles: u64,

        /// Use a constant synthetic load instead of the live host ("CPU,MEM")
        #[arg(long, value_parser = parse_load, conflicts_with = "replay")]
        fixed_load: Option<(f64, f64)>,

        /// Replay snapshots from a JSON-lines file (as written by `probe`)
        #[arg(long)]
        replay: Option<PathBuf>,

        /// Loop the replay file instead of failing when it runs out
        #[arg(long = "loop")]
        loop_replay: bool,
    },

    /// Print the effective configuration as TOML
    Config,

    /// Sample the live host, one JSON snapshot per line
    Probe {
        /// Number of snapshots to take
        #[arg(long, default_value_t = 1)]
        count: u32,

        /// Delay between snapshots in milliseconds
        #[arg(long, default_value_t = 500)]
        interval_ms: u64,
    },
}

/// What the runner reports when a run ends on an error.
#[derive(Serialize)]
struct FinalState<'a> {
    error: String,
    last_summary: Option<&'a CycleSummary>,
}

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

fn parse_load(s: &str) -> std::result::Result<(f64, f64), String> {
    let (cpu, mem) = s
        .split_once(',')
        .ok_or_else(|| format!("expected CPU,MEM, got '{s}'"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<f64>()
            .ok()
            .filter(|x| (0.0..=100.0).contains(x))
            .ok_or_else(|| format!("'{v}' is not a percentage in [0, 100]"))
    };
    Ok((parse(cpu)?, parse(mem)?))
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

/// First Ctrl-C stops the run after the current cycle, a second one exits.
fn install_interrupt_handler() {
    let installed = ctrlc::set_handler(|| {
        if INTERRUPTED.swap(true, Ordering::SeqCst) {
            std::process::exit(130);
        }
    });
    if let Err(e) = installed {
        tracing::warn!("failed to install Ctrl-C handler: {e}");
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Run {
            cycles,
            fixed_load,
            replay,
            loop_replay,
        } => cmd_run(&cli, *cycles, *fixed_load, replay.as_deref(), *loop_replay),
        Commands::Config => cmd_config(&cli),
        Commands::Probe { count, interval_ms } => cmd_probe(*count, *interval_ms),
    }
}

fn load_config(cli: &Cli) -> Result<SwarmConfig> {
    let path = cli
        .config
        .clone()
        .or_else(|| std::env::var("NRM_CONFIG").ok().map(PathBuf::from));

    let mut config = match &path {
        Some(path) => SwarmConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => SwarmConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn load_replay(path: &Path) -> Result<Vec<RealitySnapshot>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let snapshots = content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("{}:{}: invalid snapshot", path.display(), i + 1))
        })
        .collect::<Result<Vec<RealitySnapshot>>>()?;
    if snapshots.is_empty() {
        tracing::warn!("{} contains no snapshots", path.display());
    }
    Ok(snapshots)
}

fn cmd_run(
    cli: &Cli,
    cycles: u64,
    fixed_load: Option<(f64, f64)>,
    replay: Option<&Path>,
    loop_replay: bool,
) -> Result<()> {
    if loop_replay && replay.is_none() {
        bail!("--loop requires --replay");
    }
    let config = load_config(cli)?;

    let gateway: Box<dyn RealityGateway> = match (fixed_load, replay) {
        (Some((cpu, mem)), _) => Box::new(FixedGateway::load(cpu, mem)),
        (None, Some(path)) => {
            let snapshots = load_replay(path)?;
            tracing::info!("replaying {} snapshots from {}", snapshots.len(), path.display());
            if loop_replay {
                Box::new(ScriptedGateway::cycling(snapshots))
            } else {
                Box::new(ScriptedGateway::once(snapshots))
            }
        }
        (None, None) => Box::new(HostGateway::new()),
    };

    let mut swarm = SwarmOrchestrator::new(config, gateway).context("invalid configuration")?;
    install_interrupt_handler();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut write_error = None;

    let outcome = swarm.seed_population().and_then(|seeded| {
        tracing::info!(
            "run {} seeded {} agents, running {cycles} cycles",
            swarm.run_id(),
            seeded.len()
        );
        swarm.run_until(cycles, &INTERRUPTED, |summary| {
            if write_error.is_some() {
                return;
            }
            let line = serde_json::to_string(summary).map_err(std::io::Error::from);
            if let Err(e) = line.and_then(|line| writeln!(out, "{line}")) {
                write_error = Some(e);
            }
        })
    });

    if let Some(e) = write_error {
        return Err(e).context("failed to write summary");
    }

    match outcome {
        Ok(completed) => {
            if INTERRUPTED.load(Ordering::SeqCst) {
                tracing::warn!("interrupted after {completed} of {cycles} cycles");
            }
            out.flush()?;
            Ok(())
        }
        Err(e) => {
            let state = FinalState {
                error: e.to_string(),
                last_summary: swarm.last_summary(),
            };
            writeln!(out, "{}", serde_json::to_string(&state)?)?;
            out.flush()?;
            Err(e).with_context(|| format!("run stopped after cycle {}", swarm.cycle()))
        }
    }
}

fn cmd_config(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let text = toml::to_string(&config).context("failed to serialize config")?;
    print!("{text}");
    Ok(())
}

fn cmd_probe(count: u32, interval_ms: u64) -> Result<()> {
    let mut gateway = HostGateway::new();
    for i in 0..count {
        if i > 0 {
            std::thread::sleep(std::time::Duration::from_millis(interval_ms));
        }
        let snapshot = gateway
            .capture_snapshot()
            .context("failed to sample host")?;
        tracing::info!("sampled host at unix {:.3}", snapshot.timestamp);
        println!("{}", serde_json::to_string(&snapshot)?);
    }
    Ok(())
}
