//! # Carvin Control Host
//!
//! Runs the realtime control core against the simulated machine and logs
//! every report, state transition and suspend phase. Useful for exercising
//! configurations and door/alarm sequences without hardware.

use std::path::PathBuf;
use std::process;

use carvin_common::config::LogLevel;
use carvin_common::control::config::ControllerConfig;
use carvin_control::config::load_config;
use carvin_control::controller::Controller;
use carvin_control::hal::Clock;
use carvin_control::report::TracingReporter;
use carvin_control::scheduler::TickOutcome;
use carvin_control::sim::{Script, SimConfig, SimMachine};
use clap::Parser;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;

/// Carvin control core, simulated host
#[derive(Parser, Debug)]
#[command(name = "carvin_control")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Realtime control core for Carvin CNC firmware, driven by a simulated machine")]
struct Args {
    /// Controller configuration TOML. Defaults are used when omitted.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of scheduler ticks to run.
    #[arg(long, default_value_t = 4_000)]
    ticks: u64,

    /// Scripted scenario.
    #[arg(long, value_enum, default_value_t = Script::Demo)]
    script: Script,

    /// Print the effective configuration as TOML and exit.
    #[arg(long)]
    print_config: bool,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();

    // The config carries the log level, so it is read before tracing is up.
    let config = match args.config {
        Some(ref path) => match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("FATAL: {e}");
                process::exit(1);
            }
        },
        None => ControllerConfig::default(),
    };
    setup_tracing(&args, config.shared.log_level);

    info!("Carvin control v{} starting...", env!("CARGO_PKG_VERSION"));
    if args.config.is_none() {
        warn!("No config file given, using defaults");
    }

    if let Err(e) = run(&args, config) {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Carvin control shutdown complete");
}

fn run(args: &Args, config: ControllerConfig) -> Result<(), Box<dyn std::error::Error>> {
    if args.print_config {
        println!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    let mut controller = Controller::new(config)?;
    let mut sim = SimMachine::new(SimConfig::default(), controller.handle().clone())
        .with_reporter(Box::new(TracingReporter));
    args.script.install(&mut sim);
    info!(script = ?args.script, ticks = args.ticks, "simulation starting");

    controller.startup(&mut sim);
    let mut resets = 0u32;
    for _ in 0..args.ticks {
        if controller.tick(&mut sim) == TickOutcome::Aborted {
            resets += 1;
            controller.reinitialize(&mut sim);
            controller.startup(&mut sim);
        }
        sim.wait_tick();
    }

    info!(
        state = controller.state().name(),
        ticks = sim.tick(),
        resets,
        calls = sim.log().len(),
        position = ?sim.position(),
        "simulation finished"
    );

    for entry in sim.log() {
        debug!("{}", serde_json::to_string(entry)?);
    }
    Ok(())
}

/// `--verbose` forces DEBUG; otherwise `[shared].log_level` applies.
fn level_directive(verbose: bool, log_level: LogLevel) -> Directive {
    if verbose {
        Level::DEBUG.into()
    } else {
        log_level
            .as_directive()
            .parse()
            .unwrap_or_else(|_| Level::INFO.into())
    }
}

/// Setup tracing subscriber from CLI arguments and the configured level.
fn setup_tracing(args: &Args, log_level: LogLevel) {
    let filter =
        EnvFilter::from_default_env().add_directive(level_directive(args.verbose, log_level));

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
