//! VLIW scheduler CLI.
//!
//! This binary schedules one program and writes both of its schedules. It performs:
//! 1. **Load:** Reads a JSON array of instruction strings.
//! 2. **Schedule:** Builds the sequential (`loop`) and pipelined (`loop.pip`) schedules.
//! 3. **Emit:** Writes each schedule as a JSON array of bundles.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use modsched_core::io::{load_program, write_schedule};
use modsched_core::{Config, schedule_program};

#[derive(Parser, Debug)]
#[command(
    name = "modsched",
    author,
    version,
    about = "Offline VLIW scheduler with modulo scheduling",
    long_about = "Schedule a program for a VLIW machine twice: once straight-line (closed by `loop`) and once software pipelined (closed by `loop.pip`).\n\nThe input is a JSON array of instruction strings; each output is a JSON array of bundles.\n\nExamples:\n  modsched input.json loop.json looppip.json\n  modsched -vv --config machine.json input.json loop.json looppip.json"
)]
struct Cli {
    /// Program to schedule (JSON array of instruction strings).
    input: PathBuf,

    /// Output path for the sequential schedule.
    loop_output: PathBuf,

    /// Output path for the pipelined schedule.
    looppip_output: PathBuf,

    /// Machine and register-file configuration (JSON); built-in defaults otherwise.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log more (-v debug, -vv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("[!] FATAL: {e}");
        let mut source = std::error::Error::source(&e);
        while let Some(cause) = source {
            eprintln!("    caused by: {cause}");
            source = cause.source();
        }
        process::exit(1);
    }
}

/// Loads, schedules and writes both outputs.
fn run(cli: &Cli) -> modsched_core::Result<()> {
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };

    let program = load_program(&cli.input)?;
    let schedules = schedule_program(&program, &config)?;

    write_schedule(&schedules.sequential, &cli.loop_output)?;
    write_schedule(&schedules.pipelined, &cli.looppip_output)?;
    info!(
        sequential = schedules.sequential.len(),
        pipelined = schedules.pipelined.len(),
        ii = schedules.pipelined.initiation_interval(),
        "schedules written"
    );
    Ok(())
}

fn load_config(path: &Path) -> modsched_core::Result<Config> {
    let text = fs::read_to_string(path).map_err(|source| modsched_core::Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Config::from_json(&text)?)
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}
