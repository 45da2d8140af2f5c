//! qsynth command-line interface.
//!
//! Builds arithmetic fragments through a session, reports their resources
//! and simulates them.

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{modmul, resources, shift, version};

/// qsynth - quantum arithmetic synthesis with automatic uncomputation
#[derive(Parser)]
#[command(name = "qsynth")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Simulator configuration file (YAML)
    #[arg(long, global = true, env = "QSYNTH_SIM_CONFIG")]
    sim_config: Option<PathBuf>,

    /// Draw a progress bar while simulating
    #[arg(long, global = true)]
    progress: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Multiply x by a modulo N in place and measure the result
    Modmul {
        /// Multiplier
        #[arg(long)]
        a: u64,

        /// Modulus
        #[arg(short = 'N', long)]
        modulus: u64,

        /// Initial value of x
        #[arg(long)]
        x: u64,

        /// Number of shots (exact probabilities if omitted)
        #[arg(short, long)]
        shots: Option<u32>,

        /// Sampling seed
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Rotate a list of cells by a quantum offset
    Shift {
        /// Number of cells
        #[arg(short, long)]
        width: usize,

        /// Offset to load into the offset register
        #[arg(short, long)]
        offset: u64,

        /// Rotation strategy (doubling, naive)
        #[arg(long, default_value = "doubling")]
        strategy: String,
    },

    /// Count the resources of a modular multiplier without simulating it
    Resources {
        /// Multiplier
        #[arg(long)]
        a: u64,

        /// Modulus
        #[arg(short = 'N', long)]
        modulus: u64,

        /// Build a modular exponentiation over this many exponent bits
        #[arg(long)]
        exponent_bits: Option<usize>,

        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
    tracing::debug!(verbosity = cli.verbose, "logging initialized");

    let sim = commands::common::SimOptions {
        config: cli.sim_config,
        progress: cli.progress,
    };

    let result = match cli.command {
        Commands::Modmul {
            a,
            modulus,
            x,
            shots,
            seed,
        } => modmul::execute(a, modulus, x, shots, seed, &sim),

        Commands::Shift {
            width,
            offset,
            strategy,
        } => shift::execute(width, offset, &strategy, &sim),

        Commands::Resources {
            a,
            modulus,
            exponent_bits,
            format,
        } => resources::execute(a, modulus, exponent_bits, &format),

        Commands::Version => {
            version::execute();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
