//! Command-line entry point of the batch action computation
//!
//! The crate ships no binary because the potential models and the action solver are provided by
//! the caller. A binary wires them in and delegates to [main]:
//!
//! ```no_run
//! use std::process::ExitCode;
//! use torus_imaging::{ActionPipeline, ActionSolver, DatasetRegistry, PotentialRegistry};
//!
//! fn run_with<S: ActionSolver>(solver: S) -> ExitCode {
//!     torus_imaging::cli::main(|config| {
//!         let datasets = DatasetRegistry::from_datasets([]);
//!         let potentials = PotentialRegistry::potentials();
//!         Ok(ActionPipeline::new(config, datasets, potentials, solver))
//!     })
//! }
//! ```

use crate::actions::ActionSolver;
use crate::config::Config;
use crate::pipeline::ActionPipeline;
use crate::pool::Pool;

use anyhow::Context;
use clap::{ArgAction, Parser};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Clone, Debug)]
#[command(
    name = "compute-actions",
    about = "Compute actions, angles and frequencies of every dataset in every potential",
    version
)]
pub struct ComputeActionsArgs {
    /// Recompute tables that are already cached
    #[arg(short = 'o', long)]
    pub overwrite: bool,

    /// Number of parallel workers
    #[arg(long, default_value = "1", conflicts_with = "mpi")]
    pub procs: NonZeroUsize,

    /// Distribute tasks over message-passing worker ranks
    #[arg(long)]
    pub mpi: bool,

    /// Root directory of the action cache
    #[arg(long, env = "TORUS_CACHE_PATH", default_value = "cache")]
    pub cache_path: PathBuf,

    /// JSON file overriding the reference Galactocentric frame
    #[arg(long)]
    pub frame: Option<PathBuf>,

    /// Increase log verbosity, repeat for more
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Install the global `tracing` subscriber
///
/// `RUST_LOG` takes precedence over `verbosity`. Does nothing if a subscriber is already set.
pub fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Parse process arguments and run the pipeline built by `build`
pub fn main<S, B>(build: B) -> ExitCode
where
    S: ActionSolver,
    B: FnOnce(Config) -> anyhow::Result<ActionPipeline<S>>,
{
    run(ComputeActionsArgs::parse(), build)
}

pub fn run<S, B>(args: ComputeActionsArgs, build: B) -> ExitCode
where
    S: ActionSolver,
    B: FnOnce(Config) -> anyhow::Result<ActionPipeline<S>>,
{
    init_logging(args.verbose);
    match try_run(&args, build) {
        Ok(written) => {
            tracing::info!("done, {written} file(s) written");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn try_run<S, B>(args: &ComputeActionsArgs, build: B) -> anyhow::Result<usize>
where
    S: ActionSolver,
    B: FnOnce(Config) -> anyhow::Result<ActionPipeline<S>>,
{
    let config = Config::from_args(args).context("cannot load configuration")?;
    let pipeline = build(config).context("cannot build the pipeline")?;
    let pool = Pool::select(args.procs, args.mpi);
    let written = pipeline
        .run(&pool, args.overwrite)
        .context("action computation failed")?;
    Ok(written)
}
