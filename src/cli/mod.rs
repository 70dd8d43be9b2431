//! CLI module graph and command dispatch.

pub mod check;
pub mod command;
pub mod export;
pub mod output;
pub mod solve;

use std::sync::Arc;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use crate::config::Config;
use crate::data::{DatasetLoader, MarketDataset};
use crate::problem::{PortfolioProblem, Variant};

use command::{Cli, Commands, ModelArgs, UniverseArgs};

/// Load configuration, start logging and run the selected command.
pub fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(&cli.config)
        .with_context(|| format!("failed to load config {}", cli.config.display()))?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.init_logging();

    match cli.command {
        Commands::Check => check::execute(&cli.config, &config),
        Commands::ExportMps(args) => export::execute_mps(&config, &args),
        Commands::Dump(args) => export::execute_dump(&config, &args),
        Commands::Solve(args) => solve::execute(&config, &args),
    }
}

/// Load the configured sources and apply universe restrictions.
pub(crate) fn load_dataset(config: &Config, universe: &UniverseArgs) -> Result<Arc<MarketDataset>> {
    let mut dataset = DatasetLoader::new()
        .load(&config.data)
        .context("failed to load market data")?;

    if let Some(periods) = universe.periods {
        dataset = dataset.latest_periods(periods)?;
    }
    if let Some(size) = universe.subset {
        let mut rng = StdRng::seed_from_u64(universe.seed);
        dataset = dataset.random_subset(size, &mut rng)?;
        info!(size, seed = universe.seed, "using random subset");
    }
    Ok(Arc::new(dataset))
}

/// Build a problem from config parameters and command-line overrides.
pub(crate) fn build_problem(
    config: &Config,
    dataset: Arc<MarketDataset>,
    model: &ModelArgs,
) -> Result<PortfolioProblem> {
    let mut params = config.parameters;
    if let Some(k) = model.max_securities {
        params.k = k;
    }
    let variant: Variant = model.model;
    PortfolioProblem::new(dataset, variant, params)
        .with_context(|| format!("invalid parameters for {variant}"))
}
