//! Configuration and data validation command.

use std::path::Path;

use anyhow::Result;

use super::command::UniverseArgs;
use super::output;
use crate::config::Config;

/// Validate the configuration file and load the market data once.
pub fn execute(path: &Path, config: &Config) -> Result<()> {
    output::section("Configuration");
    output::key_value("Path", path.display());
    output::ok("Configuration file is valid");

    let params = &config.parameters;
    output::key_value("Capital", params.capital);
    output::key_value("mu", params.mu);
    output::key_value("sigma", params.sigma);
    output::key_value("p_max", params.p_max);
    output::key_value("w_min", params.w_min);
    output::key_value("K", params.k);
    let options = config.solver.options();
    output::key_value("Time limit", format!("{}s", options.time_limit_secs));
    output::key_value("Threads", options.threads);

    output::section("Market data");
    let dataset = super::load_dataset(config, &UniverseArgs::default())?;
    let summary = dataset.summary();
    output::key_value("Securities", summary.securities);
    output::key_value("Price days", summary.days);
    output::key_value("Return periods", summary.periods);

    let missing = dataset.returns().iter().filter(|v| v.is_nan()).count();
    if missing > 0 {
        output::warn(&format!("{missing} missing return cells"));
    } else {
        output::ok("Market data is consistent");
    }
    Ok(())
}
