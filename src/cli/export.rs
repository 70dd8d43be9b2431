//! Offline export commands: MPS models and binary array dumps.

use anyhow::{Context, Result};

use super::command::{DumpArgs, ExportArgs};
use super::output;
use crate::config::Config;

/// Execute `export-mps`.
pub fn execute_mps(config: &Config, args: &ExportArgs) -> Result<()> {
    let dataset = super::load_dataset(config, &args.universe)?;
    let problem = super::build_problem(config, dataset, &args.model)?;

    problem
        .save_model(&args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    output::ok(&format!(
        "{} written to {}",
        problem.name(),
        args.output.display()
    ));
    Ok(())
}

/// Execute `dump`.
pub fn execute_dump(config: &Config, args: &DumpArgs) -> Result<()> {
    let dataset = super::load_dataset(config, &args.universe)?;
    let problem = super::build_problem(config, dataset, &args.model)?;

    let paths = problem
        .save_bin(&args.out_dir)
        .with_context(|| format!("failed to dump into {}", args.out_dir.display()))?;

    for path in &paths {
        output::ok(&path.display().to_string());
    }
    Ok(())
}
