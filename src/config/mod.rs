//! Application configuration loading and validation.
//!
//! Configuration is loaded from a TOML file. Relative data paths are resolved
//! against the directory holding the file.
//!
//! ```toml
//! [logging]
//! level = "info"
//! format = "pretty"
//!
//! [data]
//! meta = "data/meta.csv"
//! close = "data/close.csv"
//! returns = "data/returns.csv"
//! covariance = "data/covariance.csv"
//!
//! [parameters]
//! k = 10
//!
//! [solver]
//! time_limit_secs = 60.0
//! threads = 0
//! ```

mod logging;

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::data::DataSources;
use crate::error::{ConfigError, Result};
use crate::problem::Parameters;
use crate::solver::SolveOptions;

pub use logging::LoggingConfig;

/// Solver budget.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SolverConfig {
    /// Wall-clock limit per solve, in seconds.
    #[serde(default = "default_time_limit_secs")]
    pub time_limit_secs: f64,
    /// Solver threads. Zero uses every available core.
    #[serde(default = "default_threads")]
    pub threads: usize,
    /// Print solver output and nonzero holdings.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit_secs: default_time_limit_secs(),
            threads: default_threads(),
            verbose: false,
        }
    }
}

impl SolverConfig {
    /// Options for a single solve.
    #[must_use]
    pub fn options(&self) -> SolveOptions {
        SolveOptions {
            time_limit_secs: self.time_limit_secs,
            threads: if self.threads == 0 {
                num_cpus::get()
            } else {
                self.threads
            },
            verbose: self.verbose,
        }
    }
}

const fn default_time_limit_secs() -> f64 {
    1e6
}

const fn default_threads() -> usize {
    1
}

/// Main application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    /// The four market data sources.
    pub data: DataSources,
    #[serde(default)]
    pub parameters: Parameters,
    #[serde(default)]
    pub solver: SolverConfig,
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;

        let mut config = Self::parse(&content)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }

        Ok(config)
    }

    /// Parse and validate configuration text. Data paths are kept as written.
    #[allow(clippy::result_large_err)]
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    #[allow(clippy::result_large_err)]
    fn validate(&self) -> Result<()> {
        for (field, path) in [
            ("data.meta", &self.data.meta),
            ("data.close", &self.data.close),
            ("data.returns", &self.data.returns),
            ("data.covariance", &self.data.covariance),
        ] {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::MissingField { field }.into());
            }
        }

        self.parameters.validate()?;

        let limit = self.solver.time_limit_secs;
        if !(limit.is_finite() && limit > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "solver.time_limit_secs",
                reason: format!("must be positive and finite, got {limit}"),
            }
            .into());
        }
        Ok(())
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.data.meta);
        resolve(&mut self.data.close);
        resolve(&mut self.data.returns);
        resolve(&mut self.data.covariance);
    }

    /// Initialize logging with the configured settings.
    pub fn init_logging(&self) {
        self.logging.init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    const MINIMAL: &str = r#"
[data]
meta = "meta.csv"
close = "close.csv"
returns = "returns.csv"
covariance = "covariance.csv"
"#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Config::parse(MINIMAL).unwrap();
        assert_eq!(config.parameters, Parameters::default());
        assert_eq!(config.solver, SolverConfig::default());
        assert_eq!(config.logging, LoggingConfig::default());
        assert_eq!(config.data.meta, PathBuf::from("meta.csv"));
    }

    #[test]
    fn test_zero_threads_means_all_cores() {
        let solver = SolverConfig {
            threads: 0,
            ..SolverConfig::default()
        };
        assert_eq!(solver.options().threads, num_cpus::get());
        assert_eq!(SolverConfig::default().options().threads, 1);
    }

    #[test]
    fn test_empty_path_is_missing() {
        let text = MINIMAL.replace("\"close.csv\"", "\"\"");
        assert!(matches!(
            Config::parse(&text),
            Err(Error::Config(ConfigError::MissingField {
                field: "data.close"
            }))
        ));
    }

    #[test]
    fn test_invalid_time_limit() {
        let text = format!("{MINIMAL}\n[solver]\ntime_limit_secs = -1.0\n");
        assert!(matches!(
            Config::parse(&text),
            Err(Error::Config(ConfigError::InvalidValue {
                field: "solver.time_limit_secs",
                ..
            }))
        ));
    }

    #[test]
    fn test_missing_data_section_fails_to_parse() {
        assert!(matches!(
            Config::parse("[solver]\nthreads = 2\n"),
            Err(Error::Config(ConfigError::Parse(_)))
        ));
    }

    #[test]
    fn test_relative_paths_follow_config_file() {
        let mut config = Config::parse(MINIMAL).unwrap();
        config.data.covariance = PathBuf::from("/abs/cov.csv");
        config.resolve_paths(Path::new("/etc/lotfolio"));
        assert_eq!(config.data.meta, PathBuf::from("/etc/lotfolio/meta.csv"));
        assert_eq!(config.data.covariance, PathBuf::from("/abs/cov.csv"));
    }
}
