use std::fs;

use lotfolio::data::DataSources;
use lotfolio::testkit::data;
use tempfile::TempDir;

/// A temp directory holding the fixture CSV sources and a config file.
pub struct Workspace {
    pub dir: TempDir,
    pub sources: DataSources,
}

impl Workspace {
    pub fn new() -> Self {
        Self::with_config("")
    }

    /// Write the sources and `config.toml` with `extra` appended.
    pub fn with_config(extra: &str) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let sources = data::write_sources(dir.path()).expect("write sources");
        fs::write(dir.path().join("config.toml"), data::config_toml(extra)).expect("write config");
        Self { dir, sources }
    }

    pub fn config_path(&self) -> std::path::PathBuf {
        self.dir.path().join("config.toml")
    }

    /// Overwrite one source file.
    pub fn replace(&self, name: &str, contents: &str) {
        fs::write(self.dir.path().join(name), contents).expect("overwrite source");
    }
}
