// ============================================================
// Layer 6 — Config Store
// ============================================================
// Writes the resolved PipelineConfig next to the caches it
// produced, so a cache directory records the sequence length,
// tokenizer and sharding that built it.
//
//   <cache_path>/pipeline_config.json

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::application::config::PipelineConfig;

const FILE_NAME: &str = "pipeline_config.json";

pub struct ConfigStore {
    dir: PathBuf,
}

impl ConfigStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(FILE_NAME)
    }

    pub fn save(&self, cfg: &PipelineConfig) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;

        let path = self.path();
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved pipeline config to '{}'", path.display());
        Ok(())
    }

    /// Read back a previously saved config, if there is one.
    pub fn load(&self) -> Result<Option<PipelineConfig>> {
        let path = self.path();
        if !path.exists() {
            return Ok(None);
        }
        read_config(&path).map(Some)
    }
}

fn read_config(path: &Path) -> Result<PipelineConfig> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Cannot read config from '{}'", path.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("Malformed config '{}'", path.display()))
}
