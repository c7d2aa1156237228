// ============================================================
// Layer 2 — Pipeline Configuration
// ============================================================
// Every knob of a pipeline run. Serialisable so the resolved
// configuration can be written next to the caches it produced
// (pipeline_config.json).

use anyhow::{bail, Error, Result};
use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf, str::FromStr};

use crate::infra::tokenizer_store::SpecialTokens;

// ─── Stage ────────────────────────────────────────────────────────────────────
/// Which splits a run works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Train,
    Infer,
}

impl Stage {
    /// Split names in loader order.
    pub fn splits(self) -> &'static [&'static str] {
        match self {
            Stage::Train => &["train", "valid"],
            Stage::Infer => &["test"],
        }
    }
}

impl FromStr for Stage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "train" => Ok(Stage::Train),
            "infer" => Ok(Stage::Infer),
            other   => bail!("unknown dataset type to load: '{other}'"),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Train => "train",
            Stage::Infer => "infer",
        })
    }
}

// ─── DeviceKind ───────────────────────────────────────────────────────────────
/// Where batches end up: NdArray on the CPU or Wgpu on the GPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Cpu,
    Gpu,
}

impl FromStr for DeviceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cpu"          => Ok(DeviceKind::Cpu),
            "gpu" | "cuda" => Ok(DeviceKind::Gpu),
            other          => bail!("unknown device '{other}' (expected cpu or gpu)"),
        }
    }
}

// ─── PipelineConfig ───────────────────────────────────────────────────────────
/// Everything one worker needs to build its loaders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Which splits to build
    pub stage:          Stage,
    /// Maximum assembled sequence length
    pub seq_len:        usize,
    /// Batch size of the train split; other splits use 1
    pub batch_size:     usize,
    /// Directory holding <split>.json
    pub data_path:      String,
    /// Directory for encoding caches and the saved config
    pub cache_path:     String,
    /// HuggingFace tokenizer.json
    pub tokenizer_path: String,
    pub special_tokens: SpecialTokens,
    /// This worker's rank, 0-based
    pub global_rank:    usize,
    /// Number of data-parallel workers
    pub world_size:     usize,
    pub device:         DeviceKind,
    /// Base seed of the shard permutation
    pub seed:           u64,
    /// Prefix fraction of each split's pairs to assemble
    pub ratio:          f64,
    /// DataLoader threads per split
    pub num_workers:    usize,
    /// Sampler epoch; the permutation seed is seed + epoch
    pub epoch:          u64,
    /// Directory of split_stats.csv
    pub stats_dir:      String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stage:          Stage::Train,
            seq_len:        512,
            batch_size:     8,
            data_path:      "data".to_string(),
            cache_path:     "cache".to_string(),
            tokenizer_path: "tokenizer.json".to_string(),
            special_tokens: SpecialTokens::default(),
            global_rank:    0,
            world_size:     1,
            device:         DeviceKind::Cpu,
            seed:           42,
            ratio:          1.0,
            num_workers:    1,
            epoch:          0,
            stats_dir:      "cache".to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn source_path(&self, split: &str) -> PathBuf {
        PathBuf::from(&self.data_path).join(format!("{split}.json"))
    }

    /// Cache base for a split, before the tokenizer suffix.
    pub fn cache_base(&self, split: &str) -> PathBuf {
        PathBuf::from(&self.cache_path).join(format!("{split}_cache"))
    }

    pub fn batch_size_for(&self, split: &str) -> usize {
        if split == "train" { self.batch_size } else { 1 }
    }

    pub fn is_leader(&self) -> bool {
        self.global_rank == 0
    }

    /// True if caches built under `other` hold the same encodings.
    pub fn encodes_like(&self, other: &PipelineConfig) -> bool {
        self.data_path == other.data_path
            && self.tokenizer_path == other.tokenizer_path
            && self.special_tokens == other.special_tokens
    }

    /// Reject values that would only fail later, deep in the pipeline.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            bail!("batch size must be at least 1");
        }
        if self.world_size == 0 {
            bail!("world size must be at least 1");
        }
        if self.global_rank >= self.world_size {
            bail!(
                "global rank {} is out of range for world size {}",
                self.global_rank,
                self.world_size
            );
        }
        if !(self.ratio > 0.0 && self.ratio <= 1.0) {
            bail!("ratio must be in (0, 1], got {}", self.ratio);
        }
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_splits() {
        assert_eq!("train".parse::<Stage>().unwrap().splits(), &["train", "valid"]);
        assert_eq!("infer".parse::<Stage>().unwrap().splits(), &["test"]);
    }

    #[test]
    fn test_unknown_stage_is_a_hard_error() {
        let err = "eval".parse::<Stage>().unwrap_err();
        assert_eq!(err.to_string(), "unknown dataset type to load: 'eval'");
    }

    #[test]
    fn test_paths_and_batch_sizes() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.source_path("valid"), PathBuf::from("data/valid.json"));
        assert_eq!(cfg.cache_base("test"), PathBuf::from("cache/test_cache"));
        assert_eq!(cfg.batch_size_for("train"), 8);
        assert_eq!(cfg.batch_size_for("valid"), 1);
    }

    #[test]
    fn test_validate_rejects_bad_sharding() {
        let cfg = PipelineConfig { global_rank: 2, world_size: 2, ..Default::default() };
        assert!(cfg.validate().is_err());
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_encodes_like_ignores_sharding_and_seq_len() {
        let base = PipelineConfig::default();
        let other = PipelineConfig { seq_len: 128, world_size: 4, seed: 7, ..Default::default() };
        assert!(base.encodes_like(&other));

        let retokenized = PipelineConfig { tokenizer_path: "other.json".to_string(), ..Default::default() };
        assert!(!base.encodes_like(&retokenized));
    }

    #[test]
    fn test_config_json_round_trip() {
        let cfg  = PipelineConfig { stage: Stage::Infer, device: DeviceKind::Gpu, ..Default::default() };
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(json.contains("\"stage\":\"infer\""));
        assert_eq!(serde_json::from_str::<PipelineConfig>(&json).unwrap(), cfg);
    }
}
