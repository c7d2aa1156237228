// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands `encode`, `prepare` and
// `inspect`. All of them share PipelineArgs, which is flattened
// into each subcommand and converted into the application-layer
// PipelineConfig; the application layer never sees clap types.

use anyhow::{Error, Result};
use clap::{Args, Subcommand};

use crate::application::config::PipelineConfig;
use crate::infra::tokenizer_store::SpecialTokens;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Tokenize the stage's splits into the encoding cache
    Encode(EncodeArgs),

    /// Run one epoch of every split through batching and finalization
    Prepare(PrepareArgs),

    /// Print one assembled instance decoded by segment
    Inspect(InspectArgs),
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct PipelineArgs {
    /// `train` (train + valid splits) or `infer` (test split)
    #[arg(long, default_value = "train")]
    pub stage: String,

    /// Fixed sequence width; longer histories are cut from the front
    #[arg(long, default_value_t = 512)]
    pub seq_len: usize,

    /// Batch size of the train split (valid/test always use 1)
    #[arg(long, default_value_t = 8)]
    pub batch_size: usize,

    /// Directory holding train.json / valid.json / test.json
    #[arg(long, default_value = "data")]
    pub data_path: String,

    /// Directory for encoding caches and pipeline_config.json
    #[arg(long, default_value = "cache")]
    pub cache_path: String,

    /// HuggingFace tokenizer.json
    #[arg(long, default_value = "tokenizer.json")]
    pub tokenizer: String,

    #[arg(long, default_value = "<pad>")]
    pub pad_token: String,

    #[arg(long, default_value = "<|endoftext|>")]
    pub bos_token: String,

    #[arg(long, default_value = "<|endoftext|>")]
    pub eos_token: String,

    /// Rank of this worker
    #[arg(long, default_value_t = 0)]
    pub global_rank: usize,

    /// Number of data-parallel workers
    #[arg(long, default_value_t = 1)]
    pub world_size: usize,

    /// `cpu` (NdArray) or `gpu` (Wgpu)
    #[arg(long, default_value = "cpu")]
    pub device: String,

    /// Sampler seed; the shard order also depends on the epoch
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Fraction of each split to use, e.g. 0.001 for a quick debug run
    #[arg(long, default_value_t = 1.0)]
    pub ratio: f64,

    /// DataLoader worker threads
    #[arg(long, default_value_t = 1)]
    pub num_workers: usize,

    /// Sampler epoch
    #[arg(long, default_value_t = 0)]
    pub epoch: u64,

    /// Directory for split_stats.csv
    #[arg(long, default_value = "cache")]
    pub stats_dir: String,
}

impl TryFrom<PipelineArgs> for PipelineConfig {
    type Error = Error;

    fn try_from(a: PipelineArgs) -> Result<Self> {
        let cfg = PipelineConfig {
            stage:          a.stage.parse()?,
            seq_len:        a.seq_len,
            batch_size:     a.batch_size,
            data_path:      a.data_path,
            cache_path:     a.cache_path,
            tokenizer_path: a.tokenizer,
            special_tokens: SpecialTokens { pad: a.pad_token, bos: a.bos_token, eos: a.eos_token },
            global_rank:    a.global_rank,
            world_size:     a.world_size,
            device:         a.device.parse()?,
            seed:           a.seed,
            ratio:          a.ratio,
            num_workers:    a.num_workers,
            epoch:          a.epoch,
            stats_dir:      a.stats_dir,
        };
        cfg.validate()?;
        Ok(cfg)
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// Re-encode even if a cache file exists
    #[arg(long)]
    pub overwrite: bool,
}

#[derive(Args, Debug)]
pub struct PrepareArgs {
    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// Split to read (must belong to the stage)
    #[arg(long, default_value = "train")]
    pub split: String,

    /// Instance index within the split
    #[arg(long, default_value_t = 0)]
    pub index: usize,
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::config::{DeviceKind, Stage};
    use crate::cli::Cli;
    use clap::Parser;

    fn parse(args: &[&str]) -> Commands {
        Cli::try_parse_from(std::iter::once("knowledge-dialog-data").chain(args.iter().copied()))
            .unwrap()
            .command
    }

    #[test]
    fn test_defaults_convert_to_default_config() {
        let Commands::Prepare(args) = parse(&["prepare"]) else { panic!("expected prepare") };
        let cfg = PipelineConfig::try_from(args.pipeline).unwrap();
        assert_eq!(cfg, PipelineConfig::default());
    }

    #[test]
    fn test_flags_reach_the_config() {
        let Commands::Encode(args) = parse(&[
            "encode", "--stage", "infer", "--seq-len", "256", "--device", "gpu",
            "--world-size", "4", "--global-rank", "3", "--overwrite",
        ]) else {
            panic!("expected encode")
        };
        assert!(args.overwrite);

        let cfg = PipelineConfig::try_from(args.pipeline).unwrap();
        assert_eq!(cfg.stage, Stage::Infer);
        assert_eq!(cfg.seq_len, 256);
        assert_eq!(cfg.device, DeviceKind::Gpu);
        assert_eq!((cfg.global_rank, cfg.world_size), (3, 4));
    }

    #[test]
    fn test_unknown_stage_fails_conversion() {
        let Commands::Inspect(args) = parse(&["inspect", "--stage", "dev"]) else {
            panic!("expected inspect")
        };
        let err = PipelineConfig::try_from(args.pipeline).unwrap_err();
        assert!(err.to_string().contains("unknown dataset type to load"));
    }
}
