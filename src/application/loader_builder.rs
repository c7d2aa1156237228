// ============================================================
// Layer 2 — Loader Builder
// ============================================================
// Builds one SplitLoader per split of the configured stage:
//
//   stage = train → [train, valid]
//   stage = infer → [test]
//
// For each split:
//   Step 1: encoded pairs from the cache (or encode + cache)
//   Step 2: DialogueDataset (assembly + length gate)
//   Step 3: ShardSampler for this worker (shuffle, drop_last)
//
// A SplitLoader is reusable across epochs: epoch() reshards and
// hands back a Burn DataLoader over this worker's indices.

use anyhow::{Context, Result};
use burn::{
    data::{
        dataloader::{DataLoader, DataLoaderBuilder},
        dataset::Dataset,
    },
    prelude::*,
};
use std::sync::Arc;

use crate::application::config::PipelineConfig;
use crate::data::{
    batcher::{DialogueBatch, DialogueBatcher},
    dataset::{DatasetOptions, DialogueDataset},
    finalizer::{BatchFinalizer, FinalizeMode},
    loader::JsonDialogueLoader,
    sampler::{ShardSampler, ShardedDataset},
};
use crate::domain::sample::Instance;
use crate::domain::traits::TextTokenizer;
use crate::infra::cache::EncodingCache;

/// One split's dataset plus how this worker reads it.
pub struct SplitLoader {
    /// "train", "valid" or "test"
    name:        String,
    /// Shared with every epoch's DataLoader
    dataset:     Arc<DialogueDataset>,
    /// Sharding of this worker
    sampler:     ShardSampler,
    batch_size:  usize,
    /// DataLoader threads
    num_workers: usize,
    /// Training for "train", Evaluation otherwise
    mode:        FinalizeMode,
}

impl SplitLoader {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dataset(&self) -> &DialogueDataset {
        &self.dataset
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Indices this worker visits in `epoch`.
    pub fn shard_indices(&self, epoch: u64) -> Vec<usize> {
        self.sampler.indices(self.dataset.len(), epoch)
    }

    /// A DataLoader over this worker's shard for `epoch`.
    pub fn epoch<B: Backend>(
        &self,
        epoch:  u64,
        device: &B::Device,
    ) -> Arc<dyn DataLoader<B, DialogueBatch<B>>> {
        let shard   = ShardedDataset::new::<Instance>(self.dataset.clone(), &self.sampler, epoch);
        let batcher = DialogueBatcher::new(self.dataset.special_ids());

        DataLoaderBuilder::new(batcher)
            .batch_size(self.batch_size)
            .num_workers(self.num_workers)
            .set_device(device.clone())
            .build(shard)
    }

    /// Finalizer matching this split's mode and sequence width.
    pub fn finalizer<B: Backend>(&self, device: &B::Device) -> BatchFinalizer<B> {
        BatchFinalizer::new(
            self.mode,
            self.dataset.seq_len(),
            self.dataset.special_ids(),
            device.clone(),
        )
    }
}

/// Build the loaders for every split of `cfg.stage`.
pub fn build_loaders<T>(cfg: &PipelineConfig, tokenizer: &T) -> Result<Vec<SplitLoader>>
where
    T: TextTokenizer + ?Sized,
{
    cfg.validate()?;
    tracing::info!("Build {} data loaders", cfg.stage);

    let sampler = ShardSampler::new(cfg.world_size, cfg.global_rank, cfg.seed, true)?;

    cfg.stage
        .splits()
        .iter()
        .map(|&split| {
            build_split(cfg, split, tokenizer, sampler)
                .with_context(|| format!("Cannot build the '{split}' loader"))
        })
        .collect()
}

/// Encoded pairs of `split` (cached) assembled into a dataset.
pub fn load_dataset<T>(cfg: &PipelineConfig, split: &str, tokenizer: &T) -> Result<DialogueDataset>
where
    T: TextTokenizer + ?Sized,
{
    let source     = JsonDialogueLoader::new(cfg.source_path(split));
    let cache      = EncodingCache::new(cfg.cache_base(split));
    let (pairs, _) = cache.load_or_encode(&source, tokenizer)?;

    let options = DatasetOptions { seq_len: cfg.seq_len, ratio: cfg.ratio, want_label: true };
    Ok(DialogueDataset::from_pairs(&pairs, options, tokenizer.special_ids()))
}

fn build_split<T>(
    cfg:       &PipelineConfig,
    split:     &str,
    tokenizer: &T,
    sampler:   ShardSampler,
) -> Result<SplitLoader>
where
    T: TextTokenizer + ?Sized,
{
    let dataset = load_dataset(cfg, split, tokenizer)?;
    if cfg.is_leader() {
        let stats = dataset.stats();
        tracing::info!(
            "Number of {} samples: {}, and {} over max_seq were truncated ({} dropped)",
            split,
            stats.kept,
            stats.truncated,
            stats.dropped,
        );
    }

    let mode = if split == "train" { FinalizeMode::Training } else { FinalizeMode::Evaluation };

    Ok(SplitLoader {
        name:        split.to_string(),
        dataset:     Arc::new(dataset),
        sampler,
        batch_size:  cfg.batch_size_for(split),
        num_workers: cfg.num_workers.max(1),
        mode,
    })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::config::Stage;
    use crate::data::test_support::WordTokenizer;
    use burn::backend::NdArray;
    use std::path::Path;

    type TestBackend = NdArray<f32>;

    const DIALOGUES: &str = r#"[
        [
            {"role": "user", "utter": "do you like jazz"},
            {"role": "bot",  "utter": "yes very much", "klg": "jazz is a music genre"},
            {"role": "user", "utter": "where is it from"},
            {"role": "bot",  "utter": "new orleans", "klg": {"Jazz": "jazz originated in new orleans"}}
        ],
        [
            {"role": "user", "utter": "hi"},
            {"role": "bot",  "utter": "hello", "klg": {"no_passages_used": ""}},
            {"role": "user", "utter": "tell me about rock"},
            {"role": "bot",  "utter": "rock is loud", "klg": "rock is a genre"}
        ]
    ]"#;

    fn config(dir: &Path, stage: Stage) -> PipelineConfig {
        for split in ["train", "valid", "test"] {
            std::fs::write(dir.join(format!("{split}.json")), DIALOGUES).unwrap();
        }
        PipelineConfig {
            stage,
            seq_len:    64,
            batch_size: 2,
            data_path:  dir.display().to_string(),
            cache_path: dir.join("cache").display().to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_train_stage_builds_train_and_valid() {
        let dir     = tempfile::tempdir().unwrap();
        let cfg     = config(dir.path(), Stage::Train);
        let loaders = build_loaders(&cfg, &WordTokenizer::new()).unwrap();
        let device  = <TestBackend as Backend>::Device::default();

        let names: Vec<&str> = loaders.iter().map(SplitLoader::name).collect();
        assert_eq!(names, vec!["train", "valid"]);
        assert_eq!(loaders[0].batch_size(), 2);
        assert_eq!(loaders[0].finalizer::<TestBackend>(&device).mode(), FinalizeMode::Training);
        assert_eq!(loaders[1].batch_size(), 1);
        assert_eq!(loaders[1].finalizer::<TestBackend>(&device).mode(), FinalizeMode::Evaluation);
        assert_eq!(loaders[0].dataset().len(), 3);
        assert!(dir.path().join("cache").join("train_cache_WordTokenizer").exists());
    }

    #[test]
    fn test_infer_stage_builds_test_only() {
        let dir     = tempfile::tempdir().unwrap();
        let cfg     = config(dir.path(), Stage::Infer);
        let loaders = build_loaders(&cfg, &WordTokenizer::new()).unwrap();

        assert_eq!(loaders.len(), 1);
        assert_eq!(loaders[0].name(), "test");
        assert_eq!(loaders[0].batch_size(), 1);
    }

    #[test]
    fn test_missing_source_names_the_split() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = PipelineConfig {
            data_path:  dir.path().join("absent").display().to_string(),
            cache_path: dir.path().join("cache").display().to_string(),
            ..Default::default()
        };

        let err = build_loaders(&cfg, &WordTokenizer::new()).err().unwrap();
        assert!(format!("{err:#}").contains("'train' loader"));
    }

    #[test]
    fn test_epoch_yields_batches_over_the_shard() {
        let dir     = tempfile::tempdir().unwrap();
        let cfg     = config(dir.path(), Stage::Train);
        let loaders = build_loaders(&cfg, &WordTokenizer::new()).unwrap();
        let device  = <TestBackend as Backend>::Device::default();

        // 3 instances, batch size 2
        let train = &loaders[0];
        let sizes: Vec<usize> = train
            .epoch::<TestBackend>(0, &device)
            .iter()
            .map(|batch| batch.input_ids.dims()[0])
            .collect();
        assert_eq!(sizes.iter().sum::<usize>(), 3);
        assert_eq!(sizes.len(), 2);

        let mut seen = train.shard_indices(0);
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2]);
    }
}
