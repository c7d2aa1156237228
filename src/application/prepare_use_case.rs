// ============================================================
// Layer 2 — PrepareUseCase
// ============================================================
// Runs one sampler epoch of every split of the stage through
// the whole pipeline on the selected device:
//
//   Step 1: Load the tokenizer               (Layer 6 - infra)
//   Step 2: Build the split loaders          (Layer 2)
//   Step 3: Per split, iterate the shard     (Layer 4 - data)
//           DataLoader → BatchFinalizer
//   Step 4: Log / append SplitStats          (Layer 6 - infra)
//   Step 5: Save the resolved config         (Layer 6 - infra)
//
// Device selection:
//   cpu → NdArray backend
//   gpu → Wgpu backend

use anyhow::Result;
use burn::{
    backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, NdArray, Wgpu},
    prelude::*,
};

use crate::application::{
    config::{DeviceKind, PipelineConfig},
    loader_builder::{build_loaders, SplitLoader},
};
use crate::domain::traits::TextTokenizer;
use crate::infra::{
    config_store::ConfigStore,
    metrics::{MetricsLogger, SplitStats},
    tokenizer_store::TokenizerStore,
};

pub struct PrepareUseCase {
    config: PipelineConfig,
}

impl PrepareUseCase {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<Vec<SplitStats>> {
        let tokenizer = TokenizerStore::new(&self.config.tokenizer_path)
            .load(&self.config.special_tokens)?;

        match self.config.device {
            DeviceKind::Cpu => {
                let device = NdArrayDevice::default();
                tracing::info!("Using NdArray device: {:?}", device);
                self.run::<NdArray<f32>, _>(&tokenizer, &device)
            }
            DeviceKind::Gpu => {
                let device = WgpuDevice::default();
                tracing::info!("Using WGPU device: {:?}", device);
                self.run::<Wgpu, _>(&tokenizer, &device)
            }
        }
    }

    pub(crate) fn run<B, T>(&self, tokenizer: &T, device: &B::Device) -> Result<Vec<SplitStats>>
    where
        B: Backend,
        T: TextTokenizer + ?Sized,
    {
        let cfg     = &self.config;
        let loaders = build_loaders(cfg, tokenizer)?;
        let logger  = MetricsLogger::new(&cfg.stats_dir)?;

        let mut all = Vec::with_capacity(loaders.len());
        for loader in &loaders {
            let stats = run_split::<B>(loader, cfg, device)?;
            tracing::info!(
                "{} epoch {} rank {}: {} batches, {} supervised tokens, mean input length {:.1}",
                stats.split,
                stats.epoch,
                stats.rank,
                stats.batches,
                stats.supervised_tokens,
                stats.mean_input_len,
            );
            logger.log(&stats)?;
            all.push(stats);
        }

        if cfg.is_leader() {
            ConfigStore::new(&cfg.cache_path).save(cfg)?;
            tracing::info!("Split statistics appended to '{}'", logger.csv_path().display());
        }
        Ok(all)
    }
}

fn run_split<B: Backend>(
    loader: &SplitLoader,
    cfg:    &PipelineConfig,
    device: &B::Device,
) -> Result<SplitStats> {
    let dataset   = loader.dataset();
    let finalizer = loader.finalizer::<B>(device);
    tracing::debug!(
        "{}: {:?} batches of {} over seq_len {}",
        loader.name(),
        finalizer.mode(),
        loader.batch_size(),
        dataset.seq_len(),
    );

    let mut batches    = 0usize;
    let mut supervised = 0usize;
    for batch in loader.epoch::<B>(cfg.epoch, device).iter() {
        let (finalized, rows) = finalizer.finalize(&batch)?;
        if batches == 0 {
            tracing::debug!(
                "{} first batch: input {:?}, types {:?}, positions {:?}, labels {:?}, knowledge {:?}, loss mask {:?}",
                loader.name(),
                finalized.input_ids.dims(),
                finalized.token_type_ids.dims(),
                finalized.position_ids.dims(),
                finalized.label_ids.dims(),
                finalized.knowledge_ids.dims(),
                finalized.loss_mask.dims(),
            );
        }
        batches    += 1;
        supervised += rows.supervised_tokens();
    }

    let shard = loader.shard_indices(cfg.epoch);
    let total: usize = shard
        .iter()
        .filter_map(|&i| dataset.instance(i))
        .map(|ins| ins.len())
        .sum();
    let mean_input_len = if shard.is_empty() { 0.0 } else { total as f64 / shard.len() as f64 };

    let ds = dataset.stats();
    Ok(SplitStats {
        split:             loader.name().to_string(),
        epoch:             cfg.epoch,
        rank:              cfg.global_rank,
        samples:           ds.kept,
        truncated:         ds.truncated,
        dropped:           ds.dropped,
        batches,
        supervised_tokens: supervised,
        mean_input_len,
    })
}
