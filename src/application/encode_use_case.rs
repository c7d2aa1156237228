// ============================================================
// Layer 2 — EncodeUseCase
// ============================================================
// Populates the encoding caches for every split of the stage,
// so that data-parallel workers started afterwards only ever
// read them:
//
//   Step 1: Load the tokenizer            (Layer 6 - infra)
//   Step 2: Per split, encode into cache  (Layer 4 + 6)
//   Step 3: Save the resolved config      (Layer 6 - infra)

use anyhow::Result;

use crate::application::config::PipelineConfig;
use crate::data::{encoder::EncodeStats, loader::JsonDialogueLoader};
use crate::domain::traits::TextTokenizer;
use crate::infra::{
    cache::{CacheStatus, EncodingCache},
    config_store::ConfigStore,
    tokenizer_store::TokenizerStore,
};

/// Outcome for one split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedSplit {
    pub split:   String,
    pub samples: usize,
    /// None when the cache already existed
    pub stats:   Option<EncodeStats>,
}

pub struct EncodeUseCase {
    config:    PipelineConfig,
    overwrite: bool,
}

impl EncodeUseCase {
    pub fn new(config: PipelineConfig, overwrite: bool) -> Self {
        Self { config, overwrite }
    }

    pub fn execute(&self) -> Result<Vec<EncodedSplit>> {
        let tokenizer = TokenizerStore::new(&self.config.tokenizer_path)
            .load(&self.config.special_tokens)?;
        self.run(&tokenizer)
    }

    pub(crate) fn run<T: TextTokenizer + ?Sized>(&self, tokenizer: &T) -> Result<Vec<EncodedSplit>> {
        let cfg   = &self.config;
        let store = ConfigStore::new(&cfg.cache_path);
        cfg.validate()?;

        if !self.overwrite {
            if let Some(prev) = store.load()? {
                if !prev.encodes_like(cfg) {
                    tracing::warn!(
                        "Caches in '{}' were built from '{}' with '{}'; run with --overwrite to re-encode",
                        cfg.cache_path,
                        prev.data_path,
                        prev.tokenizer_path,
                    );
                }
            }
        }

        let mut out = Vec::new();
        for &split in cfg.stage.splits() {
            let source = JsonDialogueLoader::new(cfg.source_path(split));
            let cache  = EncodingCache::new(cfg.cache_base(split));

            let (pairs, stats) = if self.overwrite {
                let (pairs, stats) = cache.rebuild(&source, tokenizer)?;
                (pairs, Some(stats))
            } else {
                match cache.load_or_encode(&source, tokenizer)? {
                    (pairs, CacheStatus::Hit)         => (pairs, None),
                    (pairs, CacheStatus::Miss(stats)) => (pairs, Some(stats)),
                }
            };

            tracing::info!("{}: {} encoded samples", split, pairs.len());
            out.push(EncodedSplit { split: split.to_string(), samples: pairs.len(), stats });
        }

        store.save(cfg)?;
        Ok(out)
    }
}
