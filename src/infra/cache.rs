// ============================================================
// Layer 6 — Encoding Cache
// ============================================================
// Tokenizing a split is the slow part of the pipeline, so the
// encoded pairs are kept on disk between runs.
//
//   key:   <cache_base>_<tokenizer type name>
//          e.g. cache/train_cache_BPETokenizer
//   body:  bincode of Vec<TokenizedPair>
//
// If the file exists it is read back as is. Otherwise the source
// is loaded, encoded and the result written (parent directories
// are created). The artifact carries no version: changing the
// source data or the encoding rules needs a manual delete or an
// `encode --overwrite` run.

use anyhow::{Context, Result};
use std::{
    fs,
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::data::encoder::{encode, EncodeStats};
use crate::domain::sample::TokenizedPair;
use crate::domain::traits::{DialogueSource, TextTokenizer};

/// Where the pairs came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss(EncodeStats),
}

pub struct EncodingCache {
    base: PathBuf,
}

impl EncodingCache {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Cache file for a given tokenizer kind.
    pub fn path_for(&self, type_name: &str) -> PathBuf {
        let mut name = self.base.as_os_str().to_owned();
        name.push("_");
        name.push(type_name);
        PathBuf::from(name)
    }

    /// Read the cached pairs, or encode `source` and write them.
    pub fn load_or_encode<S, T>(&self, source: &S, tokenizer: &T) -> Result<(Vec<TokenizedPair>, CacheStatus)>
    where
        S: DialogueSource + ?Sized,
        T: TextTokenizer + ?Sized,
    {
        let path = self.path_for(tokenizer.type_name());
        if path.exists() {
            tracing::info!("Load tokenized dataset from cache at '{}'", path.display());
            let pairs = read_pairs(&path)?;
            return Ok((pairs, CacheStatus::Hit));
        }

        let (pairs, stats) = self.rebuild(source, tokenizer)?;
        Ok((pairs, CacheStatus::Miss(stats)))
    }

    /// Encode `source` and overwrite the cache file.
    pub fn rebuild<S, T>(&self, source: &S, tokenizer: &T) -> Result<(Vec<TokenizedPair>, EncodeStats)>
    where
        S: DialogueSource + ?Sized,
        T: TextTokenizer + ?Sized,
    {
        let path = self.path_for(tokenizer.type_name());
        tracing::info!("Encoding {} into '{}'", source.describe(), path.display());

        let dialogues      = source.load_all()?;
        let (pairs, stats) = encode(&dialogues, tokenizer)?;
        write_pairs(&path, &pairs)?;

        tracing::info!(
            "Cached {} samples from {} dialogues ({} without passages, {} empty)",
            stats.emitted,
            stats.dialogues,
            stats.skipped_sentinel,
            stats.skipped_empty,
        );
        Ok((pairs, stats))
    }
}

fn read_pairs(path: &Path) -> Result<Vec<TokenizedPair>> {
    let file = fs::File::open(path)
        .with_context(|| format!("Cannot open cache '{}'", path.display()))?;
    bincode::deserialize_from(BufReader::new(file))
        .with_context(|| format!("Corrupt cache '{}'", path.display()))
}

fn write_pairs(path: &Path, pairs: &[TokenizedPair]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create cache directory '{}'", parent.display()))?;
    }
    let file = fs::File::create(path)
        .with_context(|| format!("Cannot create cache '{}'", path.display()))?;
    let mut writer = BufWriter::new(file);
    bincode::serialize_into(&mut writer, pairs)
        .with_context(|| format!("Cannot write cache '{}'", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("Cannot write cache '{}'", path.display()))
}
