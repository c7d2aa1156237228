// ============================================================
// Layer 6 — Split Statistics Logger
// ============================================================
// Appends one CSV row per split after a `prepare` pass, so
// dataset shape and truncation can be compared across runs,
// sequence lengths and tokenizers.
//
// Output file: <stats_dir>/split_stats.csv
//
//   split,epoch,rank,samples,truncated,dropped,batches,supervised_tokens,mean_input_len
//   train,0,0,18430,211,3,2304,402118,187.412000
//   valid,0,0,1009,9,0,1009,21873,181.066000
//
// The header is written only when the file is new, so repeated
// runs append.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

const HEADER: &str =
    "split,epoch,rank,samples,truncated,dropped,batches,supervised_tokens,mean_input_len";

/// What one worker saw of one split in one epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitStats {
    pub split:             String,
    pub epoch:             u64,
    pub rank:              usize,
    /// Instances in the whole split after the length gate
    pub samples:           usize,
    pub truncated:         usize,
    pub dropped:           usize,
    /// Batches this worker produced
    pub batches:           usize,
    /// Positions with a non-zero loss mask
    pub supervised_tokens: usize,
    /// Mean unpadded input length over this worker's rows
    pub mean_input_len:    f64,
}

impl SplitStats {
    pub fn to_csv_row(&self) -> String {
        format!(
            "{},{},{},{},{},{},{},{},{:.6}",
            self.split,
            self.epoch,
            self.rank,
            self.samples,
            self.truncated,
            self.dropped,
            self.batches,
            self.supervised_tokens,
            self.mean_input_len,
        )
    }
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Open (or start) `split_stats.csv` under `dir`.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create stats directory '{}'", dir.display()))?;

        let csv_path = dir.join("split_stats.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "{HEADER}")?;
            tracing::debug!("Created stats CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, stats: &SplitStats) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot append to '{}'", self.csv_path.display()))?;
        writeln!(f, "{}", stats.to_csv_row())?;

        tracing::debug!("Logged {} stats for epoch {}", stats.split, stats.epoch);
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}
