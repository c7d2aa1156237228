// ============================================================
// Layer 4 — Shard Sampler
// ============================================================
// Partitions dataset indices across data-parallel workers, the
// same contract as a distributed sampler:
//
//   1. permute 0..N with an RNG seeded by (seed + epoch)
//      → every worker computes the same permutation
//   2. size the shard:
//        drop_last and N % R != 0 → ceil((N - R) / R)
//        otherwise                 → ceil(N / R)
//   3. without drop_last, pad the permutation by repeating its head
//      with drop_last, cut it to shard_size * R
//   4. worker `rank` takes every R-th index starting at `rank`
//
// ShardedDataset exposes one worker's shard of a shared dataset
// through Burn's Dataset trait, so it plugs into DataLoaderBuilder
// without the loader shuffling again.

use anyhow::{ensure, Result};
use burn::data::dataset::Dataset;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use std::sync::Arc;

/// Deterministic per-epoch index partitioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardSampler {
    num_replicas: usize,
    rank:         usize,
    seed:         u64,
    shuffle:      bool,
    drop_last:    bool,
}

impl ShardSampler {
    /// # Errors
    /// Fails if `num_replicas` is zero or `rank` is out of range.
    pub fn new(num_replicas: usize, rank: usize, seed: u64, drop_last: bool) -> Result<Self> {
        ensure!(num_replicas > 0, "world size must be at least 1");
        ensure!(
            rank < num_replicas,
            "rank {rank} is out of range for world size {num_replicas}"
        );
        Ok(Self { num_replicas, rank, seed, shuffle: true, drop_last })
    }

    /// Keep dataset order instead of permuting.
    #[cfg(test)]
    pub fn without_shuffle(mut self) -> Self {
        self.shuffle = false;
        self
    }

    /// Number of indices each worker receives for a dataset of `len`.
    pub fn shard_size(&self, len: usize) -> usize {
        let r = self.num_replicas;
        if self.drop_last && len % r != 0 {
            len.saturating_sub(r).div_ceil(r)
        } else {
            len.div_ceil(r)
        }
    }

    /// This worker's indices for `epoch`.
    pub fn indices(&self, len: usize, epoch: u64) -> Vec<usize> {
        let mut order: Vec<usize> = (0..len).collect();
        if self.shuffle {
            let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(epoch));
            order.shuffle(&mut rng);
        }

        let total = self.shard_size(len) * self.num_replicas;
        if total > order.len() && !order.is_empty() {
            // Repeat the head until every worker gets the same count
            let head = order.clone();
            while order.len() < total {
                let missing = total - order.len();
                order.extend(head.iter().take(missing));
            }
        }
        order.truncate(total);

        order
            .into_iter()
            .skip(self.rank)
            .step_by(self.num_replicas)
            .collect()
    }
}

// ─── ShardedDataset ───────────────────────────────────────────────────────────
/// One worker's view of a shared dataset for one epoch.
pub struct ShardedDataset<D> {
    inner:   Arc<D>,
    indices: Vec<usize>,
}

impl<D> ShardedDataset<D> {
    pub fn new<I>(inner: Arc<D>, sampler: &ShardSampler, epoch: u64) -> Self
    where
        D: Dataset<I>,
    {
        let indices = sampler.indices(inner.len(), epoch);
        Self { inner, indices }
    }
}

impl<D, I> Dataset<I> for ShardedDataset<D>
where
    D: Dataset<I>,
{
    fn get(&self, index: usize) -> Option<I> {
        self.indices.get(index).and_then(|&i| self.inner.get(i))
    }

    fn len(&self) -> usize {
        self.indices.len()
    }
}
