// ============================================================
// Layer 4 — Dialogue Dataset
// ============================================================
// Owns the assembled instances of one split and implements
// Burn's Dataset trait so a DataLoader can call .get(i)/.len().
//
// Construction:
//   1. take the first floor(ratio * N) tokenized pairs
//   2. assemble each one (SequenceAssembler)
//   3. keep it only if len(input_ids) <= seq_len
//
// The instance list is immutable afterwards, so the dataset can
// be shared read-only (Arc) between loader workers.

use burn::data::dataset::Dataset;

use crate::data::assembler::SequenceAssembler;
use crate::domain::sample::{Instance, TokenizedPair};
use crate::domain::segment::SpecialIds;

/// How a split's instances are assembled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DatasetOptions {
    /// Length gate; longer instances are dropped
    pub seq_len:    usize,
    /// Fraction of pairs (a prefix) to assemble; 1.0 = all
    pub ratio:      f64,
    /// Supervise the reply; false gives an all-PAD label
    pub want_label: bool,
}

impl Default for DatasetOptions {
    fn default() -> Self {
        Self { seq_len: 512, ratio: 1.0, want_label: true }
    }
}

/// Diagnostics gathered while building the dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DatasetStats {
    /// Pairs considered after applying the ratio
    pub pairs:     usize,
    /// Instances within the length gate
    pub kept:      usize,
    /// Pairs whose history had to be cut
    pub truncated: usize,
    /// Pairs that still did not fit and were discarded
    pub dropped:   usize,
}

pub struct DialogueDataset {
    instances: Vec<Instance>,
    stats:     DatasetStats,
    ids:       SpecialIds,
    seq_len:   usize,
}

impl DialogueDataset {
    /// Assemble instances from tokenized pairs.
    pub fn from_pairs(pairs: &[TokenizedPair], options: DatasetOptions, ids: SpecialIds) -> Self {
        let take      = ((options.ratio * pairs.len() as f64) as usize).min(pairs.len());
        let assembler = SequenceAssembler::new(options.seq_len, ids, options.want_label);

        let mut stats     = DatasetStats { pairs: take, ..Default::default() };
        let mut instances = Vec::with_capacity(take);

        for pair in &pairs[..take] {
            let out = assembler.assemble(pair);
            if out.truncated {
                stats.truncated += 1;
            }
            if out.instance.len() <= assembler.seq_len() {
                instances.push(out.instance);
            } else {
                stats.dropped += 1;
            }
        }
        stats.kept = instances.len();

        tracing::debug!(
            "Assembled {} instances from {} pairs ({} truncated, {} dropped)",
            stats.kept,
            stats.pairs,
            stats.truncated,
            stats.dropped,
        );

        Self { instances, stats, ids, seq_len: options.seq_len }
    }

    pub fn stats(&self) -> DatasetStats {
        self.stats
    }

    pub fn special_ids(&self) -> SpecialIds {
        self.ids
    }

    pub fn seq_len(&self) -> usize {
        self.seq_len
    }

    /// Borrow an instance without cloning it.
    pub fn instance(&self, index: usize) -> Option<&Instance> {
        self.instances.get(index)
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }
}

impl Dataset<Instance> for DialogueDataset {
    fn get(&self, index: usize) -> Option<Instance> {
        self.instances.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.instances.len()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::encoder::encode;
    use crate::data::test_support::*;

    fn pairs() -> Vec<TokenizedPair> {
        let tok = WordTokenizer::new();
        let dialogues = vec![
            sample_dialogue(),
            vec![user("hi"), bot("hello there friend", "greeting")],
        ];
        encode(&dialogues, &tok).unwrap().0
    }

    fn options(seq_len: usize) -> DatasetOptions {
        DatasetOptions { seq_len, ..Default::default() }
    }

    #[test]
    fn test_keeps_everything_with_room() {
        let ds = DialogueDataset::from_pairs(&pairs(), options(512), ids());
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.stats().truncated, 0);
        assert_eq!(ds.stats().dropped, 0);
        assert!(ds.get(3).is_none());
    }

    #[test]
    fn test_every_instance_fits_and_is_aligned() {
        for seq_len in [4, 8, 12, 16, 20, 64] {
            let ds = DialogueDataset::from_pairs(&pairs(), options(seq_len), ids());
            for ins in ds.instances() {
                assert!(ins.input_ids.len() <= seq_len);
                assert_eq!(ins.input_ids.len(), ins.token_type_ids.len());
                assert_eq!(ins.input_ids.len(), ins.lm_label.len());
            }
            assert_eq!(ds.stats().kept + ds.stats().dropped, ds.stats().pairs);
        }
    }

    #[test]
    fn test_truncation_count_never_grows_with_seq_len() {
        let pairs = pairs();
        let mut last = usize::MAX;
        for seq_len in 1..48 {
            let truncated = DialogueDataset::from_pairs(&pairs, options(seq_len), ids())
                .stats()
                .truncated;
            assert!(truncated <= last, "seq_len {seq_len}: {truncated} > {last}");
            last = truncated;
        }
    }

    #[test]
    fn test_too_small_budget_drops_instances() {
        let ds = DialogueDataset::from_pairs(&pairs(), options(6), ids());
        assert_eq!(ds.len(), 0);
        assert_eq!(ds.stats().dropped, 3);
    }

    #[test]
    fn test_ratio_takes_a_prefix() {
        let all = pairs();
        let opts = DatasetOptions { ratio: 0.5, ..options(512) };
        let ds = DialogueDataset::from_pairs(&all, opts, ids());

        assert_eq!(ds.len(), 1);
        let first = DialogueDataset::from_pairs(&all[..1], options(512), ids());
        assert_eq!(ds.get(0), first.get(0));
    }
}
