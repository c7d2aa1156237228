// ============================================================
// Layer 3 — Tokenized Pairs and Instances
// ============================================================
// TokenizedPair is what the encoder produces and what the disk
// cache stores. Instance is one fully assembled sequence, ready
// to be batched:
//
//   input_ids       [BOS] knowledge history [SEP] reply [EOS]
//   token_type_ids  one segment id per input position
//   lm_label        PAD ... PAD [SEP] reply [EOS]
//   knowledge_ids   the knowledge tokens alone, never truncated

use serde::{Deserialize, Serialize};

/// One candidate sample: tokenized dialogue history (reply last)
/// and its tokenized knowledge snippets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizedPair {
    /// One id sequence per utterance, chronological, reply last
    pub dial_enc: Vec<Vec<u32>>,
    /// One id sequence per knowledge snippet; never empty
    pub klg_enc: Vec<Vec<u32>>,
}

impl TokenizedPair {
    pub fn new(dial_enc: Vec<Vec<u32>>, klg_enc: Vec<Vec<u32>>) -> Self {
        Self { dial_enc, klg_enc }
    }

    /// The reply utterance (last entry of `dial_enc`).
    pub fn reply(&self) -> &[u32] {
        self.dial_enc.last().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Everything said before the reply.
    pub fn history(&self) -> &[Vec<u32>] {
        let n = self.dial_enc.len().saturating_sub(1);
        &self.dial_enc[..n]
    }
}

/// A linearised training/inference sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub input_ids:      Vec<u32>,
    pub token_type_ids: Vec<u32>,
    pub knowledge_ids:  Vec<u32>,
    pub lm_label:       Vec<u32>,
}

impl Instance {
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    /// Number of label positions that are not padding.
    pub fn target_len(&self, pad: u32) -> usize {
        self.lm_label.iter().filter(|&&id| id != pad).count()
    }
}
