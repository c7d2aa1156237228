// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from raw dialogue JSON to device-ready batches:
//
//   <split>.json
//       │
//       ▼
//   JsonDialogueLoader  → parses dialogues (role, utter, klg)
//       │
//       ▼
//   encode              → (history, knowledge) token pairs
//       │                 (cached on disk by infra::cache)
//       ▼
//   SequenceAssembler   → one linear sequence per pair
//       │
//       ▼
//   DialogueDataset     → length-gated instances, Burn Dataset
//       │
//       ▼
//   ShardedDataset      → this worker's share for one epoch
//       │
//       ▼
//   DialogueBatcher     → padded batch tensors
//       │
//       ▼
//   BatchFinalizer      → fixed-width rows, positions, loss mask
//
// Every step is usable and testable on its own.

/// Reads dialogue JSON files
pub mod loader;

/// Dialogues → tokenized (history, knowledge) pairs
pub mod encoder;

/// Pair → single input / segment / label sequence
pub mod assembler;

/// Burn Dataset over assembled instances
pub mod dataset;

/// Burn Batcher: per-field right padding
pub mod batcher;

/// Training / evaluation batch finalization
pub mod finalizer;

/// Per-worker, per-epoch index sharding
pub mod sampler;

#[cfg(test)]
pub(crate) mod test_support;
