// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Concerns shared by the use cases that don't belong to the
// data pipeline itself:
//
//   tokenizer_store.rs — loads tokenizer.json and adapts it to
//                        the TextTokenizer trait
//
//   cache.rs           — on-disk cache of encoded pairs, keyed
//                        by split and tokenizer kind
//
//   metrics.rs         — per-split statistics appended to
//                        split_stats.csv
//
//   config_store.rs    — pipeline_config.json next to the caches

/// HuggingFace tokenizer loading
pub mod tokenizer_store;

/// Encoded-pair cache (bincode)
pub mod cache;

/// Split statistics CSV logger
pub mod metrics;

/// Resolved configuration persistence
pub mod config_store;
