// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the data and infra layers to accomplish one
// command each:
//
//   encode   — fill the encoding caches (single writer)
//   prepare  — run an epoch of every split through the
//              batcher and finalizer, record statistics
//   inspect  — decode one assembled instance
//
// No tokenization, assembly or padding logic lives here, and
// nothing here prints: results go back to Layer 1.

/// PipelineConfig, Stage and DeviceKind
pub mod config;

/// Per-split datasets, samplers and Burn DataLoaders
pub mod loader_builder;

/// The cache-population workflow
pub mod encode_use_case;

/// The full-epoch preparation workflow
pub mod prepare_use_case;

/// The single-instance inspection workflow
pub mod inspect_use_case;
