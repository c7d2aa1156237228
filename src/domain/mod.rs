// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs, enums and traits describing the data that
// flows through the pipeline:
//
//   Dialogue / DialogueTurn / Knowledge   — raw source records
//   TokenizedPair                         — encoder output (cached)
//   Instance                              — one assembled sequence
//   Segment / SpecialIds                  — named id constants
//   DialogueSource / TextTokenizer        — seams to the outside
//
// Rules for this layer:
//   - NO Burn framework types
//   - NO file I/O
//   - NO tokenizer implementation, only the capability trait

/// Raw dialogue records as read from the source JSON
pub mod dialogue;

/// Tokenized pairs and assembled instances
pub mod sample;

/// Segment ids and special token ids
pub mod segment;

/// Core abstractions implemented by other layers
pub mod traits;
