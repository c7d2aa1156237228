// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The pipeline talks to the outside world through two seams:
//
//   DialogueSource  — where raw dialogues come from
//                     (JsonDialogueLoader reads a JSON file)
//   TextTokenizer   — text → token ids, plus the fixed special ids
//                     (HfTokenizer wraps a HuggingFace tokenizer;
//                      tests use a word-level stand-in)
//
// The encoder, assembler and dataset only ever see these traits.

use anyhow::Result;

use crate::domain::dialogue::Dialogue;
use crate::domain::segment::SpecialIds;

// ─── DialogueSource ───────────────────────────────────────────────────────────
/// Any component that can produce raw dialogues.
pub trait DialogueSource {
    /// Load every dialogue. Malformed records are an error.
    fn load_all(&self) -> Result<Vec<Dialogue>>;

    /// Human-readable origin, used in logs.
    fn describe(&self) -> String;
}

// ─── TextTokenizer ────────────────────────────────────────────────────────────
/// Black-box tokenizer capability.
pub trait TextTokenizer {
    /// Encode text without adding special tokens.
    fn encode(&self, text: &str) -> Result<Vec<u32>>;

    /// Decode ids back to text (diagnostics only).
    fn decode(&self, ids: &[u32]) -> Result<String>;

    /// pad / bos / eos ids.
    fn special_ids(&self) -> SpecialIds;

    /// Identity of the tokenizer kind; part of the cache key.
    fn type_name(&self) -> &str;
}
