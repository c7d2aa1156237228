// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Loads a HuggingFace tokenizer.json and adapts it to the
// TextTokenizer trait the data layer works against.
//
// The special ids (pad / bos / eos) are resolved once from the
// configured token strings; a token missing from the vocabulary
// is a configuration error, not something to guess around.
//
// type_name() is derived from the underlying model kind
// (BPE, WordPiece, WordLevel, Unigram) and becomes part of the
// encoding cache key, so caches built with different tokenizer
// families never collide.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokenizers::{models::ModelWrapper, Tokenizer};

use crate::domain::segment::SpecialIds;
use crate::domain::traits::TextTokenizer;

/// Token strings for the three special roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialTokens {
    pub pad: String,
    pub bos: String,
    pub eos: String,
}

impl Default for SpecialTokens {
    fn default() -> Self {
        Self {
            pad: "<pad>".to_string(),
            bos: "<|endoftext|>".to_string(),
            eos: "<|endoftext|>".to_string(),
        }
    }
}

// ─── HfTokenizer ──────────────────────────────────────────────────────────────
pub struct HfTokenizer {
    inner:     Tokenizer,
    ids:       SpecialIds,
    type_name: String,
}

impl HfTokenizer {
    /// Wrap a loaded tokenizer, resolving the special ids.
    pub fn new(inner: Tokenizer, tokens: &SpecialTokens) -> Result<Self> {
        let lookup = |role: &str, token: &str| {
            inner.token_to_id(token).ok_or_else(|| {
                anyhow!("{role} token '{token}' is not in the tokenizer vocabulary")
            })
        };
        let ids = SpecialIds::new(
            lookup("pad", &tokens.pad)?,
            lookup("bos", &tokens.bos)?,
            lookup("eos", &tokens.eos)?,
        );

        let type_name = match inner.get_model() {
            ModelWrapper::BPE(_)       => "BPETokenizer",
            ModelWrapper::WordPiece(_) => "WordPieceTokenizer",
            ModelWrapper::WordLevel(_) => "WordLevelTokenizer",
            ModelWrapper::Unigram(_)   => "UnigramTokenizer",
        }
        .to_string();

        Ok(Self { inner, ids, type_name })
    }
}

impl TextTokenizer for HfTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        let enc = self
            .inner
            .encode(text, false)
            .map_err(|e| anyhow!("Tokenisation error: {e}"))?;
        Ok(enc.get_ids().to_vec())
    }

    fn decode(&self, ids: &[u32]) -> Result<String> {
        self.inner
            .decode(ids, false)
            .map_err(|e| anyhow!("Decoding error: {e}"))
    }

    fn special_ids(&self) -> SpecialIds {
        self.ids
    }

    fn type_name(&self) -> &str {
        &self.type_name
    }
}

// ─── TokenizerStore ───────────────────────────────────────────────────────────
pub struct TokenizerStore {
    path: PathBuf,
}

impl TokenizerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the tokenizer file and resolve its special ids.
    pub fn load(&self, tokens: &SpecialTokens) -> Result<HfTokenizer> {
        let inner = Tokenizer::from_file(&self.path).map_err(|e| {
            anyhow!("Cannot load tokenizer from '{}': {}", self.path.display(), e)
        })?;
        let tok = HfTokenizer::new(inner, tokens)
            .with_context(|| format!("Tokenizer '{}'", self.path.display()))?;

        tracing::info!(
            "Loaded {} from '{}' (pad={}, bos={}, eos={})",
            tok.type_name(),
            self.path.display(),
            tok.ids.pad,
            tok.ids.bos,
            tok.ids.eos,
        );
        Ok(tok)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    /// Write a small word-level tokenizer.json into `dir`.
    fn write_word_level(dir: &Path) -> PathBuf {
        let vocab = serde_json::json!({
            "<pad>": 0,
            "<|endoftext|>": 1,
            "[UNK]": 2,
            "hi": 3,
            "hello": 4,
            "there": 5,
            "greeting": 6,
            "jazz": 7,
        });
        let special = |id: u32, content: &str| {
            serde_json::json!({
                "id": id, "content": content, "single_word": false,
                "lstrip": false, "rstrip": false, "normalized": false, "special": true
            })
        };
        let json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [special(0, "<pad>"), special(1, "<|endoftext|>")],
            "normalizer": null,
            "pre_tokenizer": { "type": "Whitespace" },
            "post_processor": null,
            "decoder": null,
            "model": { "type": "WordLevel", "vocab": vocab, "unk_token": "[UNK]" }
        });

        let path = dir.join("tokenizer.json");
        std::fs::write(&path, serde_json::to_string_pretty(&json).unwrap()).unwrap();
        path
    }

    #[test]
    fn test_load_resolves_special_ids_and_kind() {
        let dir = tempfile::tempdir().unwrap();
        let tok = TokenizerStore::new(write_word_level(dir.path()))
            .load(&SpecialTokens::default())
            .unwrap();

        assert_eq!(tok.special_ids(), SpecialIds::new(0, 1, 1));
        assert_eq!(tok.type_name(), "WordLevelTokenizer");
    }

    #[test]
    fn test_encode_has_no_special_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let tok = TokenizerStore::new(write_word_level(dir.path()))
            .load(&SpecialTokens::default())
            .unwrap();

        assert_eq!(tok.encode("hello there").unwrap(), vec![4, 5]);
        assert_eq!(tok.encode("").unwrap(), Vec::<u32>::new());
    }

    #[test]
    fn test_missing_special_token_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let tokens = SpecialTokens { pad: "[PAD]".to_string(), ..Default::default() };
        let err = TokenizerStore::new(write_word_level(dir.path()))
            .load(&tokens)
            .err()
            .unwrap();

        assert!(format!("{err:#}").contains("'[PAD]'"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenizerStore::new(dir.path().join("absent.json"));
        assert!(store.load(&SpecialTokens::default()).is_err());
    }
}
