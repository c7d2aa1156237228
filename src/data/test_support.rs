// Test-only helpers shared by the data-layer unit tests.

use anyhow::Result;
use std::cell::RefCell;
use std::collections::HashMap;

use crate::domain::dialogue::{Dialogue, DialogueTurn, Knowledge, Role};
use crate::domain::segment::SpecialIds;
use crate::domain::traits::TextTokenizer;

pub const PAD: u32 = 0;
pub const BOS: u32 = 1;
pub const EOS: u32 = 2;

/// Word-level tokenizer: every whitespace-separated word gets its
/// own id, assigned on first sight starting at 10.
pub struct WordTokenizer {
    vocab: RefCell<HashMap<String, u32>>,
}

impl WordTokenizer {
    pub fn new() -> Self {
        Self { vocab: RefCell::new(HashMap::new()) }
    }

    pub fn id(&self, word: &str) -> u32 {
        let mut vocab = self.vocab.borrow_mut();
        let next = 10 + vocab.len() as u32;
        *vocab.entry(word.to_string()).or_insert(next)
    }
}

impl TextTokenizer for WordTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        Ok(text.split_whitespace().map(|w| self.id(w)).collect())
    }

    fn decode(&self, ids: &[u32]) -> Result<String> {
        let vocab = self.vocab.borrow();
        let words: Vec<String> = ids
            .iter()
            .map(|id| {
                vocab
                    .iter()
                    .find(|(_, v)| *v == id)
                    .map(|(k, _)| k.clone())
                    .unwrap_or_else(|| format!("<{id}>"))
            })
            .collect();
        Ok(words.join(" "))
    }

    fn special_ids(&self) -> SpecialIds {
        SpecialIds::new(PAD, BOS, EOS)
    }

    fn type_name(&self) -> &str {
        "WordTokenizer"
    }
}

pub fn ids() -> SpecialIds {
    SpecialIds::new(PAD, BOS, EOS)
}

pub fn user(text: &str) -> DialogueTurn {
    DialogueTurn::new(Role::User, text, None)
}

pub fn bot(text: &str, klg: &str) -> DialogueTurn {
    DialogueTurn::new(Role::Bot, text, Some(Knowledge::Text(klg.to_string())))
}

pub fn bot_sources(text: &str, sources: &[(&str, &str)]) -> DialogueTurn {
    let entries = sources.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    DialogueTurn::new(Role::Bot, text, Some(Knowledge::Sources(entries)))
}

/// A short four-turn dialogue with knowledge on both bot turns.
pub fn sample_dialogue() -> Dialogue {
    vec![
        user("do you like jazz"),
        bot("yes very much", "jazz is a music genre"),
        user("who invented it"),
        bot("it started in new orleans", "jazz originated in new orleans"),
    ]
}
