// ============================================================
// Layer 3 — Dialogue Domain Types
// ============================================================
// One source file is a JSON array of dialogues; each dialogue is
// an array of turns:
//
//   { "role": "user" | "bot",
//     "utter": "...",
//     "klg": "..." | { "<source title>": "<snippet>", ... } }
//
// `klg` is only required on bot turns that produce a sample, so
// it is optional here and validated by the encoder.

use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

/// Knowledge key marking "the wizard used no passage for this reply".
pub const NO_PASSAGES_USED: &str = "no_passages_used";

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

/// Knowledge attached to a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Knowledge {
    /// A single snippet of text.
    Text(String),
    /// Named snippets in the order they appear in the source file.
    Sources(Vec<(String, String)>),
}

impl Knowledge {
    /// True if the knowledge mapping carries the no-passage sentinel key.
    pub fn has_no_passage_marker(&self) -> bool {
        match self {
            Knowledge::Text(_) => false,
            Knowledge::Sources(entries) => entries.iter().any(|(k, _)| k == NO_PASSAGES_USED),
        }
    }

    /// Snippet texts in order.
    pub fn snippets(&self) -> Vec<&str> {
        match self {
            Knowledge::Text(text) => vec![text.as_str()],
            Knowledge::Sources(entries) => entries.iter().map(|(_, v)| v.as_str()).collect(),
        }
    }
}

/// One utterance of a dialogue.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DialogueTurn {
    pub role: Role,
    pub utter: String,
    #[serde(default)]
    pub klg: Option<Knowledge>,
}

impl DialogueTurn {
    #[cfg(test)]
    pub fn new(role: Role, utter: impl Into<String>, klg: Option<Knowledge>) -> Self {
        Self { role, utter: utter.into(), klg }
    }

    pub fn is_bot(&self) -> bool {
        self.role == Role::Bot
    }
}

/// A full conversation, turns in chronological order.
pub type Dialogue = Vec<DialogueTurn>;

// ─── Knowledge deserialisation ────────────────────────────────────────────────
// A hand-written visitor keeps the mapping entries in document
// order without pulling in an ordered-map crate.
impl<'de> Deserialize<'de> for Knowledge {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(KnowledgeVisitor)
    }
}

struct KnowledgeVisitor;

impl<'de> Visitor<'de> for KnowledgeVisitor {
    type Value = Knowledge;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a knowledge string or a map of source title to snippet")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Knowledge, E> {
        Ok(Knowledge::Text(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Knowledge, E> {
        Ok(Knowledge::Text(v))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Knowledge, A::Error> {
        let mut entries: Vec<(String, String)> = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((key, value)) = map.next_entry::<String, String>()? {
            // Repeated keys keep their first position, last value wins
            match entries.iter_mut().find(|entry| entry.0 == key) {
                Some(slot) => slot.1 = value,
                None => entries.push((key, value)),
            }
        }
        Ok(Knowledge::Sources(entries))
    }
}
