// ============================================================
// Layer 4 — Dialogue Source Loader
// ============================================================
// Reads one JSON source file (train.json / valid.json / test.json)
// into typed dialogues.
//
// The whole file is one JSON array of dialogues. Any record that
// does not match the DialogueTurn shape aborts the load with the
// file path and serde's line/column in the error.

use anyhow::{Context, Result};
use std::{fs, path::{Path, PathBuf}};

use crate::domain::dialogue::Dialogue;
use crate::domain::traits::DialogueSource;

/// Loads dialogues from a single JSON file.
pub struct JsonDialogueLoader {
    path: PathBuf,
}

impl JsonDialogueLoader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }
}

impl DialogueSource for JsonDialogueLoader {
    fn load_all(&self) -> Result<Vec<Dialogue>> {
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("Cannot read dialogue file '{}'", self.path.display()))?;

        let dialogues: Vec<Dialogue> = serde_json::from_str(&text)
            .with_context(|| format!("Malformed dialogue file '{}'", self.path.display()))?;

        tracing::debug!(
            "Parsed {} dialogues ({} turns) from '{}'",
            dialogues.len(),
            dialogues.iter().map(Vec::len).sum::<usize>(),
            self.path.display()
        );
        Ok(dialogues)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
