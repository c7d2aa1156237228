// ============================================================
// Layer 4 — Dialogue Encoder
// ============================================================
// Turns raw dialogues into TokenizedPairs.
//
// Walk every dialogue keeping the running history of utterances
// (every turn, whatever the role). Each bot turn that is not the
// first utterance is a candidate sample:
//
//   dial_enc = encode(u) for every utterance so far, reply last
//   klg_enc  = encode(snippet) for every knowledge snippet
//
// A candidate is skipped when its knowledge mapping carries the
// "no_passages_used" key or when it resolves to no snippets.
// A candidate with no `klg` field at all is a malformed record.
//
// This is a pure function: caching lives in infra::cache.

use anyhow::{bail, Result};

use crate::domain::dialogue::{Dialogue, Knowledge};
use crate::domain::sample::TokenizedPair;
use crate::domain::traits::TextTokenizer;

/// Counters gathered while encoding, for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeStats {
    pub dialogues:         usize,
    pub candidates:        usize,
    pub emitted:           usize,
    pub skipped_sentinel:  usize,
    pub skipped_empty:     usize,
}

/// Encode dialogues into tokenized (history, knowledge) pairs.
pub fn encode<T: TextTokenizer + ?Sized>(
    dialogues: &[Dialogue],
    tokenizer: &T,
) -> Result<(Vec<TokenizedPair>, EncodeStats)> {
    let mut pairs = Vec::new();
    let mut stats = EncodeStats { dialogues: dialogues.len(), ..Default::default() };

    for (d_idx, dialogue) in dialogues.iter().enumerate() {
        let mut history: Vec<&str> = Vec::with_capacity(dialogue.len());

        for (t_idx, turn) in dialogue.iter().enumerate() {
            history.push(turn.utter.as_str());

            if !turn.is_bot() || history.len() < 2 {
                continue;
            }
            stats.candidates += 1;

            let Some(klg) = turn.klg.as_ref() else {
                bail!("dialogue {d_idx}, turn {t_idx}: bot turn has no 'klg' field");
            };

            let dial_enc = history
                .iter()
                .map(|utter| tokenizer.encode(utter))
                .collect::<Result<Vec<_>>>()?;

            if klg.has_no_passage_marker() {
                stats.skipped_sentinel += 1;
                continue;
            }

            let klg_enc = encode_knowledge(klg, tokenizer)?;
            if klg_enc.is_empty() {
                stats.skipped_empty += 1;
                continue;
            }

            pairs.push(TokenizedPair::new(dial_enc, klg_enc));
            stats.emitted += 1;
        }
    }

    tracing::debug!(
        "Encoded {} dialogues: {} candidates, {} samples, {} without passages, {} empty",
        stats.dialogues,
        stats.candidates,
        stats.emitted,
        stats.skipped_sentinel,
        stats.skipped_empty,
    );
    Ok((pairs, stats))
}

/// Tokenize every knowledge snippet, keeping source order.
fn encode_knowledge<T: TextTokenizer + ?Sized>(
    klg: &Knowledge,
    tokenizer: &T,
) -> Result<Vec<Vec<u32>>> {
    klg.snippets()
        .into_iter()
        .map(|snippet| tokenizer.encode(snippet))
        .collect()
}
