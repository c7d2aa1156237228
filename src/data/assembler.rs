// ============================================================
// Layer 4 — Sequence Assembler
// ============================================================
// Linearises one TokenizedPair into a single sequence:
//
//   input_ids       [BOS] k1 k2 .. km  [U] u1 [B] b1 [U] u2 ..  [B] reply [EOS]
//   token_type_ids   K   K  K  .. K     U  U   B  B   U  U  ..   B  B     B
//   lm_label        PAD PAD ...                                 [B] reply [EOS]
//
// [U] and [B] are the speaker markers (both the EOS id). History
// speakers alternate starting with the user.
//
// Truncation: when the full sequence would exceed seq_len, only
// the newest history tokens are kept. Knowledge and reply are
// never cut. If knowledge plus reply alone leave no room, history
// is left as is and the sequence comes out longer than seq_len;
// the dataset's length gate then drops it.
//
// The reply's segment list is sized len([B] reply) + 1 so that it
// also covers the trailing [EOS].

use crate::domain::sample::{Instance, TokenizedPair};
use crate::domain::segment::{Segment, SpecialIds};

/// Result of assembling one pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembled {
    pub instance:  Instance,
    /// True if oldest history tokens had to be dropped
    pub truncated: bool,
}

/// Builds instances for a fixed sequence budget.
#[derive(Debug, Clone, Copy)]
pub struct SequenceAssembler {
    seq_len:    usize,
    ids:        SpecialIds,
    want_label: bool,
}

impl SequenceAssembler {
    pub fn new(seq_len: usize, ids: SpecialIds, want_label: bool) -> Self {
        Self { seq_len, ids, want_label }
    }

    pub fn seq_len(&self) -> usize {
        self.seq_len
    }

    /// Assemble one instance from a tokenized pair.
    ///
    /// # Panics
    /// Panics if the assembled fields end up with different lengths.
    pub fn assemble(&self, pair: &TokenizedPair) -> Assembled {
        let (history, reply) = (pair.history(), pair.reply());

        // ── History: marker + utterance, segment per position ────────────────
        let hist_ids: Vec<u32> = history
            .iter()
            .enumerate()
            .flat_map(|(i, utter)| {
                std::iter::once(self.ids.marker_for_history(i)).chain(utter.iter().copied())
            })
            .collect();
        let hist_tti: Vec<u32> = history
            .iter()
            .enumerate()
            .flat_map(|(i, utter)| {
                std::iter::repeat(Segment::for_history(i).id()).take(utter.len() + 1)
            })
            .collect();

        // ── Knowledge: no marker ─────────────────────────────────────────────
        let klg_ids: Vec<u32> = pair.klg_enc.iter().flatten().copied().collect();
        let klg_tti = vec![Segment::Knowledge.id(); klg_ids.len()];

        // ── Reply: [B] reply, segments cover the trailing [EOS] too ──────────
        let reply_ids: Vec<u32> = std::iter::once(self.ids.bot_marker())
            .chain(reply.iter().copied())
            .collect();
        let reply_tti = vec![Segment::Bot.id(); reply_ids.len() + 1];

        // ── Truncation ───────────────────────────────────────────────────────
        let total = hist_ids.len() + klg_ids.len() + reply_ids.len() + 2;
        let truncated = total > self.seq_len;
        let (hist_ids, hist_tti) = if truncated {
            let budget = self.seq_len as isize - (klg_ids.len() + reply_ids.len()) as isize - 2;
            if budget > 0 {
                let keep = budget as usize;
                (tail(&hist_ids, keep), tail(&hist_tti, keep))
            } else {
                (&hist_ids[..], &hist_tti[..])
            }
        } else {
            (&hist_ids[..], &hist_tti[..])
        };

        // ── Final sequences ──────────────────────────────────────────────────
        let input_ids: Vec<u32> = std::iter::once(self.ids.bos)
            .chain(klg_ids.iter().copied())
            .chain(hist_ids.iter().copied())
            .chain(reply_ids.iter().copied())
            .chain(std::iter::once(self.ids.eos))
            .collect();

        let token_type_ids: Vec<u32> = std::iter::once(Segment::Knowledge.id())
            .chain(klg_tti)
            .chain(hist_tti.iter().copied())
            .chain(reply_tti)
            .collect();

        let lm_label: Vec<u32> = if self.want_label {
            let lead = input_ids.len() - reply_ids.len() - 1;
            std::iter::repeat(self.ids.pad)
                .take(lead)
                .chain(reply_ids.iter().copied())
                .chain(std::iter::once(self.ids.eos))
                .collect()
        } else {
            vec![self.ids.pad; input_ids.len()]
        };

        assert_eq!(input_ids.len(), token_type_ids.len(), "input/token-type length mismatch");
        assert_eq!(input_ids.len(), lm_label.len(), "input/label length mismatch");

        Assembled {
            instance: Instance { input_ids, token_type_ids, knowledge_ids: klg_ids, lm_label },
            truncated,
        }
    }
}

/// Last `n` elements of `v` (all of it if shorter).
fn tail(v: &[u32], n: usize) -> &[u32] {
    &v[v.len().saturating_sub(n)..]
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::test_support::{ids, BOS, EOS, PAD};

    const U: u32 = 1; // Segment::User
    const B: u32 = 0; // Segment::Bot
    const K: u32 = 2; // Segment::Knowledge

    fn dialogue() -> TokenizedPair {
        // user: 10 11 | bot: 12 | user: 13 14 | reply: 15 16
        TokenizedPair::new(
            vec![vec![10, 11], vec![12], vec![13, 14], vec![15, 16]],
            vec![vec![20, 21], vec![22]],
        )
    }

    #[test]
    fn test_full_layout_without_truncation() {
        let pair = dialogue();
        let out = SequenceAssembler::new(64, ids(), true).assemble(&pair);
        let ins = out.instance;

        assert!(!out.truncated);
        assert_eq!(
            ins.input_ids,
            vec![BOS, 20, 21, 22, EOS, 10, 11, EOS, 12, EOS, 13, 14, EOS, 15, 16, EOS]
        );
        assert_eq!(
            ins.token_type_ids,
            vec![K, K, K, K, U, U, U, B, B, U, U, U, B, B, B, B]
        );
        assert_eq!(
            ins.lm_label,
            vec![PAD, PAD, PAD, PAD, PAD, PAD, PAD, PAD, PAD, PAD, PAD, PAD, EOS, 15, 16, EOS]
        );
        assert_eq!(ins.knowledge_ids, vec![20, 21, 22]);
    }

    #[test]
    fn test_lengths_always_agree() {
        let pair = dialogue();
        for seq_len in 0..40 {
            let ins = SequenceAssembler::new(seq_len, ids(), true).assemble(&pair).instance;
            assert_eq!(ins.input_ids.len(), ins.token_type_ids.len());
            assert_eq!(ins.input_ids.len(), ins.lm_label.len());
        }
    }

    #[test]
    fn test_overflow_drops_oldest_history_only() {
        let pair = dialogue();
        // Full length is 16; a budget of 11 overflows by 5.
        let out = SequenceAssembler::new(11, ids(), true).assemble(&pair);
        let ins = out.instance;

        assert!(out.truncated);
        assert_eq!(ins.input_ids.len(), 11);
        // History was [EOS 10 11 EOS 12 EOS 13 14]; the oldest 5 are gone.
        assert_eq!(ins.input_ids, vec![BOS, 20, 21, 22, EOS, 13, 14, EOS, 15, 16, EOS]);
        assert_eq!(ins.token_type_ids, vec![K, K, K, K, U, U, U, B, B, B, B]);
        assert_eq!(ins.knowledge_ids, vec![20, 21, 22]);
        assert_eq!(&ins.lm_label[7..], &[EOS, 15, 16, EOS]);
    }

    #[test]
    fn test_exact_fit_is_not_truncated() {
        let pair = dialogue();
        let out = SequenceAssembler::new(16, ids(), true).assemble(&pair);
        assert!(!out.truncated);
        assert_eq!(out.instance.len(), 16);
    }

    #[test]
    fn test_no_room_for_history_overflows() {
        let pair = dialogue();
        // knowledge (3) + [B] reply (3) + 2 = 8 leaves no history budget
        let out = SequenceAssembler::new(8, ids(), true).assemble(&pair);
        assert!(out.truncated);
        assert!(out.instance.len() > 8);
    }

    #[test]
    fn test_without_labels_label_is_all_padding() {
        let pair = dialogue();
        let ins = SequenceAssembler::new(64, ids(), false).assemble(&pair).instance;
        assert_eq!(ins.lm_label.len(), ins.input_ids.len());
        assert!(ins.lm_label.iter().all(|&id| id == PAD));
    }

    #[test]
    fn test_reply_only_dialogue() {
        // A pair always has history, but the assembler copes without it.
        let out = SequenceAssembler::new(16, ids(), true).assemble(&TokenizedPair::new(vec![vec![30]], vec![vec![40]]));
        assert_eq!(out.instance.input_ids, vec![BOS, 40, EOS, 30, EOS]);
        assert_eq!(out.instance.token_type_ids, vec![K, K, B, B, B]);
    }
}
