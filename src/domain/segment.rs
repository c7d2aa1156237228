// ============================================================
// Layer 3 — Segment and Special Token Ids
// ============================================================
// Every position of an assembled sequence carries a segment id
// telling the model which zone the token belongs to:
//
//   KNOWLEDGE  knowledge snippets (and the leading [BOS])
//   USER       user utterances in the history
//   BOT        bot utterances in the history and the reply
//   PAD        padding added by batching
//
// Token padding and segment padding are separate
// constants: `SpecialIds::pad` pads token/label/knowledge rows,
// `Segment::Pad` pads token-type rows.

use serde::{Deserialize, Serialize};

/// Segment (token type) ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Segment {
    Bot = 0,
    User = 1,
    Knowledge = 2,
    Pad = 3,
}

impl Segment {
    /// Numeric id written into `token_type_ids`.
    pub const fn id(self) -> u32 {
        self as u32
    }

    /// Segment of the history utterance at `position` (0 = first).
    /// Speakers alternate starting with the user.
    pub const fn for_history(position: usize) -> Self {
        if position % 2 == 0 {
            Segment::User
        } else {
            Segment::Bot
        }
    }

    pub fn from_id(id: u32) -> Option<Self> {
        match id {
            0 => Some(Segment::Bot),
            1 => Some(Segment::User),
            2 => Some(Segment::Knowledge),
            3 => Some(Segment::Pad),
            _ => None,
        }
    }
}

/// Fixed token ids exposed by the tokenizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialIds {
    pub pad: u32,
    pub bos: u32,
    pub eos: u32,
}

impl SpecialIds {
    pub fn new(pad: u32, bos: u32, eos: u32) -> Self {
        Self { pad, bos, eos }
    }

    /// Marker placed before every user utterance.
    pub fn user_marker(&self) -> u32 {
        self.eos
    }

    /// Marker placed before every bot utterance and before the reply.
    pub fn bot_marker(&self) -> u32 {
        self.eos
    }

    /// Marker for the history utterance at `position`.
    pub fn marker_for_history(&self, position: usize) -> u32 {
        match Segment::for_history(position) {
            Segment::User => self.user_marker(),
            _ => self.bot_marker(),
        }
    }
}
