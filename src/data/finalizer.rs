// ============================================================
// Layer 4 — Batch Finalizer
// ============================================================
// Turns a padded DialogueBatch into the tensors a model consumes:
//
//   (input_ids, token_type_ids, position_ids, label_ids,
//    knowledge_ids, loss_mask)
//
// Training mode, per row:
//   1. strip padding (PAD from input/label, PAD segment from types)
//   2. left-pad the stripped label with PAD to the input's length
//   3. right-pad input / types / label to the fixed seq_len
//   4. loss_mask[i] = 0.0 where label[i + 1] == PAD, else 1.0
//      (seq_len - 1 entries, targets are shifted by one)
//   5. position ids 0..seq_len
//
// Evaluation mode (one instance per batch): nothing is stripped
// or repadded; the mask is computed over label[1..] directly and
// positions run over the label width.
//
// Any length disagreement after stripping is an assembly defect
// and panics.

use anyhow::Result;
use burn::prelude::*;

use crate::data::batcher::{rows_to_tensor, DialogueBatch, PaddedBatch};
use crate::domain::segment::{Segment, SpecialIds};

/// Which batch shape to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeMode {
    Training,
    Evaluation,
}

// ─── Host-side result ─────────────────────────────────────────────────────────
/// Finalized rows before device upload.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalizedRows {
    pub input_ids:      Vec<Vec<u32>>,
    pub token_type_ids: Vec<Vec<u32>>,
    /// 0..width for every row
    pub position_ids:   Vec<Vec<u32>>,
    /// Reply targets; PAD elsewhere
    pub label_ids:      Vec<Vec<u32>>,
    /// Copied from the padded batch unchanged
    pub knowledge_ids:  Vec<Vec<u32>>,
    /// One entry per shifted target, width - 1 per row
    pub loss_mask:      Vec<Vec<f32>>,
}

impl FinalizedRows {
    /// Number of label positions that contribute to the loss.
    pub fn supervised_tokens(&self) -> usize {
        self.loss_mask
            .iter()
            .map(|row| row.iter().filter(|&&m| m > 0.0).count())
            .sum()
    }
}

/// Finalize host rows. See the module docs for both modes.
pub fn finalize_rows(
    batch:   &PaddedBatch,
    mode:    FinalizeMode,
    seq_len: usize,
    ids:     SpecialIds,
) -> FinalizedRows {
    match mode {
        FinalizeMode::Training   => finalize_training(batch, seq_len, ids),
        FinalizeMode::Evaluation => finalize_evaluation(batch, ids),
    }
}

fn finalize_training(batch: &PaddedBatch, seq_len: usize, ids: SpecialIds) -> FinalizedRows {
    let n = batch.batch_size();
    let mut out = FinalizedRows {
        input_ids:      Vec::with_capacity(n),
        token_type_ids: Vec::with_capacity(n),
        position_ids:   Vec::with_capacity(n),
        label_ids:      Vec::with_capacity(n),
        knowledge_ids:  batch.knowledge_ids.clone(),
        loss_mask:      Vec::with_capacity(n),
    };

    for row in 0..n {
        let input = strip(&batch.input_ids[row], ids.pad);
        let token = strip(&batch.token_type_ids[row], Segment::Pad.id());
        let label = strip(&batch.label_ids[row], ids.pad);

        let inp_len = input.len();
        assert!(
            label.len() <= inp_len,
            "row {row}: stripped label ({}) longer than input ({inp_len})",
            label.len()
        );
        let label = left_pad(label, inp_len, ids.pad);

        assert_eq!(inp_len, token.len(), "row {row}: input/token-type length mismatch");
        assert_eq!(inp_len, label.len(), "row {row}: input/label length mismatch");
        assert!(inp_len <= seq_len, "row {row}: {inp_len} tokens exceed seq_len {seq_len}");

        let label = right_pad(label, seq_len, ids.pad);
        out.loss_mask.push(loss_mask(&label, ids.pad));
        out.input_ids.push(right_pad(input, seq_len, ids.pad));
        out.token_type_ids.push(right_pad(token, seq_len, Segment::Pad.id()));
        out.label_ids.push(label);
        out.position_ids.push((0..seq_len as u32).collect());
    }
    out
}

fn finalize_evaluation(batch: &PaddedBatch, ids: SpecialIds) -> FinalizedRows {
    if batch.batch_size() != 1 {
        tracing::warn!(
            "Evaluation batches are expected to hold one instance, got {}",
            batch.batch_size()
        );
    }

    let label_len = batch.label_ids.first().map(Vec::len).unwrap_or(0);
    FinalizedRows {
        input_ids:      batch.input_ids.clone(),
        token_type_ids: batch.token_type_ids.clone(),
        position_ids:   vec![(0..label_len as u32).collect(); batch.batch_size()],
        label_ids:      batch.label_ids.clone(),
        knowledge_ids:  batch.knowledge_ids.clone(),
        loss_mask:      batch.label_ids.iter().map(|l| loss_mask(l, ids.pad)).collect(),
    }
}

fn strip(row: &[u32], pad: u32) -> Vec<u32> {
    row.iter().copied().filter(|&id| id != pad).collect()
}

fn left_pad(row: Vec<u32>, width: usize, pad: u32) -> Vec<u32> {
    let mut out = vec![pad; width.saturating_sub(row.len())];
    out.extend(row);
    out
}

fn right_pad(mut row: Vec<u32>, width: usize, pad: u32) -> Vec<u32> {
    if row.len() < width {
        row.resize(width, pad);
    }
    row
}

/// 1.0 for every shifted target that is not padding.
fn loss_mask(label: &[u32], pad: u32) -> Vec<f32> {
    label
        .iter()
        .skip(1)
        .map(|&id| if id == pad { 0.0 } else { 1.0 })
        .collect()
}

// ─── Device-side ──────────────────────────────────────────────────────────────
/// The finalized batch on the target device.
#[derive(Debug, Clone)]
pub struct FinalBatch<B: Backend> {
    /// [batch_size, width]; width is seq_len in training
    pub input_ids:      Tensor<B, 2, Int>,
    /// [batch_size, width]
    pub token_type_ids: Tensor<B, 2, Int>,
    /// [batch_size, width]
    pub position_ids:   Tensor<B, 2, Int>,
    /// [batch_size, width]
    pub label_ids:      Tensor<B, 2, Int>,
    /// [batch_size, max knowledge len]
    pub knowledge_ids:  Tensor<B, 2, Int>,
    /// [batch_size, width - 1], 1.0 where the next label is supervised
    pub loss_mask:      Tensor<B, 2>,
}

/// Finalizes DataLoader batches for one split.
#[derive(Debug, Clone)]
pub struct BatchFinalizer<B: Backend> {
    mode:    FinalizeMode,
    seq_len: usize,
    ids:     SpecialIds,
    device:  B::Device,
}

impl<B: Backend> BatchFinalizer<B> {
    pub fn new(mode: FinalizeMode, seq_len: usize, ids: SpecialIds, device: B::Device) -> Self {
        Self { mode, seq_len, ids, device }
    }

    pub fn mode(&self) -> FinalizeMode {
        self.mode
    }

    /// Finalize a device batch; the result lives on this finalizer's device.
    pub fn finalize(&self, batch: &DialogueBatch<B>) -> Result<(FinalBatch<B>, FinalizedRows)> {
        let rows = finalize_rows(&batch.to_padded()?, self.mode, self.seq_len, self.ids);
        Ok((self.upload(&rows), rows))
    }

    fn upload(&self, rows: &FinalizedRows) -> FinalBatch<B> {
        let d = &self.device;
        let mask_width = rows.loss_mask.first().map(Vec::len).unwrap_or(0);
        let mask_flat: Vec<f32> = rows.loss_mask.iter().flatten().copied().collect();

        FinalBatch {
            input_ids:      rows_to_tensor(&rows.input_ids, d),
            token_type_ids: rows_to_tensor(&rows.token_type_ids, d),
            position_ids:   rows_to_tensor(&rows.position_ids, d),
            label_ids:      rows_to_tensor(&rows.label_ids, d),
            knowledge_ids:  rows_to_tensor(&rows.knowledge_ids, d),
            loss_mask:      Tensor::<B, 1>::from_floats(mask_flat.as_slice(), d)
                .reshape([rows.loss_mask.len(), mask_width]),
        }
    }
}
