// ============================================================
// Layer 4 — Dialogue Batcher
// ============================================================
// Implements Burn's Batcher trait to turn a Vec<Instance> into a
// DialogueBatch of device tensors.
//
// Instances have different lengths, so batching right-pads every
// field to that field's own maximum inside the batch:
//
//   input_ids       padded with the PAD token id
//   token_type_ids  padded with the PAD segment id
//   label_ids       padded with the PAD token id
//   knowledge_ids   padded with the PAD token id
//
// All tensors are batch-first: [batch_size, max_len_of_field].
//
// The padding itself is done on host rows (PaddedBatch) by
// `collate`, which the finalizer reuses and which is testable
// without a device.

use anyhow::Result;
use burn::{data::dataloader::batcher::Batcher, prelude::*};

use crate::domain::sample::Instance;
use crate::domain::segment::{Segment, SpecialIds};

// ─── PaddedBatch ──────────────────────────────────────────────────────────────
/// Host-side padded rows, one Vec per instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaddedBatch {
    /// Right-padded with PAD
    pub input_ids:      Vec<Vec<u32>>,
    /// Right-padded with the PAD segment
    pub token_type_ids: Vec<Vec<u32>>,
    /// Right-padded with PAD
    pub label_ids:      Vec<Vec<u32>>,
    /// Padded to the longest knowledge in the batch
    pub knowledge_ids:  Vec<Vec<u32>>,
}

impl PaddedBatch {
    pub fn batch_size(&self) -> usize {
        self.input_ids.len()
    }

    /// Upload every field to `device` as a [batch, width] Int tensor.
    pub fn to_tensors<B: Backend>(&self, device: &B::Device) -> DialogueBatch<B> {
        DialogueBatch {
            input_ids:      rows_to_tensor(&self.input_ids, device),
            token_type_ids: rows_to_tensor(&self.token_type_ids, device),
            label_ids:      rows_to_tensor(&self.label_ids, device),
            knowledge_ids:  rows_to_tensor(&self.knowledge_ids, device),
        }
    }
}

/// Right-pad every field of `items` to the field's longest row.
pub fn collate(items: &[Instance], ids: SpecialIds) -> PaddedBatch {
    PaddedBatch {
        input_ids:      pad_rows(items.iter().map(|i| i.input_ids.as_slice()), ids.pad),
        token_type_ids: pad_rows(items.iter().map(|i| i.token_type_ids.as_slice()), Segment::Pad.id()),
        label_ids:      pad_rows(items.iter().map(|i| i.lm_label.as_slice()), ids.pad),
        knowledge_ids:  pad_rows(items.iter().map(|i| i.knowledge_ids.as_slice()), ids.pad),
    }
}

fn pad_rows<'a>(rows: impl Iterator<Item = &'a [u32]> + Clone, pad: u32) -> Vec<Vec<u32>> {
    let width = rows.clone().map(<[u32]>::len).max().unwrap_or(0);
    rows.map(|row| {
        let mut padded = Vec::with_capacity(width);
        padded.extend_from_slice(row);
        padded.resize(width, pad);
        padded
    })
    .collect()
}

// ─── DialogueBatch ────────────────────────────────────────────────────────────
/// A padded batch on the device, as produced by the DataLoader.
#[derive(Debug, Clone)]
pub struct DialogueBatch<B: Backend> {
    /// [batch_size, max input len]
    pub input_ids:      Tensor<B, 2, Int>,
    /// [batch_size, max input len]
    pub token_type_ids: Tensor<B, 2, Int>,
    /// [batch_size, max input len]
    pub label_ids:      Tensor<B, 2, Int>,
    /// [batch_size, max knowledge len]
    pub knowledge_ids:  Tensor<B, 2, Int>,
}

impl<B: Backend> DialogueBatch<B> {
    /// Read the batch back into host rows.
    pub fn to_padded(&self) -> Result<PaddedBatch> {
        Ok(PaddedBatch {
            input_ids:      tensor_to_rows(self.input_ids.clone())?,
            token_type_ids: tensor_to_rows(self.token_type_ids.clone())?,
            label_ids:      tensor_to_rows(self.label_ids.clone())?,
            knowledge_ids:  tensor_to_rows(self.knowledge_ids.clone())?,
        })
    }
}

/// Flatten rows of equal width into a [rows, width] Int tensor.
pub fn rows_to_tensor<B: Backend>(rows: &[Vec<u32>], device: &B::Device) -> Tensor<B, 2, Int> {
    let width = rows.first().map(Vec::len).unwrap_or(0);
    let flat: Vec<i32> = rows
        .iter()
        .flat_map(|row| row.iter().map(|&id| id as i32))
        .collect();

    Tensor::<B, 1, Int>::from_ints(flat.as_slice(), device).reshape([rows.len(), width])
}

/// Inverse of [`rows_to_tensor`].
pub fn tensor_to_rows<B: Backend>(tensor: Tensor<B, 2, Int>) -> Result<Vec<Vec<u32>>> {
    let [rows, width] = tensor.dims();
    let flat = tensor
        .into_data()
        .convert::<i32>()
        .to_vec::<i32>()
        .map_err(|e| anyhow::anyhow!("Cannot read tensor data: {e:?}"))?;

    if width == 0 {
        return Ok(vec![Vec::new(); rows]);
    }
    Ok(flat
        .chunks(width)
        .map(|row| row.iter().map(|&id| id as u32).collect())
        .collect())
}

// ─── Burn Batcher Trait Implementation ────────────────────────────────────────
/// Holds the special ids so padding uses the right values.
#[derive(Clone, Debug)]
pub struct DialogueBatcher {
    ids: SpecialIds,
}

impl DialogueBatcher {
    pub fn new(ids: SpecialIds) -> Self {
        Self { ids }
    }
}

impl<B: Backend> Batcher<B, Instance, DialogueBatch<B>> for DialogueBatcher {
    fn batch(&self, items: Vec<Instance>, device: &B::Device) -> DialogueBatch<B> {
        collate(&items, self.ids).to_tensors(device)
    }
}
