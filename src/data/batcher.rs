// ============================================================
// Layer 4 — Seq2Seq Batcher
// ============================================================
// Implements burn's Batcher trait: Vec<Seq2SeqItem> → Seq2SeqBatch.
//
// For a batch of N items:
//
//   src       [N, S]     sources right-padded with pad_id
//   tgt_in    [N, T-1]   target[:, :-1]  decoder input
//   tgt_y     [N, T-1]   target[:, 1:]   labels
//   src_mask  [N, 1, S]  true on real source tokens
//   tgt_mask  [N, T-1, T-1]  target padding AND subsequent
//   ntokens              number of non-pad labels
//
// S and T are the longest source/target in THIS batch, so
// padding is per batch rather than per dataset.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
    tensor::TensorData,
};

use crate::data::dataset::Seq2SeqItem;
use crate::ml::mask::{padding_mask, target_mask, Mask};

// ─── Seq2SeqBatch ─────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct Seq2SeqBatch<B: Backend> {
    pub src:      Tensor<B, 2, Int>,
    pub src_mask: Mask<B>,
    pub tgt_in:   Tensor<B, 2, Int>,
    pub tgt_mask: Mask<B>,
    pub tgt_y:    Tensor<B, 2, Int>,
    pub ntokens:  usize,
}

// ─── Seq2SeqBatcher ───────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct Seq2SeqBatcher {
    pub pad_id: usize,
}

impl Seq2SeqBatcher {
    pub fn new(pad_id: usize) -> Self {
        Self { pad_id }
    }

    /// Row-major `[rows, width]` ids, each row right-padded.
    fn padded<'a, I>(&self, rows: I, width: usize) -> Vec<i64>
    where
        I: Iterator<Item = &'a [usize]>,
    {
        rows.flat_map(|row| {
            row.iter()
                .map(|&id| id as i64)
                .chain(std::iter::repeat(self.pad_id as i64))
                .take(width)
        })
        .collect()
    }
}

impl<B: Backend> Batcher<B, Seq2SeqItem, Seq2SeqBatch<B>> for Seq2SeqBatcher {
    fn batch(&self, items: Vec<Seq2SeqItem>, device: &B::Device) -> Seq2SeqBatch<B> {
        let batch_size = items.len();
        let src_len    = items.iter().map(|i| i.source.len()).max().unwrap_or(0).max(1);
        let tgt_len    = items.iter().map(|i| i.target.len()).max().unwrap_or(0).max(2);
        let dec_len    = tgt_len - 1;

        let src_flat = self.padded(items.iter().map(|i| i.source.as_slice()), src_len);
        let tgt_in   = self.padded(
            items.iter().map(|i| &i.target[..i.target.len().saturating_sub(1)]),
            dec_len,
        );
        let tgt_y    = self.padded(items.iter().map(|i| i.target.get(1..).unwrap_or(&[])), dec_len);

        let ntokens = tgt_y.iter().filter(|&&id| id != self.pad_id as i64).count();

        let src    = Tensor::<B, 2, Int>::from_data(TensorData::new(src_flat, [batch_size, src_len]), device);
        let tgt_in = Tensor::<B, 2, Int>::from_data(TensorData::new(tgt_in, [batch_size, dec_len]), device);
        let tgt_y  = Tensor::<B, 2, Int>::from_data(TensorData::new(tgt_y, [batch_size, dec_len]), device);

        let src_mask = padding_mask(src.clone(), self.pad_id);
        let tgt_mask = target_mask(tgt_in.clone(), self.pad_id);

        Seq2SeqBatch { src, src_mask, tgt_in, tgt_mask, tgt_y, ntokens }
    }
}
