// ============================================================
// Layer 5 — Transformer (encoder/decoder composition)
// ============================================================
//   src ids ─► src_embed ─► +PE ─► Encoder ─► memory
//   tgt ids ─► tgt_embed ─► +PE ─► Decoder(memory) ─► classifier ─► logits
//
// Three independent parameter sets: source embedding, target
// embedding, classifier (no weight tying). One positional
// table is shared by both streams since it has no parameters.
//
// Training: `forward` runs the whole shifted target in one
// pass; the target padding mask is always ANDed with the
// subsequent mask, so causality holds during training too.
//
// Inference: `greedy_decode` grows the target one id at a time
// against a memory computed once.

use std::path::{Path, PathBuf};

use burn::{prelude::*, tensor::TensorData};

use crate::error::{Error, Result};
use crate::ml::checkpoint::{self, CheckpointMeta};
use crate::ml::classifier::OutputClassifier;
use crate::ml::config::TransformerConfig;
use crate::ml::decoder::Decoder;
use crate::ml::embeddings::{Embeddings, PositionalEncoding};
use crate::ml::encoder::Encoder;
use crate::ml::layer::Layer;
use crate::ml::mask::{decoder_self_mask, subsequent_mask, Mask};

#[derive(Module, Debug)]
pub struct Transformer<B: Backend> {
    pub encoder:    Encoder<B>,
    pub decoder:    Decoder<B>,
    pub src_embed:  Embeddings<B>,
    pub tgt_embed:  Embeddings<B>,
    pub positional: PositionalEncoding<B>,
    pub classifier: OutputClassifier<B>,
}

impl<B: Backend> Transformer<B> {
    /// Builds every sub-module; shape checks live in `TransformerConfig::init`.
    pub(crate) fn new(cfg: &TransformerConfig, device: &B::Device) -> Self {
        Self {
            encoder:    Encoder::new(cfg, device),
            decoder:    Decoder::new(cfg, device),
            src_embed:  Embeddings::new(cfg.src_vocab_size, cfg.d_model, device),
            tgt_embed:  Embeddings::new(cfg.tgt_vocab_size, cfg.d_model, device),
            positional: PositionalEncoding::new(cfg.d_model, cfg.max_len, cfg.dropout, device),
            classifier: OutputClassifier::new(cfg.d_model, cfg.tgt_vocab_size, device),
        }
    }

    /// src: [b, s], src_mask: [b, 1, s] → memory [b, s, d_model]
    pub fn encode(&self, src: Tensor<B, 2, Int>, src_mask: &Mask<B>) -> Result<Tensor<B, 3>> {
        let x = self.positional.forward(self.src_embed.forward(src)?)?;
        self.encoder.forward(x, Some(src_mask))
    }

    /// tgt: [b, t], tgt_mask: [b|1, t, t] → decoder states [b, t, d_model]
    pub fn decode(
        &self,
        memory:   &Tensor<B, 3>,
        src_mask: &Mask<B>,
        tgt:      Tensor<B, 2, Int>,
        tgt_mask: &Mask<B>,
    ) -> Result<Tensor<B, 3>> {
        let x = self.positional.forward(self.tgt_embed.forward(tgt)?)?;
        self.decoder.forward(x, memory, Some(tgt_mask), Some(src_mask))
    }

    /// Whole shifted target in one pass: logits [b, t, tgt_vocab].
    ///
    /// `tgt_mask` may be the bare target padding mask `[b, 1, t]` or an
    /// already combined `[b, t, t]` mask; the causal constraint is
    /// applied here either way.
    pub fn forward(
        &self,
        src:      Tensor<B, 2, Int>,
        src_mask: &Mask<B>,
        tgt:      Tensor<B, 2, Int>,
        tgt_mask: &Mask<B>,
    ) -> Result<Tensor<B, 3>> {
        let [_, tgt_len] = tgt.dims();
        let key_len      = tgt_mask.dims()[2];
        if key_len != tgt_len {
            return Err(Error::shape("target mask", format!("[b|1, {tgt_len}|1, {tgt_len}]"), &tgt_mask.dims()));
        }
        let tgt_mask = decoder_self_mask(tgt_mask.clone())?;

        let memory = self.encode(src, src_mask)?;
        let states = self.decode(&memory, src_mask, tgt, &tgt_mask)?;
        Ok(self.classifier.logits(states))
    }

    /// Highest-logit decoding, one position per step.
    ///
    /// Every returned row starts with `start_id` and holds at most
    /// `max_length` ids. A row that emits `stop_id` ends there (stop
    /// included); the loop exits once every row has stopped.
    pub fn greedy_decode(
        &self,
        src:        Tensor<B, 2, Int>,
        src_mask:   &Mask<B>,
        start_id:   usize,
        stop_id:    Option<usize>,
        max_length: usize,
    ) -> Result<Vec<Vec<usize>>> {
        if max_length == 0 {
            return Err(Error::Config("max_length must be at least 1".into()));
        }
        let device  = src.device();
        let [batch, _] = src.dims();
        let memory  = self.encode(src, src_mask)?;

        let mut ys: Tensor<B, 2, Int> =
            Tensor::from_data(TensorData::new(vec![start_id as i64; batch], [batch, 1]), &device);
        let mut stopped = vec![false; batch];

        for _ in 1..max_length {
            let len    = ys.dims()[1];
            let causal = subsequent_mask::<B>(len, &device);
            let states = self.decode(&memory, src_mask, ys.clone(), &causal)?;
            let [_, _, d_model] = states.dims();

            let last   = states.slice([0..batch, len - 1..len, 0..d_model]);
            let logits = self.classifier.logits(last);
            let vocab  = logits.dims()[2];
            let next   = logits.reshape([batch, vocab]).argmax(1); // [b, 1]

            if let Some(stop) = stop_id {
                let chosen = next.clone().into_data().iter::<i64>().collect::<Vec<_>>();
                for (flag, id) in stopped.iter_mut().zip(chosen) {
                    *flag |= id == stop as i64;
                }
            }
            ys = Tensor::cat(vec![ys, next], 1);

            if stop_id.is_some() && stopped.iter().all(|s| *s) {
                break;
            }
        }

        let len  = ys.dims()[1];
        let flat = ys.into_data().iter::<i64>().collect::<Vec<_>>();
        tracing::debug!("greedy decoding finished after {} positions", len);

        Ok(flat
            .chunks(len)
            .map(|row| {
                let mut ids: Vec<usize> = row.iter().map(|&id| id as usize).collect();
                if let Some(stop) = stop_id {
                    if let Some(at) = ids.iter().skip(1).position(|&id| id == stop) {
                        ids.truncate(at + 2);
                    }
                }
                ids
            })
            .collect())
    }

    /// Writes this model as the checkpoint of `epoch` at `path`.
    pub fn save_checkpoint(&self, path: &Path, epoch: usize, loss: f64) -> Result<PathBuf> {
        checkpoint::save(self, path, epoch, loss)
    }

    /// Loads parameters into this (architecturally identical) model.
    pub fn load_checkpoint(self, path: &Path, device: &B::Device) -> Result<(Self, CheckpointMeta)> {
        checkpoint::load(self, path, device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::config::{AttentionConfig, FeedForwardConfig};
    use crate::ml::mask::padding_mask;
    use burn::{backend::NdArray, module::Param};

    type TestBackend = NdArray;

    fn tiny(vocab: usize) -> Transformer<TestBackend> {
        TransformerConfig::new(16, 2, vocab, vocab, AttentionConfig::for_model(16, 4), FeedForwardConfig::new(32))
            .with_max_len(64)
            .init(&Default::default())
            .unwrap()
    }

    fn ids(values: &[i64], shape: [usize; 2]) -> Tensor<TestBackend, 2, Int> {
        Tensor::from_data(TensorData::new(values.to_vec(), shape), &Default::default())
    }

    #[test]
    fn test_forward_logits_shape() {
        let model = tiny(11);
        let src   = ids(&[1, 2, 3, 4, 1, 5, 6, 0], [2, 4]);
        let tgt   = ids(&[1, 2, 3, 1, 5, 0], [2, 3]);

        let logits = model
            .forward(src.clone(), &padding_mask(src, 0), tgt.clone(), &padding_mask(tgt, 0))
            .unwrap();
        assert_eq!(logits.dims(), [2, 3, 11]);
    }

    #[test]
    fn test_training_pass_is_causal_with_padding_mask_only() {
        // only the padding mask is passed in; later target ids still
        // must not change earlier logits
        let model = tiny(11);
        let src   = ids(&[1, 4, 7, 2], [1, 4]);
        let a     = ids(&[1, 3, 5, 7], [1, 4]);
        let b     = ids(&[1, 3, 5, 9], [1, 4]);
        let smask = padding_mask(src.clone(), 0);

        let la = model.forward(src.clone(), &smask, a.clone(), &padding_mask(a, 0)).unwrap();
        let lb = model.forward(src, &smask, b.clone(), &padding_mask(b, 0)).unwrap();

        let head = |t: Tensor<TestBackend, 3>| t.slice([0..1, 0..3, 0..11]);
        let diff: f32 = (head(la) - head(lb)).abs().max().into_scalar().elem();
        assert!(diff < 1e-4, "max difference {diff}");
    }

    #[test]
    fn test_independent_embedding_tables() {
        let model = tiny(11);
        let diff: f32 = (model.src_embed.lut.weight.val() - model.tgt_embed.lut.weight.val())
            .abs().sum().into_scalar().elem();
        assert!(diff > 0.0);
    }

    #[test]
    fn test_out_of_range_source_id_rejected() {
        let model = tiny(11);
        let src   = ids(&[1, 11], [1, 2]);
        let tgt   = ids(&[1], [1, 1]);
        let err   = model
            .forward(src.clone(), &padding_mask(src, 0), tgt.clone(), &padding_mask(tgt, 0))
            .unwrap_err();
        assert!(matches!(err, Error::TokenOutOfRange { id: 11, .. }));
    }

    #[test]
    fn test_target_mask_of_other_length_rejected() {
        let model = tiny(11);
        let src   = ids(&[1, 2, 3], [1, 3]);
        let tgt   = ids(&[1, 2, 3], [1, 3]);
        let short = ids(&[1, 2], [1, 2]);
        let err   = model
            .forward(src.clone(), &padding_mask(src, 0), tgt, &padding_mask(short, 0))
            .unwrap_err();
        assert!(matches!(err, Error::Shape { .. }));
    }

    #[test]
    fn test_greedy_decode_is_deterministic_and_bounded() {
        let model = tiny(11);
        let src   = ids(&[1, 2, 3, 4, 5, 1, 9, 8, 7, 6], [2, 5]);
        let mask  = padding_mask(src.clone(), 0);

        let first  = model.greedy_decode(src.clone(), &mask, 1, None, 6).unwrap();
        let second = model.greedy_decode(src, &mask, 1, None, 6).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        for row in &first {
            assert_eq!(row.len(), 6);
            assert_eq!(row[0], 1);
            assert!(row.iter().all(|&id| id < 11));
        }
    }

    #[test]
    fn test_greedy_decode_stops_on_stop_symbol() {
        let device    = Default::default();
        let mut model = tiny(6);

        // classifier that always prefers id 2
        let mut bias = vec![0.0f32; 6];
        bias[2] = 10.0;
        model.classifier.projection.weight = Param::from_tensor(Tensor::zeros([16, 6], &device));
        model.classifier.projection.bias   = Some(Param::from_tensor(Tensor::from_data(TensorData::new(bias, [6]), &device)));

        let src  = ids(&[1, 3, 4, 1, 5, 0], [2, 3]);
        let mask = padding_mask(src.clone(), 0);

        let stopped = model.greedy_decode(src.clone(), &mask, 1, Some(2), 10).unwrap();
        assert_eq!(stopped, vec![vec![1, 2], vec![1, 2]]);

        let unbounded = model.greedy_decode(src, &mask, 1, None, 4).unwrap();
        assert_eq!(unbounded, vec![vec![1, 2, 2, 2], vec![1, 2, 2, 2]]);
    }
}
