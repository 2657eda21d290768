// ============================================================
// Layer 5 — Decoder
// ============================================================
// DecoderLayer, three residual sublayers in order:
//   1. masked self-attention over the target stream
//        (mask = target padding AND subsequent)
//   2. cross-attention: queries from the target stream,
//      keys/values from the encoder memory
//        (mask = source padding)
//   3. position-wise feed-forward
//
// Decoder: N independent DecoderLayers + final LayerNorm.
//
// Neither type implements `Layer`: its forward takes one stream
// and one mask, while every decoder call also needs the encoder
// memory and the source mask.

use burn::{nn::LayerNorm, prelude::*};

use crate::error::Result;
use crate::ml::attention::MultiHeadAttention;
use crate::ml::config::TransformerConfig;
use crate::ml::feed_forward::PositionwiseFeedForward;
use crate::ml::layer::{layer_norm, SublayerConnection};
use crate::ml::mask::Mask;

/// Not a [`Layer`](crate::ml::layer::Layer): forward also takes the
/// encoder memory and its padding mask.
#[derive(Module, Debug)]
pub struct DecoderLayer<B: Backend> {
    pub self_attn:    MultiHeadAttention<B>,
    pub memory_attn:  MultiHeadAttention<B>,
    pub feed_forward: PositionwiseFeedForward<B>,
    pub self_sub:     SublayerConnection<B>,
    pub memory_sub:   SublayerConnection<B>,
    pub ffn_sub:      SublayerConnection<B>,
}

impl<B: Backend> DecoderLayer<B> {
    pub fn new(cfg: &TransformerConfig, device: &B::Device) -> Self {
        Self {
            self_attn:    MultiHeadAttention::new(cfg.d_model, &cfg.attention, device),
            memory_attn:  MultiHeadAttention::new(cfg.d_model, &cfg.attention, device),
            feed_forward: PositionwiseFeedForward::new(cfg.d_model, &cfg.feed_forward, device),
            self_sub:     SublayerConnection::new(cfg.d_model, cfg.dropout, device),
            memory_sub:   SublayerConnection::new(cfg.d_model, cfg.dropout, device),
            ffn_sub:      SublayerConnection::new(cfg.d_model, cfg.dropout, device),
        }
    }

    /// x: [b, t, d], memory: [b, s, d] → [b, t, d]
    pub fn forward(
        &self,
        x:           Tensor<B, 3>,
        memory:      &Tensor<B, 3>,
        self_mask:   Option<&Mask<B>>,
        memory_mask: Option<&Mask<B>>,
    ) -> Result<Tensor<B, 3>> {
        let x = self.self_sub.forward(x, |h| {
            self.self_attn.forward(h.clone(), h.clone(), h, self_mask)
        })?;
        let x = self.memory_sub.forward(x, |h| {
            self.memory_attn.forward(h, memory.clone(), memory.clone(), memory_mask)
        })?;
        self.ffn_sub.forward(x, |h| Ok(self.feed_forward.project(h)))
    }
}

#[derive(Module, Debug)]
pub struct Decoder<B: Backend> {
    pub layers: Vec<DecoderLayer<B>>,
    pub norm:   LayerNorm<B>,
}

impl<B: Backend> Decoder<B> {
    pub fn new(cfg: &TransformerConfig, device: &B::Device) -> Self {
        let layers = (0..cfg.n_layers)
            .map(|_| DecoderLayer::new(cfg, device))
            .collect();
        Self { layers, norm: layer_norm(cfg.d_model, device) }
    }

    pub fn forward(
        &self,
        x:           Tensor<B, 3>,
        memory:      &Tensor<B, 3>,
        self_mask:   Option<&Mask<B>>,
        memory_mask: Option<&Mask<B>>,
    ) -> Result<Tensor<B, 3>> {
        let mut x = x;
        for layer in &self.layers {
            x = layer.forward(x, memory, self_mask, memory_mask)?;
        }
        Ok(self.norm.forward(x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::config::{AttentionConfig, FeedForwardConfig};
    use crate::ml::mask::{padding_mask, subsequent_mask};
    use burn::{
        backend::NdArray,
        tensor::{Distribution, TensorData},
    };

    type TestBackend = NdArray;

    fn tiny_config() -> TransformerConfig {
        TransformerConfig::new(16, 2, 10, 10, AttentionConfig::for_model(16, 4), FeedForwardConfig::new(32))
    }

    fn normal(shape: [usize; 3]) -> Tensor<TestBackend, 3> {
        Tensor::random(shape, Distribution::Normal(0.0, 1.0), &Default::default())
    }

    #[test]
    fn test_output_shape_follows_target() {
        let device  = Default::default();
        let decoder = Decoder::<TestBackend>::new(&tiny_config(), &device);
        let memory  = normal([2, 7, 16]);
        let mask    = subsequent_mask::<TestBackend>(3, &device);

        let out = decoder.forward(normal([2, 3, 16]), &memory, Some(&mask), None).unwrap();
        assert_eq!(out.dims(), [2, 3, 16]);
    }

    #[test]
    fn test_future_positions_do_not_influence_past() {
        let device  = Default::default();
        let decoder = Decoder::<TestBackend>::new(&tiny_config(), &device);
        let memory  = normal([1, 4, 16]);
        let mask    = subsequent_mask::<TestBackend>(4, &device);

        let x = normal([1, 4, 16]);
        // replace the last position only
        let y = Tensor::cat(vec![x.clone().slice([0..1, 0..3, 0..16]), normal([1, 1, 16])], 1);

        let a = decoder.forward(x, &memory, Some(&mask), None).unwrap().slice([0..1, 0..3, 0..16]);
        let b = decoder.forward(y, &memory, Some(&mask), None).unwrap().slice([0..1, 0..3, 0..16]);
        let diff: f32 = (a - b).abs().max().into_scalar().elem();
        assert!(diff < 1e-4, "max difference {diff}");
    }

    #[test]
    fn test_padded_memory_is_invisible() {
        let device  = Default::default();
        let decoder = Decoder::<TestBackend>::new(&tiny_config(), &device);
        let src     = Tensor::<TestBackend, 2, Int>::from_data(
            TensorData::new(vec![1i64, 2, 3, 0], [1, 4]),
            &device,
        );
        let memory_mask = padding_mask(src, 0);
        let self_mask   = subsequent_mask::<TestBackend>(3, &device);

        let memory = normal([1, 4, 16]);
        // memory row under the source pad replaced
        let other  = Tensor::cat(vec![memory.clone().slice([0..1, 0..3, 0..16]), normal([1, 1, 16]).mul_scalar(10.0)], 1);
        let x      = normal([1, 3, 16]);

        let a = decoder.forward(x.clone(), &memory, Some(&self_mask), Some(&memory_mask)).unwrap();
        let b = decoder.forward(x.clone(), &other, Some(&self_mask), Some(&memory_mask)).unwrap();
        let diff: f32 = (a.clone() - b).abs().max().into_scalar().elem();
        assert!(diff < 1e-4, "max difference {diff}");

        // without the mask the pad row leaks into every position
        let c = decoder.forward(x, &other, Some(&self_mask), None).unwrap();
        let diff: f32 = (a - c).abs().max().into_scalar().elem();
        assert!(diff > 1e-4);
    }
}
