// ============================================================
// Layer 5 — Encoder
// ============================================================
// EncoderLayer:
//   x = x + Dropout(SelfAttention(LayerNorm(x), src_mask))
//   x = x + Dropout(FeedForward(LayerNorm(x)))
//
// Encoder: N independent EncoderLayers followed by a final
// LayerNorm. The output is the "memory" read by every decoder
// layer: [batch, src_len, d_model].
//
// The only mask here is the source padding mask: the encoder
// sees the whole sentence.

use burn::{nn::LayerNorm, prelude::*};

use crate::error::Result;
use crate::ml::attention::MultiHeadAttention;
use crate::ml::config::TransformerConfig;
use crate::ml::feed_forward::PositionwiseFeedForward;
use crate::ml::layer::{layer_norm, Layer, SublayerConnection};
use crate::ml::mask::Mask;

#[derive(Module, Debug)]
pub struct EncoderLayer<B: Backend> {
    pub self_attn:    MultiHeadAttention<B>,
    pub feed_forward: PositionwiseFeedForward<B>,
    pub attn_sub:     SublayerConnection<B>,
    pub ffn_sub:      SublayerConnection<B>,
}

impl<B: Backend> EncoderLayer<B> {
    pub fn new(cfg: &TransformerConfig, device: &B::Device) -> Self {
        Self {
            self_attn:    MultiHeadAttention::new(cfg.d_model, &cfg.attention, device),
            feed_forward: PositionwiseFeedForward::new(cfg.d_model, &cfg.feed_forward, device),
            attn_sub:     SublayerConnection::new(cfg.d_model, cfg.dropout, device),
            ffn_sub:      SublayerConnection::new(cfg.d_model, cfg.dropout, device),
        }
    }
}

impl<B: Backend> Layer<B> for EncoderLayer<B> {
    fn forward(&self, x: Tensor<B, 3>, mask: Option<&Mask<B>>) -> Result<Tensor<B, 3>> {
        let x = self.attn_sub.forward(x, |h| {
            self.self_attn.forward(h.clone(), h.clone(), h, mask)
        })?;
        self.ffn_sub.forward(x, |h| Ok(self.feed_forward.project(h)))
    }
}

#[derive(Module, Debug)]
pub struct Encoder<B: Backend> {
    pub layers: Vec<EncoderLayer<B>>,
    pub norm:   LayerNorm<B>,
}

impl<B: Backend> Encoder<B> {
    pub fn new(cfg: &TransformerConfig, device: &B::Device) -> Self {
        let layers = (0..cfg.n_layers)
            .map(|_| EncoderLayer::new(cfg, device))
            .collect();
        Self { layers, norm: layer_norm(cfg.d_model, device) }
    }
}

impl<B: Backend> Layer<B> for Encoder<B> {
    fn forward(&self, x: Tensor<B, 3>, mask: Option<&Mask<B>>) -> Result<Tensor<B, 3>> {
        let mut x = x;
        for layer in &self.layers {
            x = layer.forward(x, mask)?;
        }
        Ok(self.norm.forward(x))
    }
}
