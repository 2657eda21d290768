// ============================================================
// Layer 5 — Layer Contract and Residual Connection
// ============================================================
// Every single-stream building block exposes the same call:
//
//   forward(x: [batch, seq, d_model], mask?) -> [batch, seq, d']
//
// Stacks are plain Vec<_> of layers iterated in order.
//
// SublayerConnection wraps any sublayer f with a pre-norm
// residual branch:
//
//   x + Dropout(f(LayerNorm(x)))

use burn::{
    nn::{Dropout, DropoutConfig, LayerNorm, LayerNormConfig},
    prelude::*,
};

use crate::error::Result;
use crate::ml::mask::Mask;

pub const LAYER_NORM_EPS: f64 = 1e-6;

pub trait Layer<B: Backend> {
    fn forward(&self, x: Tensor<B, 3>, mask: Option<&Mask<B>>) -> Result<Tensor<B, 3>>;
}

#[derive(Module, Debug)]
pub struct SublayerConnection<B: Backend> {
    pub norm:    LayerNorm<B>,
    pub dropout: Dropout,
}

impl<B: Backend> SublayerConnection<B> {
    pub fn new(d_model: usize, dropout: f64, device: &B::Device) -> Self {
        Self {
            norm:    layer_norm(d_model, device),
            dropout: DropoutConfig::new(dropout).init(),
        }
    }

    pub fn forward<F>(&self, x: Tensor<B, 3>, sublayer: F) -> Result<Tensor<B, 3>>
    where
        F: FnOnce(Tensor<B, 3>) -> Result<Tensor<B, 3>>,
    {
        let branch = sublayer(self.norm.forward(x.clone()))?;
        Ok(x + self.dropout.forward(branch))
    }
}

pub fn layer_norm<B: Backend>(d_model: usize, device: &B::Device) -> LayerNorm<B> {
    LayerNormConfig::new(d_model)
        .with_epsilon(LAYER_NORM_EPS)
        .init(device)
}
