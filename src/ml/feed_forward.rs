// ============================================================
// Layer 5 — Position-wise Feed-Forward
// ============================================================
//   FFN(x) = W_2 · Dropout(ReLU(W_1 · x + b_1)) + b_2
//
// d_model → d_ff → d_model, applied to each position on its
// own (no mixing across the sequence axis).

use burn::{
    nn::{Dropout, DropoutConfig, Linear},
    prelude::*,
    tensor::activation::relu,
};

use crate::error::Result;
use crate::ml::config::FeedForwardConfig;
use crate::ml::init::glorot_linear;
use crate::ml::layer::Layer;
use crate::ml::mask::Mask;

#[derive(Module, Debug)]
pub struct PositionwiseFeedForward<B: Backend> {
    pub expand:   Linear<B>,
    pub contract: Linear<B>,
    pub dropout:  Dropout,
}

impl<B: Backend> PositionwiseFeedForward<B> {
    pub fn new(d_model: usize, cfg: &FeedForwardConfig, device: &B::Device) -> Self {
        Self {
            expand:   glorot_linear(d_model, cfg.d_ff, device),
            contract: glorot_linear(cfg.d_ff, d_model, device),
            dropout:  DropoutConfig::new(cfg.dropout).init(),
        }
    }

    pub fn project(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let hidden = self.dropout.forward(relu(self.expand.forward(x)));
        self.contract.forward(hidden)
    }
}

impl<B: Backend> Layer<B> for PositionwiseFeedForward<B> {
    /// The mask is ignored: positions never interact here.
    fn forward(&self, x: Tensor<B, 3>, _mask: Option<&Mask<B>>) -> Result<Tensor<B, 3>> {
        Ok(self.project(x))
    }
}
