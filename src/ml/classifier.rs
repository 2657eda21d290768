// ============================================================
// Layer 5 — Output Classifier
// ============================================================
// d_model → target vocabulary logits. No softmax here: the loss
// (label smoothing or cross-entropy) and greedy decoding both
// consume raw logits.

use burn::{nn::Linear, prelude::*};

use crate::error::Result;
use crate::ml::init::glorot_linear;
use crate::ml::layer::Layer;
use crate::ml::mask::Mask;

#[derive(Module, Debug)]
pub struct OutputClassifier<B: Backend> {
    pub projection: Linear<B>,
}

impl<B: Backend> OutputClassifier<B> {
    pub fn new(d_model: usize, vocab_size: usize, device: &B::Device) -> Self {
        Self { projection: glorot_linear(d_model, vocab_size, device) }
    }

    pub fn logits(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        self.projection.forward(x)
    }
}

impl<B: Backend> Layer<B> for OutputClassifier<B> {
    fn forward(&self, x: Tensor<B, 3>, _mask: Option<&Mask<B>>) -> Result<Tensor<B, 3>> {
        Ok(self.logits(x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_logits_shape() {
        let device = Default::default();
        let head   = OutputClassifier::<TestBackend>::new(8, 11, &device);
        let out    = head.forward(Tensor::ones([2, 5, 8], &device), None).unwrap();
        assert_eq!(out.dims(), [2, 5, 11]);
    }
}
