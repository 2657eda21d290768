// ============================================================
// Layer 5 — Parameter Initialisation
// ============================================================
// Glorot / fan-average uniform initialisation for every
// rank-2 parameter:
//
//   W ~ U(-a, a),   a = sqrt(6 / (fan_in + fan_out))
//
// Biases keep burn's default initialiser.

use burn::{
    module::Param,
    nn::{Embedding, EmbeddingConfig, Linear, LinearConfig},
    prelude::*,
    tensor::Distribution,
};

/// Uniform Glorot matrix of shape `[rows, cols]`.
pub fn glorot_uniform<B: Backend>(rows: usize, cols: usize, device: &B::Device) -> Param<Tensor<B, 2>> {
    let bound = (6.0 / (rows + cols) as f64).sqrt();
    Param::from_tensor(Tensor::random(
        [rows, cols],
        Distribution::Uniform(-bound, bound),
        device,
    ))
}

/// `Linear` layer whose weight is Glorot-initialised.
pub fn glorot_linear<B: Backend>(d_input: usize, d_output: usize, device: &B::Device) -> Linear<B> {
    let mut linear = LinearConfig::new(d_input, d_output).init(device);
    linear.weight  = glorot_uniform(d_input, d_output, device);
    linear
}

/// Lookup table whose weight is Glorot-initialised.
pub fn glorot_embedding<B: Backend>(vocab_size: usize, d_model: usize, device: &B::Device) -> Embedding<B> {
    let mut table = EmbeddingConfig::new(vocab_size, d_model).init(device);
    table.weight  = glorot_uniform(vocab_size, d_model, device);
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_glorot_bound_respected() {
        let device = Default::default();
        let w      = glorot_uniform::<TestBackend>(30, 20, &device).val();
        let bound  = (6.0f32 / 50.0).sqrt();

        assert_eq!(w.dims(), [30, 20]);
        for v in w.into_data().iter::<f32>() {
            assert!(v.abs() <= bound + 1e-6, "{v} outside ±{bound}");
        }
    }

    #[test]
    fn test_linear_shapes() {
        let device = Default::default();
        let linear = glorot_linear::<TestBackend>(8, 3, &device);
        assert_eq!(linear.weight.val().dims(), [8, 3]);
        assert!(linear.bias.is_some());
    }
}
