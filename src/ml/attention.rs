// ============================================================
// Layer 5 — Multi-Head Attention
// ============================================================
// Scaled dot-product attention split across n_head parallel
// subspaces:
//
//   Q = x_q W_q   K = x_k W_k   V = x_v W_v      (per head)
//   scores  = Q Kᵗ / sqrt(d_k)                   [b, h, q, k]
//   scores  = -1e9 where the mask is false
//   weights = Dropout(softmax(scores, key axis))
//   out     = concat_h(weights V) W_o            [b, q, d_model]
//
// Hidden positions are zeroed again after the softmax so a
// query whose keys are ALL hidden receives zero mass rather
// than a uniform distribution over them.

use burn::{
    nn::{Dropout, DropoutConfig, Linear},
    prelude::*,
    tensor::activation::softmax,
};

use crate::error::{Error, Result};
use crate::ml::config::AttentionConfig;
use crate::ml::init::glorot_linear;
use crate::ml::layer::Layer;
use crate::ml::mask::{expand_to_scores, Mask};

/// Score written into hidden positions before normalisation.
pub const MASKED_SCORE: f32 = -1.0e9;

#[derive(Module, Debug)]
pub struct MultiHeadAttention<B: Backend> {
    pub query:   Linear<B>,
    pub key:     Linear<B>,
    pub value:   Linear<B>,
    pub output:  Linear<B>,
    pub dropout: Dropout,
    pub n_head:  usize,
    pub d_k:     usize,
    pub d_v:     usize,
}

/// Context vectors plus the post-softmax weights `[b, h, q, k]`.
pub struct AttentionOutput<B: Backend> {
    pub context: Tensor<B, 3>,
    pub weights: Tensor<B, 4>,
}

impl<B: Backend> MultiHeadAttention<B> {
    pub fn new(d_model: usize, cfg: &AttentionConfig, device: &B::Device) -> Self {
        Self {
            query:   glorot_linear(d_model, cfg.n_head * cfg.d_k, device),
            key:     glorot_linear(d_model, cfg.n_head * cfg.d_k, device),
            value:   glorot_linear(d_model, cfg.n_head * cfg.d_v, device),
            output:  glorot_linear(cfg.n_head * cfg.d_v, d_model, device),
            dropout: DropoutConfig::new(cfg.dropout).init(),
            n_head:  cfg.n_head,
            d_k:     cfg.d_k,
            d_v:     cfg.d_v,
        }
    }

    /// query: [b, q, d_model], key/value: [b, k, d_model] → [b, q, d_model]
    pub fn forward(
        &self,
        query: Tensor<B, 3>,
        key:   Tensor<B, 3>,
        value: Tensor<B, 3>,
        mask:  Option<&Mask<B>>,
    ) -> Result<Tensor<B, 3>> {
        Ok(self.attend(query, key, value, mask)?.context)
    }

    pub fn attend(
        &self,
        query: Tensor<B, 3>,
        key:   Tensor<B, 3>,
        value: Tensor<B, 3>,
        mask:  Option<&Mask<B>>,
    ) -> Result<AttentionOutput<B>> {
        let [batch, seq_q, d_q] = query.dims();
        let [kb, seq_k, d_kin]  = key.dims();
        let [vb, seq_v, d_vin]  = value.dims();

        let d_model = self.n_head * self.d_v;
        if d_q != d_model || d_kin != d_model || d_vin != d_model {
            return Err(Error::shape(
                "attention input",
                format!("last dimension {d_model}"),
                &[d_q, d_kin, d_vin],
            ));
        }
        if kb != batch || vb != batch || seq_v != seq_k {
            return Err(Error::shape(
                "attention key/value",
                format!("[{batch}, {seq_k}, _] for both key and value"),
                &[kb, seq_k, vb, seq_v],
            ));
        }

        // [b, s, h·d] → [b, h, s, d]
        let q = self.query.forward(query)
            .reshape([batch, seq_q, self.n_head, self.d_k])
            .swap_dims(1, 2);
        let k = self.key.forward(key)
            .reshape([batch, seq_k, self.n_head, self.d_k])
            .swap_dims(1, 2);
        let v = self.value.forward(value)
            .reshape([batch, seq_k, self.n_head, self.d_v])
            .swap_dims(1, 2);

        let scores = q.matmul(k.swap_dims(2, 3))
            .div_scalar((self.d_k as f64).sqrt());

        let weights = match mask {
            Some(mask) => {
                let hidden = expand_to_scores(mask, [batch, self.n_head, seq_q, seq_k])?.bool_not();
                let scores = scores.mask_fill(hidden.clone(), MASKED_SCORE);
                softmax(scores, 3).mask_fill(hidden, 0.0)
            }
            None => softmax(scores, 3),
        };

        let context = self.dropout.forward(weights.clone())
            .matmul(v)
            .swap_dims(1, 2)
            .reshape([batch, seq_q, self.n_head * self.d_v]);

        Ok(AttentionOutput {
            context: self.output.forward(context),
            weights,
        })
    }
}

/// Self-attention form: query = key = value = x.
impl<B: Backend> Layer<B> for MultiHeadAttention<B> {
    fn forward(&self, x: Tensor<B, 3>, mask: Option<&Mask<B>>) -> Result<Tensor<B, 3>> {
        MultiHeadAttention::forward(self, x.clone(), x.clone(), x, mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::mask::{padding_mask, subsequent_mask};
    use approx::assert_abs_diff_eq;
    use burn::{backend::NdArray, tensor::Distribution};

    type TestBackend = NdArray;

    fn random_input(shape: [usize; 3]) -> Tensor<TestBackend, 3> {
        Tensor::random(shape, Distribution::Normal(0.0, 1.0), &Default::default())
    }

    #[test]
    fn test_base_model_output_shape() {
        let device = Default::default();
        let mha = MultiHeadAttention::<TestBackend>::new(512, &AttentionConfig::for_model(512, 8), &device);
        assert_eq!((mha.d_k, mha.d_v), (64, 64));

        let x    = random_input([2, 4, 512]);
        let mask = Tensor::<TestBackend, 3, Int>::ones([2, 1, 4], &device).equal_elem(1);
        let out  = mha.forward(x.clone(), x.clone(), x, Some(&mask)).unwrap();

        assert_eq!(out.dims(), [2, 4, 512]);
    }

    #[test]
    fn test_weights_normalised_and_zero_on_hidden_keys() {
        let device = Default::default();
        let mha = MultiHeadAttention::<TestBackend>::new(16, &AttentionConfig::for_model(16, 4), &device);

        // row 0 has one padded key, row 1 has two
        let ids  = Tensor::<TestBackend, 1, Int>::from_ints([3, 4, 5, 0, 6, 7, 0, 0], &device)
            .reshape([2, 4]);
        let mask = padding_mask(ids, 0);

        let q   = random_input([2, 3, 16]);
        let kv  = random_input([2, 4, 16]);
        let out = mha.attend(q, kv.clone(), kv, Some(&mask)).unwrap();

        assert_eq!(out.context.dims(), [2, 3, 16]);
        assert_eq!(out.weights.dims(), [2, 4, 3, 4]);

        let w = out.weights.into_data().iter::<f32>().collect::<Vec<_>>();
        let hidden = |b: usize, k: usize| (b == 0 && k == 3) || (b == 1 && k >= 2);

        for b in 0..2 {
            for h in 0..4 {
                for q in 0..3 {
                    let row = &w[((b * 4 + h) * 3 + q) * 4..][..4];
                    assert_abs_diff_eq!(row.iter().sum::<f32>(), 1.0, epsilon = 1e-5);
                    for (k, p) in row.iter().enumerate() {
                        if hidden(b, k) {
                            assert_eq!(*p, 0.0, "batch {b} head {h} query {q} key {k}");
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_causal_mask_hides_future() {
        let device = Default::default();
        let mha  = MultiHeadAttention::<TestBackend>::new(8, &AttentionConfig::for_model(8, 2), &device);
        let x    = random_input([1, 5, 8]);
        let mask = subsequent_mask::<TestBackend>(5, &device);

        let w = mha.attend(x.clone(), x.clone(), x, Some(&mask)).unwrap()
            .weights.into_data().iter::<f32>().collect::<Vec<_>>();

        for h in 0..2 {
            for q in 0..5 {
                for k in (q + 1)..5 {
                    assert_eq!(w[(h * 5 + q) * 5 + k], 0.0);
                }
            }
        }
    }

    #[test]
    fn test_fully_hidden_row_gets_no_mass() {
        let device = Default::default();
        let mha  = MultiHeadAttention::<TestBackend>::new(8, &AttentionConfig::for_model(8, 2), &device);
        let mask = Tensor::<TestBackend, 3, Int>::zeros([1, 1, 3], &device).equal_elem(1);

        let x = random_input([1, 2, 8]);
        let y = random_input([1, 3, 8]);
        let w = mha.attend(x, y.clone(), y, Some(&mask)).unwrap().weights;
        let total: f32 = w.sum().into_scalar().elem();
        assert_eq!(total, 0.0);
    }

    #[test]
    fn test_mismatched_mask_is_shape_error() {
        let device = Default::default();
        let mha  = MultiHeadAttention::<TestBackend>::new(8, &AttentionConfig::for_model(8, 2), &device);
        let x    = random_input([2, 4, 8]);
        let mask = Tensor::<TestBackend, 3, Int>::ones([2, 1, 5], &device).equal_elem(1);

        let err = mha.forward(x.clone(), x.clone(), x, Some(&mask)).unwrap_err();
        assert!(matches!(err, Error::Shape { .. }));
    }

    #[test]
    fn test_layer_trait_is_self_attention() {
        let device = Default::default();
        let mha = MultiHeadAttention::<TestBackend>::new(8, &AttentionConfig::for_model(8, 2), &device);
        let x   = random_input([1, 3, 8]);
        let a   = Layer::forward(&mha, x.clone(), None).unwrap();
        let b   = mha.forward(x.clone(), x.clone(), x, None).unwrap();
        let diff: f32 = (a - b).abs().sum().into_scalar().elem();
        assert_eq!(diff, 0.0);
    }
}
