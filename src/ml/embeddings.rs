// ============================================================
// Layer 5 — Token Embeddings and Positional Encoding
// ============================================================
//   Embeddings:          ids [b, s] → lut(ids) · sqrt(d_model)
//   PositionalEncoding:  x   [b, s, d] → Dropout(x + PE[0..s])
//
//   PE[pos, 2i]   = sin(pos / 10000^(2i / d_model))
//   PE[pos, 2i+1] = cos(pos / 10000^(2i / d_model))
//
// The PE table is computed once on the host and stored as a
// plain tensor field: the optimiser never sees it and it is
// not written into checkpoints.

use burn::{
    nn::{Dropout, DropoutConfig, Embedding},
    prelude::*,
    tensor::TensorData,
};

use crate::error::{Error, Result};
use crate::ml::init::glorot_embedding;

#[derive(Module, Debug)]
pub struct Embeddings<B: Backend> {
    pub lut:        Embedding<B>,
    pub vocab_size: usize,
    pub d_model:    usize,
}

impl<B: Backend> Embeddings<B> {
    pub fn new(vocab_size: usize, d_model: usize, device: &B::Device) -> Self {
        Self {
            lut: glorot_embedding(vocab_size, d_model, device),
            vocab_size,
            d_model,
        }
    }

    /// ids: [b, s] → [b, s, d_model]
    pub fn forward(&self, ids: Tensor<B, 2, Int>) -> Result<Tensor<B, 3>> {
        self.check_range(&ids)?;
        Ok(self.lut.forward(ids).mul_scalar((self.d_model as f64).sqrt()))
    }

    fn check_range(&self, ids: &Tensor<B, 2, Int>) -> Result<()> {
        let [batch, seq] = ids.dims();
        if batch == 0 || seq == 0 {
            return Ok(());
        }
        let min: i64 = ids.clone().min().into_scalar().elem();
        let max: i64 = ids.clone().max().into_scalar().elem();

        let bad = if min < 0 { min } else { max };
        if min < 0 || max >= self.vocab_size as i64 {
            return Err(Error::TokenOutOfRange { id: bad, vocab_size: self.vocab_size });
        }
        Ok(())
    }
}

/// Value of the sinusoidal table at (`pos`, `dim`) for width `d_model`.
pub fn sinusoid(pos: usize, dim: usize, d_model: usize) -> f64 {
    let pair     = (dim - dim % 2) as f64;
    let exponent = pair / d_model as f64;
    let angle    = pos as f64 / 10_000f64.powf(exponent);
    if dim % 2 == 0 { angle.sin() } else { angle.cos() }
}

#[derive(Module, Debug)]
pub struct PositionalEncoding<B: Backend> {
    pub table:   Tensor<B, 2>,
    pub dropout: Dropout,
    pub max_len: usize,
}

impl<B: Backend> PositionalEncoding<B> {
    pub fn new(d_model: usize, max_len: usize, dropout: f64, device: &B::Device) -> Self {
        let values: Vec<f32> = (0..max_len)
            .flat_map(|pos| (0..d_model).map(move |dim| sinusoid(pos, dim, d_model) as f32))
            .collect();

        let table = Tensor::from_data(TensorData::new(values, [max_len, d_model]), device);
        Self {
            table,
            dropout: DropoutConfig::new(dropout).init(),
            max_len,
        }
    }

    /// x: [b, s, d] → [b, s, d]
    pub fn forward(&self, x: Tensor<B, 3>) -> Result<Tensor<B, 3>> {
        let [_, seq_len, d_model] = x.dims();
        if seq_len > self.max_len {
            return Err(Error::SequenceTooLong { len: seq_len, max_len: self.max_len });
        }
        let [_, table_width] = self.table.dims();
        if d_model != table_width {
            return Err(Error::shape("positional encoding", format!("last dimension {table_width}"), &x.dims()));
        }

        let pe = self.table.clone()
            .slice([0..seq_len, 0..d_model])
            .unsqueeze_dim::<3>(0);
        Ok(self.dropout.forward(x + pe))
    }
}
