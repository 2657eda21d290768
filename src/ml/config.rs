// ============================================================
// Layer 5 — Model Configuration
// ============================================================
// The hyper-parameter tree consumed at construction time:
//
//   {
//     d_model, n_layers, dropout, max_len,
//     src_vocab_size, tgt_vocab_size,
//     attention:    { n_head, d_k, d_v, dropout },
//     feed_forward: { d_ff, dropout }
//   }
//
// Invariant: d_model = n_head × d_k = n_head × d_v.
//
// NOTE: #[derive(Config)] already generates Clone and
// Serialize/Deserialize; do NOT add them again.

use burn::prelude::*;

use crate::error::Error;
use crate::ml::model::Transformer;

#[derive(Config, Debug)]
pub struct AttentionConfig {
    pub n_head: usize,
    pub d_k:    usize,
    pub d_v:    usize,
    #[config(default = 0.1)]
    pub dropout: f64,
}

#[derive(Config, Debug)]
pub struct FeedForwardConfig {
    pub d_ff: usize,
    #[config(default = 0.1)]
    pub dropout: f64,
}

#[derive(Config, Debug)]
pub struct TransformerConfig {
    pub d_model:        usize,
    /// Number of layers in each of the encoder and decoder stacks.
    pub n_layers:       usize,
    pub src_vocab_size: usize,
    pub tgt_vocab_size: usize,
    pub attention:      AttentionConfig,
    pub feed_forward:   FeedForwardConfig,
    /// Dropout on residual branches and on embeddings + positions.
    #[config(default = 0.1)]
    pub dropout: f64,
    /// Rows in the precomputed sinusoidal table.
    #[config(default = 5000)]
    pub max_len: usize,
}

impl AttentionConfig {
    /// Heads of size d_model / n_head, as in the base model.
    pub fn for_model(d_model: usize, n_head: usize) -> Self {
        let d_head = if n_head == 0 { 0 } else { d_model / n_head };
        Self::new(n_head, d_head, d_head)
    }
}

impl TransformerConfig {
    /// Check every shape invariant before any parameter is allocated.
    pub fn validate(&self) -> crate::error::Result<()> {
        let att = &self.attention;

        if self.d_model == 0 || self.n_layers == 0 {
            return Err(Error::Config(format!(
                "d_model ({}) and n_layers ({}) must be positive",
                self.d_model, self.n_layers
            )));
        }
        if att.n_head == 0 {
            return Err(Error::Config("attention.n_head must be positive".into()));
        }
        if self.d_model % att.n_head != 0 {
            return Err(Error::Config(format!(
                "d_model ({}) is not divisible by n_head ({})",
                self.d_model, att.n_head
            )));
        }
        if att.n_head * att.d_k != self.d_model || att.n_head * att.d_v != self.d_model {
            return Err(Error::Config(format!(
                "d_model ({}) must equal n_head × d_k ({} × {}) and n_head × d_v ({} × {})",
                self.d_model, att.n_head, att.d_k, att.n_head, att.d_v
            )));
        }
        if self.src_vocab_size == 0 || self.tgt_vocab_size == 0 {
            return Err(Error::Config("vocabulary sizes must be positive".into()));
        }
        if self.feed_forward.d_ff == 0 {
            return Err(Error::Config("feed_forward.d_ff must be positive".into()));
        }
        if self.max_len == 0 {
            return Err(Error::Config("max_len must be positive".into()));
        }
        for (name, p) in [
            ("dropout", self.dropout),
            ("attention.dropout", att.dropout),
            ("feed_forward.dropout", self.feed_forward.dropout),
        ] {
            if !(0.0..1.0).contains(&p) {
                return Err(Error::Config(format!("{name} must be in [0, 1), got {p}")));
            }
        }
        Ok(())
    }

    /// Validate, then build every sub-module on `device`.
    pub fn init<B: Backend>(&self, device: &B::Device) -> crate::error::Result<Transformer<B>> {
        self.validate()?;
        Ok(Transformer::new(self, device))
    }
}
