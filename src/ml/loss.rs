// ============================================================
// Layer 5 — Training Objectives
// ============================================================
// Both losses take raw logits [b, t, V] and target ids [b, t]
// and average over NON-PAD target positions only.
//
// Label smoothing, per target position with true id y ≠ pad:
//
//   td[y]   = 1 - s
//   td[pad] = 0
//   td[v]   = s / (V - 2)      every other v
//
//   loss = Σ td · (ln td - log_softmax(logits)) / #non-pad
//
// Rows whose target is pad are all-zero and add nothing. With
// s = 0 the sum reduces to -log p(y), i.e. cross-entropy.

use burn::{prelude::*, tensor::activation::log_softmax};

use crate::error::{Error, Result};

/// Anything that turns logits and target ids into a scalar loss.
pub trait LossFunction {
    fn forward<B: Backend>(&self, logits: Tensor<B, 3>, targets: Tensor<B, 2, Int>) -> Result<Tensor<B, 1>>;
}

#[derive(Debug, Clone)]
pub struct LabelSmoothingLoss {
    pub vocab_size: usize,
    pub pad_id:     usize,
    pub smoothing:  f64,
}

#[derive(Debug, Clone)]
pub struct CrossEntropyLoss {
    pub vocab_size: usize,
    pub pad_id:     usize,
}

/// Training objective picked from the configuration.
#[derive(Debug, Clone)]
pub enum Objective {
    LabelSmoothing(LabelSmoothingLoss),
    CrossEntropy(CrossEntropyLoss),
}

impl LabelSmoothingLoss {
    pub fn new(vocab_size: usize, pad_id: usize, smoothing: f64) -> Result<Self> {
        if !(0.0..1.0).contains(&smoothing) {
            return Err(Error::Config(format!("smoothing must be in [0, 1), got {smoothing}")));
        }
        if pad_id >= vocab_size {
            return Err(Error::Config(format!("pad id {pad_id} outside vocabulary of size {vocab_size}")));
        }
        if smoothing > 0.0 && vocab_size <= 2 {
            return Err(Error::Config(format!(
                "label smoothing needs at least 3 vocabulary entries, got {vocab_size}"
            )));
        }
        Ok(Self { vocab_size, pad_id, smoothing })
    }

    /// Smoothed target distribution [b, t, V].
    pub fn target_distribution<B: Backend>(&self, targets: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        let [batch, seq] = targets.dims();
        let shape   = [batch, seq, self.vocab_size];
        let classes = class_ids::<B>(self.vocab_size, shape, &targets.device());

        let one_hot = one_hot(&classes, targets.clone(), shape).float();
        let pad_col = classes.equal_elem(self.pad_id as i64).float();

        let spread = if self.vocab_size > 2 {
            self.smoothing / (self.vocab_size - 2) as f64
        } else {
            0.0
        };

        let rest = one_hot.ones_like() - one_hot.clone() - pad_col;
        let dist = one_hot.mul_scalar(1.0 - self.smoothing) + rest.mul_scalar(spread);
        dist.mask_fill(pad_rows(targets, self.pad_id, shape), 0.0)
    }
}

impl LossFunction for LabelSmoothingLoss {
    fn forward<B: Backend>(&self, logits: Tensor<B, 3>, targets: Tensor<B, 2, Int>) -> Result<Tensor<B, 1>> {
        check_shapes(&logits, &targets, self.vocab_size)?;
        let count = non_pad_count(&targets, self.pad_id);

        let log_probs = log_softmax(logits, 2);
        let dist      = self.target_distribution(targets);
        // 0 · ln(max(0, ε)) = 0, so zero entries drop out of the sum
        let log_dist  = dist.clone().clamp_min(1e-12).log();

        let kl = (dist * (log_dist - log_probs)).sum();
        Ok(kl.div_scalar(count.max(1) as f64))
    }
}

impl CrossEntropyLoss {
    pub fn new(vocab_size: usize, pad_id: usize) -> Result<Self> {
        if pad_id >= vocab_size {
            return Err(Error::Config(format!("pad id {pad_id} outside vocabulary of size {vocab_size}")));
        }
        Ok(Self { vocab_size, pad_id })
    }
}

impl LossFunction for CrossEntropyLoss {
    fn forward<B: Backend>(&self, logits: Tensor<B, 3>, targets: Tensor<B, 2, Int>) -> Result<Tensor<B, 1>> {
        check_shapes(&logits, &targets, self.vocab_size)?;
        let [batch, seq] = targets.dims();
        let shape = [batch, seq, self.vocab_size];
        let count = non_pad_count(&targets, self.pad_id);

        let classes  = class_ids::<B>(self.vocab_size, shape, &targets.device());
        let selected = one_hot(&classes, targets.clone(), shape)
            .float()
            .mask_fill(pad_rows(targets, self.pad_id, shape), 0.0);

        let nll = (selected * log_softmax(logits, 2)).sum().neg();
        Ok(nll.div_scalar(count.max(1) as f64))
    }
}

impl Objective {
    /// Label smoothing when `smoothing` is set, plain cross-entropy otherwise.
    pub fn new(vocab_size: usize, pad_id: usize, smoothing: Option<f64>) -> Result<Self> {
        Ok(match smoothing {
            Some(s) => Objective::LabelSmoothing(LabelSmoothingLoss::new(vocab_size, pad_id, s)?),
            None    => Objective::CrossEntropy(CrossEntropyLoss::new(vocab_size, pad_id)?),
        })
    }
}

impl LossFunction for Objective {
    fn forward<B: Backend>(&self, logits: Tensor<B, 3>, targets: Tensor<B, 2, Int>) -> Result<Tensor<B, 1>> {
        match self {
            Objective::LabelSmoothing(loss) => loss.forward(logits, targets),
            Objective::CrossEntropy(loss)   => loss.forward(logits, targets),
        }
    }
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn class_ids<B: Backend>(vocab_size: usize, shape: [usize; 3], device: &B::Device) -> Tensor<B, 3, Int> {
    Tensor::<B, 1, Int>::arange(0..vocab_size as i64, device)
        .reshape([1, 1, vocab_size])
        .expand(shape)
}

fn one_hot<B: Backend>(classes: &Tensor<B, 3, Int>, targets: Tensor<B, 2, Int>, shape: [usize; 3]) -> Tensor<B, 3, Bool> {
    classes.clone().equal(targets.unsqueeze_dim::<3>(2).expand(shape))
}

fn pad_rows<B: Backend>(targets: Tensor<B, 2, Int>, pad_id: usize, shape: [usize; 3]) -> Tensor<B, 3, Bool> {
    targets.equal_elem(pad_id as i64).unsqueeze_dim::<3>(2).expand(shape)
}

fn non_pad_count<B: Backend>(targets: &Tensor<B, 2, Int>, pad_id: usize) -> usize {
    let count: i64 = targets.clone()
        .equal_elem(pad_id as i64)
        .bool_not()
        .int()
        .sum()
        .into_scalar()
        .elem();
    count.max(0) as usize
}

fn check_shapes<B: Backend>(logits: &Tensor<B, 3>, targets: &Tensor<B, 2, Int>, vocab_size: usize) -> Result<()> {
    let [lb, lt, lv] = logits.dims();
    let [tb, tt]     = targets.dims();
    if lb != tb || lt != tt || lv != vocab_size {
        return Err(Error::shape(
            "loss",
            format!("logits [{tb}, {tt}, {vocab_size}]"),
            &[lb, lt, lv],
        ));
    }
    Ok(())
}
