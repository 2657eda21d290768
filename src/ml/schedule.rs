// ============================================================
// Layer 5 — Noam Learning-Rate Schedule
// ============================================================
//   rate(step) = factor · d_model^-0.5 · min(step^-0.5, step · warmup^-1.5)
//
// Linear warmup up to `warmup` steps, then decay ∝ step^-0.5.
// The wrapper owns the step counter: each call bumps it by one
// and hands the resulting rate to the wrapped optimizer for a
// single update of every parameter.

use burn::{
    module::AutodiffModule,
    optim::{GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

#[derive(Config, Debug)]
pub struct NoamConfig {
    pub d_model: usize,
    #[config(default = 1.0)]
    pub factor: f64,
    #[config(default = 400)]
    pub warmup: usize,
}

/// Rate after `step` optimizer updates. Zero at step 0.
pub fn noam_rate(step: usize, d_model: usize, factor: f64, warmup: usize) -> f64 {
    if step == 0 || d_model == 0 {
        return 0.0;
    }
    let step  = step as f64;
    let decay = step.powf(-0.5);
    let ramp  = if warmup == 0 { decay } else { step * (warmup as f64).powf(-1.5) };
    factor * (d_model as f64).powf(-0.5) * decay.min(ramp)
}

pub struct NoamOptimizer<O> {
    inner:   O,
    step:    usize,
    d_model: usize,
    factor:  f64,
    warmup:  usize,
}

impl<O> NoamOptimizer<O> {
    pub fn new(cfg: &NoamConfig, inner: O) -> Self {
        Self {
            inner,
            step:    0,
            d_model: cfg.d_model,
            factor:  cfg.factor,
            warmup:  cfg.warmup,
        }
    }

    /// Updates applied so far.
    pub fn steps(&self) -> usize {
        self.step
    }

    /// Rate used by the most recent update.
    pub fn rate(&self) -> f64 {
        noam_rate(self.step, self.d_model, self.factor, self.warmup)
    }

    pub fn step<B, M>(&mut self, module: M, grads: GradientsParams) -> M
    where
        B: AutodiffBackend,
        M: AutodiffModule<B>,
        O: Optimizer<M, B>,
    {
        self.step += 1;
        let rate = self.rate();
        self.inner.step(rate, module, grads)
    }
}
