// ============================================================
// Layer 4 — Train/Validation Splitter
// ============================================================
// Shuffles with a seeded generator, then cuts at
// round(len · train_fraction). The same seed always gives the
// same split, so a run can be reproduced from params.json.

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Shuffle `samples` with `seed` and split into (train, validation).
pub fn split_train_val<T>(mut samples: Vec<T>, train_fraction: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let total    = samples.len();
    let split_at = ((total as f64) * train_fraction.clamp(0.0, 1.0)).round() as usize;
    let split_at = split_at.min(total);

    let val = samples.split_off(split_at);

    tracing::debug!(
        "Dataset split: {} training, {} validation",
        samples.len(),
        val.len(),
    );

    (samples, val)
}
