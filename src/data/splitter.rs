// ============================================================
// Layer 4 — Train/Validation Splitter
// ============================================================
// Shuffles samples and splits them into a training set and a
// held-out validation set (default 80% / 20%). The validation
// set feeds the per-epoch `val_*` metrics and the final
// evaluation report.
//
// The caller supplies the RNG so a configured seed makes the
// split reproducible.

use rand::{seq::SliceRandom, Rng};

/// Shuffle `samples` and split into `(train, validation)`.
///
/// `train_fraction` is the share kept for training, e.g. 0.8.
pub fn split_train_val<T, R: Rng + ?Sized>(
    mut samples:    Vec<T>,
    train_fraction: f64,
    rng:            &mut R,
) -> (Vec<T>, Vec<T>) {
    samples.shuffle(rng);

    let total    = samples.len();
    let split_at = ((total as f64) * train_fraction).round() as usize;
    let split_at = split_at.min(total);

    // samples keeps [0..split_at], val takes the rest
    let val = samples.split_off(split_at);

    tracing::debug!(
        "Dataset split: {} training, {} validation",
        samples.len(),
        val.len(),
    );

    (samples, val)
}
