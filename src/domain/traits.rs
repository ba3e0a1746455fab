// ============================================================
// Layer 3 — Core Traits
// ============================================================

use anyhow::Result;

use crate::domain::table::Table;

// ─── DatasetSource ────────────────────────────────────────────────────────────
/// Anything that can produce a labelled feature table.
///
/// Implementations:
///   - CsvLoader → one CSV file
///   - MultiSourceLoader → several CSV files concatenated
pub trait DatasetSource {
    fn load(&self) -> Result<Table>;
}

// ─── ModelInputs ──────────────────────────────────────────────────────────────
/// Row-addressable model inputs with a fixed per-sample shape.
///
/// FeatureMatrix yields samples of shape `[F]`, FeatureTensor
/// yields `[2, 2, depth]`. Samples are flat, row-major slices.
pub trait ModelInputs {
    /// Number of samples
    fn len(&self) -> usize;

    /// Shape of one sample, without the batch dimension
    fn sample_shape(&self) -> Vec<usize>;

    /// Flat values of sample `index`
    fn sample(&self, index: usize) -> &[f64];

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rank of a batch of these inputs (sample rank + 1).
    fn batch_rank(&self) -> usize {
        self.sample_shape().len() + 1
    }
}
