// ============================================================
// Layer 3 — Features and Targets
// ============================================================
// FeatureMatrix : samples × F, row-major
// FeatureTensor : samples × 2 × 2 × depth, row-major, where
//                 4 × depth is F rounded up to a multiple of 4
// OneHot        : samples × K, exactly one 1.0 per row

use anyhow::{ensure, Result};

use crate::domain::traits::ModelInputs;

// ─── FeatureMatrix ────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl FeatureMatrix {
    /// Build a matrix from row vectors of equal width `cols`.
    pub fn from_rows(cols: usize, rows: Vec<Vec<f64>>) -> Result<Self> {
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (i, row) in rows.iter().enumerate() {
            ensure!(row.len() == cols, "row {} has {} values, expected {}", i, row.len(), cols);
            data.extend_from_slice(row);
        }
        Ok(Self { rows: rows.len(), cols, data })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn row(&self, index: usize) -> &[f64] {
        &self.data[index * self.cols..(index + 1) * self.cols]
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    /// Values of one column, top to bottom.
    pub fn column(&self, col: usize) -> Vec<f64> {
        (0..self.rows).map(|r| self.get(r, col)).collect()
    }
}

impl ModelInputs for FeatureMatrix {
    fn len(&self) -> usize {
        self.rows
    }

    fn sample_shape(&self) -> Vec<usize> {
        vec![self.cols]
    }

    fn sample(&self, index: usize) -> &[f64] {
        self.row(index)
    }
}

// ─── FeatureTensor ────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTensor {
    samples: usize,
    depth:   usize,
    data:    Vec<f64>,
}

impl FeatureTensor {
    /// Wrap padded row-major data of `samples × 4·depth` values.
    pub fn new(samples: usize, depth: usize, data: Vec<f64>) -> Result<Self> {
        ensure!(
            data.len() == samples * 4 * depth,
            "tensor data has {} values, expected {}x2x2x{}",
            data.len(),
            samples,
            depth
        );
        Ok(Self { samples, depth, data })
    }

    /// `[samples, 2, 2, depth]`
    pub fn shape(&self) -> [usize; 4] {
        [self.samples, 2, 2, self.depth]
    }

    /// Padded feature count per sample.
    pub fn target_size(&self) -> usize {
        4 * self.depth
    }

    pub fn get(&self, sample: usize, i: usize, j: usize, k: usize) -> f64 {
        let per_sample = 4 * self.depth;
        self.data[sample * per_sample + i * 2 * self.depth + j * self.depth + k]
    }
}

impl ModelInputs for FeatureTensor {
    fn len(&self) -> usize {
        self.samples
    }

    fn sample_shape(&self) -> Vec<usize> {
        vec![2, 2, self.depth]
    }

    fn sample(&self, index: usize) -> &[f64] {
        let per_sample = 4 * self.depth;
        &self.data[index * per_sample..(index + 1) * per_sample]
    }
}

// ─── OneHot ───────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq)]
pub struct OneHot {
    width: usize,
    data:  Vec<f64>,
}

impl OneHot {
    /// One-hot encode class indices into rows of `width` columns.
    pub fn encode(labels: &[usize], width: usize) -> Result<Self> {
        let mut data = vec![0.0; labels.len() * width];
        for (row, &label) in labels.iter().enumerate() {
            ensure!(label < width, "class index {} out of range for {} classes", label, width);
            data[row * width + label] = 1.0;
        }
        Ok(Self { width, data })
    }

    pub fn rows(&self) -> usize {
        if self.width == 0 { 0 } else { self.data.len() / self.width }
    }

    /// Number of classes (K).
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn row(&self, index: usize) -> &[f64] {
        &self.data[index * self.width..(index + 1) * self.width]
    }

    /// Class index of every row.
    pub fn labels(&self) -> Vec<usize> {
        (0..self.rows()).map(|r| argmax(self.row(r))).collect()
    }
}

/// Index of the largest value, first one on ties.
pub fn argmax(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold(0usize, |best, (i, &v)| if v > values[best] { i } else { best })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_rows_and_columns() {
        let m = FeatureMatrix::from_rows(2, vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(m.rows(), 2);
        assert_eq!(m.row(1), &[3.0, 4.0]);
        assert_eq!(m.column(0), vec![1.0, 3.0]);
        assert_eq!(m.sample_shape(), vec![2]);
    }

    #[test]
    fn test_matrix_rejects_ragged_rows() {
        assert!(FeatureMatrix::from_rows(2, vec![vec![1.0]]).is_err());
    }

    #[test]
    fn test_tensor_indexing() {
        let t = FeatureTensor::new(1, 2, (0..8).map(f64::from).collect()).unwrap();
        assert_eq!(t.shape(), [1, 2, 2, 2]);
        assert_eq!(t.get(0, 0, 0, 1), 1.0);
        assert_eq!(t.get(0, 0, 1, 0), 2.0);
        assert_eq!(t.get(0, 1, 1, 1), 7.0);
    }

    #[test]
    fn test_one_hot_rows() {
        let oh = OneHot::encode(&[2, 0, 1], 3).unwrap();
        assert_eq!(oh.rows(), 3);
        assert_eq!(oh.row(0), &[0.0, 0.0, 1.0]);
        assert_eq!(oh.labels(), vec![2, 0, 1]);
        assert!(OneHot::encode(&[3], 3).is_err());
    }

    #[test]
    fn test_argmax_first_on_ties() {
        assert_eq!(argmax(&[0.2, 0.5, 0.5]), 1);
        assert_eq!(argmax(&[1.0]), 0);
    }
}
