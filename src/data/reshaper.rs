// ============================================================
// Layer 4 — Feature Reshaper
// ============================================================
// Pads each feature row to a multiple of 4 and views it as a
// 2 × 2 × depth block, the input shape of a classifier built
// with a reshape input layer.
//
//   F = 6  →  target = 8, depth = 2
//   [a b c d e f] → [a b c d e f 0 0] → [[[a b] [c d]] [[e f] [0 0]]]

use anyhow::Result;

use crate::domain::features::{FeatureMatrix, FeatureTensor};

/// Smallest multiple of 4 that holds `num_features` values.
pub fn target_size(num_features: usize) -> usize {
    num_features.div_ceil(4) * 4
}

/// Zero-pad `inputs` to `target_size` columns and reshape to
/// `(samples, 2, 2, target_size / 4)`.
pub fn resize_inputs(inputs: &FeatureMatrix) -> Result<FeatureTensor> {
    let target = target_size(inputs.cols());
    let mut data = Vec::with_capacity(inputs.rows() * target);

    for r in 0..inputs.rows() {
        data.extend_from_slice(inputs.row(r));
        data.resize(data.len() + target - inputs.cols(), 0.0);
    }

    FeatureTensor::new(inputs.rows(), target / 4, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::traits::ModelInputs;

    #[test]
    fn test_target_size_is_multiple_of_four() {
        for f in 0..40 {
            let t = target_size(f);
            assert_eq!(t % 4, 0);
            assert!(t >= f);
            assert!(t < f + 4);
        }
    }

    #[test]
    fn test_values_kept_and_padding_is_zero() {
        let rows = vec![
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            vec![7.0, 8.0, 9.0, 10.0, 11.0, 12.0],
        ];
        let m = FeatureMatrix::from_rows(6, rows.clone()).unwrap();
        let t = resize_inputs(&m).unwrap();

        assert_eq!(t.shape(), [2, 2, 2, 2]);
        for (s, row) in rows.iter().enumerate() {
            let sample = t.sample(s);
            assert_eq!(&sample[..6], row.as_slice());
            assert_eq!(&sample[6..], &[0.0, 0.0]);
        }
        // row-major: feature 4 sits at [1][0][0]
        assert_eq!(t.get(0, 1, 0, 0), 5.0);
        assert_eq!(t.get(1, 1, 1, 1), 0.0);
    }

    #[test]
    fn test_exact_multiple_needs_no_padding() {
        let m = FeatureMatrix::from_rows(4, vec![vec![1.0, 2.0, 3.0, 4.0]]).unwrap();
        let t = resize_inputs(&m).unwrap();
        assert_eq!(t.shape(), [1, 2, 2, 1]);
        assert_eq!(t.sample(0), &[1.0, 2.0, 3.0, 4.0]);
    }
}
