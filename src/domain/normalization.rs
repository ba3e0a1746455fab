// ============================================================
// Layer 3 — Normalization Statistics
// ============================================================
// `ColumnStats` is what the training preprocessor computes:
// one mean / stdev per column of the label-mapped table, the
// label column included at index 0 (a placeholder that keeps
// indices aligned with the table's columns).
//
// `Normalization` is the persisted form, written next to the
// exported model. The label placeholder is dropped, so entry `i`
// belongs to feature column `i`.
//
//   normalization.json
//   {
//     "mean":    [..],
//     "stdev":   [..],
//     "columns": [..]     ← feature names, optional on read
//   }
//
// A stdev over fewer than two rows is NaN, which JSON stores as
// `null`; `null` entries read back as NaN.

use anyhow::{ensure, Result};
use serde::{Deserialize, Deserializer, Serialize};

/// Raw per-column statistics of a training table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    /// Column names, label column first
    pub columns: Vec<String>,
    #[serde(deserialize_with = "nullable_floats")]
    pub mean:    Vec<f64>,
    #[serde(deserialize_with = "nullable_floats")]
    pub stdev:   Vec<f64>,
}

impl ColumnStats {
    /// Compute mean and sample stdev of every column of `rows`.
    /// Each row must have one value per entry of `columns`.
    pub fn compute(columns: Vec<String>, rows: &[Vec<f64>]) -> Self {
        let mut mean  = Vec::with_capacity(columns.len());
        let mut stdev = Vec::with_capacity(columns.len());

        for c in 0..columns.len() {
            let values: Vec<f64> = rows.iter().map(|r| r[c]).collect();
            let (m, s) = mean_stdev(&values);
            mean.push(m);
            stdev.push(s);
        }

        Self { columns, mean, stdev }
    }

    /// z-score of `value` for column `column` (label column = 0).
    pub fn z_score(&self, column: usize, value: f64) -> f64 {
        (value - self.mean[column]) / self.stdev[column]
    }

    /// The persisted form, without the label placeholder.
    pub fn to_normalization(&self) -> Normalization {
        Normalization {
            mean:    self.mean.iter().skip(1).copied().collect(),
            stdev:   self.stdev.iter().skip(1).copied().collect(),
            columns: Some(self.columns.iter().skip(1).cloned().collect()),
        }
    }
}

/// Feature normalization reloaded for prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Normalization {
    #[serde(deserialize_with = "nullable_floats")]
    pub mean:  Vec<f64>,
    #[serde(deserialize_with = "nullable_floats")]
    pub stdev: Vec<f64>,

    /// Feature names the statistics were computed on. Files
    /// written by older exports do not carry them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
}

fn nullable_floats<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
    let values: Vec<Option<f64>> = Vec::deserialize(deserializer)?;
    Ok(values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}

impl Normalization {
    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    /// z-score of `value` for feature column `column`.
    pub fn apply(&self, column: usize, value: f64) -> f64 {
        (value - self.mean[column]) / self.stdev[column]
    }

    /// Check that these statistics line up with `feature_names`.
    pub fn check_columns(&self, feature_names: &[String]) -> Result<()> {
        ensure!(
            self.mean.len() == self.stdev.len(),
            "normalization has {} means but {} stdevs",
            self.mean.len(),
            self.stdev.len()
        );
        ensure!(
            self.mean.len() == feature_names.len(),
            "normalization covers {} features, dataset has {}",
            self.mean.len(),
            feature_names.len()
        );
        if let Some(columns) = &self.columns {
            for (i, (expected, found)) in columns.iter().zip(feature_names).enumerate() {
                ensure!(
                    expected == found,
                    "feature column {} is '{}', normalization expects '{}'",
                    i,
                    found,
                    expected
                );
            }
        }
        Ok(())
    }
}

/// Mean and sample standard deviation (n - 1 denominator).
/// Fewer than two values give a NaN stdev.
pub fn mean_stdev(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    if values.is_empty() {
        return (f64::NAN, f64::NAN);
    }
    let mean = values.iter().sum::<f64>() / n;
    if values.len() < 2 {
        return (mean, f64::NAN);
    }
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (mean, var.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_stdev() {
        let (m, s) = mean_stdev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((m - 5.0).abs() < 1e-12);
        // population stdev is 2.0, sample stdev is sqrt(32/7)
        assert!((s - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_single_value_has_nan_stdev() {
        let (m, s) = mean_stdev(&[3.0]);
        assert_eq!(m, 3.0);
        assert!(s.is_nan());
    }

    #[test]
    fn test_to_normalization_drops_label_entry() {
        let stats = ColumnStats::compute(
            vec!["Class".into(), "a".into(), "b".into()],
            &[vec![0.0, 1.0, 10.0], vec![1.0, 3.0, 30.0]],
        );
        let norm = stats.to_normalization();
        assert_eq!(norm.mean, vec![2.0, 20.0]);
        assert_eq!(norm.stdev.len(), 2);
        assert_eq!(norm.columns, Some(vec!["a".to_string(), "b".to_string()]));
        assert!((norm.apply(0, 2.0)).abs() < 1e-12);
    }

    #[test]
    fn test_check_columns() {
        let norm = Normalization {
            mean:    vec![0.0, 0.0],
            stdev:   vec![1.0, 1.0],
            columns: Some(vec!["a".into(), "b".into()]),
        };
        assert!(norm.check_columns(&["a".into(), "b".into()]).is_ok());
        assert!(norm.check_columns(&["b".into(), "a".into()]).is_err());
        assert!(norm.check_columns(&["a".into()]).is_err());

        let unnamed = Normalization { columns: None, ..norm };
        assert!(unnamed.check_columns(&["x".into(), "y".into()]).is_ok());
    }

    #[test]
    fn test_reads_file_without_column_names() {
        let norm: Normalization =
            serde_json::from_str(r#"{"mean": [1.0], "stdev": [2.0]}"#).unwrap();
        assert_eq!(norm.columns, None);
        assert_eq!(norm.apply(0, 5.0), 2.0);
    }

    #[test]
    fn test_null_stdev_reads_as_nan() {
        let norm: Normalization =
            serde_json::from_str(r#"{"mean": [1.0, null], "stdev": [null, 2.0]}"#).unwrap();
        assert_eq!(norm.mean[0], 1.0);
        assert!(norm.mean[1].is_nan());
        assert!(norm.stdev[0].is_nan());
        assert_eq!(norm.stdev[1], 2.0);
    }
}
