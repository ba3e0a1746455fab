// ============================================================
// Layer 4 — Preprocessor
// ============================================================
// Turns a loaded `Table` into model inputs and one-hot targets.
//
// Training (`process_training_data`):
//   1. Replace class names with mapping indices
//      (labels missing from the mapping become missing values)
//   2. Shuffle rows
//   3. Drop rows with any missing value
//   4. Compute mean / stdev of every column (label included at
//      index 0) and z-score every feature column
//   5. Optionally keep at most N rows per class, re-shuffled
//   6. Split into a feature matrix and one-hot targets
//
// Prediction (`process_prediction_data`):
//   Same label mapping and row dropping, optional shuffle, but
//   the statistics come from the training run instead of the
//   data at hand. Unlabelled tables give inputs without targets.

use anyhow::{ensure, Result};
use rand::{seq::SliceRandom, Rng};

use crate::domain::{
    class_mapping::ClassMapping,
    features::{FeatureMatrix, OneHot},
    normalization::{ColumnStats, Normalization},
    table::Table,
};

/// Output of the training preprocessor.
#[derive(Debug, Clone)]
pub struct TrainingData {
    pub inputs:  FeatureMatrix,
    pub targets: OneHot,
    /// Raw statistics, label column at index 0
    pub stats:   ColumnStats,
}

/// Output of the prediction preprocessor.
#[derive(Debug, Clone)]
pub struct PredictionData {
    pub inputs:  FeatureMatrix,
    /// `None` when the table carries no class labels at all
    pub targets: Option<OneHot>,
}

// ─── Training ─────────────────────────────────────────────────────────────────
/// Prepare a table for training.
///
/// `values_per_class = None` keeps every row; `Some(n)` keeps at
/// most `n` rows of each class.
pub fn process_training_data<R: Rng + ?Sized>(
    table:            &Table,
    mapping:          &ClassMapping,
    values_per_class: Option<usize>,
    rng:              &mut R,
) -> Result<TrainingData> {
    let mut mapped = map_labels(table, mapping);
    mapped.shuffle(rng);
    let mut rows = drop_incomplete(mapped, table.len());

    ensure!(!rows.is_empty(), "No complete rows left to train on");

    let columns: Vec<String> = table.columns().into_iter().map(str::to_string).collect();
    let stats = ColumnStats::compute(columns, &rows);

    for row in &mut rows {
        for c in 1..row.len() {
            row[c] = stats.z_score(c, row[c]);
        }
    }

    if let Some(cap) = values_per_class {
        rows = cap_per_class(rows, mapping.len(), cap);
        rows.shuffle(rng);
        tracing::info!("Capped to {} rows per class, {} rows kept", cap, rows.len());
    }

    let (inputs, targets) = split_inputs_targets(rows, table.num_features(), mapping.len())?;
    Ok(TrainingData { inputs, targets, stats })
}

// ─── Prediction ───────────────────────────────────────────────────────────────
/// Prepare a table for prediction with statistics persisted at
/// training time. Feature column `i` is normalized with entry `i`.
///
/// A table without any class label keeps every complete row and
/// yields no targets.
pub fn process_prediction_data<R: Rng + ?Sized>(
    table:         &Table,
    mapping:       &ClassMapping,
    normalization: &Normalization,
    shuffle:       bool,
    rng:           &mut R,
) -> Result<PredictionData> {
    normalization.check_columns(table.feature_names())?;

    let labelled   = table.is_labelled();
    let mut mapped = if labelled {
        map_labels(table, mapping)
    } else {
        // placeholder label 0, discarded with the targets below
        table.rows().map(|(_, features)| (Some(0), features.to_vec())).collect()
    };
    if shuffle {
        mapped.shuffle(rng);
    }
    let mut rows = drop_incomplete(mapped, table.len());

    for row in &mut rows {
        for c in 1..row.len() {
            row[c] = normalization.apply(c - 1, row[c]);
        }
    }

    if !labelled {
        let inputs = FeatureMatrix::from_rows(
            table.num_features(),
            rows.into_iter().map(|r| r[1..].to_vec()).collect(),
        )?;
        return Ok(PredictionData { inputs, targets: None });
    }

    let (inputs, targets) = split_inputs_targets(rows, table.num_features(), mapping.len())?;
    Ok(PredictionData { inputs, targets: Some(targets) })
}

// ─── Shared steps ─────────────────────────────────────────────────────────────
type MappedRow = (Option<usize>, Vec<Option<f64>>);

fn map_labels(table: &Table, mapping: &ClassMapping) -> Vec<MappedRow> {
    table
        .rows()
        .map(|(class, features)| (class.and_then(|c| mapping.index_of(c)), features.to_vec()))
        .collect()
}

/// Complete rows as `[label, f1, .., fN]`.
fn drop_incomplete(mapped: Vec<MappedRow>, total: usize) -> Vec<Vec<f64>> {
    let rows: Vec<Vec<f64>> = mapped
        .into_iter()
        .filter_map(|(label, features)| {
            let label = label? as f64;
            let features: Option<Vec<f64>> = features.into_iter().collect();
            features.map(|f| std::iter::once(label).chain(f).collect())
        })
        .collect();

    if rows.len() < total {
        tracing::warn!(
            "Dropped {} of {} rows with an unknown class or missing values",
            total - rows.len(),
            total
        );
    }
    rows
}

/// First `cap` rows of each class, class by class.
fn cap_per_class(rows: Vec<Vec<f64>>, num_classes: usize, cap: usize) -> Vec<Vec<f64>> {
    let mut capped = Vec::new();
    for class in 0..num_classes {
        capped.extend(
            rows.iter()
                .filter(|r| r[0] as usize == class)
                .take(cap)
                .cloned(),
        );
    }
    capped
}

fn split_inputs_targets(
    rows:         Vec<Vec<f64>>,
    num_features: usize,
    num_classes:  usize,
) -> Result<(FeatureMatrix, OneHot)> {
    let labels: Vec<usize> = rows.iter().map(|r| r[0] as usize).collect();
    let inputs = FeatureMatrix::from_rows(
        num_features,
        rows.into_iter().map(|r| r[1..].to_vec()).collect(),
    )?;
    let targets = OneHot::encode(&labels, num_classes)?;
    Ok((inputs, targets))
}
