// ============================================================
// Layer 3 — Table Domain Type
// ============================================================
// The in-memory form of a loaded CSV file after the unused
// `Label` column is gone: one class label per row and a fixed,
// ordered set of numeric feature columns.
//
// Missing cells are `None`. The class column is always reported
// as the first column, the features follow in file order.

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

/// Name of the class-label column.
pub const CLASS_COLUMN: &str = "Class";

/// Name of the always-present column the loader discards.
pub const LABEL_COLUMN: &str = "Label";

/// A labelled table of numeric features.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Feature column names, in file order
    feature_names: Vec<String>,

    /// Raw class label per row (`None` when the cell was empty)
    classes: Vec<Option<String>>,

    /// Feature cells per row, aligned with `feature_names`
    rows: Vec<Vec<Option<f64>>>,
}

impl Table {
    /// Create an empty table with the given feature columns.
    pub fn new(feature_names: Vec<String>) -> Self {
        Self {
            feature_names,
            classes: Vec::new(),
            rows:    Vec::new(),
        }
    }

    /// Append one row. The feature count must match the header.
    pub fn push_row(&mut self, class: Option<String>, features: Vec<Option<f64>>) -> Result<()> {
        ensure!(
            features.len() == self.feature_names.len(),
            "row has {} features, table has {} feature columns",
            features.len(),
            self.feature_names.len()
        );
        self.classes.push(class);
        self.rows.push(features);
        Ok(())
    }

    /// All column names, class column first.
    pub fn columns(&self) -> Vec<&str> {
        std::iter::once(CLASS_COLUMN)
            .chain(self.feature_names.iter().map(String::as_str))
            .collect()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn num_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether any row carries a class label.
    pub fn is_labelled(&self) -> bool {
        self.classes.iter().any(Option::is_some)
    }

    /// Class label of row `index`.
    pub fn class_of(&self, index: usize) -> Option<&str> {
        self.classes.get(index).and_then(|c| c.as_deref())
    }

    /// Iterate `(class, features)` pairs in row order.
    pub fn rows(&self) -> impl Iterator<Item = (Option<&str>, &[Option<f64>])> + '_ {
        self.classes
            .iter()
            .zip(&self.rows)
            .map(|(class, row)| (class.as_deref(), row.as_slice()))
    }

    /// Values of one feature column, missing cells included.
    pub fn feature_column(&self, column: usize) -> impl Iterator<Item = Option<f64>> + '_ {
        self.rows.iter().map(move |row| row[column])
    }

    /// Keep only the rows for which `keep` returns true.
    pub fn retain_rows<F>(&mut self, mut keep: F)
    where
        F: FnMut(Option<&str>, &[Option<f64>]) -> bool,
    {
        let mut classes = Vec::with_capacity(self.classes.len());
        let mut rows    = Vec::with_capacity(self.rows.len());

        for (class, row) in self.classes.drain(..).zip(self.rows.drain(..)) {
            if keep(class.as_deref(), &row) {
                classes.push(class);
                rows.push(row);
            }
        }

        self.classes = classes;
        self.rows    = rows;
    }

    /// Set every row's class to the same constant label.
    pub fn set_constant_class(&mut self, class: &str) {
        for c in &mut self.classes {
            *c = Some(class.to_string());
        }
    }

    /// Append all rows of `other`. Both tables must carry the
    /// same feature columns in the same order.
    pub fn append(&mut self, other: Table) -> Result<()> {
        ensure!(
            self.feature_names == other.feature_names,
            "feature columns differ: {:?} vs {:?}",
            self.feature_names,
            other.feature_names
        );
        self.classes.extend(other.classes);
        self.rows.extend(other.rows);
        Ok(())
    }
}
