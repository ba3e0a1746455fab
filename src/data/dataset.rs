// ============================================================
// Layer 4 — Class Dataset
// ============================================================
// Burn `Dataset` over normalized samples. Built from model inputs
// and one-hot targets, then split into training and validation
// sets before batching.

use anyhow::{ensure, Result};
use burn::data::dataset::Dataset;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::data::splitter::split_train_val;
use crate::domain::{features::OneHot, traits::ModelInputs};

/// One normalized sample: flat row-major features and its class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassSample {
    pub features: Vec<f64>,
    pub label:    usize,
}

/// Samples sharing one per-sample shape (`[F]` or `[2, 2, k]`).
#[derive(Debug, Clone)]
pub struct ClassDataset {
    samples:      Vec<ClassSample>,
    sample_shape: Vec<usize>,
}

impl ClassDataset {
    pub fn new(samples: Vec<ClassSample>, sample_shape: Vec<usize>) -> Self {
        Self { samples, sample_shape }
    }

    /// Pair every input sample with its target class.
    pub fn from_inputs<I: ModelInputs + ?Sized>(inputs: &I, targets: &OneHot) -> Result<Self> {
        ensure!(
            inputs.len() == targets.rows(),
            "{} input samples but {} targets",
            inputs.len(),
            targets.rows()
        );
        let samples = targets
            .labels()
            .into_iter()
            .enumerate()
            .map(|(i, label)| ClassSample {
                features: inputs.sample(i).to_vec(),
                label,
            })
            .collect();
        Ok(Self::new(samples, inputs.sample_shape()))
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// One-hot targets of width `num_classes`, in sample order.
    pub fn targets(&self, num_classes: usize) -> Result<OneHot> {
        let labels: Vec<usize> = self.samples.iter().map(|s| s.label).collect();
        OneHot::encode(&labels, num_classes)
    }

    /// Shuffle and split into `(train, validation)` datasets.
    pub fn split<R: Rng + ?Sized>(self, train_fraction: f64, rng: &mut R) -> (Self, Self) {
        let (train, valid) = split_train_val(self.samples, train_fraction, rng);
        (
            Self::new(train, self.sample_shape.clone()),
            Self::new(valid, self.sample_shape),
        )
    }
}

impl Dataset<ClassSample> for ClassDataset {
    fn get(&self, index: usize) -> Option<ClassSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

impl ModelInputs for ClassDataset {
    fn len(&self) -> usize {
        self.samples.len()
    }

    fn sample_shape(&self) -> Vec<usize> {
        self.sample_shape.clone()
    }

    fn sample(&self, index: usize) -> &[f64] {
        &self.samples[index].features
    }
}
