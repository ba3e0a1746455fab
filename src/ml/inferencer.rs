// ============================================================
// Layer 5 — Inferencer
// ============================================================
use anyhow::{anyhow, bail, ensure, Result};
use burn::{data::dataloader::batcher::Batcher, prelude::*};

use crate::data::{batcher::ClassBatcher, dataset::ClassSample};
use crate::domain::traits::ModelInputs;
use crate::ml::model::ClassifierModel;

/// Class probabilities for every sample of `inputs`, computed
/// `batch_size` samples at a time. Row `i` has one entry per class.
pub fn predict_proba<B: Backend, I: ModelInputs + ?Sized>(
    model:      &ClassifierModel<B>,
    inputs:     &I,
    batch_size: usize,
    device:     &B::Device,
) -> Result<Vec<Vec<f64>>> {
    ensure!(batch_size > 0, "batch size must be positive");
    ensure!(
        inputs.batch_rank() == model.input_rank(),
        "model expects rank-{} inputs, got samples of shape {:?}",
        model.input_rank(),
        inputs.sample_shape()
    );

    match inputs.batch_rank() {
        2 => predict_batches::<B, I, 2>(model, inputs, batch_size, device),
        4 => predict_batches::<B, I, 4>(model, inputs, batch_size, device),
        r => bail!("unsupported input rank {}", r),
    }
}

/// Most probable class of every row.
pub fn predict_classes(probabilities: &[Vec<f64>]) -> Vec<usize> {
    probabilities
        .iter()
        .map(|p| crate::domain::features::argmax(p))
        .collect()
}

fn predict_batches<B: Backend, I: ModelInputs + ?Sized, const D: usize>(
    model:      &ClassifierModel<B>,
    inputs:     &I,
    batch_size: usize,
    device:     &B::Device,
) -> Result<Vec<Vec<f64>>> {
    let batcher     = ClassBatcher::<B, D>::new(device.clone(), inputs.sample_shape());
    let num_classes = model.num_classes();
    let mut rows    = Vec::with_capacity(inputs.len());

    let indices: Vec<usize> = (0..inputs.len()).collect();
    for chunk in indices.chunks(batch_size) {
        // labels are unused at inference time
        let samples: Vec<ClassSample> = chunk
            .iter()
            .map(|&i| ClassSample { features: inputs.sample(i).to_vec(), label: 0 })
            .collect();

        let batch = batcher.batch(samples);
        let probs: Vec<f32> = model
            .forward(batch.inputs)
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| anyhow!("Cannot read model output: {:?}", e))?;

        rows.extend(
            probs
                .chunks(num_classes)
                .map(|row| row.iter().map(|&p| p as f64).collect::<Vec<f64>>()),
        );
    }

    tracing::debug!("Predicted {} samples in batches of {}", rows.len(), batch_size);
    Ok(rows)
}
