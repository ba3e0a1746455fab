// ============================================================
// Layer 4 — Class Batcher
// ============================================================
// Implements Burn's Batcher trait: stacks `ClassSample`s into
// one input tensor and one label tensor.
//
//   samples of shape [F]       → inputs [batch, F]          (D = 2)
//   samples of shape [2, 2, k] → inputs [batch, 2, 2, k]    (D = 4)
//
// Every sample in a dataset has the same shape, so batching is
// a flatten followed by a reshape.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::ClassSample;

/// A batch ready for the model forward pass.
#[derive(Debug, Clone)]
pub struct ClassBatch<B: Backend, const D: usize> {
    /// Features — shape: [batch_size, ..sample_shape]
    pub inputs: Tensor<B, D>,

    /// Class indices — shape: [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

#[derive(Clone, Debug)]
pub struct ClassBatcher<B: Backend, const D: usize> {
    pub device:   B::Device,
    sample_shape: Vec<usize>,
}

impl<B: Backend, const D: usize> ClassBatcher<B, D> {
    /// `sample_shape` excludes the batch dimension, so it must
    /// have `D - 1` entries.
    pub fn new(device: B::Device, sample_shape: Vec<usize>) -> Self {
        debug_assert_eq!(sample_shape.len() + 1, D, "sample shape does not match tensor rank");
        Self { device, sample_shape }
    }

    fn batch_shape(&self, batch_size: usize) -> Vec<usize> {
        std::iter::once(batch_size)
            .chain(self.sample_shape.iter().copied())
            .collect()
    }
}

impl<B: Backend, const D: usize> Batcher<ClassSample, ClassBatch<B, D>> for ClassBatcher<B, D> {
    fn batch(&self, items: Vec<ClassSample>) -> ClassBatch<B, D> {
        let batch_size = items.len();

        let flat: Vec<f32> = items
            .iter()
            .flat_map(|s| s.features.iter().map(|&v| v as f32))
            .collect();

        let labels: Vec<i32> = items
            .iter()
            .map(|s| s.label as i32)
            .collect();

        let inputs = Tensor::<B, D>::from_floats(
            TensorData::new(flat, self.batch_shape(batch_size)),
            &self.device,
        );

        let targets = Tensor::<B, 1, Int>::from_ints(
            labels.as_slice(), &self.device
        );

        ClassBatch { inputs, targets }
    }
}
