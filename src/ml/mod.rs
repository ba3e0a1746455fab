// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All Burn model, training and inference code lives here.
//
//   model.rs      — the fixed classifier: optional reshape input,
//                   four Dense→BatchNorm→ReLU→Dropout blocks
//                   (128/64/32/16), Dense + softmax output
//
//   trainer.rs    — training loop: Adam, cross-entropy,
//                   per-epoch validation, History capture
//
//   inferencer.rs — batched class probabilities for any inputs
//
//   evaluator.rs  — accuracy, per-class precision / recall / F1,
//                   one-vs-rest AUC, row-normalized confusion
//
// Tabular inputs are small, so everything runs on the CPU
// NdArray backend; training wraps it in Autodiff.

/// Feed-forward classifier architecture
pub mod model;

/// Training loop with validation and history capture
pub mod trainer;

/// Batched inference
pub mod inferencer;

/// Classification metrics
pub mod evaluator;

/// Backend used for training (gradients enabled)
pub type TrainBackend = burn::backend::Autodiff<burn::backend::NdArray>;

/// Backend used for validation, evaluation and prediction
pub type InferBackend = burn::backend::NdArray;

/// The CPU device both backends run on
pub type Device = burn::backend::ndarray::NdArrayDevice;
