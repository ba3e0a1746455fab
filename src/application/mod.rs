// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers to accomplish one goal each
// (training a model, or predicting with an exported one).
//
// Rules for this layer:
//   - No ML math or model code here
//   - No argument parsing or printing (that's Layer 1)
//   - Only workflow coordination

/// The training workflow
pub mod train_use_case;

/// The prediction workflow
pub mod predict_use_case;
