// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs and traits describing the classification
// data: the loaded table, the class mapping, normalization
// statistics, feature matrices and tensors, one-hot targets,
// and the training history.
//
// Rules for this layer:
//   - NO Burn framework types
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits

/// The loaded CSV table: class column plus numeric features
pub mod table;

/// Ordered class names ↔ integer indices
pub mod class_mapping;

/// Per-column mean / stdev and their persisted form
pub mod normalization;

/// Feature matrices, reshaped feature tensors, one-hot targets
pub mod features;

/// Per-epoch training metrics
pub mod history;

/// Core abstractions that other layers implement
pub mod traits;
