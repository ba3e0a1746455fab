// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// From CSV files to burn-ready batches:
//
//   CSV file(s)
//       │
//       ▼
//   loader            → Table (Label dropped, Class ensured)
//       │
//       ▼
//   preprocessor      → normalized FeatureMatrix + OneHot
//       │
//       ▼
//   reshaper          → FeatureTensor [n, 2, 2, k] (optional)
//       │
//       ▼
//   dataset/splitter  → train / validation ClassDatasets
//       │
//       ▼
//   batcher           → ClassBatch tensors for the DataLoader

/// Reads CSV files into a Table
pub mod loader;

/// Label mapping, shuffling, normalization, per-class capping
pub mod preprocessor;

/// Pads and reshapes feature rows into 2×2×k blocks
pub mod reshaper;

/// Implements Burn's Dataset trait for class samples
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Shuffles and splits data into train/validation sets
pub mod splitter;
