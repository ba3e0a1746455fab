// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything that touches the filesystem after training:
//
//   export.rs              — model export and reload
//                            saved_model.json manifest, weights
//                            through Burn's file recorders, the
//                            sibling .zip archive
//
//   normalization_store.rs — feature statistics JSON, read from
//                            the export directory or straight out
//                            of the archive
//
//   history_store.rs       — per-epoch training history as JSON
//                            (float series only)

/// Model export directory, archive and reload
pub mod export;

/// Normalization statistics persistence
pub mod normalization_store;

/// Training history persistence
pub mod history_store;
