// ============================================================
// Layer 6 — History Store
// ============================================================
// Writes the training history as JSON after training.
//
// Only float series are kept; integer and text series (such as
// the per-epoch batch count) are dropped. NaN values are written
// as null and read back as NaN.
//
// Example output:
//   {
//     "accuracy": [0.61, 0.74, 0.80],
//     "loss":     [0.93, 0.71, 0.58],
//     "lr":       [0.001, 0.001, 0.001]
//   }

use anyhow::{Context, Result};
use std::{collections::BTreeMap, fs, path::Path};

use crate::domain::history::{History, MetricSeries};

/// Save the float series of `history` to `path`.
pub fn save_history(history: &History, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();

    let floats: BTreeMap<&str, &[f64]> = history
        .iter()
        .filter_map(|(name, series)| match series {
            MetricSeries::Float(values) => Some((name.as_str(), values.as_slice())),
            _ => None,
        })
        .collect();

    let dropped = history.len() - floats.len();
    if dropped > 0 {
        tracing::debug!("Skipping {} non-float history series", dropped);
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create directory '{}'", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(&floats)?;
    fs::write(path, json)
        .with_context(|| format!("Cannot write history to '{}'", path.display()))?;

    tracing::info!("Saved {} history series to '{}'", floats.len(), path.display());
    Ok(())
}

/// Read a history file written by [`save_history`].
pub fn load_history(path: impl AsRef<Path>) -> Result<History> {
    let path = path.as_ref();
    let json = fs::read_to_string(path)
        .with_context(|| format!("Cannot read history from '{}'", path.display()))?;

    let raw: BTreeMap<String, Vec<Option<f64>>> = serde_json::from_str(&json)
        .with_context(|| format!("'{}' is not a history file", path.display()))?;

    let mut history = History::new();
    for (name, values) in raw {
        let values = values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect();
        history.insert(name, MetricSeries::Float(values));
    }
    Ok(history)
}
