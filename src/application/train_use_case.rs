// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load and concatenate CSV sources   (Layer 4 - data)
//   Step 2: Map labels, shuffle, normalize     (Layer 4 - data)
//   Step 3: Reshape to [2, 2, k] if enabled    (Layer 4 - data)
//   Step 4: Split train/validation             (Layer 4 - data)
//   Step 5: Run training loop                  (Layer 5 - ml)
//   Step 6: Evaluate on the validation set     (Layer 5 - ml)
//   Step 7: Save history and export the model  (Layer 6 - infra)

use anyhow::{ensure, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::data::{
    dataset::ClassDataset,
    loader::{DataSourceSpec, MultiSourceLoader},
    preprocessor::process_training_data,
    reshaper::resize_inputs,
};
use crate::domain::{
    class_mapping::ClassMapping,
    features::FeatureTensor,
    history::History,
    traits::{DatasetSource, ModelInputs},
};
use crate::infra::{export::save_model, history_store::save_history};
use crate::ml::{
    evaluator::{evaluate, Evaluation},
    model::ClassifierConfig,
    trainer::run_training,
    Device,
};

// ─── Training Configuration ──────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    /// CSV files, each optionally tagged with the class of all its rows
    pub sources:             Vec<DataSourceSpec>,
    /// Class names in index order
    pub classes:             Vec<String>,
    pub export_dir:          PathBuf,
    pub history_path:        Option<PathBuf>,
    /// Keep at most this many rows per class; `None` keeps all
    pub values_per_class:    Option<usize>,
    pub exclude_outliers:    bool,
    pub epochs:              usize,
    pub batch_size:          usize,
    pub lr:                  f64,
    pub dropout:             f64,
    /// Feed the model [2, 2, k] tensors instead of flat rows
    pub reshape:             bool,
    /// Share of the samples held out for validation
    pub validation_fraction: f64,
    /// Fixed seed for shuffling; entropy when unset
    pub seed:                Option<u64>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            sources:             Vec::new(),
            classes:             Vec::new(),
            export_dir:          PathBuf::from("model"),
            history_path:        None,
            values_per_class:    None,
            exclude_outliers:    false,
            epochs:              50,
            batch_size:          32,
            lr:                  1e-3,
            dropout:             0.5,
            reshape:             true,
            validation_fraction: 0.2,
            seed:                None,
        }
    }
}

/// What a finished training run produced.
#[derive(Debug, Clone)]
pub struct TrainReport {
    pub history:       History,
    /// `None` when no samples were held out
    pub evaluation:    Option<Evaluation>,
    pub train_samples: usize,
    pub valid_samples: usize,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<TrainReport> {
        let cfg = &self.config;
        ensure!(!cfg.classes.is_empty(), "At least one class name is required");
        ensure!(!cfg.sources.is_empty(), "At least one input CSV is required");
        ensure!(
            (0.0..1.0).contains(&cfg.validation_fraction),
            "validation fraction must be in [0, 1), got {}",
            cfg.validation_fraction
        );

        let mut rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None       => StdRng::from_entropy(),
        };

        // ── Step 1: Load sources ──────────────────────────────────────────────
        let loader = MultiSourceLoader::new(cfg.sources.clone(), cfg.exclude_outliers);
        let table  = loader.load()?;
        tracing::info!(
            "Loaded {} rows with {} features from {} file(s)",
            table.len(),
            table.num_features(),
            cfg.sources.len()
        );

        // ── Step 2: Preprocess ────────────────────────────────────────────────
        let mapping = ClassMapping::new(&cfg.classes);
        let data    = process_training_data(&table, &mapping, cfg.values_per_class, &mut rng)?;
        tracing::info!("{} samples ready for training", data.inputs.rows());

        // ── Step 3: Reshape ───────────────────────────────────────────────────
        let reshaped: FeatureTensor;
        let inputs: &dyn ModelInputs = if cfg.reshape {
            reshaped = resize_inputs(&data.inputs)?;
            &reshaped
        } else {
            &data.inputs
        };
        let input_size = inputs.sample_shape().iter().product::<usize>();

        // ── Step 4: Split ─────────────────────────────────────────────────────
        let dataset        = ClassDataset::from_inputs(inputs, &data.targets)?;
        let (train, valid) = dataset.split(1.0 - cfg.validation_fraction, &mut rng);
        let train_samples  = train.sample_count();
        let valid_samples  = valid.sample_count();
        tracing::info!("Split: {} train, {} validation", train_samples, valid_samples);

        // ── Step 5: Train ─────────────────────────────────────────────────────
        let model_cfg = ClassifierConfig::new(input_size, mapping.len())
            .with_reshape_input(cfg.reshape)
            .with_dropout(cfg.dropout);
        let loader_seed: u64 = rng.gen();

        let valid_eval     = valid.clone();
        let (model, history) = run_training(&model_cfg, cfg, loader_seed, train, valid)?;

        // ── Step 6: Evaluate ──────────────────────────────────────────────────
        let evaluation = if valid_samples > 0 {
            let targets    = valid_eval.targets(mapping.len())?;
            let evaluation = evaluate(&model, &valid_eval, &targets, &Device::default())?;
            tracing::info!("Validation results:\n{}", evaluation);
            Some(evaluation)
        } else {
            tracing::warn!("No validation samples, skipping evaluation");
            None
        };

        // ── Step 7: Persist ───────────────────────────────────────────────────
        if let Some(path) = &cfg.history_path {
            save_history(&history, path)?;
        }
        save_model(&model, &model_cfg, &data.stats, &mapping, &cfg.export_dir)?;

        Ok(TrainReport { history, evaluation, train_samples, valid_samples })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::infra::export::{archive_path, load_manifest};
    use crate::infra::history_store::load_history;
    use std::{fs, path::Path};

    /// Two classes split on the first two features, 40 rows each.
    pub(crate) fn write_csv(dir: &Path, name: &str, with_class: bool) -> PathBuf {
        let path = dir.join(name);
        let mut text = String::from(if with_class { "Label,Class,area,perimeter,intensity\n" } else { "Label,area,perimeter,intensity\n" });
        for i in 0..80 {
            let (class, base) = if i % 2 == 0 { ("round", 1.0) } else { ("elongated", 5.0) };
            let jitter = (i % 7) as f64 * 0.1;
            if with_class {
                text.push_str(&format!("cell{i},{class},{},{},{}\n", base + jitter, base * 2.0 - jitter, 0.3 + jitter));
            } else {
                text.push_str(&format!("cell{i},{},{},{}\n", base + jitter, base * 2.0 - jitter, 0.3 + jitter));
            }
        }
        fs::write(&path, text).unwrap();
        path
    }

    pub(crate) fn config(dir: &Path) -> TrainConfig {
        let csv = write_csv(dir, "cells.csv", true);
        TrainConfig {
            sources:      vec![DataSourceSpec { path: csv, class: None }],
            classes:      vec!["round".into(), "elongated".into()],
            export_dir:   dir.join("export"),
            history_path: Some(dir.join("history.json")),
            epochs:       3,
            batch_size:   16,
            seed:         Some(42),
            ..TrainConfig::default()
        }
    }

    #[test]
    fn test_train_exports_model_and_history() {
        let dir    = tempfile::tempdir().unwrap();
        let cfg    = config(dir.path());
        let report = TrainUseCase::new(cfg.clone()).execute().unwrap();

        assert_eq!(report.train_samples + report.valid_samples, 80);
        assert_eq!(report.valid_samples, 16);
        let evaluation = report.evaluation.unwrap();
        assert_eq!(evaluation.num_classes(), 2);

        let manifest = load_manifest(&cfg.export_dir).unwrap();
        // 3 features padded to 4
        assert_eq!(manifest.model.input_size, 4);
        assert!(manifest.model.reshape_input);
        assert_eq!(manifest.classes.names(), &["round".to_string(), "elongated".to_string()]);
        assert!(archive_path(&cfg.export_dir).is_file());

        let history = load_history(dir.path().join("history.json")).unwrap();
        assert_eq!(history.floats("loss").unwrap().len(), 3);
        assert!(history.get("batches").is_none());
    }

    #[test]
    fn test_flat_inputs_and_class_per_file() {
        let dir = tempfile::tempdir().unwrap();
        let a   = write_csv(dir.path(), "a.csv", false);
        let b   = write_csv(dir.path(), "b.csv", false);

        let cfg = TrainConfig {
            sources:             vec![
                DataSourceSpec { path: a, class: Some("first".into()) },
                DataSourceSpec { path: b, class: Some("second".into()) },
            ],
            classes:             vec!["first".into(), "second".into()],
            export_dir:          dir.path().join("flat"),
            reshape:             false,
            values_per_class:    Some(10),
            validation_fraction: 0.0,
            epochs:              1,
            seed:                Some(1),
            ..TrainConfig::default()
        };
        let report = TrainUseCase::new(cfg.clone()).execute().unwrap();

        assert_eq!(report.train_samples, 20);
        assert!(report.evaluation.is_none());
        assert_eq!(load_manifest(&cfg.export_dir).unwrap().model.input_size, 3);
    }

    #[test]
    fn test_missing_classes_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = TrainConfig { classes: Vec::new(), ..config(dir.path()) };
        assert!(TrainUseCase::new(cfg).execute().is_err());
    }
}
