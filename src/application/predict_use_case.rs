// ============================================================
// Layer 2 — PredictUseCase
// ============================================================
// Runs an exported model over a CSV, labelled or not:
//
//   Step 1: Load the exported model and its normalization  (Layer 6)
//   Step 2: Load the CSV                                   (Layer 4)
//   Step 3: Map labels and normalize with persisted stats  (Layer 4)
//   Step 4: Reshape when the model expects [2, 2, k]       (Layer 4)
//   Step 5: Predict, evaluate when labels are present      (Layer 5)
//   Step 6: Write probabilities CSV / report JSON          (here)
//
// The class mapping always comes from the export manifest; the
// normalization statistics are never recomputed.

use anyhow::{ensure, Context, Result};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}};

use crate::data::{
    loader::{CsvLoader, DataSourceSpec},
    preprocessor::process_prediction_data,
    reshaper::resize_inputs,
};
use crate::domain::{
    class_mapping::ClassMapping,
    features::{FeatureTensor, OneHot},
    traits::{DatasetSource, ModelInputs},
};
use crate::infra::{
    export::load_model,
    normalization_store::{load_normalization, NORMALIZATION_FILE},
};
use crate::ml::{
    evaluator::Evaluation,
    inferencer::{predict_classes, predict_proba},
    Device, InferBackend,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictConfig {
    pub source:             DataSourceSpec,
    /// Export directory written by training
    pub model_dir:          PathBuf,
    pub shuffle:            bool,
    pub exclude_outliers:   bool,
    pub probabilities_path: Option<PathBuf>,
    pub report_path:        Option<PathBuf>,
    pub batch_size:         usize,
    pub seed:               Option<u64>,
}

impl Default for PredictConfig {
    fn default() -> Self {
        Self {
            source:             DataSourceSpec { path: PathBuf::from("cells.csv"), class: None },
            model_dir:          PathBuf::from("model"),
            shuffle:            false,
            exclude_outliers:   false,
            probabilities_path: None,
            report_path:        None,
            batch_size:         256,
            seed:               None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PredictReport {
    pub classes:       ClassMapping,
    /// One row per kept sample, one column per class
    pub probabilities: Vec<Vec<f64>>,
    /// `None` for unlabelled input
    pub targets:       Option<OneHot>,
    pub evaluation:    Option<Evaluation>,
}

pub struct PredictUseCase {
    config: PredictConfig,
}

impl PredictUseCase {
    pub fn new(config: PredictConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<PredictReport> {
        let cfg    = &self.config;
        let device = Device::default();
        let mut rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None       => StdRng::from_entropy(),
        };

        // ── Step 1: Exported model ────────────────────────────────────────────
        let loaded        = load_model::<InferBackend>(&cfg.model_dir, &device)?;
        let normalization = load_normalization(cfg.model_dir.join(NORMALIZATION_FILE))?;
        let classes       = loaded.manifest.classes.clone();

        // ── Step 2: CSV ───────────────────────────────────────────────────────
        let table = CsvLoader::new(cfg.source.clone(), cfg.exclude_outliers)
            .allow_unlabelled()
            .load()?;
        tracing::info!("Loaded {} rows from '{}'", table.len(), cfg.source);

        // ── Step 3: Preprocess ────────────────────────────────────────────────
        let data = process_prediction_data(&table, &classes, &normalization, cfg.shuffle, &mut rng)?;
        ensure!(data.inputs.rows() > 0, "No complete rows to predict");

        // ── Step 4: Reshape ───────────────────────────────────────────────────
        let reshaped: FeatureTensor;
        let inputs: &dyn ModelInputs = if loaded.manifest.model.reshape_input {
            reshaped = resize_inputs(&data.inputs)?;
            &reshaped
        } else {
            &data.inputs
        };
        let width = inputs.sample_shape().iter().product::<usize>();
        ensure!(
            width == loaded.manifest.model.input_size,
            "model takes {} inputs, data gives {}",
            loaded.manifest.model.input_size,
            width
        );

        // ── Step 5: Predict ───────────────────────────────────────────────────
        let probabilities = predict_proba(&loaded.model, inputs, cfg.batch_size, &device)?;
        let evaluation = match &data.targets {
            Some(targets) => {
                let evaluation = Evaluation::from_probabilities(&probabilities, targets)?;
                tracing::info!("Results on {} samples:\n{}", probabilities.len(), evaluation);
                Some(evaluation)
            }
            None => {
                tracing::warn!("No class labels in '{}', skipping evaluation", cfg.source);
                None
            }
        };

        // ── Step 6: Outputs ───────────────────────────────────────────────────
        if let Some(path) = &cfg.probabilities_path {
            write_probabilities(path, &classes, &probabilities, data.targets.as_ref())?;
        }
        match (&cfg.report_path, &evaluation) {
            (Some(path), Some(evaluation)) => {
                let json = serde_json::to_string_pretty(evaluation)?;
                fs::write(path, json)
                    .with_context(|| format!("Cannot write report to '{}'", path.display()))?;
                tracing::info!("Saved report to '{}'", path.display());
            }
            (Some(path), None) => {
                tracing::warn!("Nothing to report, '{}' not written", path.display());
            }
            (None, _) => {}
        }

        Ok(PredictReport { classes, probabilities, targets: data.targets, evaluation })
    }
}

/// One CSV row per sample: true class (empty when unlabelled),
/// predicted class, then the probability of every class.
fn write_probabilities(
    path:          &Path,
    classes:       &ClassMapping,
    probabilities: &[Vec<f64>],
    targets:       Option<&OneHot>,
) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Cannot create '{}'", path.display()))?;

    let mut header = vec!["true_class".to_string(), "predicted_class".to_string()];
    header.extend(classes.names().iter().cloned());
    writer.write_record(&header)?;

    let predicted = predict_classes(probabilities);
    let truths    = targets.map(OneHot::labels);
    for (i, (probs, pred)) in probabilities.iter().zip(predicted).enumerate() {
        let truth = truths.as_ref().and_then(|t| classes.name(t[i]));
        let mut record = vec![
            truth.unwrap_or_default().to_string(),
            classes.name(pred).unwrap_or_default().to_string(),
        ];
        record.extend(probs.iter().map(|p| format!("{:.6}", p)));
        writer.write_record(&record)?;
    }
    writer.flush()?;

    tracing::info!("Saved {} probability rows to '{}'", probabilities.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::{tests as train_tests, TrainUseCase};

    #[test]
    fn test_predict_with_exported_model() {
        let dir       = tempfile::tempdir().unwrap();
        let train_cfg = train_tests::config(dir.path());
        TrainUseCase::new(train_cfg.clone()).execute().unwrap();

        let probabilities_path = dir.path().join("probabilities.csv");
        let report_path        = dir.path().join("report.json");
        let cfg = PredictConfig {
            source:             train_cfg.sources[0].clone(),
            model_dir:          train_cfg.export_dir.clone(),
            probabilities_path: Some(probabilities_path.clone()),
            report_path:        Some(report_path.clone()),
            seed:               Some(3),
            ..PredictConfig::default()
        };
        let report = PredictUseCase::new(cfg).execute().unwrap();

        assert_eq!(report.probabilities.len(), 80);
        assert_eq!(report.targets.unwrap().width(), 2);
        assert_eq!(report.evaluation.unwrap().confusion.len(), 2);

        let mut reader = csv::Reader::from_path(&probabilities_path).unwrap();
        let headers: Vec<String> = reader.headers().unwrap().iter().map(str::to_string).collect();
        assert_eq!(headers, vec!["true_class", "predicted_class", "round", "elongated"]);
        assert_eq!(reader.records().count(), 80);

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
        assert!(json.get("accuracy").is_some());
    }

    #[test]
    fn test_predict_unlabelled_csv() {
        let dir       = tempfile::tempdir().unwrap();
        let train_cfg = train_tests::config(dir.path());
        TrainUseCase::new(train_cfg.clone()).execute().unwrap();

        let unlabelled         = train_tests::write_csv(dir.path(), "unlabelled.csv", false);
        let probabilities_path = dir.path().join("unlabelled_probabilities.csv");
        let report_path        = dir.path().join("unlabelled_report.json");
        let cfg = PredictConfig {
            source:             DataSourceSpec { path: unlabelled, class: None },
            model_dir:          train_cfg.export_dir.clone(),
            probabilities_path: Some(probabilities_path.clone()),
            report_path:        Some(report_path.clone()),
            seed:               Some(3),
            ..PredictConfig::default()
        };
        let report = PredictUseCase::new(cfg).execute().unwrap();

        assert_eq!(report.probabilities.len(), 80);
        assert!(report.targets.is_none());
        assert!(report.evaluation.is_none());
        assert!(!report_path.exists());

        let mut reader = csv::Reader::from_path(&probabilities_path).unwrap();
        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 80);
        for record in &records {
            assert_eq!(&record[0], "");
            assert!(["round", "elongated"].contains(&&record[1]));
        }
    }

    #[test]
    fn test_mismatched_columns_are_rejected() {
        let dir       = tempfile::tempdir().unwrap();
        let train_cfg = train_tests::config(dir.path());
        TrainUseCase::new(train_cfg.clone()).execute().unwrap();

        let other = dir.path().join("other.csv");
        fs::write(&other, "Label,Class,area,volume,intensity\nc1,round,1.0,2.0,0.3\n").unwrap();

        let cfg = PredictConfig {
            source:    DataSourceSpec { path: other, class: None },
            model_dir: train_cfg.export_dir.clone(),
            ..PredictConfig::default()
        };
        assert!(PredictUseCase::new(cfg).execute().is_err());
    }
}
