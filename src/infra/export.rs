// ============================================================
// Layer 6 — Model Export
// ============================================================
// Saves and restores a trained classifier together with
// everything prediction needs to reuse it.
//
// Export directory layout:
//   <dir>/
//     saved_model.json    ← manifest: architecture, class names,
//                           input/output signature
//     variables.mpk.gz    ← full-precision weights (named MessagePack)
//     normalization.json  ← feature mean/stdev, no label entry
//     model.bin           ← same weights, Burn binary record
//   <dir>.zip             ← archive of the first three files
//
// model.bin is written after the archive is built, so the zip
// carries only the portable files. Loading prefers model.bin and
// falls back to variables.mpk.gz.
//
// Saving removes any existing directory at the export path first.

use anyhow::{anyhow, ensure, Context, Result};
use burn::{
    prelude::*,
    record::{BinFileRecorder, FullPrecisionSettings, NamedMpkGzFileRecorder},
};
use serde::{Deserialize, Serialize};
use std::{
    ffi::OsString,
    fs::{self, File},
    io,
    path::{Path, PathBuf},
};
use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

use crate::domain::{class_mapping::ClassMapping, normalization::ColumnStats};
use crate::infra::normalization_store::{save_normalization, NORMALIZATION_FILE};
use crate::ml::model::{ClassifierConfig, ClassifierModel};

pub const MANIFEST_FILE: &str = "saved_model.json";

// Recorders append their own extensions (.mpk.gz / .bin).
const VARIABLES_STEM: &str = "variables";
const NATIVE_STEM:    &str = "model";

/// Bumped whenever the directory layout changes.
pub const FORMAT_VERSION: u32 = 1;

/// Shape of one model input or output; `None` is the batch axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorSignature {
    pub name:  String,
    pub shape: Vec<Option<usize>>,
}

/// Contents of `saved_model.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportManifest {
    pub format_version: u32,
    pub model:          ClassifierConfig,
    pub classes:        ClassMapping,
    pub input:          TensorSignature,
    pub output:         TensorSignature,
}

impl ExportManifest {
    pub fn new(model: ClassifierConfig, classes: ClassMapping) -> Self {
        let input_shape = if model.reshape_input {
            vec![None, Some(2), Some(2), Some(model.input_size / 4)]
        } else {
            vec![None, Some(model.input_size)]
        };
        let output_shape = vec![None, Some(model.num_classes)];

        Self {
            format_version: FORMAT_VERSION,
            input:  TensorSignature { name: "features".into(),      shape: input_shape },
            output: TensorSignature { name: "probabilities".into(), shape: output_shape },
            model,
            classes,
        }
    }
}

/// A model rebuilt from an export directory.
#[derive(Debug)]
pub struct LoadedModel<B: Backend> {
    pub model:    ClassifierModel<B>,
    pub manifest: ExportManifest,
}

/// `<path>.zip`, ignoring any trailing separator on `path`.
pub fn archive_path(path: impl AsRef<Path>) -> PathBuf {
    let normalized: PathBuf = path.as_ref().components().collect();
    let mut name = OsString::from(normalized.as_os_str());
    name.push(".zip");
    PathBuf::from(name)
}

/// Export `model` to the directory `path` and the archive `<path>.zip`.
pub fn save_model<B: Backend>(
    model:   &ClassifierModel<B>,
    config:  &ClassifierConfig,
    stats:   &ColumnStats,
    classes: &ClassMapping,
    path:    impl AsRef<Path>,
) -> Result<()> {
    let dir = path.as_ref();
    ensure!(
        classes.len() == config.num_classes,
        "{} class names for a model with {} outputs",
        classes.len(),
        config.num_classes
    );

    if dir.exists() {
        tracing::warn!("Replacing existing export at '{}'", dir.display());
        fs::remove_dir_all(dir)
            .with_context(|| format!("Cannot remove '{}'", dir.display()))?;
    }
    fs::create_dir_all(dir)
        .with_context(|| format!("Cannot create '{}'", dir.display()))?;

    // ── Manifest ──────────────────────────────────────────────────────────────
    let manifest = ExportManifest::new(config.clone(), classes.clone());
    let manifest_path = dir.join(MANIFEST_FILE);
    fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?)
        .with_context(|| format!("Cannot write '{}'", manifest_path.display()))?;

    // ── Weights ───────────────────────────────────────────────────────────────
    let variables = dir.join(VARIABLES_STEM);
    model
        .clone()
        .save_file(variables.clone(), &NamedMpkGzFileRecorder::<FullPrecisionSettings>::new())
        .map_err(|e| anyhow!("Cannot save weights to '{}': {:?}", variables.display(), e))?;

    save_normalization(stats, dir.join(NORMALIZATION_FILE))?;

    // ── Archive, then the native file ─────────────────────────────────────────
    let zip_path = archive_path(dir);
    zip_dir(dir, &zip_path)?;

    let native = dir.join(NATIVE_STEM);
    model
        .clone()
        .save_file(native.clone(), &BinFileRecorder::<FullPrecisionSettings>::new())
        .map_err(|e| anyhow!("Cannot save model to '{}': {:?}", native.display(), e))?;

    tracing::info!(
        "Exported model to '{}' and '{}'",
        dir.display(),
        zip_path.display()
    );
    Ok(())
}

/// Read only the manifest of an export directory.
pub fn load_manifest(path: impl AsRef<Path>) -> Result<ExportManifest> {
    let manifest_path = path.as_ref().join(MANIFEST_FILE);
    let json = fs::read_to_string(&manifest_path).with_context(|| {
        format!(
            "Cannot read '{}'. Has a model been exported there?",
            manifest_path.display()
        )
    })?;
    let manifest: ExportManifest = serde_json::from_str(&json)
        .with_context(|| format!("Bad manifest '{}'", manifest_path.display()))?;

    ensure!(
        manifest.format_version == FORMAT_VERSION,
        "export format {} is not supported (expected {})",
        manifest.format_version,
        FORMAT_VERSION
    );
    Ok(manifest)
}

/// Rebuild the model exported at `path`.
pub fn load_model<B: Backend>(path: impl AsRef<Path>, device: &B::Device) -> Result<LoadedModel<B>> {
    let dir      = path.as_ref();
    let manifest = load_manifest(dir)?;
    let model: ClassifierModel<B> = manifest.model.init(device);

    let native = dir.join(NATIVE_STEM);
    let model = if native.with_extension("bin").exists() {
        tracing::debug!("Loading weights from '{}.bin'", native.display());
        model
            .load_file(native.clone(), &BinFileRecorder::<FullPrecisionSettings>::new(), device)
            .map_err(|e| anyhow!("Cannot load '{}': {:?}", native.display(), e))?
    } else {
        let variables = dir.join(VARIABLES_STEM);
        tracing::debug!("Loading weights from '{}.mpk.gz'", variables.display());
        model
            .load_file(variables.clone(), &NamedMpkGzFileRecorder::<FullPrecisionSettings>::new(), device)
            .map_err(|e| anyhow!("Cannot load '{}': {:?}", variables.display(), e))?
    };

    tracing::info!(
        "Loaded model from '{}' ({} classes)",
        dir.display(),
        manifest.classes.len()
    );
    Ok(LoadedModel { model, manifest })
}

/// Deflate every regular file directly inside `dir` into `zip_path`.
fn zip_dir(dir: &Path, zip_path: &Path) -> Result<()> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Cannot list '{}'", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .collect();
    files.sort();

    let file = File::create(zip_path)
        .with_context(|| format!("Cannot create '{}'", zip_path.display()))?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for path in &files {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| anyhow!("Non UTF-8 file name in '{}'", dir.display()))?;
        zip.start_file(name, options)?;
        let mut src = File::open(path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        io::copy(&mut src, &mut zip)?;
    }
    zip.finish()?;

    tracing::debug!("Archived {} files into '{}'", files.len(), zip_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::normalization_store::{load_normalization, load_normalization_from_archive};
    use crate::ml::inferencer::predict_proba;
    use crate::domain::features::FeatureMatrix;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn stats() -> ColumnStats {
        let columns = ["Class", "a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
        let rows = vec![
            vec![0.0, 1.0, 2.0, 3.0, 4.0],
            vec![1.0, 2.0, 3.0, 5.0, 8.0],
            vec![2.0, 0.0, 1.0, 1.0, 0.0],
        ];
        ColumnStats::compute(columns, &rows)
    }

    fn classes() -> ClassMapping {
        ClassMapping::new(&["healthy", "apoptotic", "mitotic"])
    }

    fn inputs() -> FeatureMatrix {
        let rows = (0..5).map(|i| vec![i as f64, -1.0, 0.5, 2.0 - i as f64]).collect();
        FeatureMatrix::from_rows(4, rows).unwrap()
    }

    #[test]
    fn test_export_layout() {
        let dir    = tempfile::tempdir().unwrap();
        let export = dir.path().join("export");
        let device = Default::default();
        let config = ClassifierConfig::new(4, 3).with_reshape_input(false);
        let model: ClassifierModel<TestBackend> = config.init(&device);

        // stale content is removed
        fs::create_dir_all(&export).unwrap();
        fs::write(export.join("stale.txt"), "old").unwrap();

        save_model(&model, &config, &stats(), &classes(), &export).unwrap();

        assert!(export.join(MANIFEST_FILE).is_file());
        assert!(export.join("variables.mpk.gz").is_file());
        assert!(export.join(NORMALIZATION_FILE).is_file());
        assert!(export.join("model.bin").is_file());
        assert!(!export.join("stale.txt").exists());

        let zip_path = archive_path(&export);
        assert_eq!(zip_path, dir.path().join("export.zip"));
        let archive = zip::ZipArchive::new(File::open(&zip_path).unwrap()).unwrap();
        let mut names: Vec<&str> = archive.file_names().collect();
        names.sort();
        assert_eq!(names, vec![NORMALIZATION_FILE, MANIFEST_FILE, "variables.mpk.gz"]);

        let from_dir = load_normalization(export.join(NORMALIZATION_FILE)).unwrap();
        let from_zip = load_normalization_from_archive(&zip_path).unwrap();
        assert_eq!(from_dir, from_zip);
        assert_eq!(from_dir.mean.len(), 4);
    }

    #[test]
    fn test_reloaded_model_gives_same_probabilities() {
        let dir    = tempfile::tempdir().unwrap();
        let export = dir.path().join("export");
        let device = Default::default();
        let config = ClassifierConfig::new(4, 3).with_reshape_input(false);
        let model: ClassifierModel<TestBackend> = config.init(&device);

        save_model(&model, &config, &stats(), &classes(), &export).unwrap();
        let loaded = load_model::<TestBackend>(&export, &device).unwrap();

        assert_eq!(loaded.manifest.classes, classes());
        assert_eq!(loaded.manifest.input.shape, vec![None, Some(4)]);
        assert_eq!(loaded.manifest.output.shape, vec![None, Some(3)]);

        let before = predict_proba(&model, &inputs(), 8, &device).unwrap();
        let after  = predict_proba(&loaded.model, &inputs(), 8, &device).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_loads_from_variables_without_native_file() {
        let dir    = tempfile::tempdir().unwrap();
        let export = dir.path().join("export");
        let device = Default::default();
        let config = ClassifierConfig::new(4, 3).with_reshape_input(false);
        let model: ClassifierModel<TestBackend> = config.init(&device);

        save_model(&model, &config, &stats(), &classes(), &export).unwrap();
        fs::remove_file(export.join("model.bin")).unwrap();

        let loaded = load_model::<TestBackend>(&export, &device).unwrap();
        let before = predict_proba(&model, &inputs(), 8, &device).unwrap();
        let after  = predict_proba(&loaded.model, &inputs(), 8, &device).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_reshaped_signature() {
        let manifest = ExportManifest::new(ClassifierConfig::new(12, 2), ClassMapping::new(&["a", "b"]));
        assert_eq!(manifest.input.shape, vec![None, Some(2), Some(2), Some(3)]);
    }

    #[test]
    fn test_class_count_mismatch_is_an_error() {
        let dir    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let config = ClassifierConfig::new(4, 2).with_reshape_input(false);
        let model: ClassifierModel<TestBackend> = config.init(&device);

        assert!(save_model(&model, &config, &stats(), &classes(), dir.path().join("x")).is_err());
    }

    #[test]
    fn test_missing_export_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_model::<TestBackend>(dir.path().join("nothing"), &Default::default()).is_err());
    }

    #[test]
    fn test_archive_path_ignores_trailing_separator() {
        assert_eq!(archive_path("out/model/"), PathBuf::from("out/model.zip"));
        assert_eq!(archive_path("out/model"), PathBuf::from("out/model.zip"));
    }
}
