// ============================================================
// Layer 6 — Normalization Store
// ============================================================
// Reads and writes the feature statistics used to z-score
// prediction data:
//
//   {"mean": [...], "stdev": [...], "columns": [...]}
//
// Entry i belongs to feature column i. The label placeholder
// kept in ColumnStats is never written.

use anyhow::{Context, Result};
use std::{fs, fs::File, path::Path};

use crate::domain::normalization::{ColumnStats, Normalization};

/// File name inside the export directory and archive.
pub const NORMALIZATION_FILE: &str = "normalization.json";

/// Write `stats` (label placeholder dropped) to `path`.
pub fn save_normalization(stats: &ColumnStats, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(&stats.to_normalization())?;
    fs::write(path, json)
        .with_context(|| format!("Cannot write normalization to '{}'", path.display()))?;
    tracing::debug!("Saved normalization to '{}'", path.display());
    Ok(())
}

/// Read mean/stdev arrays from a normalization file.
pub fn load_normalization(path: impl AsRef<Path>) -> Result<Normalization> {
    let path = path.as_ref();
    let json = fs::read_to_string(path)
        .with_context(|| format!("Cannot read normalization from '{}'", path.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("'{}' is not a normalization file", path.display()))
}

/// Read `normalization.json` straight out of an export archive.
pub fn load_normalization_from_archive(zip_path: impl AsRef<Path>) -> Result<Normalization> {
    let zip_path = zip_path.as_ref();
    let file = File::open(zip_path)
        .with_context(|| format!("Cannot open archive '{}'", zip_path.display()))?;
    let mut archive = zip::ZipArchive::new(file)
        .with_context(|| format!("'{}' is not a zip archive", zip_path.display()))?;
    let entry = archive
        .by_name(NORMALIZATION_FILE)
        .with_context(|| format!("'{}' has no {}", zip_path.display(), NORMALIZATION_FILE))?;

    serde_json::from_reader(entry)
        .with_context(|| format!("Bad {} in '{}'", NORMALIZATION_FILE, zip_path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn stats() -> ColumnStats {
        let columns = vec!["Class".to_string(), "a".to_string(), "b".to_string()];
        let rows = vec![
            vec![0.0, 1.0, 10.0],
            vec![1.0, 3.0, 20.0],
            vec![2.0, 5.0, 30.0],
        ];
        ColumnStats::compute(columns, &rows)
    }

    #[test]
    fn test_round_trip_drops_label_placeholder() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join(NORMALIZATION_FILE);

        save_normalization(&stats(), &path).unwrap();
        let loaded = load_normalization(&path).unwrap();

        assert_eq!(loaded.mean, vec![3.0, 20.0]);
        assert_eq!(loaded.stdev, vec![2.0, 10.0]);
        assert_eq!(loaded.columns, Some(vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn test_single_row_statistics_round_trip() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join(NORMALIZATION_FILE);
        let single = ColumnStats::compute(vec!["Class".into(), "a".into()], &[vec![0.0, 1.0]]);

        save_normalization(&single, &path).unwrap();
        let loaded = load_normalization(&path).unwrap();

        assert_eq!(loaded.mean, vec![1.0]);
        assert!(loaded.stdev[0].is_nan());
    }

    #[test]
    fn test_file_without_column_names_loads() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("norm.json");
        fs::write(&path, r#"{"mean": [0.5], "stdev": [2.0]}"#).unwrap();

        let loaded = load_normalization(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded.columns.is_none());
    }

    #[test]
    fn test_reads_from_archive() {
        let dir      = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("model.zip");

        let mut zip = zip::ZipWriter::new(File::create(&zip_path).unwrap());
        zip.start_file(NORMALIZATION_FILE, zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(br#"{"mean": [1.0, 2.0], "stdev": [0.5, 0.25]}"#).unwrap();
        zip.finish().unwrap();

        let loaded = load_normalization_from_archive(&zip_path).unwrap();
        assert_eq!(loaded.mean, vec![1.0, 2.0]);
        assert_eq!(loaded.stdev, vec![0.5, 0.25]);
    }

    #[test]
    fn test_archive_without_entry_is_an_error() {
        let dir      = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("empty.zip");
        zip::ZipWriter::new(File::create(&zip_path).unwrap()).finish().unwrap();

        assert!(load_normalization_from_archive(&zip_path).is_err());
    }
}
