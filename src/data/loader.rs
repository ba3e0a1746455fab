// ============================================================
// Layer 4 — CSV Loader
// ============================================================
// Reads a labelled feature CSV into a `Table`.
//
// Per file:
//   1. Read the header and every record (csv crate)
//   2. Drop the `Label` column, present in every export,
//      never used as a feature
//   3. Parse every other non-`Class` column as f64;
//      empty and NaN cells become missing values
//   4. Optionally drop outlier rows (any feature 3σ or more
//      from its column mean, computed over the whole file)
//   5. If the file has no `Class` column, every row gets the
//      constant class given for that file
//
// Several files are usually combined, one per class:
//   human.csv=human  mouse.csv=mouse  →  one table
//
// Reference: csv crate documentation

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use crate::domain::normalization::mean_stdev;
use crate::domain::table::{Table, CLASS_COLUMN, LABEL_COLUMN};
use crate::domain::traits::DatasetSource;

/// Rows further than this many stdevs from a column mean are outliers.
const OUTLIER_SIGMAS: f64 = 3.0;

// ─── get_data ─────────────────────────────────────────────────────────────────
/// Load one CSV file.
///
/// `class_cat` is the label given to every row when the file has
/// no `Class` column. A file without `Class` and without
/// `class_cat` is an error.
pub fn get_data(
    path:             impl AsRef<Path>,
    class_cat:        Option<&str>,
    exclude_outliers: bool,
) -> Result<Table> {
    read_table(path.as_ref(), class_cat, exclude_outliers, true)
}

/// Load one CSV file that may carry no classes at all.
///
/// Same as [`get_data`], except that a file without `Class` and
/// without `class_cat` loads with every class missing.
pub fn get_unlabelled_data(
    path:             impl AsRef<Path>,
    class_cat:        Option<&str>,
    exclude_outliers: bool,
) -> Result<Table> {
    read_table(path.as_ref(), class_cat, exclude_outliers, false)
}

fn read_table(
    path:             &Path,
    class_cat:        Option<&str>,
    exclude_outliers: bool,
    require_class:    bool,
) -> Result<Table> {

    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Cannot open CSV '{}'", path.display()))?;
    let headers = reader
        .headers()
        .with_context(|| format!("Cannot read header of '{}'", path.display()))?
        .clone();

    let label_idx = headers
        .iter()
        .position(|h| h == LABEL_COLUMN)
        .ok_or_else(|| anyhow!("'{}' has no '{}' column", path.display(), LABEL_COLUMN))?;
    let class_idx = headers.iter().position(|h| h == CLASS_COLUMN);

    let feature_idx: Vec<usize> = (0..headers.len())
        .filter(|&i| i != label_idx && Some(i) != class_idx)
        .collect();
    let feature_names = feature_idx.iter().map(|&i| headers[i].to_string()).collect();

    let mut table = Table::new(feature_names);

    for (row_no, record) in reader.records().enumerate() {
        // Header is line 1, first record is line 2
        let line   = row_no + 2;
        let record = record
            .with_context(|| format!("Malformed CSV record at line {} of '{}'", line, path.display()))?;

        let class = class_idx
            .and_then(|i| record.get(i))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let features = feature_idx
            .iter()
            .map(|&i| {
                parse_cell(record.get(i).unwrap_or("")).with_context(|| {
                    format!("line {}, column '{}' of '{}'", line, &headers[i], path.display())
                })
            })
            .collect::<Result<Vec<_>>>()?;

        table.push_row(class, features)?;
    }

    tracing::debug!(
        "Read {} rows x {} features from '{}'",
        table.len(),
        table.num_features(),
        path.display()
    );

    if exclude_outliers {
        let before = table.len();
        remove_outliers(&mut table);
        tracing::info!(
            "Removed {} outlier rows from '{}'",
            before - table.len(),
            path.display()
        );
    }

    if class_idx.is_none() {
        match class_cat {
            Some(class) => table.set_constant_class(class),
            None if !require_class => {
                tracing::info!("'{}' has no class labels", path.display());
            }
            None => bail!(
                "'{}' has no '{}' column and no class was given for it",
                path.display(),
                CLASS_COLUMN
            ),
        }
    }

    Ok(table)
}

/// Parse a numeric cell. Empty and NaN cells are missing values.
fn parse_cell(cell: &str) -> Result<Option<f64>> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Ok(None);
    }
    let value: f64 = cell
        .parse()
        .map_err(|_| anyhow!("'{}' is not a number", cell))?;
    Ok(if value.is_nan() { None } else { Some(value) })
}

/// Keep rows whose features all lie strictly within 3σ of their
/// column mean. Rows with a missing feature are dropped too.
fn remove_outliers(table: &mut Table) {
    let bounds: Vec<(f64, f64)> = (0..table.num_features())
        .map(|c| {
            let present: Vec<f64> = table.feature_column(c).flatten().collect();
            mean_stdev(&present)
        })
        .collect();

    table.retain_rows(|_, row| {
        row.iter().zip(&bounds).all(|(cell, &(mean, stdev))| match cell {
            Some(v) => (v - mean).abs() < OUTLIER_SIGMAS * stdev,
            None    => false,
        })
    });
}

// ─── DataSourceSpec ───────────────────────────────────────────────────────────
/// A CSV path plus the class its rows belong to, written on the
/// command line as `PATH` or `PATH=CLASS`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSourceSpec {
    pub path:  PathBuf,
    pub class: Option<String>,
}

impl FromStr for DataSourceSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (path, class) = match s.rsplit_once('=') {
            Some((path, class)) => (path, Some(class)),
            None                => (s, None),
        };
        if path.is_empty() {
            return Err(format!("missing CSV path in '{s}'"));
        }
        if class == Some("") {
            return Err(format!("empty class name in '{s}'"));
        }
        Ok(Self {
            path:  PathBuf::from(path),
            class: class.map(str::to_string),
        })
    }
}

impl fmt::Display for DataSourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.class {
            Some(class) => write!(f, "{}={}", self.path.display(), class),
            None        => write!(f, "{}", self.path.display()),
        }
    }
}

// ─── Loaders ──────────────────────────────────────────────────────────────────
/// Loads a single CSV file.
pub struct CsvLoader {
    source:           DataSourceSpec,
    exclude_outliers: bool,
    allow_unlabelled: bool,
}

impl CsvLoader {
    pub fn new(source: DataSourceSpec, exclude_outliers: bool) -> Self {
        Self { source, exclude_outliers, allow_unlabelled: false }
    }

    /// Accept files with neither a `Class` column nor a given class.
    pub fn allow_unlabelled(mut self) -> Self {
        self.allow_unlabelled = true;
        self
    }
}

impl DatasetSource for CsvLoader {
    fn load(&self) -> Result<Table> {
        let class = self.source.class.as_deref();
        if self.allow_unlabelled {
            get_unlabelled_data(&self.source.path, class, self.exclude_outliers)
        } else {
            get_data(&self.source.path, class, self.exclude_outliers)
        }
    }
}

/// Loads several CSV files and concatenates them in order.
pub struct MultiSourceLoader {
    sources:          Vec<DataSourceSpec>,
    exclude_outliers: bool,
}

impl MultiSourceLoader {
    pub fn new(sources: Vec<DataSourceSpec>, exclude_outliers: bool) -> Self {
        Self { sources, exclude_outliers }
    }
}

impl DatasetSource for MultiSourceLoader {
    fn load(&self) -> Result<Table> {
        load_sources(&self.sources, self.exclude_outliers)
    }
}

/// Load every source with `get_data` and append them into one
/// table. All files must share the same feature columns.
pub fn load_sources(sources: &[DataSourceSpec], exclude_outliers: bool) -> Result<Table> {
    let mut combined: Option<Table> = None;

    for source in sources {
        let table = get_data(&source.path, source.class.as_deref(), exclude_outliers)?;
        tracing::info!("Loaded {} rows from '{}'", table.len(), source);

        match combined.as_mut() {
            Some(all) => all
                .append(table)
                .with_context(|| format!("'{}' does not match earlier inputs", source))?,
            None => combined = Some(table),
        }
    }

    combined.ok_or_else(|| anyhow!("No input CSV files given"))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(contents: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn test_inserts_constant_class_first() {
        let f = csv_file("Label,area,perimeter\ncell-1,1.0,2.0\ncell-2,3.0,4.0\n");
        let t = get_data(f.path(), Some("human"), false).unwrap();

        assert_eq!(t.columns(), vec!["Class", "area", "perimeter"]);
        assert_eq!(t.len(), 2);
        assert_eq!(t.class_of(0), Some("human"));
        assert_eq!(t.class_of(1), Some("human"));
    }

    #[test]
    fn test_keeps_existing_class_column() {
        let f = csv_file("area,Class,Label\n1.0,mouse,a\n2.0,,b\n");
        let t = get_data(f.path(), Some("human"), false).unwrap();

        assert_eq!(t.columns(), vec!["Class", "area"]);
        assert_eq!(t.class_of(0), Some("mouse"));
        assert_eq!(t.class_of(1), None);
    }

    #[test]
    fn test_missing_cells_are_none() {
        let f = csv_file("Label,a,b\nx,1.0,\ny,NaN,2.0\n");
        let t = get_data(f.path(), Some("c"), false).unwrap();
        let rows: Vec<_> = t.rows().map(|(_, r)| r.to_vec()).collect();
        assert_eq!(rows, vec![vec![Some(1.0), None], vec![None, Some(2.0)]]);
    }

    #[test]
    fn test_requires_label_column() {
        let f = csv_file("a,b\n1,2\n");
        assert!(get_data(f.path(), Some("c"), false).is_err());
    }

    #[test]
    fn test_requires_class_when_column_absent() {
        let f = csv_file("Label,a\nx,1\n");
        assert!(get_data(f.path(), None, false).is_err());
    }

    #[test]
    fn test_unlabelled_file_loads_without_classes() {
        let f = csv_file("Label,a,b\nx,1,2\ny,3,4\n");
        let t = get_unlabelled_data(f.path(), None, false).unwrap();

        assert_eq!(t.len(), 2);
        assert_eq!(t.columns(), vec!["Class", "a", "b"]);
        assert!(!t.is_labelled());

        let spec   = DataSourceSpec { path: f.path().to_path_buf(), class: None };
        assert!(CsvLoader::new(spec.clone(), false).load().is_err());
        assert!(CsvLoader::new(spec, false).allow_unlabelled().load().is_ok());
    }

    #[test]
    fn test_rejects_non_numeric_feature() {
        let f   = csv_file("Label,a\nx,abc\n");
        let err = get_data(f.path(), Some("c"), false).unwrap_err();
        assert!(format!("{err:#}").contains("column 'a'"));
    }

    #[test]
    fn test_excludes_outliers() {
        // 20 rows near 0 and one far away
        let mut contents = String::from("Label,a\n");
        for i in 0..20 {
            contents.push_str(&format!("r{i},{}\n", (i % 3) as f64 * 0.1));
        }
        contents.push_str("far,100.0\n");
        let f = csv_file(&contents);

        let all      = get_data(f.path(), Some("c"), false).unwrap();
        let filtered = get_data(f.path(), Some("c"), true).unwrap();
        assert_eq!(all.len(), 21);
        assert_eq!(filtered.len(), 20);
        assert!(filtered.feature_column(0).flatten().all(|v| v < 1.0));
    }

    #[test]
    fn test_load_sources_concatenates() {
        let a = csv_file("Label,x\n1,1.0\n2,2.0\n");
        let b = csv_file("Label,x\n3,3.0\n");
        let sources = vec![
            DataSourceSpec { path: a.path().to_path_buf(), class: Some("a".into()) },
            DataSourceSpec { path: b.path().to_path_buf(), class: Some("b".into()) },
        ];

        let t = MultiSourceLoader::new(sources, false).load().unwrap();
        assert_eq!(t.len(), 3);
        assert_eq!(t.class_of(2), Some("b"));
    }

    #[test]
    fn test_load_sources_rejects_mismatched_columns() {
        let a = csv_file("Label,x\n1,1.0\n");
        let b = csv_file("Label,y\n1,1.0\n");
        let sources = vec![
            DataSourceSpec { path: a.path().to_path_buf(), class: Some("a".into()) },
            DataSourceSpec { path: b.path().to_path_buf(), class: Some("b".into()) },
        ];
        assert!(load_sources(&sources, false).is_err());
    }

    #[test]
    fn test_parse_source_spec() {
        let s: DataSourceSpec = "data/human.csv=human".parse().unwrap();
        assert_eq!(s.path, PathBuf::from("data/human.csv"));
        assert_eq!(s.class.as_deref(), Some("human"));

        let s: DataSourceSpec = "data/mixed.csv".parse().unwrap();
        assert_eq!(s.class, None);

        assert!("data/x.csv=".parse::<DataSourceSpec>().is_err());
        assert!("=human".parse::<DataSourceSpec>().is_err());
    }
}
