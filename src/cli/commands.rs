// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `predict`, and the
// conversion of their flags into application-layer configs.

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::{predict_use_case::PredictConfig, train_use_case::TrainConfig};
use crate::data::loader::DataSourceSpec;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a classifier on one or more labelled CSV files
    Train(TrainArgs),

    /// Run an exported classifier over a CSV file
    Predict(PredictArgs),
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Input CSV as PATH or PATH=CLASS (repeatable). With CLASS,
    /// every row of the file gets that class.
    #[arg(long = "input", required = true)]
    pub inputs: Vec<DataSourceSpec>,

    /// Class names in index order, e.g. `--classes healthy,apoptotic`
    #[arg(long, value_delimiter = ',', required = true)]
    pub classes: Vec<String>,

    /// Export directory; `<dir>.zip` is written next to it
    #[arg(long, default_value = "model")]
    pub export_dir: PathBuf,

    /// Where to write the per-epoch history JSON
    #[arg(long)]
    pub history: Option<PathBuf>,

    /// Keep at most N rows per class, -1 keeps all
    #[arg(
        long,
        default_value_t = -1,
        allow_negative_numbers = true,
        value_parser = clap::value_parser!(i64).range(-1..)
    )]
    pub values_per_class: i64,

    /// Drop rows with any feature 3 or more stdevs from its mean
    #[arg(long)]
    pub exclude_outliers: bool,

    #[arg(long, default_value_t = 50)]
    pub epochs: usize,

    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    /// Adam learning rate
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Dropout probability after every hidden block
    #[arg(long, default_value_t = 0.5)]
    pub dropout: f64,

    /// Feed flat feature rows instead of [2, 2, k] tensors
    #[arg(long)]
    pub no_reshape: bool,

    /// Share of samples held out for validation
    #[arg(long, default_value_t = 0.2)]
    pub validation_fraction: f64,

    /// Seed for every shuffle; random when omitted
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            sources:             a.inputs,
            classes:             a.classes,
            export_dir:          a.export_dir,
            history_path:        a.history,
            values_per_class:    usize::try_from(a.values_per_class).ok(),
            exclude_outliers:    a.exclude_outliers,
            epochs:              a.epochs,
            batch_size:          a.batch_size,
            lr:                  a.lr,
            dropout:             a.dropout,
            reshape:             !a.no_reshape,
            validation_fraction: a.validation_fraction,
            seed:                a.seed,
        }
    }
}

#[derive(Args, Debug)]
pub struct PredictArgs {
    /// Input CSV as PATH or PATH=CLASS
    #[arg(long)]
    pub input: DataSourceSpec,

    /// Export directory written by `train`
    #[arg(long, default_value = "model")]
    pub model: PathBuf,

    /// Shuffle rows before predicting
    #[arg(long)]
    pub shuffle: bool,

    #[arg(long)]
    pub exclude_outliers: bool,

    /// Write per-row class probabilities to this CSV
    #[arg(long)]
    pub probabilities: Option<PathBuf>,

    /// Write the evaluation report to this JSON file
    #[arg(long)]
    pub report: Option<PathBuf>,

    #[arg(long, default_value_t = 256)]
    pub batch_size: usize,

    #[arg(long)]
    pub seed: Option<u64>,
}

impl From<PredictArgs> for PredictConfig {
    fn from(a: PredictArgs) -> Self {
        PredictConfig {
            source:             a.input,
            model_dir:          a.model,
            shuffle:            a.shuffle,
            exclude_outliers:   a.exclude_outliers,
            probabilities_path: a.probabilities,
            report_path:        a.report,
            batch_size:         a.batch_size,
            seed:               a.seed,
        }
    }
}
