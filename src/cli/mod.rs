// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses command line arguments with `clap` and hands off to
// Layer 2 (application). Two commands are supported:
//   1. `train`   — train and export a classifier
//   2. `predict` — run an exported classifier over a CSV

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, PredictArgs, TrainArgs};

use crate::application::{predict_use_case::PredictUseCase, train_use_case::TrainUseCase};

#[derive(Parser, Debug)]
#[command(
    name = "cell-classifier",
    version,
    about = "Train a feed-forward cell classifier on CSV features, then predict with it."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the matching use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)   => run_train(args),
            Commands::Predict(args) => run_predict(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    let export_dir = args.export_dir.clone();
    let report     = TrainUseCase::new(args.into()).execute()?;

    println!(
        "Trained on {} samples ({} held out). Model exported to '{}'.",
        report.train_samples,
        report.valid_samples,
        export_dir.display()
    );
    if let Some(evaluation) = report.evaluation {
        println!("{}", evaluation);
    }
    Ok(())
}

fn run_predict(args: PredictArgs) -> Result<()> {
    let report = PredictUseCase::new(args.into()).execute()?;

    println!(
        "Predicted {} samples over classes [{}].",
        report.probabilities.len(),
        report.classes.names().join(", ")
    );
    if let Some(evaluation) = report.evaluation {
        println!("{}", evaluation);
    }
    Ok(())
}
