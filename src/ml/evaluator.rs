// ============================================================
// Layer 5 — Evaluator
// ============================================================
// Scores a trained classifier against one-hot targets.
//
//   accuracy   — share of rows whose argmax class is correct
//   precision  — per class, TP / (TP + FP), 0 when undefined
//   recall     — per class, TP / (TP + FN), 0 when undefined
//   f1         — per class, harmonic mean of the two
//   auc        — per class, one-vs-rest ROC AUC from the class
//                probability (NaN when the class has no positive
//                or no negative row)
//   confusion  — row = true class, column = predicted class,
//                each row divided by its total
//
// Predictions are one-hot encoded at the target width, so a class
// the model never predicts still gets its own (zero) column.

use anyhow::{ensure, Result};
use burn::prelude::*;
use serde::Serialize;
use std::fmt;

use crate::domain::{features::OneHot, traits::ModelInputs};
use crate::ml::{
    inferencer::{predict_classes, predict_proba},
    model::ClassifierModel,
};

/// Samples per forward pass during evaluation.
const EVAL_BATCH_SIZE: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub accuracy:  f64,
    pub precision: Vec<f64>,
    pub recall:    Vec<f64>,
    pub f1:        Vec<f64>,
    pub auc:       Vec<f64>,
    pub confusion: Vec<Vec<f64>>,
}

/// Run `model` over `inputs` and score it against `targets`.
pub fn evaluate<B: Backend, I: ModelInputs + ?Sized>(
    model:   &ClassifierModel<B>,
    inputs:  &I,
    targets: &OneHot,
    device:  &B::Device,
) -> Result<Evaluation> {
    let probabilities = predict_proba(model, inputs, EVAL_BATCH_SIZE, device)?;
    Evaluation::from_probabilities(&probabilities, targets)
}

impl Evaluation {
    /// Score per-row class probabilities against one-hot targets.
    pub fn from_probabilities(probabilities: &[Vec<f64>], targets: &OneHot) -> Result<Self> {
        ensure!(
            probabilities.len() == targets.rows(),
            "{} predictions for {} targets",
            probabilities.len(),
            targets.rows()
        );
        let k = targets.width();
        ensure!(
            probabilities.iter().all(|p| p.len() == k),
            "prediction width does not match {} target classes",
            k
        );

        let truth     = targets.labels();
        let predicted = predict_classes(probabilities);

        let mut counts = vec![vec![0usize; k]; k];
        for (&t, &p) in truth.iter().zip(&predicted) {
            counts[t][p] += 1;
        }

        let n       = truth.len();
        let correct = (0..k).map(|c| counts[c][c]).sum::<usize>();
        let accuracy = if n > 0 { correct as f64 / n as f64 } else { 0.0 };

        let mut precision = Vec::with_capacity(k);
        let mut recall    = Vec::with_capacity(k);
        let mut f1        = Vec::with_capacity(k);
        for c in 0..k {
            let tp        = counts[c][c];
            let predicted = (0..k).map(|t| counts[t][c]).sum::<usize>();
            let actual    = counts[c].iter().sum::<usize>();

            let p = ratio(tp, predicted);
            let r = ratio(tp, actual);
            precision.push(p);
            recall.push(r);
            f1.push(if p + r > 0.0 { 2.0 * p * r / (p + r) } else { 0.0 });
        }

        let auc = (0..k)
            .map(|c| {
                let scores: Vec<f64>  = probabilities.iter().map(|p| p[c]).collect();
                let positive: Vec<bool> = truth.iter().map(|&t| t == c).collect();
                roc_auc(&scores, &positive)
            })
            .collect();

        let confusion = counts
            .iter()
            .map(|row| {
                let total = row.iter().sum::<usize>();
                row.iter().map(|&v| ratio(v, total)).collect()
            })
            .collect();

        Ok(Self { accuracy, precision, recall, f1, auc, confusion })
    }

    pub fn num_classes(&self) -> usize {
        self.precision.len()
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

/// ROC AUC via the rank-sum statistic. Tied scores share their
/// average rank. NaN when either class is absent.
pub fn roc_auc(scores: &[f64], positive: &[bool]) -> f64 {
    let n_pos = positive.iter().filter(|&&p| p).count();
    let n_neg = positive.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return f64::NAN;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    // 1-based ranks, averaged over runs of equal scores
    let mut ranks = vec![0.0; scores.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        let avg = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg;
        }
        i = j + 1;
    }

    let pos_rank_sum: f64 = ranks
        .iter()
        .zip(positive)
        .filter(|(_, &p)| p)
        .map(|(r, _)| r)
        .sum();

    let n_pos = n_pos as f64;
    (pos_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg as f64)
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "accuracy={:.4}", self.accuracy)?;
        for c in 0..self.num_classes() {
            writeln!(
                f,
                "class {}: precision={:.4} recall={:.4} f1={:.4} auc={:.4}",
                c, self.precision[c], self.recall[c], self.f1[c], self.auc[c],
            )?;
        }
        write!(f, "confusion (rows = true class):")?;
        for row in &self.confusion {
            write!(f, "\n ")?;
            for v in row {
                write!(f, " {:.3}", v)?;
            }
        }
        Ok(())
    }
}
