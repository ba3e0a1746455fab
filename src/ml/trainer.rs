// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Train + validation loop using Burn's DataLoader and Adam.
//
//   - Training runs on TrainBackend (Autodiff<NdArray>)
//   - model.valid() drops autodiff and disables dropout; the
//     validation batcher therefore uses InferBackend
//   - argmax(1) returns [batch, 1] so we flatten before .equal()
//
// Every epoch appends one value to each History series:
//   loss, accuracy          — sample-weighted over the train set
//   val_loss, val_accuracy  — same over the validation set
//                             (omitted when it is empty)
//   lr                      — learning rate used for the epoch
//   batches                 — optimizer steps taken (int series)

use anyhow::{bail, ensure, Result};
use burn::{
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    nn::loss::{CrossEntropyLoss, CrossEntropyLossConfig},
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::ClassBatcher, dataset::ClassDataset};
use crate::domain::{history::History, traits::ModelInputs};
use crate::ml::{
    model::{ClassifierConfig, ClassifierModel},
    Device, InferBackend, TrainBackend,
};

/// Train a fresh model described by `model_cfg`.
///
/// `loader_seed` drives the per-epoch shuffling of the training
/// batches. Returns the trained model on the inference backend
/// together with its per-epoch history.
pub fn run_training(
    model_cfg:   &ClassifierConfig,
    cfg:         &TrainConfig,
    loader_seed: u64,
    train:       ClassDataset,
    valid:       ClassDataset,
) -> Result<(ClassifierModel<InferBackend>, History)> {
    ensure!(train.sample_count() > 0, "training set is empty");
    ensure!(cfg.batch_size > 0, "batch size must be positive");

    let shape = ModelInputs::sample_shape(&train);
    ensure!(
        shape.iter().product::<usize>() == model_cfg.input_size,
        "samples of shape {:?} do not fit a model with {} inputs",
        shape,
        model_cfg.input_size
    );
    ensure!(
        shape.len() + 1 == model_cfg.input_rank(),
        "model expects rank-{} inputs, samples have shape {:?}",
        model_cfg.input_rank(),
        shape
    );

    let device = Device::default();
    tracing::info!("Using NdArray device: {:?}", device);

    match model_cfg.input_rank() {
        2 => train_loop::<2>(model_cfg, cfg, loader_seed, train, valid, device),
        4 => train_loop::<4>(model_cfg, cfg, loader_seed, train, valid, device),
        r => bail!("unsupported input rank {}", r),
    }
}

fn train_loop<const D: usize>(
    model_cfg:   &ClassifierConfig,
    cfg:         &TrainConfig,
    loader_seed: u64,
    train:       ClassDataset,
    valid:       ClassDataset,
    device:      Device,
) -> Result<(ClassifierModel<InferBackend>, History)> {
    let shape      = ModelInputs::sample_shape(&train);
    let has_valid  = valid.sample_count() > 0;

    // ── Build model ───────────────────────────────────────────────────────────
    let mut model: ClassifierModel<TrainBackend> = model_cfg.init(&device);
    tracing::info!(
        "Model ready: {} inputs, {} classes, reshape={}, dropout={}",
        model_cfg.input_size,
        model_cfg.num_classes,
        model_cfg.reshape_input,
        model_cfg.dropout,
    );

    let mut optim = AdamConfig::new().init();

    // ── Data loaders ──────────────────────────────────────────────────────────
    let train_batcher = ClassBatcher::<TrainBackend, D>::new(device.clone(), shape.clone());
    let train_loader  = DataLoaderBuilder::new(train_batcher)
        .batch_size(cfg.batch_size)
        .shuffle(loader_seed)
        .num_workers(1)
        .build(train);

    let val_batcher = ClassBatcher::<InferBackend, D>::new(device.clone(), shape);
    let val_loader  = DataLoaderBuilder::new(val_batcher)
        .batch_size(cfg.batch_size)
        .num_workers(1)
        .build(valid);

    let mut history = History::new();

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=cfg.epochs {
        let mut loss_sum = 0.0f64;
        let mut correct  = 0usize;
        let mut seen     = 0usize;
        let mut steps    = 0usize;

        for batch in train_loader.iter() {
            let batch_size = batch.targets.dims()[0];
            let (loss, logits) = model.forward_loss(batch.inputs, batch.targets.clone());

            loss_sum += loss.clone().into_scalar().elem::<f64>() * batch_size as f64;
            correct  += count_correct(logits, batch.targets);
            seen     += batch_size;
            steps    += 1;

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.lr, model, grads);
        }

        let loss     = mean_or_nan(loss_sum, seen);
        let accuracy = mean_or_nan(correct as f64, seen);
        history.push_float("loss", loss);
        history.push_float("accuracy", accuracy);
        history.push_float("lr", cfg.lr);
        history.push_int("batches", steps as i64);

        if has_valid {
            let model_valid = model.valid();
            let ce: CrossEntropyLoss<InferBackend> = CrossEntropyLossConfig::new().init(&device);

            let mut val_loss_sum = 0.0f64;
            let mut val_correct  = 0usize;
            let mut val_seen     = 0usize;

            for batch in val_loader.iter() {
                let batch_size = batch.targets.dims()[0];
                let logits     = model_valid.forward_logits(batch.inputs);
                let loss       = ce.forward(logits.clone(), batch.targets.clone());

                val_loss_sum += loss.into_scalar().elem::<f64>() * batch_size as f64;
                val_correct  += count_correct(logits, batch.targets);
                val_seen     += batch_size;
            }

            let val_loss     = mean_or_nan(val_loss_sum, val_seen);
            let val_accuracy = mean_or_nan(val_correct as f64, val_seen);
            history.push_float("val_loss", val_loss);
            history.push_float("val_accuracy", val_accuracy);

            tracing::info!(
                "Epoch {:>3}/{} | loss={:.4} | accuracy={:.1}% | val_loss={:.4} | val_accuracy={:.1}%",
                epoch, cfg.epochs, loss, accuracy * 100.0, val_loss, val_accuracy * 100.0,
            );
        } else {
            tracing::info!(
                "Epoch {:>3}/{} | loss={:.4} | accuracy={:.1}%",
                epoch, cfg.epochs, loss, accuracy * 100.0,
            );
        }
    }

    tracing::info!("Training complete after {} epochs", cfg.epochs);
    Ok((model.valid(), history))
}

/// Rows whose highest logit is the target class.
fn count_correct<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> usize {
    let predicted = logits.argmax(1).flatten::<1>(0, 1);
    predicted
        .equal(targets)
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>() as usize
}

fn mean_or_nan(sum: f64, count: usize) -> f64 {
    if count > 0 { sum / count as f64 } else { f64::NAN }
}
