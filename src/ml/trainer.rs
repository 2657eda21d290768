// ============================================================
// Layer 5 — Training Loop
// ============================================================
// One epoch:
//
//   for batch in train_loader:
//       logits = model(src, src_mask, tgt_in, tgt_mask)
//       loss   = objective(logits, tgt_y)        label smoothing or CE
//       grads  = loss.backward()
//       model  = noam.step(model, grads)         Adam at the Noam rate
//       log    epoch / episode / loss
//
//   checkpoint(model, epoch, last batch loss)
//   validation with model.valid()  (inner backend, no dropout),
//   the whole validation set as one batch
//
// Episode counters (one per phase) run over all epochs.
// Returns the mean validation loss of the last epoch.

use std::sync::Arc;

use anyhow::{ensure, Result};
use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::{Seq2SeqBatch, Seq2SeqBatcher},
    dataset::Seq2SeqDataset,
};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{Phase, StatisticsLogger},
};
use crate::ml::loss::{LossFunction, Objective};
use crate::ml::model::Transformer;
use crate::ml::schedule::{NoamConfig, NoamOptimizer};

pub fn run_training<B: AutodiffBackend>(
    cfg:           &TrainConfig,
    pad_id:        usize,
    train_dataset: Seq2SeqDataset,
    val_dataset:   Seq2SeqDataset,
    checkpoints:   &CheckpointManager,
    statistics:    &StatisticsLogger,
    device:        B::Device,
) -> Result<f64> {
    ensure!(cfg.batch_size > 0, "batch size must be positive");
    ensure!(cfg.epochs > 0, "at least one epoch is required");

    // ── Build model ───────────────────────────────────────────────────────────
    let mut model: Transformer<B> = cfg.model.init(&device)?;
    tracing::info!(
        "Model ready: N={}, d_model={}, {} parameters",
        cfg.model.n_layers,
        cfg.model.d_model,
        model.num_params()
    );

    let objective = Objective::new(cfg.model.tgt_vocab_size, pad_id, cfg.smoothing)?;

    // ── Adam under the Noam schedule ──────────────────────────────────────────
    let opt  = &cfg.optimizer;
    let adam = AdamConfig::new()
        .with_beta_1(opt.beta_1)
        .with_beta_2(opt.beta_2)
        .with_epsilon(opt.epsilon)
        .init::<B, Transformer<B>>();
    let noam_cfg = NoamConfig::new(cfg.model.d_model)
        .with_factor(opt.factor)
        .with_warmup(opt.warmup);
    let mut optim = NoamOptimizer::new(&noam_cfg, adam);

    // ── Data loaders ──────────────────────────────────────────────────────────
    let train_loader: Arc<dyn DataLoader<B, Seq2SeqBatch<B>>> =
        DataLoaderBuilder::new(Seq2SeqBatcher::new(pad_id))
            .batch_size(cfg.batch_size)
            .shuffle(cfg.seed)
            .num_workers(1)
            .build(train_dataset);

    let val_loader: Arc<dyn DataLoader<B::InnerBackend, Seq2SeqBatch<B::InnerBackend>>> =
        DataLoaderBuilder::new(Seq2SeqBatcher::new(pad_id))
            .batch_size(val_dataset.item_count().max(1))
            .num_workers(1)
            .build(val_dataset);

    // ── Epoch loop ────────────────────────────────────────────────────────────
    let mut episode       = 0usize;
    let mut val_episode   = 0usize;
    let mut last_val_loss = f64::NAN;

    for epoch in 1..=cfg.epochs {
        let mut last_loss      = f64::NAN;
        let mut train_loss_sum = 0.0f64;
        let mut train_batches  = 0usize;

        for batch in train_loader.iter() {
            let logits = model.forward(batch.src, &batch.src_mask, batch.tgt_in, &batch.tgt_mask)?;
            let loss   = objective.forward(logits, batch.tgt_y)?;

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(model, grads);

            episode        += 1;
            train_batches  += 1;
            train_loss_sum += loss_val;
            last_loss       = loss_val;
            statistics.log(Phase::Training, epoch, episode, loss_val)?;
        }

        checkpoints.save(&model, epoch, last_loss)?;

        // ── Validation ────────────────────────────────────────────────────────
        let model_valid = model.valid();

        let mut val_loss_sum = 0.0f64;
        let mut val_batches  = 0usize;

        for batch in val_loader.iter() {
            let logits = model_valid.forward(batch.src, &batch.src_mask, batch.tgt_in, &batch.tgt_mask)?;
            let loss: f64 = objective.forward(logits, batch.tgt_y)?.into_scalar().elem::<f64>();

            val_episode  += 1;
            val_batches  += 1;
            val_loss_sum += loss;
            statistics.log(Phase::Validation, epoch, val_episode, loss)?;
        }

        let avg_train_loss = if train_batches > 0 { train_loss_sum / train_batches as f64 } else { f64::NAN };
        last_val_loss      = if val_batches   > 0 { val_loss_sum   / val_batches   as f64 } else { f64::NAN };

        tracing::info!(
            "Epoch {:>3}/{} | train_loss={:.4} | val_loss={:.4} | lr={:.3e} | steps={}",
            epoch, cfg.epochs, avg_train_loss, last_val_loss, optim.rate(), optim.steps(),
        );
    }

    tracing::info!("Training complete");
    Ok(last_val_loss)
}
