// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Runs one experiment end to end:
//
//   Step 1: Build train/validation data    (Layer 4 - data)
//           copy task:   synthetic, seeded
//           translation: TSV corpus + tokenizers, seeded split
//   Step 2: Create the experiment folder   (Layer 6 - infra)
//           and start copying the log into training.log
//   Step 3: Save params.json               (Layer 6 - infra)
//   Step 4: Run the training loop          (Layer 5 - ml)
//           on Autodiff<NdArray> or Autodiff<Wgpu>

use anyhow::{ensure, Context, Result};
use burn::backend::{wgpu::WgpuDevice, Autodiff, NdArray, Wgpu};
use serde::{Deserialize, Serialize};

use crate::data::{
    copy_task::{CopyTask, COPY_PAD_ID},
    dataset::Seq2SeqDataset,
    loader::TsvCorpusLoader,
    parallel_corpus::encode_pairs,
    splitter::split_train_val,
};
use crate::domain::{traits::PairSource, vocabulary::Vocabulary};
use crate::infra::{
    checkpoint::CheckpointManager,
    experiment::Experiment,
    metrics::StatisticsLogger,
    run_log::RunLog,
    tokenizer_store::{SpecialTokens, TokenizerVocabulary},
};
use crate::ml::config::{AttentionConfig, FeedForwardConfig, TransformerConfig};
use crate::ml::trainer::run_training;

// ─── Training Configuration ──────────────────────────────────────────────────
// Everything needed to rerun or reload an experiment. Saved verbatim
// as params.json; decoding rebuilds the model from `model`.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComputeDevice {
    Cpu,
    Wgpu,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyTaskConfig {
    /// Vocabulary size; ids are drawn from 1..max_int.
    pub max_int:       usize,
    pub seq_length:    usize,
    pub train_samples: usize,
    pub valid_samples: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    /// Tab-separated `source<TAB>target` lines.
    pub corpus:         String,
    pub src_tokenizer:  String,
    pub tgt_tokenizer:  String,
    pub max_seq_length: usize,
    pub train_fraction: f64,
    pub specials:       SpecialTokens,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TaskConfig {
    Copy(CopyTaskConfig),
    Translation(TranslationConfig),
}

impl TaskConfig {
    pub fn name(&self) -> &'static str {
        match self {
            TaskConfig::Copy(_)        => "copy",
            TaskConfig::Translation(_) => "translation",
        }
    }
}

/// Adam moments plus the Noam schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerConfig {
    pub beta_1:  f32,
    pub beta_2:  f32,
    pub epsilon: f32,
    pub factor:  f64,
    pub warmup:  usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self { beta_1: 0.9, beta_2: 0.98, epsilon: 1e-9, factor: 1.0, warmup: 400 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub task:            TaskConfig,
    pub model:           TransformerConfig,
    pub optimizer:       OptimizerConfig,
    pub epochs:          usize,
    pub batch_size:      usize,
    /// Label smoothing when set, plain cross-entropy otherwise.
    pub smoothing:       Option<f64>,
    pub seed:            u64,
    pub device:          ComputeDevice,
    pub experiments_dir: String,
}

impl TrainConfig {
    /// Two-layer model copying random digit sequences.
    pub fn copy_task() -> Self {
        let vocab = 11;
        Self {
            task: TaskConfig::Copy(CopyTaskConfig {
                max_int:       vocab,
                seq_length:    10,
                train_samples: 30 * 20,
                valid_samples: 10,
            }),
            model:           base_model(2, vocab, vocab),
            optimizer:       OptimizerConfig::default(),
            epochs:          10,
            batch_size:      30,
            smoothing:       None,
            seed:            42,
            device:          ComputeDevice::Cpu,
            experiments_dir: "experiments".to_string(),
        }
    }

    /// Base model on a parallel corpus. Vocabulary sizes are filled in
    /// from the tokenizers when training starts.
    pub fn translation() -> Self {
        Self {
            task: TaskConfig::Translation(TranslationConfig {
                corpus:         "data/train.tsv".to_string(),
                src_tokenizer:  "data/tokenizer_src.json".to_string(),
                tgt_tokenizer:  "data/tokenizer_tgt.json".to_string(),
                max_seq_length: 40,
                train_fraction: 0.9,
                specials:       SpecialTokens::default(),
            }),
            model:           base_model(6, 0, 0),
            optimizer:       OptimizerConfig { warmup: 2000, ..OptimizerConfig::default() },
            epochs:          10,
            batch_size:      32,
            smoothing:       Some(0.1),
            seed:            42,
            device:          ComputeDevice::Cpu,
            experiments_dir: "experiments".to_string(),
        }
    }
}

/// d_model 512, 8 heads, d_ff 2048.
fn base_model(n_layers: usize, src_vocab: usize, tgt_vocab: usize) -> TransformerConfig {
    TransformerConfig::new(
        512,
        n_layers,
        src_vocab,
        tgt_vocab,
        AttentionConfig::for_model(512, 8),
        FeedForwardConfig::new(2048),
    )
}

/// Train and validation data plus the pad id they were padded with.
struct PreparedData {
    train:  Seq2SeqDataset,
    valid:  Seq2SeqDataset,
    pad_id: usize,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config:  TrainConfig,
    run_log: RunLog,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config, run_log: RunLog::default() }
    }

    /// File writer of the installed subscriber; attached to the
    /// experiment's training.log for the duration of `execute`.
    pub fn with_run_log(mut self, run_log: RunLog) -> Self {
        self.run_log = run_log;
        self
    }

    /// Returns the final validation loss.
    pub fn execute(&self) -> Result<f64> {
        let mut cfg = self.config.clone();

        // ── Step 1: Datasets ──────────────────────────────────────────────────
        let data = prepare_data(&mut cfg)?;
        tracing::info!(
            "Datasets ready: {} train, {} validation",
            data.train.item_count(),
            data.valid.item_count()
        );
        cfg.model.validate()?;

        // ── Step 2: Experiment folder ─────────────────────────────────────────
        let experiment = Experiment::create(&cfg.experiments_dir, cfg.task.name())?;
        self.run_log.attach(&experiment.log_path())?;
        tracing::info!("Logging to '{}'", experiment.log_path().display());

        let outcome = train_in(&experiment, &cfg, data);
        self.run_log.detach();
        outcome
    }
}

fn train_in(experiment: &Experiment, cfg: &TrainConfig, data: PreparedData) -> Result<f64> {
    // ── Step 3: Save params (vocab sizes are now final) ───────────────────────
    experiment.save_params(cfg)?;

    // ── Step 4: Train ─────────────────────────────────────────────────────────
    let checkpoints = CheckpointManager::new(experiment.models_dir())?;
    let statistics  = StatisticsLogger::new(experiment.dir())?;

    let PreparedData { train, valid, pad_id } = data;
    let loss = match cfg.device {
        ComputeDevice::Cpu => run_training::<Autodiff<NdArray>>(
            cfg, pad_id, train, valid, &checkpoints, &statistics, Default::default(),
        )?,
        ComputeDevice::Wgpu => run_training::<Autodiff<Wgpu>>(
            cfg, pad_id, train, valid, &checkpoints, &statistics, WgpuDevice::default(),
        )?,
    };

    tracing::info!("Final validation loss: {:.6}", loss);
    Ok(loss)
}

fn prepare_data(cfg: &mut TrainConfig) -> Result<PreparedData> {
    match &cfg.task {
        TaskConfig::Copy(task) => {
            let generator = CopyTask::new(task.max_int, task.seq_length)?;
            cfg.model.src_vocab_size = task.max_int;
            cfg.model.tgt_vocab_size = task.max_int;
            Ok(PreparedData {
                train:  generator.dataset(task.train_samples, cfg.seed),
                valid:  generator.dataset(task.valid_samples, cfg.seed.wrapping_add(1)),
                pad_id: COPY_PAD_ID,
            })
        }
        TaskConfig::Translation(task) => {
            let src_vocab = TokenizerVocabulary::from_file(&task.src_tokenizer, &task.specials)?;
            let tgt_vocab = TokenizerVocabulary::from_file(&task.tgt_tokenizer, &task.specials)?;
            ensure!(
                src_vocab.pad_id() == tgt_vocab.pad_id(),
                "source and target tokenizers disagree on the pad id ({} vs {})",
                src_vocab.pad_id(),
                tgt_vocab.pad_id()
            );

            let pairs = TsvCorpusLoader::new(&task.corpus).load_all()?;
            tracing::info!("Loaded {} sentence pairs from '{}'", pairs.len(), task.corpus);

            let items = encode_pairs(&pairs, &src_vocab, &tgt_vocab, task.max_seq_length)
                .context("Failed to encode the parallel corpus")?;
            ensure!(!items.is_empty(), "no usable sentence pairs in '{}'", task.corpus);

            let (train, valid) = split_train_val(items, task.train_fraction, cfg.seed);
            let pad_id = tgt_vocab.pad_id();
            cfg.model.src_vocab_size = src_vocab.len();
            cfg.model.tgt_vocab_size = tgt_vocab.len();

            Ok(PreparedData {
                train:  Seq2SeqDataset::new(train),
                valid:  Seq2SeqDataset::new(valid),
                pad_id,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let copy = TrainConfig::copy_task();
        assert_eq!(copy.model.n_layers, 2);
        assert_eq!(copy.model.tgt_vocab_size, 11);
        assert_eq!(copy.optimizer.warmup, 400);
        assert!(copy.smoothing.is_none());
        assert!(copy.model.validate().is_ok());

        let translation = TrainConfig::translation();
        assert_eq!(translation.model.n_layers, 6);
        assert_eq!(translation.optimizer.warmup, 2000);
        assert_eq!(translation.smoothing, Some(0.1));
    }

    #[test]
    fn test_params_json_shape() {
        let json = serde_json::to_value(TrainConfig::copy_task()).unwrap();
        assert_eq!(json["task"]["kind"], "copy");
        assert_eq!(json["device"], "cpu");
        assert_eq!(json["model"]["attention"]["n_head"], 8);

        let back: TrainConfig = serde_json::from_value(json).unwrap();
        assert!(matches!(back.task, TaskConfig::Copy(ref t) if t.seq_length == 10));
    }

    #[test]
    fn test_copy_data_uses_task_vocabulary() {
        let mut cfg = TrainConfig::copy_task();
        cfg.model.src_vocab_size = 0;
        let data = prepare_data(&mut cfg).unwrap();
        assert_eq!(data.train.item_count(), 600);
        assert_eq!(data.valid.item_count(), 10);
        assert_eq!(data.pad_id, 0);
        assert_eq!(cfg.model.src_vocab_size, 11);
    }

    #[test]
    fn test_run_writes_training_log() {
        use crate::infra::experiment::LOG_FILE;
        use tracing_subscriber::{fmt, prelude::*};

        let base    = tempfile::tempdir().unwrap();
        let run_log = RunLog::default();

        let mut cfg = TrainConfig::copy_task();
        cfg.task = TaskConfig::Copy(CopyTaskConfig {
            max_int: 11, seq_length: 5, train_samples: 8, valid_samples: 4,
        });
        cfg.model           = base_model(1, 11, 11);
        cfg.model.d_model   = 16;
        cfg.model.attention = crate::ml::config::AttentionConfig::for_model(16, 2);
        cfg.model.feed_forward = crate::ml::config::FeedForwardConfig::new(32);
        cfg.epochs          = 1;
        cfg.batch_size      = 4;
        cfg.experiments_dir = base.path().to_string_lossy().into_owned();

        let subscriber = tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(run_log.clone()));
        let loss = tracing::subscriber::with_default(subscriber, || {
            TrainUseCase::new(cfg).with_run_log(run_log.clone()).execute()
        }).unwrap();
        assert!(loss.is_finite());

        let run = std::fs::read_dir(base.path()).unwrap().next().unwrap().unwrap().path();
        let log = std::fs::read_to_string(run.join(LOG_FILE)).unwrap();
        assert!(log.contains("Epoch   1/1"));
        assert!(log.contains("Final validation loss"));

        // detached once the run ends
        tracing::subscriber::with_default(
            tracing_subscriber::registry().with(fmt::layer().with_writer(run_log.clone())),
            || tracing::info!("after the run"),
        );
        let after = std::fs::read_to_string(run.join(LOG_FILE)).unwrap();
        assert_eq!(log, after);
    }

    #[test]
    fn test_missing_corpus_reported() {
        let mut cfg = TrainConfig::translation();
        if let TaskConfig::Translation(t) = &mut cfg.task {
            t.src_tokenizer = "does/not/exist.json".into();
        }
        assert!(prepare_data(&mut cfg).is_err());
    }
}
