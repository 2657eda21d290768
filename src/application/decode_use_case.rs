// ============================================================
// Layer 2 — DecodeUseCase
// ============================================================
// Rebuilds a trained model from an experiment folder:
//
//   Step 1: Read params.json              (Layer 6 - infra)
//   Step 2: Rebuild the vocabularies      (Layer 3 / Layer 6)
//   Step 3: Init the model, load weights  (Layer 5 / Layer 6)
//   Step 4: Greedy decoding per request   (Layer 5 - ml)

use std::path::PathBuf;

use anyhow::Result;
use burn::{
    backend::{wgpu::WgpuDevice, NdArray, Wgpu},
    prelude::*,
};

use crate::application::train_use_case::{ComputeDevice, TaskConfig, TrainConfig};
use crate::domain::{
    traits::Translator,
    vocabulary::{IndexVocabulary, Vocabulary},
};
use crate::infra::{
    checkpoint::CheckpointManager,
    experiment::Experiment,
    tokenizer_store::TokenizerVocabulary,
};
use crate::ml::inferencer::GreedyTranslator;

#[derive(Debug, Clone)]
pub struct DecodeRequest {
    pub experiment_dir: PathBuf,
    /// Latest checkpoint when `None`.
    pub epoch:          Option<usize>,
    /// Defaults to the training sequence length (plus start/stop).
    pub max_length:     Option<usize>,
    /// Defaults to the device used for training.
    pub device:         Option<ComputeDevice>,
}

pub struct DecodeUseCase {
    translator: Box<dyn Translator>,
}

impl DecodeUseCase {
    pub fn new(request: DecodeRequest) -> Result<Self> {
        // ── Step 1: Params ────────────────────────────────────────────────────
        let experiment = Experiment::open(&request.experiment_dir)?;
        let cfg        = experiment.load_params()?;
        let max_length = request.max_length.unwrap_or_else(|| default_max_length(&cfg));
        let device     = request.device.unwrap_or(cfg.device);

        // ── Step 2: Vocabularies ──────────────────────────────────────────────
        let (src_vocab, tgt_vocab) = vocabularies(&cfg)?;

        // ── Steps 3 + 4 on the chosen backend ─────────────────────────────────
        let checkpoints = CheckpointManager::new(experiment.models_dir())?;
        let translator: Box<dyn Translator> = match device {
            ComputeDevice::Cpu => Box::new(load_translator::<NdArray>(
                &cfg, &checkpoints, request.epoch, src_vocab, tgt_vocab, max_length, Default::default(),
            )?),
            ComputeDevice::Wgpu => Box::new(load_translator::<Wgpu>(
                &cfg, &checkpoints, request.epoch, src_vocab, tgt_vocab, max_length, WgpuDevice::default(),
            )?),
        };

        Ok(Self { translator })
    }
}

impl Translator for DecodeUseCase {
    fn translate(&self, input: &str) -> Result<String> {
        self.translator.translate(input)
    }
}

fn default_max_length(cfg: &TrainConfig) -> usize {
    match &cfg.task {
        TaskConfig::Copy(task)        => task.seq_length,
        TaskConfig::Translation(task) => task.max_seq_length + 2,
    }
}

type VocabularyPair = (Box<dyn Vocabulary>, Box<dyn Vocabulary>);

fn vocabularies(cfg: &TrainConfig) -> Result<VocabularyPair> {
    match &cfg.task {
        TaskConfig::Copy(task) => Ok((
            Box::new(IndexVocabulary::digits(task.max_int)?),
            Box::new(IndexVocabulary::digits(task.max_int)?),
        )),
        TaskConfig::Translation(task) => Ok((
            Box::new(TokenizerVocabulary::from_file(&task.src_tokenizer, &task.specials)?),
            Box::new(TokenizerVocabulary::from_file(&task.tgt_tokenizer, &task.specials)?),
        )),
    }
}

fn load_translator<B: Backend>(
    cfg:         &TrainConfig,
    checkpoints: &CheckpointManager,
    epoch:       Option<usize>,
    src_vocab:   Box<dyn Vocabulary>,
    tgt_vocab:   Box<dyn Vocabulary>,
    max_length:  usize,
    device:      B::Device,
) -> Result<GreedyTranslator<B>> {
    let model         = cfg.model.init::<B>(&device)?;
    let (model, meta) = checkpoints.load(model, epoch, &device)?;
    tracing::info!("Decoding with epoch {} (loss {:.4})", meta.epoch, meta.loss);
    Ok(GreedyTranslator::new(model, src_vocab, tgt_vocab, max_length, device))
}
