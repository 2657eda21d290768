// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Two subcommands:
//
//   train   --task copy|translation [overrides]
//   decode  --experiment-dir DIR --input TEXT [--epoch N]
//
// Every `train` flag is optional and overrides the task preset.

use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::application::{
    decode_use_case::DecodeRequest,
    train_use_case::{ComputeDevice, TaskConfig, TrainConfig},
};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a model and write an experiment folder
    Train(TrainArgs),

    /// Greedy-decode one input with a trained checkpoint
    Decode(DecodeArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskArg {
    /// Copy random digit sequences (synthetic)
    Copy,
    /// Tab-separated parallel corpus with pre-built tokenizers
    Translation,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceArg {
    Cpu,
    Wgpu,
}

impl From<DeviceArg> for ComputeDevice {
    fn from(d: DeviceArg) -> Self {
        match d {
            DeviceArg::Cpu  => ComputeDevice::Cpu,
            DeviceArg::Wgpu => ComputeDevice::Wgpu,
        }
    }
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    #[arg(long, value_enum, default_value_t = TaskArg::Copy)]
    pub task: TaskArg,

    #[arg(long)]
    pub epochs: Option<usize>,

    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Label smoothing; 0 trains with plain cross-entropy
    #[arg(long)]
    pub smoothing: Option<f64>,

    /// Warmup steps of the learning-rate schedule
    #[arg(long)]
    pub warmup: Option<usize>,

    #[arg(long, value_enum)]
    pub device: Option<DeviceArg>,

    #[arg(long)]
    pub seed: Option<u64>,

    /// Root folder; runs land in <dir>/<task>/<timestamp>
    #[arg(long)]
    pub experiments_dir: Option<String>,

    /// Translation only: tab-separated corpus
    #[arg(long)]
    pub corpus: Option<String>,

    /// Translation only: tokenizers JSON for the source language
    #[arg(long)]
    pub src_tokenizer: Option<String>,

    /// Translation only: tokenizers JSON for the target language
    #[arg(long)]
    pub tgt_tokenizer: Option<String>,

    /// Translation only: longer pairs are dropped
    #[arg(long)]
    pub max_seq_length: Option<usize>,
}

/// Preset for the task with the given flags applied on top.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        let mut cfg = match a.task {
            TaskArg::Copy        => TrainConfig::copy_task(),
            TaskArg::Translation => TrainConfig::translation(),
        };

        if let Some(epochs) = a.epochs         { cfg.epochs = epochs; }
        if let Some(size)   = a.batch_size     { cfg.batch_size = size; }
        if let Some(warmup) = a.warmup         { cfg.optimizer.warmup = warmup; }
        if let Some(device) = a.device         { cfg.device = device.into(); }
        if let Some(seed)   = a.seed           { cfg.seed = seed; }
        if let Some(dir)    = a.experiments_dir { cfg.experiments_dir = dir; }
        if let Some(s)      = a.smoothing {
            cfg.smoothing = if s > 0.0 { Some(s) } else { None };
        }

        if let TaskConfig::Translation(t) = &mut cfg.task {
            if let Some(path) = a.corpus         { t.corpus = path; }
            if let Some(path) = a.src_tokenizer  { t.src_tokenizer = path; }
            if let Some(path) = a.tgt_tokenizer  { t.tgt_tokenizer = path; }
            if let Some(len)  = a.max_seq_length { t.max_seq_length = len; }
        }
        cfg
    }
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Folder written by `train` (contains params.json and models/)
    #[arg(long)]
    pub experiment_dir: PathBuf,

    /// Epoch to load; latest when omitted
    #[arg(long)]
    pub epoch: Option<usize>,

    /// Sentence (or digit sequence) to decode
    #[arg(long)]
    pub input: String,

    /// Maximum output length, start symbol included
    #[arg(long)]
    pub max_length: Option<usize>,

    #[arg(long, value_enum)]
    pub device: Option<DeviceArg>,
}

impl From<&DecodeArgs> for DecodeRequest {
    fn from(a: &DecodeArgs) -> Self {
        DecodeRequest {
            experiment_dir: a.experiment_dir.clone(),
            epoch:          a.epoch,
            max_length:     a.max_length,
            device:         a.device.map(Into::into),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    fn train_config(args: &[&str]) -> TrainConfig {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Train(a) => a.into(),
            other              => panic!("expected train, got {other:?}"),
        }
    }

    #[test]
    fn test_copy_preset_with_overrides() {
        let cfg = train_config(&["prog", "train", "--epochs", "3", "--device", "wgpu", "--seed", "7"]);
        assert!(matches!(cfg.task, TaskConfig::Copy(_)));
        assert_eq!(cfg.epochs, 3);
        assert_eq!(cfg.seed, 7);
        assert_eq!(cfg.device, ComputeDevice::Wgpu);
        assert_eq!(cfg.batch_size, 30);
    }

    #[test]
    fn test_translation_paths_and_zero_smoothing() {
        let cfg = train_config(&[
            "prog", "train", "--task", "translation",
            "--corpus", "de-en.tsv", "--src-tokenizer", "de.json", "--tgt-tokenizer", "en.json",
            "--smoothing", "0",
        ]);
        assert!(cfg.smoothing.is_none());
        match cfg.task {
            TaskConfig::Translation(t) => {
                assert_eq!(t.corpus, "de-en.tsv");
                assert_eq!(t.src_tokenizer, "de.json");
                assert_eq!(t.tgt_tokenizer, "en.json");
                assert_eq!(t.max_seq_length, 40);
            }
            other => panic!("expected translation, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_args() {
        let cli = Cli::try_parse_from([
            "prog", "decode", "--experiment-dir", "experiments/copy/x", "--input", "1 2 3", "--epoch", "4",
        ])
        .unwrap();
        let Commands::Decode(args) = cli.command else { panic!("expected decode") };
        let request = DecodeRequest::from(&args);
        assert_eq!(request.epoch, Some(4));
        assert_eq!(request.device, None);
        assert_eq!(args.input, "1 2 3");
    }

    #[test]
    fn test_decode_requires_input() {
        assert!(Cli::try_parse_from(["prog", "decode", "--experiment-dir", "x"]).is_err());
    }
}
