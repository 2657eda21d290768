// ============================================================
// Layer 6 — Experiment Folder
// ============================================================
// Every training run gets its own directory:
//
//   experiments/
//     copy/
//       20261016_142501/
//         params.json                 ← full TrainConfig
//         training.log                ← copy of the run's log output
//         training_statistics.csv
//         validation_statistics.csv
//         models/
//           model_epoch_1.mpk.gz
//           latest_epoch.json
//
// The timestamp folder must not exist yet: a run never writes
// into another run's directory.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::application::train_use_case::TrainConfig;

pub const PARAMS_FILE: &str = "params.json";
pub const MODELS_DIR:  &str = "models";
pub const LOG_FILE:    &str = "training.log";

pub struct Experiment {
    dir: PathBuf,
}

impl Experiment {
    /// `base/<task>/<now>` with a fresh `models/` directory.
    pub fn create(base: impl AsRef<Path>, task: &str) -> Result<Self> {
        Self::create_at(base, task, Local::now())
    }

    pub fn create_at(base: impl AsRef<Path>, task: &str, started: DateTime<Local>) -> Result<Self> {
        let dir = base
            .as_ref()
            .join(task)
            .join(started.format("%Y%m%d_%H%M%S").to_string());

        if dir.exists() {
            bail!("Experiment folder '{}' already exists", dir.display());
        }
        fs::create_dir_all(dir.join(MODELS_DIR))
            .with_context(|| format!("Cannot create experiment folder '{}'", dir.display()))?;
        fs::File::create(dir.join(LOG_FILE))
            .with_context(|| format!("Cannot create '{}'", dir.join(LOG_FILE).display()))?;

        tracing::info!("Experiment folder: '{}'", dir.display());
        Ok(Self { dir })
    }

    /// An existing run, e.g. for decoding.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.join(PARAMS_FILE).is_file() {
            bail!(
                "'{}' is not an experiment folder (no {}). Have you run 'train' first?",
                dir.display(),
                PARAMS_FILE
            );
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn models_dir(&self) -> PathBuf {
        self.dir.join(MODELS_DIR)
    }

    pub fn log_path(&self) -> PathBuf {
        self.dir.join(LOG_FILE)
    }

    pub fn save_params(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join(PARAMS_FILE);
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write parameters to '{}'", path.display()))?;
        tracing::debug!("Saved training parameters to '{}'", path.display());
        Ok(())
    }

    pub fn load_params(&self) -> Result<TrainConfig> {
        let path = self.dir.join(PARAMS_FILE);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read parameters from '{}'", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Malformed parameters in '{}'", path.display()))
    }
}
