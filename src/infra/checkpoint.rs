// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Names and tracks the per-epoch checkpoint files of one run:
//
//   models/
//     model_epoch_1.mpk.gz   ← parameters + metadata after epoch 1
//     model_epoch_2.mpk.gz
//     latest_epoch.json      ← number of the newest epoch
//
// The record itself (fields, recorder, precision) is defined in
// ml::checkpoint; this type only deals with the directory.

use anyhow::{Context, Result};
use burn::prelude::*;
use std::{fs, path::PathBuf};

use crate::ml::checkpoint::CheckpointMeta;
use crate::ml::model::Transformer;

const LATEST_EPOCH_FILE: &str = "latest_epoch.json";

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    fn stem(&self, epoch: usize) -> PathBuf {
        self.dir.join(format!("model_epoch_{epoch}"))
    }

    /// Writes the epoch file (never overwriting) and moves the latest pointer.
    pub fn save<B: Backend>(&self, model: &Transformer<B>, epoch: usize, loss: f64) -> Result<PathBuf> {
        let file = model
            .save_checkpoint(&self.stem(epoch), epoch, loss)
            .with_context(|| format!("Failed to save checkpoint for epoch {epoch}"))?;

        let latest = self.dir.join(LATEST_EPOCH_FILE);
        fs::write(&latest, serde_json::to_string(&epoch)?)
            .with_context(|| format!("Failed to write '{}'", latest.display()))?;

        tracing::info!("Checkpoint saved: '{}'", file.display());
        Ok(file)
    }

    /// Loads `epoch`, or the latest one when `None`.
    pub fn load<B: Backend>(
        &self,
        model:  Transformer<B>,
        epoch:  Option<usize>,
        device: &B::Device,
    ) -> Result<(Transformer<B>, CheckpointMeta)> {
        let epoch = match epoch {
            Some(epoch) => epoch,
            None        => self.latest_epoch()?,
        };

        let loaded = model
            .load_checkpoint(&self.stem(epoch), device)
            .with_context(|| {
                format!("Cannot load checkpoint for epoch {epoch} from '{}'", self.dir.display())
            })?;
        Ok(loaded)
    }

    pub fn latest_epoch(&self) -> Result<usize> {
        let path = self.dir.join(LATEST_EPOCH_FILE);
        let s = fs::read_to_string(&path).with_context(|| {
            format!("Cannot find '{}'. Have you run 'train' first?", path.display())
        })?;
        Ok(serde_json::from_str::<usize>(&s)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::config::{AttentionConfig, FeedForwardConfig, TransformerConfig};
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn model() -> Transformer<TestBackend> {
        TransformerConfig::new(8, 1, 5, 5, AttentionConfig::for_model(8, 2), FeedForwardConfig::new(16))
            .with_max_len(16)
            .init(&Default::default())
            .unwrap()
    }

    #[test]
    fn test_latest_epoch_tracks_saves() {
        let dir     = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path().join("models")).unwrap();
        let m       = model();

        manager.save(&m, 1, 2.0).unwrap();
        manager.save(&m, 2, 1.0).unwrap();
        assert_eq!(manager.latest_epoch().unwrap(), 2);

        let (_, meta) = manager.load(model(), None, &Default::default()).unwrap();
        assert_eq!((meta.epoch, meta.loss), (2, 1.0));

        let (_, meta) = manager.load(model(), Some(1), &Default::default()).unwrap();
        assert_eq!(meta.epoch, 1);
    }

    #[test]
    fn test_epoch_file_not_overwritten() {
        let dir     = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path()).unwrap();
        manager.save(&model(), 1, 2.0).unwrap();
        assert!(manager.save(&model(), 1, 1.0).is_err());
    }

    #[test]
    fn test_missing_run_reports_error() {
        let dir     = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path()).unwrap();
        assert!(manager.latest_epoch().is_err());
        assert!(manager.load(model(), Some(4), &Default::default()).is_err());
    }
}
