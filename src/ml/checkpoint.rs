// ============================================================
// Layer 5 — Checkpoint Record
// ============================================================
// One record per epoch:
//
//   { name, state_dict, model_timestamp, epoch, loss }
//
// written with NamedMpkGzFileRecorder at full precision so a
// save/load round trip reproduces every parameter bit for bit.
// Records are backend-agnostic: a checkpoint written from the
// GPU backend loads on the CPU one and vice versa.
//
// Only model parameters are stored. The Noam step counter and
// Adam moments are not, so loading does not resume training.

use std::{
    fs::File,
    io,
    path::{Path, PathBuf},
};

use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Record, Recorder},
};
use chrono::Local;

use crate::error::{Error, Result};
use crate::ml::model::{Transformer, TransformerRecord};

pub const MODEL_NAME: &str = "Transformer";

/// Extension the recorder appends to every checkpoint stem.
pub const CHECKPOINT_EXTENSION: &str = "mpk.gz";

type CheckpointRecorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

#[derive(Record)]
pub struct CheckpointRecord<B: Backend> {
    pub name:            String,
    pub state_dict:      TransformerRecord<B>,
    pub model_timestamp: String,
    pub epoch:           usize,
    pub loss:            f64,
}

/// Everything in a checkpoint except the parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointMeta {
    pub name:            String,
    pub model_timestamp: String,
    pub epoch:           usize,
    pub loss:            f64,
}

/// File actually written for the extension-less `stem`.
pub fn checkpoint_file(stem: &Path) -> PathBuf {
    stem.with_extension(CHECKPOINT_EXTENSION)
}

/// Refuses to replace an existing file.
pub fn save<B: Backend>(model: &Transformer<B>, stem: &Path, epoch: usize, loss: f64) -> Result<PathBuf> {
    let file = checkpoint_file(stem);
    if file.exists() {
        return Err(Error::CheckpointExists(file));
    }

    let record = CheckpointRecord {
        name:            MODEL_NAME.to_string(),
        state_dict:      model.clone().into_record(),
        model_timestamp: Local::now().to_rfc3339(),
        epoch,
        loss,
    };

    CheckpointRecorder::new()
        .record(record, stem.to_path_buf())
        .map_err(|e| Error::Record(e.to_string()))?;

    tracing::debug!("wrote checkpoint '{}'", file.display());
    Ok(file)
}

pub fn load<B: Backend>(
    model:  Transformer<B>,
    stem:   &Path,
    device: &B::Device,
) -> Result<(Transformer<B>, CheckpointMeta)> {
    let file = checkpoint_file(stem);
    File::open(&file).map_err(|e| Error::io(&file, e))?;

    // An unreadable or truncated record is reported against its file.
    let record: CheckpointRecord<B> = CheckpointRecorder::new()
        .load(stem.to_path_buf(), device)
        .map_err(|e| Error::io(&file, io::Error::new(io::ErrorKind::InvalidData, e.to_string())))?;

    let meta = CheckpointMeta {
        name:            record.name,
        model_timestamp: record.model_timestamp,
        epoch:           record.epoch,
        loss:            record.loss,
    };
    tracing::info!(
        "Imported {} parameters from checkpoint from {} (epoch: {}, loss: {})",
        meta.name, meta.model_timestamp, meta.epoch, meta.loss
    );

    Ok((model.load_record(record.state_dict), meta))
}
