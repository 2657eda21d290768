// ============================================================
// Layer 6 — Statistics Logger
// ============================================================
// One CSV row per batch, split by phase:
//
//   training_statistics.csv     epoch,episode,loss
//   validation_statistics.csv   epoch,episode,loss
//
// `episode` counts batches across the whole run, not per
// epoch. The same numbers go to the log as
//
//   epoch 01 episode 000042 loss 2.3025850930
//   [Validation] epoch 01 episode 000001 loss 1.9000000000

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

pub const TRAINING_CSV:   &str = "training_statistics.csv";
pub const VALIDATION_CSV: &str = "validation_statistics.csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Training,
    Validation,
}

/// Log line for one batch.
pub fn format_statistics(phase: Phase, epoch: usize, episode: usize, loss: f64) -> String {
    let line = format!("epoch {:02} episode {:06} loss {:12.10}", epoch, episode, loss);
    match phase {
        Phase::Training   => line,
        Phase::Validation => format!("[Validation] {line}"),
    }
}

pub struct StatisticsLogger {
    training:   PathBuf,
    validation: PathBuf,
}

impl StatisticsLogger {
    /// Creates both CSV files (with header) inside `dir` if missing.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create statistics directory '{}'", dir.display()))?;

        let training   = dir.join(TRAINING_CSV);
        let validation = dir.join(VALIDATION_CSV);
        for path in [&training, &validation] {
            if !path.exists() {
                let mut f = fs::File::create(path)
                    .with_context(|| format!("Cannot create '{}'", path.display()))?;
                writeln!(f, "epoch,episode,loss")?;
                tracing::debug!("Created statistics CSV: '{}'", path.display());
            }
        }

        Ok(Self { training, validation })
    }

    /// Appends one row and emits the matching log line.
    pub fn log(&self, phase: Phase, epoch: usize, episode: usize, loss: f64) -> Result<()> {
        let path = self.csv_path(phase);
        let mut f = OpenOptions::new()
            .append(true)
            .open(path)
            .with_context(|| format!("Cannot open '{}'", path.display()))?;
        writeln!(f, "{},{},{}", epoch, episode, loss)?;

        tracing::info!("{}", format_statistics(phase, epoch, episode, loss));
        Ok(())
    }

    pub fn csv_path(&self, phase: Phase) -> &Path {
        match phase {
            Phase::Training   => &self.training,
            Phase::Validation => &self.validation,
        }
    }
}
