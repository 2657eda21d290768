// ============================================================
// Layer 6 — Run Log
// ============================================================
// Second tracing output next to stdout: every event is also
// appended to `<experiment>/training.log` once a run folder
// exists.
//
//   main:        registry ─┬─ fmt::layer()              → stdout
//                          └─ fmt::layer().with_writer(RunLog) → file
//   train:       run_log.attach(experiment.log_path())
//
// Until `attach` is called (and after `detach`) the file layer
// drops its output.

use anyhow::{Context, Result};
use std::{
    fs::{File, OpenOptions},
    io::{self, Write},
    path::Path,
    sync::{Arc, Mutex},
};
use tracing_subscriber::fmt::MakeWriter;

#[derive(Clone, Default)]
pub struct RunLog {
    file: Arc<Mutex<Option<File>>>,
}

impl RunLog {
    /// Appends all further events to `path`.
    pub fn attach(&self, path: &Path) -> Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Cannot open run log '{}'", path.display()))?;

        if let Ok(mut slot) = self.file.lock() {
            *slot = Some(file);
        }
        tracing::debug!("Run log attached: '{}'", path.display());
        Ok(())
    }

    pub fn detach(&self) {
        if let Ok(mut slot) = self.file.lock() {
            if let Some(mut file) = slot.take() {
                let _ = file.flush();
            }
        }
    }
}

pub struct RunLogWriter {
    file: Arc<Mutex<Option<File>>>,
}

impl Write for RunLogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.file.lock() {
            Ok(mut slot) => match slot.as_mut() {
                Some(file) => file.write(buf),
                None       => Ok(buf.len()),
            },
            Err(_) => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.lock() {
            Ok(mut slot) => slot.as_mut().map_or(Ok(()), |file| file.flush()),
            Err(_)       => Ok(()),
        }
    }
}

impl<'a> MakeWriter<'a> for RunLog {
    type Writer = RunLogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        RunLogWriter { file: Arc::clone(&self.file) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::{fmt, prelude::*};

    fn subscriber(run_log: &RunLog) -> impl tracing::Subscriber + Send + Sync {
        tracing_subscriber::registry().with(fmt::layer().with_ansi(false).with_writer(run_log.clone()))
    }

    #[test]
    fn test_events_reach_attached_file() {
        let dir     = tempfile::tempdir().unwrap();
        let path    = dir.path().join("training.log");
        let run_log = RunLog::default();
        run_log.attach(&path).unwrap();

        tracing::subscriber::with_default(subscriber(&run_log), || {
            tracing::info!("epoch 01 episode 000001 loss 2.5000000000");
        });
        run_log.detach();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("epoch 01 episode 000001 loss 2.5000000000"));
    }

    #[test]
    fn test_nothing_written_when_detached() {
        let dir     = tempfile::tempdir().unwrap();
        let path    = dir.path().join("training.log");
        let run_log = RunLog::default();
        run_log.attach(&path).unwrap();
        run_log.detach();

        tracing::subscriber::with_default(subscriber(&run_log), || {
            tracing::info!("after detach");
        });

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }
}
