// ============================================================
// Core error type
// ============================================================
// Every fallible operation of the model engine returns this
// error. The orchestration layers (cli, application) wrap it
// in anyhow with extra context; the core never retries.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Hyper-parameters that cannot form a valid model.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A tensor (usually a mask) whose shape does not fit the operation.
    #[error("shape mismatch in {op}: expected {expected}, got {actual:?}")]
    Shape {
        op:       &'static str,
        expected: String,
        actual:   Vec<usize>,
    },

    #[error("token id {id} is outside the vocabulary of size {vocab_size}")]
    TokenOutOfRange { id: i64, vocab_size: usize },

    #[error("sequence length {len} exceeds the positional table length {max_len}")]
    SequenceTooLong { len: usize, max_len: usize },

    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("checkpoint '{}' already exists", .0.display())]
    CheckpointExists(PathBuf),

    /// The recorder failed to write a checkpoint.
    #[error("recorder error: {0}")]
    Record(String),
}

impl Error {
    pub(crate) fn shape(op: &'static str, expected: impl Into<String>, actual: &[usize]) -> Self {
        Error::Shape {
            op,
            expected: expected.into(),
            actual:   actual.to_vec(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io { path: path.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
