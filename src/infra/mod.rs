// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Filesystem concerns shared by training and decoding:
//
//   experiment.rs      — per-run folder experiments/<task>/<timestamp>/
//                        and its params.json
//
//   checkpoint.rs      — model_epoch_{n}.mpk.gz naming and the
//                        latest_epoch.json pointer
//
//   metrics.rs         — per-batch statistics CSVs and log lines
//
//   run_log.rs         — tracing writer for <run>/training.log
//
//   tokenizer_store.rs — pre-built `tokenizers` files exposed as
//                        a Vocabulary

/// Experiment folder layout and parameter persistence
pub mod experiment;

/// Per-epoch checkpoint files
pub mod checkpoint;

/// Training / validation statistics
pub mod metrics;

/// Tokenizer-backed vocabulary
pub mod tokenizer_store;

/// Per-run log file writer
pub mod run_log;
