// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Two sources of training pairs, one batching path:
//
//   copy task                      parallel corpus (.tsv)
//   CopyTask (seeded rng)          TsvCorpusLoader → Preprocessor
//       │                              │
//       │                          encode_pairs (tokenizers, length filter)
//       │                              │
//       │                          split_train_val (seeded)
//       ▼                              ▼
//              Seq2SeqDataset  (burn Dataset)
//                     │
//                     ▼
//              Seq2SeqBatcher  → pad, shift target, build masks
//                     │
//                     ▼
//              DataLoader      → training loop

/// In-memory dataset of id-sequence pairs
pub mod dataset;

/// Synthetic copy task: target = source
pub mod copy_task;

/// Reads tab-separated sentence pairs from disk
pub mod loader;

/// Normalises whitespace and control characters in corpus lines
pub mod preprocessor;

/// Tokenises sentence pairs and drops over-long ones
pub mod parallel_corpus;

/// Seeded shuffle + train/validation split
pub mod splitter;

/// Implements burn's Batcher trait for seq2seq batches
pub mod batcher;
