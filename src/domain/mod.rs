// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types and traits describing what the system
// works with, independent of burn and of any file format:
//
//   sentence_pair.rs — a raw source/target sentence pair
//   vocabulary.rs    — token ⇄ id mapping with start/stop/pad ids
//   traits.rs        — capabilities other layers implement
//
// Nothing here touches tensors, devices or the filesystem.

/// A raw parallel-corpus entry
pub mod sentence_pair;

/// Token ⇄ id lookup used by batching and decoding
pub mod vocabulary;

/// Pair sources and translators
pub mod traits;
