// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer only sees these traits:
//
//   PairSource  — TsvCorpusLoader reads a tab-separated file
//   Translator  — DecodeUseCase runs greedy decoding on a
//                 trained checkpoint

use anyhow::Result;

use crate::domain::sentence_pair::SentencePair;

// ─── PairSource ───────────────────────────────────────────────────────────────
/// Anything that yields aligned sentence pairs.
pub trait PairSource {
    fn load_all(&self) -> Result<Vec<SentencePair>>;
}

// ─── Translator ───────────────────────────────────────────────────────────────
/// Anything that maps a source sentence to a target sentence.
pub trait Translator {
    fn translate(&self, input: &str) -> Result<String>;
}
