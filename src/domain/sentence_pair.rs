// ============================================================
// Layer 3 — SentencePair Domain Type
// ============================================================
// One aligned line of a parallel corpus, before tokenisation.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentencePair {
    /// Text in the source language
    pub source: String,

    /// Reference translation in the target language
    pub target: String,
}

impl SentencePair {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    /// True when either side is blank after trimming.
    pub fn is_blank(&self) -> bool {
        self.source.trim().is_empty() || self.target.trim().is_empty()
    }
}
