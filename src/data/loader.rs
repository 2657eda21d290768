// ============================================================
// Layer 4 — Parallel Corpus Loader
// ============================================================
// Reads a tab-separated file with one aligned pair per line:
//
//   <source sentence> \t <target sentence>
//
// Lines without a tab or with a blank side are skipped with a
// warning instead of failing the whole corpus. Both sides go
// through the Preprocessor before they are returned.

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};

use crate::data::preprocessor::Preprocessor;
use crate::domain::sentence_pair::SentencePair;
use crate::domain::traits::PairSource;

pub struct TsvCorpusLoader {
    path: PathBuf,
}

impl TsvCorpusLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PairSource for TsvCorpusLoader {
    fn load_all(&self) -> Result<Vec<SentencePair>> {
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("Cannot read corpus '{}'", self.path.display()))?;

        let preprocessor = Preprocessor::new();
        let mut pairs    = Vec::new();
        let mut skipped  = 0usize;

        for (line_no, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let Some((source, target)) = line.split_once('\t') else {
                tracing::warn!("{}:{}: no tab separator, line skipped", self.path.display(), line_no + 1);
                skipped += 1;
                continue;
            };

            let pair = SentencePair::new(preprocessor.clean(source), preprocessor.clean(target));
            if pair.is_blank() {
                skipped += 1;
                continue;
            }
            pairs.push(pair);
        }

        tracing::info!(
            "Loaded {} sentence pairs from '{}' ({} skipped)",
            pairs.len(),
            self.path.display(),
            skipped
        );
        Ok(pairs)
    }
}
