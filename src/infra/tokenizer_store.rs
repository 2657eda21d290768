// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Loads a pre-built `tokenizers` JSON file and exposes it as a
// Vocabulary. The special tokens are looked up by their text
// (by default `<s>`, `</s>`, `<blank>`), so the ids follow
// whatever the tokenizer file assigned.
//
// Building the vocabulary is out of scope: the files are
// produced once, outside this program, for each language.

use anyhow::{anyhow, Context, Result};
use std::path::Path;
use tokenizers::Tokenizer;

use crate::domain::vocabulary::Vocabulary;

/// Text of the three special tokens.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SpecialTokens {
    pub start: String,
    pub stop:  String,
    pub pad:   String,
}

impl Default for SpecialTokens {
    fn default() -> Self {
        Self {
            start: "<s>".to_string(),
            stop:  "</s>".to_string(),
            pad:   "<blank>".to_string(),
        }
    }
}

pub struct TokenizerVocabulary {
    tokenizer: Tokenizer,
    start_id:  usize,
    stop_id:   usize,
    pad_id:    usize,
}

impl TokenizerVocabulary {
    pub fn from_file(path: impl AsRef<Path>, specials: &SpecialTokens) -> Result<Self> {
        let path = path.as_ref();
        let tokenizer = Tokenizer::from_file(path)
            .map_err(|e| anyhow!("Cannot load tokenizer from '{}': {}", path.display(), e))?;
        Self::new(tokenizer, specials)
            .with_context(|| format!("Tokenizer '{}' lacks a special token", path.display()))
    }

    pub fn new(tokenizer: Tokenizer, specials: &SpecialTokens) -> Result<Self> {
        let id = |token: &str| {
            tokenizer
                .token_to_id(token)
                .map(|id| id as usize)
                .ok_or_else(|| anyhow!("token '{token}' is not in the vocabulary"))
        };
        let start_id = id(&specials.start)?;
        let stop_id  = id(&specials.stop)?;
        let pad_id   = id(&specials.pad)?;

        tracing::debug!(
            "Tokenizer vocabulary: {} ids (start {}, stop {}, pad {})",
            tokenizer.get_vocab_size(true),
            start_id,
            stop_id,
            pad_id
        );
        Ok(Self { tokenizer, start_id, stop_id, pad_id })
    }
}

impl Vocabulary for TokenizerVocabulary {
    fn token_to_id(&self, token: &str) -> Option<usize> {
        self.tokenizer.token_to_id(token).map(|id| id as usize)
    }

    fn id_to_token(&self, id: usize) -> Option<String> {
        u32::try_from(id).ok().and_then(|id| self.tokenizer.id_to_token(id))
    }

    fn len(&self) -> usize {
        self.tokenizer.get_vocab_size(true)
    }

    fn start_id(&self) -> usize {
        self.start_id
    }

    fn stop_id(&self) -> Option<usize> {
        Some(self.stop_id)
    }

    fn pad_id(&self) -> usize {
        self.pad_id
    }

    fn encode(&self, text: &str) -> Result<Vec<usize>> {
        let encoding = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| anyhow!("Tokenisation error: {e}"))?;
        Ok(encoding.get_ids().iter().map(|&id| id as usize).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_tokenizer(dir: &Path) -> std::path::PathBuf {
        let special = |id: u32, content: &str| serde_json::json!({
            "id": id, "content": content, "single_word": false, "lstrip": false,
            "rstrip": false, "normalized": false, "special": true
        });
        let json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [special(0, "<blank>"), special(1, "<s>"), special(2, "</s>"), special(3, "<unk>")],
            "normalizer": null,
            "pre_tokenizer": { "type": "Whitespace" },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": { "<blank>": 0, "<s>": 1, "</s>": 2, "<unk>": 3, "ein": 4, "haus": 5 },
                "unk_token": "<unk>"
            }
        });
        let path = dir.join("de.json");
        std::fs::write(&path, serde_json::to_string_pretty(&json).unwrap()).unwrap();
        path
    }

    #[test]
    fn test_special_ids_resolved() {
        let dir   = tempfile::tempdir().unwrap();
        let vocab = TokenizerVocabulary::from_file(write_tokenizer(dir.path()), &SpecialTokens::default()).unwrap();

        assert_eq!(vocab.len(), 6);
        assert_eq!((vocab.pad_id(), vocab.start_id(), vocab.stop_id()), (0, 1, Some(2)));
        assert_eq!(vocab.encode("ein haus").unwrap(), vec![4, 5]);
        assert_eq!(vocab.encode("ein boot").unwrap(), vec![4, 3]);
        assert_eq!(vocab.render(&[1, 4, 5, 2, 0]), "ein haus");
    }

    #[test]
    fn test_missing_special_token_rejected() {
        let dir      = tempfile::tempdir().unwrap();
        let specials = SpecialTokens { start: "<bos>".into(), ..SpecialTokens::default() };
        assert!(TokenizerVocabulary::from_file(write_tokenizer(dir.path()), &specials).is_err());
    }

    #[test]
    fn test_missing_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(TokenizerVocabulary::from_file(dir.path().join("none.json"), &SpecialTokens::default()).is_err());
    }
}
