// ============================================================
// Layer 3 — Vocabulary
// ============================================================
// Bidirectional token ⇄ id mapping plus the three ids the
// model treats specially:
//
//   start  — first decoder input of every target sequence
//   stop   — ends a decoded sequence (optional: the copy task
//            has none and always runs to max length)
//   pad    — filler; masked out of attention and the loss
//
// IndexVocabulary is a plain ordered token list. The tokenizer
// backed implementation lives in infra::tokenizer_store.

use std::collections::HashMap;

use anyhow::{anyhow, bail, Result};

pub trait Vocabulary {
    fn token_to_id(&self, token: &str) -> Option<usize>;

    fn id_to_token(&self, id: usize) -> Option<String>;

    /// Number of ids, i.e. the model's vocabulary size.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn start_id(&self) -> usize;

    fn stop_id(&self) -> Option<usize>;

    fn pad_id(&self) -> usize;

    /// Whitespace-separated tokens → ids. Unknown tokens are an error.
    fn encode(&self, text: &str) -> Result<Vec<usize>> {
        text.split_whitespace()
            .map(|token| {
                self.token_to_id(token)
                    .ok_or_else(|| anyhow!("unknown token '{token}'"))
            })
            .collect()
    }

    /// Ids → text. A leading start id is dropped, output ends at the
    /// first stop id and pad ids are skipped.
    fn render(&self, ids: &[usize]) -> String {
        let body = match ids.first() {
            Some(&first) if first == self.start_id() => &ids[1..],
            _ => ids,
        };
        body.iter()
            .take_while(|&&id| Some(id) != self.stop_id())
            .filter(|&&id| id != self.pad_id())
            .filter_map(|&id| self.id_to_token(id))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone)]
pub struct IndexVocabulary {
    tokens:   Vec<String>,
    index:    HashMap<String, usize>,
    start_id: usize,
    stop_id:  Option<usize>,
    pad_id:   usize,
}

impl IndexVocabulary {
    pub fn new(
        tokens:   Vec<String>,
        start_id: usize,
        stop_id:  Option<usize>,
        pad_id:   usize,
    ) -> Result<Self> {
        let size = tokens.len();
        for (name, id) in [("start", Some(start_id)), ("stop", stop_id), ("pad", Some(pad_id))] {
            if let Some(id) = id {
                if id >= size {
                    bail!("{name} id {id} is outside a vocabulary of {size} tokens");
                }
            }
        }

        let mut index = HashMap::with_capacity(size);
        for (id, token) in tokens.iter().enumerate() {
            if index.insert(token.clone(), id).is_some() {
                bail!("duplicate token '{token}' in vocabulary");
            }
        }

        Ok(Self { tokens, index, start_id, stop_id, pad_id })
    }

    /// `"0"`, `"1"`, … `"n-1"`: pad 0, start 1, no stop symbol.
    /// This is the copy-task vocabulary.
    pub fn digits(n: usize) -> Result<Self> {
        let tokens = (0..n).map(|i| i.to_string()).collect();
        Self::new(tokens, 1, None, 0)
    }
}

impl Vocabulary for IndexVocabulary {
    fn token_to_id(&self, token: &str) -> Option<usize> {
        self.index.get(token).copied()
    }

    fn id_to_token(&self, id: usize) -> Option<String> {
        self.tokens.get(id).cloned()
    }

    fn len(&self) -> usize {
        self.tokens.len()
    }

    fn start_id(&self) -> usize {
        self.start_id
    }

    fn stop_id(&self) -> Option<usize> {
        self.stop_id
    }

    fn pad_id(&self) -> usize {
        self.pad_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digit_vocabulary_roundtrip() {
        let vocab = IndexVocabulary::digits(11).unwrap();
        assert_eq!(vocab.len(), 11);
        assert_eq!(vocab.token_to_id("7"), Some(7));
        assert_eq!(vocab.id_to_token(10).as_deref(), Some("10"));
        assert_eq!(vocab.id_to_token(11), None);
        assert_eq!((vocab.pad_id(), vocab.start_id(), vocab.stop_id()), (0, 1, None));
    }

    #[test]
    fn test_encode_rejects_unknown_token() {
        let vocab = IndexVocabulary::digits(5).unwrap();
        assert_eq!(vocab.encode(" 1 2  4 ").unwrap(), vec![1, 2, 4]);
        assert!(vocab.encode("1 9").is_err());
    }

    #[test]
    fn test_render_skips_special_ids() {
        let tokens = ["<blank>", "<s>", "</s>", "hallo", "welt"].map(String::from).to_vec();
        let vocab  = IndexVocabulary::new(tokens, 1, Some(2), 0).unwrap();
        assert_eq!(vocab.render(&[1, 3, 4, 2, 0]), "hallo welt");
        assert_eq!(vocab.render(&[1, 3, 2, 4]), "hallo");
    }

    #[test]
    fn test_render_keeps_content_equal_to_start() {
        // the copy task reuses the start id as an ordinary symbol
        let vocab = IndexVocabulary::digits(11).unwrap();
        assert_eq!(vocab.render(&[1, 1, 5, 1, 0]), "1 5 1");
    }

    #[test]
    fn test_invalid_special_ids_rejected() {
        let tokens = vec!["a".to_string(), "b".to_string()];
        assert!(IndexVocabulary::new(tokens.clone(), 2, None, 0).is_err());
        assert!(IndexVocabulary::new(tokens, 0, Some(5), 1).is_err());
        assert!(IndexVocabulary::new(vec!["a".into(), "a".into()], 0, None, 1).is_err());
    }
}
