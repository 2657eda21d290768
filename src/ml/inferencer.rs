// ============================================================
// Layer 5 — Inferencer
// ============================================================
// text ─encode─▶ ids [1, S] ─padding mask─▶ greedy_decode ─render─▶ text
//
// One sentence at a time; the model is expected to come out of
// a checkpoint already (see application::decode_use_case).

use anyhow::{ensure, Context, Result};
use burn::{prelude::*, tensor::TensorData};

use crate::domain::{traits::Translator, vocabulary::Vocabulary};
use crate::ml::mask::padding_mask;
use crate::ml::model::Transformer;

pub struct GreedyTranslator<B: Backend> {
    model:      Transformer<B>,
    src_vocab:  Box<dyn Vocabulary>,
    tgt_vocab:  Box<dyn Vocabulary>,
    max_length: usize,
    device:     B::Device,
}

impl<B: Backend> GreedyTranslator<B> {
    pub fn new(
        model:      Transformer<B>,
        src_vocab:  Box<dyn Vocabulary>,
        tgt_vocab:  Box<dyn Vocabulary>,
        max_length: usize,
        device:     B::Device,
    ) -> Self {
        Self { model, src_vocab, tgt_vocab, max_length, device }
    }

    /// Raw decoded ids, start id included.
    pub fn decode_ids(&self, input: &str) -> Result<Vec<usize>> {
        let ids = self.src_vocab.encode(input)?;
        ensure!(!ids.is_empty(), "input contains no tokens");

        let len  = ids.len();
        let data = TensorData::new(ids.into_iter().map(|id| id as i64).collect::<Vec<_>>(), [1, len]);
        let src  = Tensor::<B, 2, Int>::from_data(data, &self.device);
        let mask = padding_mask(src.clone(), self.src_vocab.pad_id());

        let decoded = self
            .model
            .greedy_decode(src, &mask, self.tgt_vocab.start_id(), self.tgt_vocab.stop_id(), self.max_length)
            .context("Greedy decoding failed")?
            .pop()
            .context("Greedy decoding returned no rows")?;
        tracing::debug!("Decoded {} ids from {} source tokens", decoded.len(), len);
        Ok(decoded)
    }
}

impl<B: Backend> Translator for GreedyTranslator<B> {
    fn translate(&self, input: &str) -> Result<String> {
        let ids = self.decode_ids(input)?;
        Ok(self.tgt_vocab.render(&ids))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::vocabulary::IndexVocabulary;
    use crate::ml::config::{AttentionConfig, FeedForwardConfig, TransformerConfig};
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn translator(max_length: usize) -> GreedyTranslator<TestBackend> {
        let device = Default::default();
        let model  = TransformerConfig::new(
            16, 1, 11, 11,
            AttentionConfig::for_model(16, 2),
            FeedForwardConfig::new(32),
        )
        .init::<TestBackend>(&device)
        .unwrap();
        GreedyTranslator::new(
            model,
            Box::new(IndexVocabulary::digits(11).unwrap()),
            Box::new(IndexVocabulary::digits(11).unwrap()),
            max_length,
            device,
        )
    }

    #[test]
    fn test_output_length_bounded() {
        let t   = translator(6);
        let ids = t.decode_ids("1 4 5 6").unwrap();
        assert_eq!(ids.len(), 6);
        assert_eq!(ids[0], 1);

        // pad ids are dropped when rendering
        let visible = ids[1..].iter().filter(|&&id| id != 0).count();
        let text    = t.translate("1 4 5 6").unwrap();
        assert_eq!(text.split_whitespace().count(), visible);
    }

    #[test]
    fn test_unknown_or_empty_input_rejected() {
        let t = translator(4);
        assert!(t.translate("1 42").is_err());
        assert!(t.translate("   ").is_err());
    }
}
