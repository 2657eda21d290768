// ============================================================
// Layer 4 — Parallel Corpus Encoding
// ============================================================
// SentencePair → Seq2SeqItem:
//
//   source ids = encode(source)
//   target ids = [start] + encode(target) + [stop]
//
// Pairs whose source or target has more than `max_length`
// tokens (before start/stop are added) are dropped.

use anyhow::{anyhow, Context, Result};

use crate::data::dataset::Seq2SeqItem;
use crate::domain::sentence_pair::SentencePair;
use crate::domain::vocabulary::Vocabulary;

pub fn encode_pairs<S, T>(
    pairs:      &[SentencePair],
    src_vocab:  &S,
    tgt_vocab:  &T,
    max_length: usize,
) -> Result<Vec<Seq2SeqItem>>
where
    S: Vocabulary + ?Sized,
    T: Vocabulary + ?Sized,
{
    let stop = tgt_vocab
        .stop_id()
        .ok_or_else(|| anyhow!("target vocabulary has no stop symbol"))?;

    let mut items   = Vec::with_capacity(pairs.len());
    let mut dropped = 0usize;

    for pair in pairs {
        let source = src_vocab
            .encode(&pair.source)
            .with_context(|| format!("Cannot encode source '{}'", pair.source))?;
        let body = tgt_vocab
            .encode(&pair.target)
            .with_context(|| format!("Cannot encode target '{}'", pair.target))?;

        if source.is_empty() || source.len() > max_length || body.len() > max_length {
            dropped += 1;
            continue;
        }

        let mut target = Vec::with_capacity(body.len() + 2);
        target.push(tgt_vocab.start_id());
        target.extend(body);
        target.push(stop);
        items.push(Seq2SeqItem::new(source, target));
    }

    tracing::info!(
        "Encoded {} pairs, dropped {} longer than {} tokens",
        items.len(),
        dropped,
        max_length
    );
    Ok(items)
}
