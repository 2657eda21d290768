// ============================================================
// Layer 5 — Attention Masks
// ============================================================
// A mask is a boolean tensor of shape [batch|1, query|1, key]
// where TRUE marks a key position the query may attend to.
//
//   padding mask     [batch, 1, key]   true where the key is real content
//   subsequent mask  [1, n, n]         true where key_index <= query_index
//
// The decoder's self-attention uses the AND of both, so a
// target position sees neither padding nor the future.
//
// burn's `mask_fill` writes where its mask is TRUE, so the
// attention code inverts these masks before filling scores.

use burn::prelude::*;

use crate::error::{Error, Result};

pub type Mask<B> = Tensor<B, 3, Bool>;

/// Lower-triangular `[1, size, size]` mask: `[0, i, j]` is true iff `j <= i`.
pub fn subsequent_mask<B: Backend>(size: usize, device: &B::Device) -> Mask<B> {
    let flags: Vec<i32> = (0..size)
        .flat_map(|i| (0..size).map(move |j| i32::from(j <= i)))
        .collect();

    Tensor::<B, 1, Int>::from_ints(flags.as_slice(), device)
        .reshape([1, size, size])
        .equal_elem(1)
}

/// `[batch, 1, seq]` mask, true wherever `ids` is not the pad id.
pub fn padding_mask<B: Backend>(ids: Tensor<B, 2, Int>, pad_id: usize) -> Mask<B> {
    ids.equal_elem(pad_id as i64)
        .bool_not()
        .unsqueeze_dim::<3>(1)
}

/// Logical AND of two masks, broadcasting size-1 batch/query dimensions.
pub fn mask_and<B: Backend>(lhs: Mask<B>, rhs: Mask<B>) -> Result<Mask<B>> {
    let l = lhs.dims();
    let r = rhs.dims();

    let batch = broadcast_dim(l[0], r[0]).ok_or_else(|| mismatch(&l, &r))?;
    let query = broadcast_dim(l[1], r[1]).ok_or_else(|| mismatch(&l, &r))?;
    if l[2] != r[2] {
        return Err(mismatch(&l, &r));
    }

    Ok(and_expanded(lhs, rhs, [batch, query, l[2]]))
}

/// Combined padding + causal mask for decoder self-attention.
///
/// `target_padding` is `[batch, 1, t]` (or already `[batch, t, t]`);
/// the result is `[batch, t, t]`.
pub fn decoder_self_mask<B: Backend>(target_padding: Mask<B>) -> Result<Mask<B>> {
    let t      = target_padding.dims()[2];
    let causal = subsequent_mask::<B>(t, &target_padding.device());
    mask_and(target_padding, causal)
}

/// `[batch, t, t]` self-attention mask straight from decoder input ids.
pub fn target_mask<B: Backend>(tgt: Tensor<B, 2, Int>, pad_id: usize) -> Mask<B> {
    let [batch, t] = tgt.dims();
    let causal     = subsequent_mask::<B>(t, &tgt.device());
    and_expanded(padding_mask(tgt, pad_id), causal, [batch, t, t])
}

/// Broadcast `mask` onto an attention-score shape `[batch, heads, query, key]`.
pub(crate) fn expand_to_scores<B: Backend>(mask: &Mask<B>, scores: [usize; 4]) -> Result<Tensor<B, 4, Bool>> {
    let [batch, heads, query, key] = scores;
    let [mb, mq, mk] = mask.dims();

    let fits = (mb == batch || mb == 1) && (mq == query || mq == 1) && mk == key;
    if !fits {
        return Err(Error::shape(
            "attention mask",
            format!("[{batch}|1, {query}|1, {key}]"),
            &[mb, mq, mk],
        ));
    }

    Ok(mask
        .clone()
        .unsqueeze_dim::<4>(1)
        .expand([batch, heads, query, key]))
}

fn and_expanded<B: Backend>(lhs: Mask<B>, rhs: Mask<B>, shape: [usize; 3]) -> Mask<B> {
    lhs.expand(shape).bool_and(rhs.expand(shape))
}

fn broadcast_dim(a: usize, b: usize) -> Option<usize> {
    match (a, b) {
        _ if a == b => Some(a),
        (1, _) => Some(b),
        (_, 1) => Some(a),
        _ => None,
    }
}

fn mismatch(l: &[usize; 3], r: &[usize; 3]) -> Error {
    Error::shape("mask_and", format!("broadcastable with {l:?}"), r)
}
