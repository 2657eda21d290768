// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All tensor code lives here, generic over the burn Backend.
//
//   src ─▶ Embeddings + PE ─▶ Encoder ─▶ memory
//   tgt ─▶ Embeddings + PE ─▶ Decoder(memory) ─▶ OutputClassifier ─▶ logits
//
// Building blocks (bottom up):
//   init, mask, layer          Glorot init, masks, pre-norm residuals
//   attention, feed_forward    the two sublayer kinds
//   encoder, decoder           N-layer stacks with a final LayerNorm
//   embeddings, classifier     token tables, sinusoid table, vocab projection
//   model, config              Transformer + its Config tree
//
// Training and inference:
//   loss, schedule             label smoothing / CE, Noam rate wrapper
//   checkpoint                 one record file per epoch
//   trainer, inferencer        epoch loop, greedy translator
//
// Reference: Vaswani et al. (2017) Attention Is All You Need
//            Burn Book §3 (Building Blocks), §5 (Training)

pub mod attention;
pub mod checkpoint;
pub mod classifier;
pub mod config;
pub mod decoder;
pub mod embeddings;
pub mod encoder;
pub mod feed_forward;
pub mod inferencer;
pub mod init;
pub mod layer;
pub mod loss;
pub mod mask;
pub mod model;
pub mod schedule;
pub mod trainer;
