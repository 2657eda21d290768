// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Workflow coordination only: no tensor code and no printing.
//
//   train_use_case   build data → experiment folder → train
//   decode_use_case  experiment folder → model → greedy decode

pub mod train_use_case;

pub mod decode_use_case;
