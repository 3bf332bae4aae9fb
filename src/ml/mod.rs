// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All network, loss and optimiser code lives here.
//
//   model.rs       — the VqaNet contract every network implements,
//                    hyper-parameters per model kind, and the
//                    shared image encoder
//
//   baseline.rs    — global image feature × LSTM question encoding
//
//   coattention.rs — question-guided image attention plus
//                    image-guided question attention
//
//   evaluator.rs   — budgeted accuracy / loss on validation data
//
//   trainer.rs     — the step-driven training loop: logging,
//                    periodic validation and checkpointing
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Antol et al. (2015) VQA: Visual Question Answering
//            Lu et al. (2016) Hierarchical Question-Image Co-Attention

/// Model contract and shared building blocks
pub mod model;

/// Baseline image × question network
pub mod baseline;

/// Co-attention network
pub mod coattention;

/// Validation accuracy and loss
pub mod evaluator;

/// Training loop with validation and checkpointing
pub mod trainer;
