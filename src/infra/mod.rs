// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything that touches the filesystem on behalf of a run:
//
//   vocab_store.rs — Vocabulary artifact
//                    bincode bundle written once by `prepare`,
//                    loaded read-only by every training run.
//
//   checkpoint.rs  — Saving and loading model weights
//                    Uses Burn's CompactRecorder. Also saves
//                    the run's configuration as JSON.
//
//   metrics.rs     — Scalar metrics as tag,step,value CSV rows
//
//   run_log.rs     — Timestamped progress log of one run

/// Vocabulary artifact persistence
pub mod vocab_store;

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;

/// Per-run progress log
pub mod run_log;
