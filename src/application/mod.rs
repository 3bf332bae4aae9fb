// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates all the other layers to accomplish
// a specific goal (preparing a corpus or training a model).
//
// Rules for this layer:
//   - No ML math or model code here
//   - No argument parsing or printing here (that's Layer 1)
//   - Only workflow coordination

// Raw VQA JSON → corpus file + vocabulary artifact
pub mod prepare_use_case;

// The training workflow
pub mod train_use_case;
