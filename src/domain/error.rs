// ============================================================
// Layer 3 — Error Taxonomy
// ============================================================
// Every failure the pipeline can report, grouped by where it
// comes from. The application layer wraps these in anyhow
// with extra context; the variants themselves carry the
// offending value or path so the message stands on its own.
//
// VqaError is Clone because data errors are produced inside
// data-loader workers and handed to the training loop as part
// of a batch.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum VqaError {
    /// Missing, conflicting or out-of-range settings
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A corpus record or sample that cannot be used
    #[error("data error in {origin}: {message}")]
    Data { origin: String, message: String },

    /// The vocabulary artifact is absent, unreadable or inconsistent
    #[error("vocabulary artifact '{}': {message}", .path.display())]
    Artifact { path: PathBuf, message: String },

    /// Loss (or another training quantity) stopped being finite
    #[error("non-finite {quantity} at step {step}: {value}")]
    Numeric { quantity: &'static str, step: usize, value: f64 },

    #[error("evaluation processed no full batch (sample budget {budget}, batch size {batch_size})")]
    EmptyEvaluation { budget: usize, batch_size: usize },

    #[error("{0} is not implemented")]
    Unsupported(String),
}

impl VqaError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn data(origin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Data { origin: origin.into(), message: message.into() }
    }

    pub fn artifact(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Artifact { path: path.into(), message: message.into() }
    }
}

pub type VqaResult<T> = Result<T, VqaError>;
