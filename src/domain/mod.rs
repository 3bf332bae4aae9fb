// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types shared by every other layer. No Burn types,
// no file I/O.

/// One (image, question, answer) corpus line
pub mod record;

/// Error taxonomy for the whole pipeline
pub mod error;

/// Tokenizer and image-source abstractions
pub mod traits;
