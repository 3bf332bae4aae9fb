// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The two external collaborators of the data pipeline. Both are
// pure from the pipeline's point of view: the same input always
// yields the same output.
//
//   WordTokenizer — question text → ordered word tokens
//   ImageSource   — image path    → fixed-shape pixel tensor (CHW)

use std::path::Path;

use crate::domain::error::VqaResult;

/// Splits a question into word tokens.
pub trait WordTokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> VqaResult<Vec<String>>;
}

/// Decoded, resized and normalised image pixels in channel-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePixels {
    /// `[channels, height, width]`
    pub shape:  [usize; 3],
    pub values: Vec<f32>,
}

/// Loads an image file as a tensor of a shape that is the same for
/// every image in a dataset.
pub trait ImageSource: Send + Sync {
    fn load(&self, path: &Path) -> VqaResult<ImagePixels>;

    /// `[channels, height, width]` of every image this source produces
    fn shape(&self) -> [usize; 3];
}
