// ============================================================
// Layer 4 — Sample Encoder
// ============================================================
// Turns one corpus record into the fixed-shape numeric sample
// the model consumes:
//
//   question → token ids, truncated or right-padded with <PAD>
//              to max_seq_length, plus the unpadded length
//   answer   → class id (UNKNOWN when outside the top-K)
//   image    → normalised pixel tensor from the ImageSource
//
// The same Vocabulary (and therefore the same max_seq_length)
// is used for every split.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::data::vocab::{Vocabulary, WordIndex, PAD_INDEX};
use crate::domain::error::{VqaError, VqaResult};
use crate::domain::record::CorpusRecord;
use crate::domain::traits::{ImagePixels, ImageSource, WordTokenizer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedQuestion {
    /// Exactly max_seq_length ids
    pub token_ids:   Vec<usize>,
    /// Real tokens before padding, capped at max_seq_length
    pub true_length: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EncodedSample {
    pub token_ids:   Vec<usize>,
    pub true_length: usize,
    pub image:       ImagePixels,
    pub label:       usize,
}

pub fn encode_question(tokens: &[String], words: &WordIndex) -> EncodedQuestion {
    let max_len = words.max_seq_length;
    let mut token_ids: Vec<usize> = tokens
        .iter()
        .take(max_len)
        .map(|t| words.index_of(t))
        .collect();
    let true_length = token_ids.len();
    token_ids.resize(max_len, PAD_INDEX);
    EncodedQuestion { token_ids, true_length }
}

/// Map token ids back to words, dropping padding.
pub fn decode_question(token_ids: &[usize], words: &WordIndex) -> Vec<String> {
    token_ids
        .iter()
        .filter(|&&id| id != PAD_INDEX)
        .map(|&id| words.word(id).unwrap_or("<?>").to_string())
        .collect()
}

#[derive(Clone)]
pub struct SampleEncoder {
    vocab:     Arc<Vocabulary>,
    tokenizer: Arc<dyn WordTokenizer>,
    images:    Arc<dyn ImageSource>,
    image_dir: PathBuf,
}

impl SampleEncoder {
    pub fn new(
        vocab:     Arc<Vocabulary>,
        tokenizer: Arc<dyn WordTokenizer>,
        images:    Arc<dyn ImageSource>,
        image_dir: impl Into<PathBuf>,
    ) -> Self {
        Self { vocab, tokenizer, images, image_dir: image_dir.into() }
    }

    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    pub fn image_path(&self, record: &CorpusRecord) -> PathBuf {
        self.image_dir.join(&record.image_file)
    }

    /// Encode the question and answer of `record`.
    /// `origin` names the record in error messages.
    pub fn encode_text(&self, record: &CorpusRecord, origin: &str) -> VqaResult<(EncodedQuestion, usize)> {
        let tokens = self.tokenizer.tokenize(&record.question)?;
        if tokens.is_empty() {
            return Err(VqaError::data(origin, "question is empty"));
        }
        let question = encode_question(&tokens, &self.vocab.words);
        let label = self.vocab.labels.index_of(&record.answer);
        Ok((question, label))
    }

    pub fn load_image(&self, path: &Path) -> VqaResult<ImagePixels> {
        self.images.load(path)
    }

    /// Full encoding, image included.
    pub fn encode(&self, record: &CorpusRecord, origin: &str) -> VqaResult<EncodedSample> {
        let (question, label) = self.encode_text(record, origin)?;
        let image = self.load_image(&self.image_path(record))?;
        Ok(EncodedSample {
            token_ids:   question.token_ids,
            true_length: question.true_length,
            image,
            label,
        })
    }
}
