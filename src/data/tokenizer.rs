// ============================================================
// Layer 4 — Question Tokenizer
// ============================================================
// Splits question text into word tokens with the HuggingFace
// BERT pre-tokenizer: whitespace separates words and every
// punctuation character becomes its own token.
//
//   "What's on the table?" → what ' s on the table ?
//
// Tokens are lowercased. The same tokenizer must be used when
// the vocabulary is built and when samples are encoded.

use tokenizers::pre_tokenizers::bert::BertPreTokenizer;
use tokenizers::{OffsetReferential, OffsetType, PreTokenizedString, PreTokenizer};

use crate::domain::error::{VqaError, VqaResult};
use crate::domain::traits::WordTokenizer;

#[derive(Debug, Clone, Copy, Default)]
pub struct BertWordTokenizer;

impl BertWordTokenizer {
    pub fn new() -> Self {
        Self
    }
}

impl WordTokenizer for BertWordTokenizer {
    fn tokenize(&self, text: &str) -> VqaResult<Vec<String>> {
        let lowered = text.to_lowercase();
        let mut pretokenized = PreTokenizedString::from(lowered.as_str());

        BertPreTokenizer
            .pre_tokenize(&mut pretokenized)
            .map_err(|e| VqaError::data(format!("question '{text}'"), format!("tokenizer failed: {e}")))?;

        Ok(pretokenized
            .get_splits(OffsetReferential::Original, OffsetType::Byte)
            .into_iter()
            .map(|(word, _, _)| word.to_string())
            .collect())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splits_words_and_punctuation() {
        let t = BertWordTokenizer::new();
        assert_eq!(t.tokenize("Is it a cat?").unwrap(), vec!["is", "it", "a", "cat", "?"]);
    }

    #[test]
    fn test_contraction_yields_bare_s() {
        let t = BertWordTokenizer::new();
        assert_eq!(t.tokenize("what's that").unwrap(), vec!["what", "'", "s", "that"]);
    }

    #[test]
    fn test_empty_question_has_no_tokens() {
        let t = BertWordTokenizer::new();
        assert!(t.tokenize("   ").unwrap().is_empty());
    }
}
