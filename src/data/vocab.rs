// ============================================================
// Layer 4 — Vocabulary and Label Builders
// ============================================================
// Builds the two index spaces the model works in, from the
// training corpus only:
//
//   WordIndex  — question words → token ids
//     0 <PAD>   1 <UNKNOWN>   2 s   3 /s   then corpus words
//     in first-encountered order, if seen >= min_word_count
//
//   LabelIndex — answer strings → class ids
//     0 UNKNOWN   then the top-K answers, most frequent first,
//     equal counts ordered by the answer string (ascending)
//
// Both maps are BTreeMaps so serialising the same vocabulary
// always produces the same bytes.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::domain::error::VqaResult;
use crate::domain::record::CorpusRecord;
use crate::domain::traits::WordTokenizer;

pub const PAD_TOKEN:     &str  = "<PAD>";
pub const UNKNOWN_TOKEN: &str  = "<UNKNOWN>";
pub const PAD_INDEX:     usize = 0;
pub const UNKNOWN_INDEX: usize = 1;

/// Fixed block at the start of every word index. `s` and `/s` are
/// sentence markers; they keep ids 2 and 3 even when unused.
pub const RESERVED_TOKENS: [&str; 4] = [PAD_TOKEN, UNKNOWN_TOKEN, "s", "/s"];

pub const UNKNOWN_LABEL:       &str  = "UNKNOWN";
pub const UNKNOWN_LABEL_INDEX: usize = 0;

// ─── WordIndex ────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordIndex {
    pub word2idx:       BTreeMap<String, usize>,
    pub idx2word:       BTreeMap<usize, String>,
    /// Token count of the longest question the index was built from.
    pub max_seq_length: usize,
}

impl WordIndex {
    pub fn len(&self) -> usize {
        self.word2idx.len()
    }

    /// Token id of `word`, or the `<UNKNOWN>` id when absent.
    pub fn index_of(&self, word: &str) -> usize {
        self.word2idx.get(word).copied().unwrap_or(UNKNOWN_INDEX)
    }

    pub fn word(&self, index: usize) -> Option<&str> {
        self.idx2word.get(&index).map(String::as_str)
    }
}

/// Build the word index from every question in `corpus`.
pub fn build_vocab(
    corpus:         &[CorpusRecord],
    tokenizer:      &dyn WordTokenizer,
    min_word_count: usize,
) -> VqaResult<WordIndex> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut first_seen: Vec<String> = Vec::new();
    let mut max_seq_length = 0usize;

    for record in corpus {
        let words = tokenizer.tokenize(&record.question)?;
        max_seq_length = max_seq_length.max(words.len());

        for word in words {
            match counts.get_mut(&word) {
                Some(count) => *count += 1,
                None => {
                    counts.insert(word.clone(), 1);
                    first_seen.push(word);
                }
            }
        }
    }

    let mut word2idx: BTreeMap<String, usize> = RESERVED_TOKENS
        .iter()
        .enumerate()
        .map(|(i, w)| (w.to_string(), i))
        .collect();

    let mut next_idx = RESERVED_TOKENS.len();
    for word in first_seen {
        if counts[&word] >= min_word_count && !word2idx.contains_key(&word) {
            word2idx.insert(word, next_idx);
            next_idx += 1;
        }
    }

    let idx2word = word2idx.iter().map(|(w, &i)| (i, w.clone())).collect();

    tracing::debug!(
        "Word index: {} distinct words, {} kept (min count {}), max length {}",
        counts.len(),
        word2idx.len() - RESERVED_TOKENS.len(),
        min_word_count,
        max_seq_length,
    );

    Ok(WordIndex { word2idx, idx2word, max_seq_length })
}

// ─── LabelIndex ───────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelIndex {
    pub label2idx: BTreeMap<String, usize>,
    pub idx2label: BTreeMap<usize, String>,
}

impl LabelIndex {
    pub fn len(&self) -> usize {
        self.label2idx.len()
    }

    /// Class id of `answer`, or the `UNKNOWN` class when absent.
    pub fn index_of(&self, answer: &str) -> usize {
        self.label2idx.get(answer).copied().unwrap_or(UNKNOWN_LABEL_INDEX)
    }

    pub fn label(&self, index: usize) -> Option<&str> {
        self.idx2label.get(&index).map(String::as_str)
    }

    /// Answer strings excluding `UNKNOWN`, in class-id order.
    pub fn answers(&self) -> Vec<&str> {
        (UNKNOWN_LABEL_INDEX + 1..self.len()).filter_map(|i| self.label(i)).collect()
    }
}

/// Select the `k` most frequent answers of `corpus` as class labels.
///
/// When the corpus has fewer than `k` distinct answers, every answer
/// becomes a label and the set is smaller than `k + 1`.
pub fn build_labels(corpus: &[CorpusRecord], k: usize) -> LabelIndex {
    let mut frequency: HashMap<&str, usize> = HashMap::new();
    for record in corpus {
        *frequency.entry(record.answer.as_str()).or_insert(0) += 1;
    }

    // UNKNOWN already owns class 0
    frequency.remove(UNKNOWN_LABEL);

    let mut ranked: Vec<(&str, usize)> = frequency.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    if ranked.len() < k {
        tracing::warn!(
            "Requested top-{} answers but the corpus only has {} distinct answers",
            k,
            ranked.len()
        );
    }
    ranked.truncate(k);

    let ordered = std::iter::once(UNKNOWN_LABEL).chain(ranked.into_iter().map(|(a, _)| a));

    let mut label2idx = BTreeMap::new();
    let mut idx2label = BTreeMap::new();
    for (idx, answer) in ordered.enumerate() {
        label2idx.insert(answer.to_string(), idx);
        idx2label.insert(idx, answer.to_string());
    }

    LabelIndex { label2idx, idx2label }
}

// ─── Vocabulary (the persisted artifact) ──────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    pub words:  WordIndex,
    pub labels: LabelIndex,
}

impl Vocabulary {
    pub fn build(
        corpus:         &[CorpusRecord],
        tokenizer:      &dyn WordTokenizer,
        min_word_count: usize,
        top_k:          usize,
    ) -> VqaResult<Self> {
        let words  = build_vocab(corpus, tokenizer, min_word_count)?;
        let labels = build_labels(corpus, top_k);
        Ok(Self { words, labels })
    }

    pub fn max_seq_length(&self) -> usize {
        self.words.max_seq_length
    }

    /// Check the invariants a loaded artifact must satisfy.
    /// Returns a description of the first violation found.
    pub fn check_consistency(&self) -> Result<(), String> {
        if self.words.word2idx.len() != self.words.idx2word.len() {
            return Err("word2idx and idx2word differ in size".into());
        }
        for (word, idx) in &self.words.word2idx {
            if self.words.idx2word.get(idx) != Some(word) {
                return Err(format!("idx2word does not invert word2idx at '{word}'"));
            }
        }
        if !self.words.idx2word.keys().copied().eq(0..self.words.len()) {
            return Err(format!("word indices are not exactly 0..{}", self.words.len()));
        }
        for (i, token) in RESERVED_TOKENS.iter().enumerate() {
            if self.words.word2idx.get(*token) != Some(&i) {
                return Err(format!("reserved token '{token}' is not at index {i}"));
            }
        }
        if self.labels.label2idx.len() != self.labels.idx2label.len() {
            return Err("label2idx and idx2label differ in size".into());
        }
        for (label, idx) in &self.labels.label2idx {
            if self.labels.idx2label.get(idx) != Some(label) {
                return Err(format!("idx2label does not invert label2idx at '{label}'"));
            }
        }
        if !self.labels.idx2label.keys().copied().eq(0..self.labels.len()) {
            return Err(format!("label indices are not exactly 0..{}", self.labels.len()));
        }
        if self.labels.label2idx.get(UNKNOWN_LABEL) != Some(&UNKNOWN_LABEL_INDEX) {
            return Err("UNKNOWN label is not at index 0".into());
        }
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::tokenizer::BertWordTokenizer;

    fn record(question: &str, answer: &str) -> CorpusRecord {
        CorpusRecord::new("img.jpg", question, answer)
    }

    fn answers(list: &[(&str, usize)]) -> Vec<CorpusRecord> {
        list.iter()
            .flat_map(|(a, n)| std::iter::repeat(record("q", a)).take(*n))
            .collect()
    }

    #[test]
    fn test_build_vocab_is_deterministic() {
        let corpus = vec![
            record("what colour is the bus", "red"),
            record("how many dogs are there", "2"),
            record("what is on the table", "cake"),
        ];
        let tok = BertWordTokenizer::new();
        let a = build_vocab(&corpus, &tok, 1).unwrap();
        let b = build_vocab(&corpus, &tok, 1).unwrap();
        assert_eq!(a, b);
        assert_eq!(bincode::serialize(&a).unwrap(), bincode::serialize(&b).unwrap());
    }

    #[test]
    fn test_idx2word_inverts_word2idx() {
        let corpus = vec![record("is the man happy", "yes"), record("is the sky blue", "no")];
        let v = build_vocab(&corpus, &BertWordTokenizer::new(), 1).unwrap();
        assert_eq!(v.word2idx.len(), v.idx2word.len());
        for (w, i) in &v.word2idx {
            assert_eq!(v.idx2word[i], *w);
        }
    }

    #[test]
    fn test_min_word_count_threshold() {
        // "red" x2, "blue" x3
        let corpus = vec![
            record("red blue", "a"),
            record("red blue", "a"),
            record("blue", "a"),
        ];
        let v = build_vocab(&corpus, &BertWordTokenizer::new(), 3).unwrap();
        assert!(!v.word2idx.contains_key("red"));
        assert_eq!(v.word2idx.get("blue"), Some(&4));
    }

    #[test]
    fn test_reserved_block_and_first_seen_order() {
        let corpus = vec![record("is it a cat", "yes"), record("is it a dog", "no")];
        let v = build_vocab(&corpus, &BertWordTokenizer::new(), 1).unwrap();
        assert_eq!(v.word2idx["<PAD>"], 0);
        assert_eq!(v.word2idx["<UNKNOWN>"], 1);
        assert_eq!(v.word2idx["s"], 2);
        assert_eq!(v.word2idx["/s"], 3);
        assert_eq!(v.word2idx["is"], 4);
        assert_eq!(v.word2idx["it"], 5);
        assert_eq!(v.word2idx["a"], 6);
        assert_eq!(v.word2idx["cat"], 7);
        assert_eq!(v.word2idx["dog"], 8);
        assert_eq!(v.max_seq_length, 4);
    }

    #[test]
    fn test_corpus_word_matching_reserved_token_keeps_reserved_index() {
        let corpus = vec![record("what's that", "a")];
        let v = build_vocab(&corpus, &BertWordTokenizer::new(), 1).unwrap();
        assert_eq!(v.word2idx["s"], 2);
        let dense: Vec<usize> = v.idx2word.keys().copied().collect();
        assert_eq!(dense, (0..v.len()).collect::<Vec<_>>());
    }

    #[test]
    fn test_empty_corpus_has_only_reserved_tokens() {
        let v = build_vocab(&[], &BertWordTokenizer::new(), 5).unwrap();
        assert_eq!(v.len(), RESERVED_TOKENS.len());
        assert_eq!(v.max_seq_length, 0);
    }

    #[test]
    fn test_top_k_selects_most_frequent() {
        let corpus = answers(&[("yes", 10), ("no", 8), ("maybe", 3)]);
        let labels = build_labels(&corpus, 2);
        let expected: BTreeMap<String, usize> =
            [("UNKNOWN", 0), ("yes", 1), ("no", 2)].iter().map(|(a, i)| (a.to_string(), *i)).collect();
        assert_eq!(labels.label2idx, expected);
    }

    #[test]
    fn test_label_count_never_exceeds_k_plus_one() {
        let corpus = answers(&[("a", 1), ("b", 1)]);
        let labels = build_labels(&corpus, 1000);
        assert!(labels.len() <= 1001);
        assert_eq!(labels.len(), 3);
        assert_eq!(labels.label2idx["UNKNOWN"], 0);
    }

    #[test]
    fn test_equal_frequency_ties_break_lexicographically() {
        let corpus = answers(&[("zebra", 4), ("apple", 4), ("mango", 4)]);
        let labels = build_labels(&corpus, 2);
        assert_eq!(labels.label(1), Some("apple"));
        assert_eq!(labels.label(2), Some("mango"));
        assert_eq!(labels.index_of("zebra"), UNKNOWN_LABEL_INDEX);
    }

    #[test]
    fn test_unknown_answer_folds_into_class_zero() {
        let corpus = answers(&[("UNKNOWN", 9), ("yes", 2)]);
        let labels = build_labels(&corpus, 2);
        assert_eq!(labels.len(), 2);
        assert_eq!(labels.label(1), Some("yes"));
    }

    #[test]
    fn test_built_vocabulary_is_consistent() {
        let corpus = vec![record("where is the cat", "sofa")];
        let v = Vocabulary::build(&corpus, &BertWordTokenizer::new(), 1, 10).unwrap();
        assert!(v.check_consistency().is_ok());
    }

    #[test]
    fn test_label_maps_must_invert_each_other() {
        let corpus = answers(&[("yes", 2), ("no", 1)]);
        let mut v = Vocabulary::build(&corpus, &BertWordTokenizer::new(), 1, 2).unwrap();
        v.labels.idx2label.insert(2, "maybe".to_string());
        let err = v.check_consistency().unwrap_err();
        assert!(err.contains("idx2label"), "{err}");
    }

    #[test]
    fn test_label_index_past_the_class_count_is_rejected() {
        let corpus = answers(&[("yes", 2), ("no", 1)]);
        let mut v = Vocabulary::build(&corpus, &BertWordTokenizer::new(), 1, 2).unwrap();
        // both maps agree, but "no" sits outside 0..3
        v.labels.label2idx.insert("no".to_string(), 7);
        v.labels.idx2label.remove(&2);
        v.labels.idx2label.insert(7, "no".to_string());
        let err = v.check_consistency().unwrap_err();
        assert!(err.contains("label indices"), "{err}");
    }

    #[test]
    fn test_word_index_gap_is_rejected() {
        let corpus = vec![record("where is the cat", "sofa")];
        let mut v = Vocabulary::build(&corpus, &BertWordTokenizer::new(), 1, 10).unwrap();
        let last = v.words.len() - 1;
        let word = v.words.idx2word.remove(&last).unwrap();
        v.words.idx2word.insert(last + 5, word.clone());
        v.words.word2idx.insert(word, last + 5);
        let err = v.check_consistency().unwrap_err();
        assert!(err.contains("word indices"), "{err}");
    }
}
