// ============================================================
// Layer 2 — PrepareUseCase
// ============================================================
// Turns the raw VQA JSON files of one split into a corpus file
// and, for the training split, the vocabulary artifact:
//
//   Step 1: Load annotations + questions     (Layer 4 - data)
//   Step 2: Join them into corpus records    (Layer 4 - data)
//   Step 3: Optionally keep selected answers (Layer 4 - data)
//   Step 4: Write the corpus file            (Layer 4 - data)
//   Step 5: Build + save the vocabulary      (Layer 4 / 6)
//
// Annotations that cannot be joined are reported and skipped;
// every valid record is kept.

use anyhow::Result;
use std::path::PathBuf;

use crate::data::{
    annotations::{image_file_name, join_annotations, load_annotations, load_questions, ImageNaming, Split},
    corpus::{filter_by_labels, write_corpus},
    tokenizer::BertWordTokenizer,
    vocab::Vocabulary,
};
use crate::domain::error::VqaError;
use crate::infra::vocab_store::save_vocabulary;

/// How many rejected annotations are spelled out in the log.
const REPORTED_REJECTS: usize = 10;

#[derive(Debug, Clone)]
pub struct PrepareConfig {
    pub split:          Split,
    pub annot_file:     PathBuf,
    pub ques_file:      PathBuf,
    pub output_file:    PathBuf,
    pub vocab_file:     Option<PathBuf>,
    pub min_word_count: usize,
    pub num_cls:        usize,
    pub naming:         ImageNaming,
    /// Keep only records with one of these answers
    pub keep_answers:   Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrepareReport {
    pub written:  usize,
    pub rejected: usize,
    pub filtered: usize,
}

pub struct PrepareUseCase {
    config: PrepareConfig,
}

impl PrepareUseCase {
    pub fn new(config: PrepareConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<PrepareReport> {
        let cfg = &self.config;
        let (split, naming) = (cfg.split, cfg.naming);
        if cfg.num_cls < 2 {
            return Err(VqaError::config(format!("--num-cls must be at least 2, got {}", cfg.num_cls)).into());
        }
        // fail on an impossible naming before reading large JSON files
        image_file_name(naming, split, 0)?;

        // ── Step 1 + 2: Load and join ─────────────────────────────────────────
        let annotations = load_annotations(&cfg.annot_file)?;
        let questions = load_questions(&cfg.ques_file)?;
        tracing::info!(
            "Loaded {} annotations and {} questions",
            annotations.annotations.len(),
            questions.questions.len()
        );

        let build = join_annotations(&annotations, &questions, naming, split)?;
        for err in build.rejected.iter().take(REPORTED_REJECTS) {
            tracing::warn!("Skipped {}", err);
        }
        if build.rejected.len() > REPORTED_REJECTS {
            tracing::warn!("... and {} more", build.rejected.len() - REPORTED_REJECTS);
        }

        // ── Step 3: Answer filter ─────────────────────────────────────────────
        let joined = build.records.len();
        let records = if cfg.keep_answers.is_empty() {
            build.records
        } else {
            let keep: Vec<&str> = cfg.keep_answers.iter().map(String::as_str).collect();
            filter_by_labels(build.records, &keep)
        };

        // ── Step 4: Corpus file ───────────────────────────────────────────────
        write_corpus(&cfg.output_file, &records)?;
        tracing::info!("Saved {} records to '{}'", records.len(), cfg.output_file.display());

        // ── Step 5: Vocabulary (training split only) ──────────────────────────
        if let Some(vocab_file) = &cfg.vocab_file {
            if split != Split::Train {
                tracing::warn!("Building a vocabulary from the {} split", split.as_str());
            }
            let vocab = Vocabulary::build(&records, &BertWordTokenizer::new(), cfg.min_word_count, cfg.num_cls)?;
            save_vocabulary(&vocab, vocab_file)?;
        }

        Ok(PrepareReport {
            written:  records.len(),
            rejected: build.rejected.len(),
            filtered: joined - records.len(),
        })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::corpus::read_corpus;
    use crate::infra::vocab_store::load_vocabulary;
    use std::fs;

    const ANNOTATIONS: &str = r#"{"annotations": [
        {"image_id": 1, "question_id": 10, "multiple_choice_answer": "yes"},
        {"image_id": 2, "question_id": 20, "multiple_choice_answer": "2"},
        {"image_id": 3, "question_id": 30, "multiple_choice_answer": "no"},
        {"image_id": 4, "question_id": 99, "multiple_choice_answer": "yes"}
    ]}"#;

    const QUESTIONS: &str = r#"{"questions": [
        {"question_id": 10, "question": "Is it sunny?", "image_id": 1},
        {"question_id": 20, "question": "How many dogs?", "image_id": 2},
        {"question_id": 30, "question": "Is it raining?", "image_id": 3}
    ]}"#;

    fn config(dir: &std::path::Path) -> PrepareConfig {
        fs::write(dir.join("annotations.json"), ANNOTATIONS).unwrap();
        fs::write(dir.join("questions.json"), QUESTIONS).unwrap();
        PrepareConfig {
            split:          Split::Train,
            annot_file:     dir.join("annotations.json"),
            ques_file:      dir.join("questions.json"),
            output_file:    dir.join("out").join("train.txt"),
            vocab_file:     Some(dir.join("out").join("vocab.bin")),
            min_word_count: 1,
            num_cls:        2,
            naming:         ImageNaming::BalancedReal,
            keep_answers:   Vec::new(),
        }
    }

    #[test]
    fn test_prepare_writes_corpus_and_vocab() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let report = PrepareUseCase::new(cfg.clone()).execute().unwrap();

        assert_eq!(report, PrepareReport { written: 3, rejected: 1, filtered: 0 });

        let records = read_corpus(&cfg.output_file).unwrap();
        assert_eq!(records[0].image_file, "COCO_train2014_000000000001.jpg");
        assert_eq!(records[1].question, "How many dogs?");

        let vocab = load_vocabulary(cfg.vocab_file.as_ref().unwrap()).unwrap();
        assert_eq!(vocab.labels.len(), 3);
        assert_eq!(vocab.labels.index_of("2"), 1);
        assert_eq!(vocab.max_seq_length(), 4);
    }

    #[test]
    fn test_keep_answers_filters_records() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path());
        cfg.keep_answers = vec!["yes".into(), "no".into()];
        cfg.vocab_file = None;

        let report = PrepareUseCase::new(cfg.clone()).execute().unwrap();
        assert_eq!(report.written, 2);
        assert_eq!(report.filtered, 1);
        assert!(read_corpus(&cfg.output_file).unwrap().iter().all(|r| r.answer != "2"));
    }

    #[test]
    fn test_abstract_val_fails_before_reading() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path());
        cfg.split = Split::Val;
        cfg.naming = ImageNaming::AbstractScene;
        cfg.annot_file = dir.path().join("missing.json");

        let err = PrepareUseCase::new(cfg).execute().unwrap_err();
        assert!(matches!(err.downcast_ref::<VqaError>(), Some(VqaError::Config(_))));
    }
}
