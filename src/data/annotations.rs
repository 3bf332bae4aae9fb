// ============================================================
// Layer 4 — VQA Annotation Reader
// ============================================================
// Joins the two VQA JSON files into flat corpus records:
//
//   annotations file   { "annotations": [ { image_id, question_id,
//                                            multiple_choice_answer } ] }
//   questions file     { "questions":   [ { question_id, question } ] }
//
// One record per annotation, in annotation order. The image
// filename is derived from image_id and the dataset flavour.
// Annotations that cannot be joined are collected as rejected
// instead of aborting the whole file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::domain::error::{VqaError, VqaResult};
use crate::domain::record::CorpusRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Val,
}

impl Split {
    pub fn as_str(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Val   => "val",
        }
    }
}

/// Filename convention of the image collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageNaming {
    /// COCO_<split>2014_<id>.jpg
    BalancedReal,
    /// abstract_v002_train2015_<id>.png
    AbstractScene,
}

/// Image filename for `image_id`, ids zero-padded to 12 digits.
pub fn image_file_name(naming: ImageNaming, split: Split, image_id: u64) -> VqaResult<String> {
    match (naming, split) {
        (ImageNaming::BalancedReal, _) => {
            Ok(format!("COCO_{}2014_{:012}.jpg", split.as_str(), image_id))
        }
        (ImageNaming::AbstractScene, Split::Train) => {
            Ok(format!("abstract_v002_train2015_{:012}.png", image_id))
        }
        (ImageNaming::AbstractScene, Split::Val) => Err(VqaError::config(
            "abstract scene images are only available for the train split",
        )),
    }
}

// ─── JSON shapes ──────────────────────────────────────────────────────────────
#[derive(Debug, Deserialize)]
pub struct Annotation {
    pub image_id:               u64,
    pub question_id:            u64,
    pub multiple_choice_answer: String,
}

#[derive(Debug, Deserialize)]
pub struct AnnotationFile {
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Deserialize)]
pub struct Question {
    pub question_id: u64,
    pub question:    String,
}

#[derive(Debug, Deserialize)]
pub struct QuestionFile {
    pub questions: Vec<Question>,
}

pub fn load_annotations(path: &Path) -> Result<AnnotationFile> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read annotations file: {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Malformed annotations file: {}", path.display()))
}

pub fn load_questions(path: &Path) -> Result<QuestionFile> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read questions file: {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Malformed questions file: {}", path.display()))
}

/// Result of joining annotations with questions.
#[derive(Debug, Default)]
pub struct CorpusBuild {
    pub records:  Vec<CorpusRecord>,
    pub rejected: Vec<VqaError>,
}

pub fn join_annotations(
    annotations: &AnnotationFile,
    questions:   &QuestionFile,
    naming:      ImageNaming,
    split:       Split,
) -> VqaResult<CorpusBuild> {
    let by_id: HashMap<u64, &str> = questions
        .questions
        .iter()
        .map(|q| (q.question_id, q.question.as_str()))
        .collect();

    let mut build = CorpusBuild::default();
    for (i, ann) in annotations.annotations.iter().enumerate() {
        let origin = format!("annotation {} (question_id {})", i, ann.question_id);

        let Some(question) = by_id.get(&ann.question_id) else {
            build.rejected.push(VqaError::data(origin, "no question with this id"));
            continue;
        };
        if question.trim().is_empty() {
            build.rejected.push(VqaError::data(origin, "question text is empty"));
            continue;
        }

        let image = image_file_name(naming, split, ann.image_id)?;
        build.records.push(CorpusRecord::new(image, *question, &ann.multiple_choice_answer));
    }
    Ok(build)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn annotations() -> AnnotationFile {
        serde_json::from_str(
            r#"{"annotations": [
                {"image_id": 42, "question_id": 1, "multiple_choice_answer": "yes"},
                {"image_id": 7,  "question_id": 9, "multiple_choice_answer": "no"},
                {"image_id": 3,  "question_id": 2, "multiple_choice_answer": "two"}
            ], "info": {}}"#,
        )
        .unwrap()
    }

    fn questions() -> QuestionFile {
        serde_json::from_str(
            r#"{"questions": [
                {"question_id": 1, "question": "Is   this a dog?", "image_id": 42},
                {"question_id": 2, "question": "How many cats\tare there?", "image_id": 3}
            ]}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_image_names() {
        assert_eq!(
            image_file_name(ImageNaming::BalancedReal, Split::Train, 9).unwrap(),
            "COCO_train2014_000000000009.jpg"
        );
        assert_eq!(
            image_file_name(ImageNaming::BalancedReal, Split::Val, 123456).unwrap(),
            "COCO_val2014_000000123456.jpg"
        );
        assert_eq!(
            image_file_name(ImageNaming::AbstractScene, Split::Train, 11).unwrap(),
            "abstract_v002_train2015_000000000011.png"
        );
    }

    #[test]
    fn test_abstract_val_is_config_error() {
        let err = image_file_name(ImageNaming::AbstractScene, Split::Val, 1).unwrap_err();
        assert!(matches!(err, VqaError::Config(_)));
    }

    #[test]
    fn test_join_keeps_order_and_rejects_orphans() {
        let build =
            join_annotations(&annotations(), &questions(), ImageNaming::BalancedReal, Split::Train).unwrap();

        assert_eq!(build.records.len(), 2);
        assert_eq!(build.records[0].image_file, "COCO_train2014_000000000042.jpg");
        assert_eq!(build.records[0].question, "Is this a dog?");
        assert_eq!(build.records[0].answer, "yes");
        assert_eq!(build.records[1].question, "How many cats are there?");

        assert_eq!(build.rejected.len(), 1);
        assert!(build.rejected[0].to_string().contains("question_id 9"));
    }
}
