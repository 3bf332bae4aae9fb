// ============================================================
// Layer 3 — Corpus Record
// ============================================================
// One annotated question: the image it refers to, the question
// text and the human answer. The corpus file stores one record
// per line as three tab-separated fields:
//
//   COCO_train2014_000000458752.jpg \t What is this? \t net
//
// Records are written once by `prepare` and never modified.

use serde::{Deserialize, Serialize};

use crate::domain::error::{VqaError, VqaResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusRecord {
    pub image_file: String,
    pub question:   String,
    pub answer:     String,
}

impl CorpusRecord {
    /// Build a record, folding tabs and line breaks inside any field
    /// into single spaces so the line format cannot be broken.
    pub fn new(
        image_file: impl Into<String>,
        question:   impl Into<String>,
        answer:     impl Into<String>,
    ) -> Self {
        Self {
            image_file: flatten_field(&image_file.into()),
            question:   flatten_field(&question.into()),
            answer:     flatten_field(&answer.into()),
        }
    }

    /// Parse one corpus line. `origin` names the line in error messages
    /// (typically `file:line`).
    pub fn parse_line(line: &str, origin: &str) -> VqaResult<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != 3 {
            return Err(VqaError::data(
                origin,
                format!("expected 3 tab-separated fields, found {}", fields.len()),
            ));
        }

        let image_file = fields[0].trim();
        if image_file.is_empty() {
            return Err(VqaError::data(origin, "record has no image file"));
        }

        Ok(Self {
            image_file: image_file.to_string(),
            question:   fields[1].trim().to_string(),
            answer:     fields[2].trim().to_string(),
        })
    }

    pub fn to_line(&self) -> String {
        format!("{}\t{}\t{}", self.image_file, self.question, self.answer)
    }
}

fn flatten_field(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
