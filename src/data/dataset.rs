// ============================================================
// Layer 4 — VQA Dataset
// ============================================================
// Burn Dataset over one split of corpus records.
//
//   from_records → every question encoded and every image path
//                  checked once, all problems reported together
//   get(i)       → full encode of record i, image decoded on the
//                  data-loader worker that asks for it

use burn::data::dataset::Dataset;

use crate::data::encoder::{decode_question, EncodedSample, SampleEncoder};
use crate::domain::error::{VqaError, VqaResult};
use crate::domain::record::CorpusRecord;

/// What the data loader receives for each index: a fully encoded
/// sample, or the reason its image could not be loaded.
pub type SampleResult = VqaResult<EncodedSample>;

/// A record that passed the up-front checks, with the name used
/// for it in error messages.
#[derive(Debug, Clone)]
struct PendingSample {
    origin: String,
    record: CorpusRecord,
}

/// How many individual problems to spell out in an aggregated error.
const REPORTED_PROBLEMS: usize = 5;

pub struct VqaDataset {
    encoder: SampleEncoder,
    samples: Vec<PendingSample>,
}

impl VqaDataset {
    /// Encode every question and check every image exists.
    /// All invalid records are collected into one DataError
    /// instead of stopping at the first.
    pub fn from_records(
        name:    &str,
        records: &[CorpusRecord],
        encoder: SampleEncoder,
    ) -> VqaResult<Self> {
        let mut samples  = Vec::with_capacity(records.len());
        let mut problems = Vec::new();
        let mut first_question = None;

        for (i, record) in records.iter().enumerate() {
            let origin = format!("{name} record {}", i + 1);
            let image_path = encoder.image_path(record);

            match encoder.encode_text(record, &origin) {
                Err(e) => problems.push(e.to_string()),
                Ok(_) if !image_path.is_file() => problems.push(
                    VqaError::data(&origin, format!("image '{}' not found", image_path.display())).to_string(),
                ),
                Ok((question, _)) => {
                    first_question.get_or_insert(question);
                    samples.push(PendingSample { origin, record: record.clone() });
                }
            }
        }

        if !problems.is_empty() {
            let shown: Vec<&str> = problems.iter().take(REPORTED_PROBLEMS).map(String::as_str).collect();
            return Err(VqaError::data(
                name,
                format!("{} of {} records are invalid: {}", problems.len(), records.len(), shown.join("; ")),
            ));
        }

        tracing::debug!("Dataset '{}' ready with {} samples", name, samples.len());
        if let Some(first) = first_question {
            let words = decode_question(&first.token_ids, &encoder.vocab().words);
            tracing::debug!("First '{}' question as the model sees it: {}", name, words.join(" "));
        }
        Ok(Self { encoder, samples })
    }
}

impl Dataset<SampleResult> for VqaDataset {
    fn get(&self, index: usize) -> Option<SampleResult> {
        let pending = self.samples.get(index)?;
        Some(self.encoder.encode(&pending.record, &pending.origin))
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
