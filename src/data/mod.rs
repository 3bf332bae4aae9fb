// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from the raw VQA JSON files to tensor batches.
//
//   annotations.json + questions.json
//       │
//       ▼
//   annotations       → joins them into corpus records
//       │
//       ▼
//   corpus            → reads / writes the tab-separated corpus
//       │
//       ▼
//   tokenizer + vocab → word index and label index (train only)
//       │
//       ▼
//   encoder + image   → fixed-shape token ids, label, pixels
//       │
//       ▼
//   VqaDataset        → implements Burn's Dataset trait
//       │
//       ▼
//   VqaBatcher        → sorts by length, stacks into tensors
//       │
//       ▼
//   DataLoader        → feeds batches to the training loop

/// Reads VQA annotation / question JSON into corpus records
pub mod annotations;

/// Tab-separated corpus file I/O
pub mod corpus;

/// BERT-style word splitting of questions
pub mod tokenizer;

/// Word index and answer label index
pub mod vocab;

/// Decodes and normalises images
pub mod image;

/// Turns one corpus record into a numeric sample
pub mod encoder;

/// Implements Burn's Dataset trait for VQA samples
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
