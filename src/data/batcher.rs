// ============================================================
// Layer 4 — VQA Batcher
// ============================================================
// Implements Burn's Batcher trait: a Vec of encoded samples
// becomes one VqaBatch of tensors.
//
//   images    [batch, 3, H, W]   float
//   questions [batch, max_len]   int
//   labels    [batch]            int
//   lengths   [batch]            int
//
// Samples are sorted by question length (longest first) as
// whole records before they are split into the four tensors,
// so row i of every tensor always describes the same sample.
//
// Errors from image decoding travel inside the batch result
// and surface in the training loop.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
    tensor::TensorData,
};

use crate::data::dataset::SampleResult;
use crate::data::encoder::EncodedSample;
use crate::domain::error::{VqaError, VqaResult};

#[derive(Debug, Clone)]
pub struct VqaBatch<B: Backend> {
    pub images:    Tensor<B, 4>,
    pub questions: Tensor<B, 2, Int>,
    pub labels:    Tensor<B, 1, Int>,
    pub lengths:   Tensor<B, 1, Int>,
}

impl<B: Backend> VqaBatch<B> {
    pub fn len(&self) -> usize {
        self.labels.dims()[0]
    }
}

/// Stable sort by true question length, longest first.
pub fn sort_batch(mut samples: Vec<EncodedSample>) -> Vec<EncodedSample> {
    samples.sort_by(|a, b| b.true_length.cmp(&a.true_length));
    samples
}

#[derive(Clone, Debug)]
pub struct VqaBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> VqaBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    /// Sort and stack already-decoded samples.
    pub fn assemble(&self, samples: Vec<EncodedSample>) -> VqaResult<VqaBatch<B>> {
        let first = samples
            .first()
            .ok_or_else(|| VqaError::data("batch", "no samples"))?;
        let batch_size = samples.len();
        let seq_len    = first.token_ids.len();
        let [c, h, w]  = first.image.shape;

        if let Some(odd) = samples
            .iter()
            .find(|s| s.token_ids.len() != seq_len || s.image.shape != [c, h, w])
        {
            return Err(VqaError::data(
                "batch",
                format!(
                    "sample shapes differ: question {} vs {}, image {:?} vs {:?}",
                    odd.token_ids.len(), seq_len, odd.image.shape, [c, h, w],
                ),
            ));
        }

        let samples = sort_batch(samples);

        let question_flat: Vec<i32> = samples
            .iter()
            .flat_map(|s| s.token_ids.iter().map(|&id| id as i32))
            .collect();
        let labels:  Vec<i32> = samples.iter().map(|s| s.label as i32).collect();
        let lengths: Vec<i32> = samples.iter().map(|s| s.true_length as i32).collect();
        let pixels:  Vec<f32> = samples
            .into_iter()
            .flat_map(|s| s.image.values)
            .collect();

        let images = Tensor::<B, 4>::from_data(
            TensorData::new(pixels, [batch_size, c, h, w]),
            &self.device,
        );
        let questions = Tensor::<B, 1, Int>::from_ints(question_flat.as_slice(), &self.device)
            .reshape([batch_size, seq_len]);
        let labels  = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device);
        let lengths = Tensor::<B, 1, Int>::from_ints(lengths.as_slice(), &self.device);

        Ok(VqaBatch { images, questions, labels, lengths })
    }
}

impl<B: Backend> Batcher<SampleResult, VqaResult<VqaBatch<B>>> for VqaBatcher<B> {
    fn batch(&self, items: Vec<SampleResult>) -> VqaResult<VqaBatch<B>> {
        let samples = items.into_iter().collect::<VqaResult<Vec<_>>>()?;
        self.assemble(samples)
    }
}
