// ============================================================
// Layer 5 — Validation Evaluator
// ============================================================
// Runs the inference model over at most floor(budget / batch)
// full batches of a validation stream.
//
//   accuracy = 100 × correct / (batches × batch_size)
//   loss     = mean of the per-batch mean cross-entropy
//
// Short batches are skipped, so every counted batch holds
// exactly batch_size samples. No full batch at all is an
// EmptyEvaluation error rather than a 0% accuracy.

use burn::{nn::loss::CrossEntropyLossConfig, prelude::*, tensor::ElementConversion};

use crate::data::batcher::VqaBatch;
use crate::domain::error::{VqaError, VqaResult};
use crate::ml::model::VqaNet;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalMetrics {
    /// Percentage in [0, 100]
    pub accuracy: f64,
    pub loss:     f64,
    pub batches:  usize,
}

#[derive(Debug, Clone)]
pub struct EvalTally {
    batch_size: usize,
    batches:    usize,
    correct:    usize,
    loss_sum:   f64,
}

impl EvalTally {
    pub fn new(batch_size: usize) -> Self {
        Self { batch_size, batches: 0, correct: 0, loss_sum: 0.0 }
    }

    /// Add one full batch: how many predictions were right and its mean loss.
    pub fn record(&mut self, correct: usize, batch_loss: f64) {
        self.batches  += 1;
        self.correct  += correct.min(self.batch_size);
        self.loss_sum += batch_loss;
    }

    pub fn batches(&self) -> usize {
        self.batches
    }

    pub fn finish(self, budget: usize) -> VqaResult<EvalMetrics> {
        if self.batches == 0 {
            return Err(VqaError::EmptyEvaluation { budget, batch_size: self.batch_size });
        }
        let samples = (self.batches * self.batch_size) as f64;
        Ok(EvalMetrics {
            accuracy: 100.0 * self.correct as f64 / samples,
            loss:     self.loss_sum / self.batches as f64,
            batches:  self.batches,
        })
    }
}

pub fn evaluate<B, M, I>(
    model:      &M,
    batches:    I,
    budget:     usize,
    batch_size: usize,
) -> VqaResult<EvalMetrics>
where
    B: Backend,
    M: VqaNet<B>,
    I: IntoIterator<Item = VqaResult<VqaBatch<B>>>,
{
    let max_batches = budget / batch_size.max(1);
    let mut tally = EvalTally::new(batch_size);

    if max_batches > 0 {
        for batch in batches {
            let batch = batch?;
            if batch.len() != batch_size {
                continue;
            }

            let logits = model.forward(batch.images, batch.questions, batch.lengths);
            let loss = CrossEntropyLossConfig::new()
                .init(&logits.device())
                .forward(logits.clone(), batch.labels.clone());

            // argmax(1) returns [batch, 1]; flatten before comparing with labels [batch]
            let correct: i64 = logits
                .argmax(1)
                .flatten::<1>(0, 1)
                .equal(batch.labels)
                .int()
                .sum()
                .into_scalar()
                .elem::<i64>();

            tally.record(correct.max(0) as usize, loss.into_scalar().elem::<f64>());
            if tally.batches() == max_batches {
                break;
            }
        }
    }

    tally.finish(budget)
}
