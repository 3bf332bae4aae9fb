// ============================================================
// Layer 5 — Baseline Network
// ============================================================
// Global image feature × question encoding:
//
//   image    → ImageEncoder (1×1 grid) → Linear → tanh   [b, h]
//   question → Embedding → tanh → LSTM → last real token [b, h]
//   fused    = image ⊙ question → Dropout → Linear       [b, classes]

use burn::{
    nn::{
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        Linear, LinearConfig,
        Lstm, LstmConfig,
    },
    prelude::*,
};

use crate::ml::model::{last_true_state, ImageEncoder, VqaModelConfig, VqaNet, IMAGE_FEATURES};

#[derive(Module, Debug)]
pub struct BaselineNet<B: Backend> {
    image:      ImageEncoder<B>,
    image_proj: Linear<B>,
    embedding:  Embedding<B>,
    lstm:       Lstm<B>,
    dropout:    Dropout,
    classifier: Linear<B>,
}

impl VqaModelConfig {
    pub fn init_baseline<B: Backend>(&self, device: &B::Device) -> BaselineNet<B> {
        BaselineNet {
            image:      ImageEncoder::new(1, device),
            image_proj: LinearConfig::new(IMAGE_FEATURES, self.hidden_dim).init(device),
            embedding:  EmbeddingConfig::new(self.vocab_size, self.embed_dim).init(device),
            lstm:       LstmConfig::new(self.embed_dim, self.hidden_dim, true).init(device),
            dropout:    DropoutConfig::new(self.dropout).init(),
            classifier: LinearConfig::new(self.hidden_dim, self.num_classes).init(device),
        }
    }
}

impl<B: Backend> VqaNet<B> for BaselineNet<B> {
    fn forward(
        &self,
        images:    Tensor<B, 4>,
        questions: Tensor<B, 2, Int>,
        lengths:   Tensor<B, 1, Int>,
    ) -> Tensor<B, 2> {
        let [batch, ..] = images.dims();

        let image = self.image.forward(images).reshape([batch, IMAGE_FEATURES]);
        let image = self.image_proj.forward(image).tanh();

        let words = self.embedding.forward(questions).tanh();
        let (states, _) = self.lstm.forward(words, None);
        let question = last_true_state(states, lengths);

        self.classifier.forward(self.dropout.forward(image * question))
    }
}
