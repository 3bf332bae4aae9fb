// ============================================================
// Layer 5 — Co-Attention Network
// ============================================================
// Attends both ways between image regions and question words:
//
//   regions  = ImageEncoder (grid×grid) → Linear → tanh    [b, n, h]
//   words    = Embedding → tanh → LSTM                     [b, s, h]
//   q        = words at the last real token                [b, h]
//
//   image attention    : q attends over regions            [b, h]
//   question attention : mean region attends over words,
//                        <PAD> positions masked out        [b, h]
//
//   [question att + q ; image att] → Linear → ReLU → Dropout
//                                  → Linear               [b, classes]

use burn::{
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        Linear, LinearConfig,
        Lstm, LstmConfig,
    },
    prelude::*,
    tensor::activation::relu,
};

use crate::data::vocab::PAD_INDEX;
use crate::ml::model::{last_true_state, ImageEncoder, VqaModelConfig, VqaNet, IMAGE_FEATURES};

#[derive(Module, Debug)]
pub struct CoAttentionNet<B: Backend> {
    image:         ImageEncoder<B>,
    region_proj:   Linear<B>,
    embedding:     Embedding<B>,
    lstm:          Lstm<B>,
    image_attn:    MultiHeadAttention<B>,
    question_attn: MultiHeadAttention<B>,
    fuse:          Linear<B>,
    dropout:       Dropout,
    classifier:    Linear<B>,
}

impl VqaModelConfig {
    pub fn init_attention<B: Backend>(&self, device: &B::Device) -> CoAttentionNet<B> {
        let attention = || {
            MultiHeadAttentionConfig::new(self.hidden_dim, self.num_heads)
                .with_dropout(self.dropout)
                .init(device)
        };
        CoAttentionNet {
            image:         ImageEncoder::new(self.grid_size, device),
            region_proj:   LinearConfig::new(IMAGE_FEATURES, self.hidden_dim).init(device),
            embedding:     EmbeddingConfig::new(self.vocab_size, self.embed_dim).init(device),
            lstm:          LstmConfig::new(self.embed_dim, self.hidden_dim, true).init(device),
            image_attn:    attention(),
            question_attn: attention(),
            fuse:          LinearConfig::new(2 * self.hidden_dim, self.mlp_dim).init(device),
            dropout:       DropoutConfig::new(self.dropout).init(),
            classifier:    LinearConfig::new(self.mlp_dim, self.num_classes).init(device),
        }
    }
}

impl<B: Backend> VqaNet<B> for CoAttentionNet<B> {
    fn forward(
        &self,
        images:    Tensor<B, 4>,
        questions: Tensor<B, 2, Int>,
        lengths:   Tensor<B, 1, Int>,
    ) -> Tensor<B, 2> {
        let [batch, ..] = images.dims();

        let regions = self.region_proj.forward(self.image.forward(images)).tanh();
        let [_, _, hidden] = regions.dims();

        let pad_mask = questions.clone().equal_elem(PAD_INDEX as i64);
        let (words, _) = self.lstm.forward(self.embedding.forward(questions).tanh(), None);
        let question = last_true_state(words.clone(), lengths);

        let attended_regions = self
            .image_attn
            .forward(MhaInput::new(question.clone().unsqueeze_dim(1), regions.clone(), regions.clone()))
            .context
            .reshape([batch, hidden]);

        let attended_words = self
            .question_attn
            .forward(MhaInput::new(regions.mean_dim(1), words.clone(), words).mask_pad(pad_mask))
            .context
            .reshape([batch, hidden]);

        let fused = Tensor::cat(vec![attended_words + question, attended_regions], 1);
        let fused = self.dropout.forward(relu(self.fuse.forward(fused)));
        self.classifier.forward(fused)
    }
}
