// ============================================================
// Layer 5 — Model Contract and Shared Building Blocks
// ============================================================
// Every VQA network is used through one capability:
//
//   forward(images [b,3,H,W], questions [b,s], lengths [b])
//       → logits [b, num_classes]
//
// The training loop, evaluator and checkpoint manager only
// depend on VqaNet, so the baseline and the co-attention
// network are interchangeable.
//
// Shared pieces:
//   ImageEncoder     — small conv stack, pooled to a grid of
//                      region features [b, grid², 64]
//   last_true_state  — picks the LSTM output at the last real
//                      token of each question (padding ignored)

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
        PaddingConfig2d,
    },
    prelude::*,
    tensor::activation::relu,
};
use serde::{Deserialize, Serialize};

pub trait VqaNet<B: Backend>: Module<B> {
    fn forward(
        &self,
        images:    Tensor<B, 4>,
        questions: Tensor<B, 2, Int>,
        lengths:   Tensor<B, 1, Int>,
    ) -> Tensor<B, 2>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Baseline,
    Attention,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Baseline  => "baseline",
            ModelKind::Attention => "attention",
        }
    }

    /// Default hyper-parameters of each network.
    pub fn config(&self, vocab_size: usize, num_classes: usize) -> VqaModelConfig {
        match self {
            ModelKind::Baseline  => VqaModelConfig::new(vocab_size, num_classes, 224, 300, 1024),
            ModelKind::Attention => VqaModelConfig::new(vocab_size, num_classes, 448, 512, 512)
                .with_mlp_dim(1024),
        }
    }
}

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct VqaModelConfig {
    pub vocab_size:  usize,
    pub num_classes: usize,
    /// Side of the square input image
    pub image_size:  usize,
    pub embed_dim:   usize,
    pub hidden_dim:  usize,
    #[config(default = 1024)]
    pub mlp_dim:     usize,
    #[config(default = 8)]
    pub num_heads:   usize,
    /// Side of the region grid the attention network attends over
    #[config(default = 7)]
    pub grid_size:   usize,
    #[config(default = 0.5)]
    pub dropout:     f64,
}

/// Channels of every region feature produced by ImageEncoder.
pub const IMAGE_FEATURES: usize = 64;

#[derive(Module, Debug)]
pub struct ImageEncoder<B: Backend> {
    conv1: Conv2d<B>,
    conv2: Conv2d<B>,
    conv3: Conv2d<B>,
    pool:  MaxPool2d,
    grid:  AdaptiveAvgPool2d,
}

impl<B: Backend> ImageEncoder<B> {
    pub fn new(grid_size: usize, device: &B::Device) -> Self {
        let conv = |c_in: usize, c_out: usize| {
            Conv2dConfig::new([c_in, c_out], [3, 3])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .init(device)
        };
        Self {
            conv1: conv(3, 16),
            conv2: conv(16, 32),
            conv3: conv(32, IMAGE_FEATURES),
            pool:  MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            grid:  AdaptiveAvgPool2dConfig::new([grid_size, grid_size]).init(),
        }
    }

    /// images [b, 3, H, W] → regions [b, grid², IMAGE_FEATURES]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 3> {
        let x = self.pool.forward(relu(self.conv1.forward(images)));
        let x = self.pool.forward(relu(self.conv2.forward(x)));
        let x = self.grid.forward(relu(self.conv3.forward(x)));

        let [batch, channels, h, w] = x.dims();
        x.reshape([batch, channels, h * w]).swap_dims(1, 2)
    }
}

/// states [b, s, h], lengths [b] → states at position lengths-1, [b, h]
pub fn last_true_state<B: Backend>(states: Tensor<B, 3>, lengths: Tensor<B, 1, Int>) -> Tensor<B, 2> {
    let [batch, _, hidden] = states.dims();
    let index = lengths
        .sub_scalar(1)
        .clamp_min(0)
        .reshape([batch, 1, 1])
        .expand([batch, 1, hidden]);
    states.gather(1, index).reshape([batch, hidden])
}
