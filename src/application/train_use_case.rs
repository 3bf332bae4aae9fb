// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates one training run in order:
//
//   Step 1: Validate the configuration
//   Step 2: Load the vocabulary artifact     (Layer 6 - infra)
//   Step 3: Read the corpora                 (Layer 4 - data)
//   Step 4: Build datasets                   (Layer 4 - data)
//   Step 5: Prepare the run directory        (Layer 6 - infra)
//   Step 6: Build or restore the model       (Layer 5 - ml)
//   Step 7: Run the training loop            (Layer 5 - ml)
//
// Run directory: <expt_dir>/<expt_name>/<run_name>/
//   train_log.txt, metrics.csv, train_config.json, model_*.mpk

use anyhow::{Context, Result};
use burn::{module::AutodiffModule, tensor::backend::AutodiffBackend};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::data::{
    corpus::read_corpus,
    dataset::VqaDataset,
    encoder::SampleEncoder,
    image::ImageTransform,
    tokenizer::BertWordTokenizer,
};
use crate::domain::error::VqaError;
use crate::domain::traits::WordTokenizer;
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::MetricsLogger,
    run_log::RunLog,
    vocab_store::load_vocabulary,
};
use crate::ml::{
    model::{ModelKind, VqaModelConfig, VqaNet},
    trainer::{train_loop, RunOutputs, TrainSummary},
};

type MyBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Train,
    Test,
}

// ─── Training Configuration ──────────────────────────────────────────────────
// Immutable for the whole run. Serialisable so it can be echoed
// into the run log and saved next to the checkpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub mode:          RunMode,
    pub model:         ModelKind,
    pub expt_dir:      PathBuf,
    pub expt_name:     String,
    pub run_name:      String,
    pub train_img:     PathBuf,
    pub train_file:    PathBuf,
    pub val_img:       Option<PathBuf>,
    pub val_file:      Option<PathBuf>,
    pub vocab_file:    PathBuf,
    /// Top-K answers; the classifier has num_cls + 1 outputs
    pub num_cls:       usize,
    pub batch_size:    usize,
    pub num_epochs:    usize,
    pub learning_rate: f64,
    pub log_interval:  usize,
    pub save_interval: usize,
    pub val_size:      usize,
    pub model_ckpt:    Option<PathBuf>,
    pub num_workers:   usize,
    pub seed:          u64,
    /// Overrides the model's default square input size
    pub image_size:    Option<usize>,
}

impl TrainConfig {
    pub fn validate(&self) -> Result<(), VqaError> {
        let positive = [
            ("batch_size", self.batch_size),
            ("num_epochs", self.num_epochs),
            ("log_interval", self.log_interval),
            ("save_interval", self.save_interval),
            ("num_workers", self.num_workers),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(VqaError::config(format!("--{} must be at least 1", name.replace('_', "-"))));
            }
        }
        if self.num_cls < 2 {
            return Err(VqaError::config(format!("--num-cls must be at least 2, got {}", self.num_cls)));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(VqaError::config(format!(
                "--learning-rate must be a positive number, got {}",
                self.learning_rate
            )));
        }
        if let Some(size) = self.image_size {
            if size < 8 {
                return Err(VqaError::config(format!("--image-size must be at least 8, got {size}")));
            }
        }
        match (&self.val_img, &self.val_file) {
            (Some(_), None) | (None, Some(_)) => {
                return Err(VqaError::config("--val-img and --val-file must be given together"));
            }
            (Some(_), Some(_)) if self.val_size < self.batch_size => {
                return Err(VqaError::config(format!(
                    "--val-size {} is smaller than one batch of {}",
                    self.val_size, self.batch_size
                )));
            }
            _ => {}
        }
        Ok(())
    }

    pub fn run_dir(&self) -> PathBuf {
        self.expt_dir.join(&self.expt_name).join(&self.run_name)
    }

    pub fn num_classes(&self) -> usize {
        self.num_cls + 1
    }

    /// Model hyper-parameters for the selected network.
    pub fn model_config(&self, vocab_size: usize) -> VqaModelConfig {
        let cfg = self.model.config(vocab_size, self.num_classes());
        match self.image_size {
            Some(size) => VqaModelConfig { image_size: size, ..cfg },
            None => cfg,
        }
    }

    /// Every set field as a `(flag, value)` pair, in flag order.
    pub fn flag_pairs(&self) -> Vec<(String, String)> {
        let Ok(serde_json::Value::Object(fields)) = serde_json::to_value(self) else {
            return Vec::new();
        };
        fields
            .into_iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| {
                let value = match v {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                (k, value)
            })
            .collect()
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<TrainSummary> {
        let cfg = &self.config;

        // ── Step 1: Validate ──────────────────────────────────────────────────
        cfg.validate()?;
        if cfg.mode == RunMode::Test {
            return Err(VqaError::Unsupported("--mode test".to_string()).into());
        }

        // ── Step 2: Vocabulary artifact ───────────────────────────────────────
        let vocab = load_vocabulary(&cfg.vocab_file)?;
        if vocab.labels.len() > cfg.num_classes() {
            return Err(VqaError::config(format!(
                "vocabulary has {} labels but --num-cls {} allows only {}",
                vocab.labels.len(),
                cfg.num_cls,
                cfg.num_classes()
            ))
            .into());
        }
        let top: Vec<&str> = vocab.labels.answers().into_iter().take(10).collect();
        tracing::info!(
            "Vocabulary: {} words, {} labels, max_seq_length={}; top answers: {}",
            vocab.words.len(),
            vocab.labels.len(),
            vocab.max_seq_length(),
            top.join(", ")
        );
        let vocab = Arc::new(vocab);

        // ── Step 3 + 4: Corpora and datasets ──────────────────────────────────
        let model_cfg = cfg.model_config(vocab.words.len());
        let tokenizer: Arc<dyn WordTokenizer> = Arc::new(BertWordTokenizer::new());
        let images = Arc::new(ImageTransform::new(model_cfg.image_size));

        let build = |name: &str, file: &Path, img_dir: &Path| -> Result<VqaDataset> {
            let records = read_corpus(file)?;
            tracing::info!("Read {} {} records from '{}'", records.len(), name, file.display());
            let encoder = SampleEncoder::new(vocab.clone(), tokenizer.clone(), images.clone(), img_dir);
            Ok(VqaDataset::from_records(name, &records, encoder)?)
        };

        let train_set = build("train", &cfg.train_file, &cfg.train_img)?;
        let val_set = match (&cfg.val_file, &cfg.val_img) {
            (Some(file), Some(img)) => Some(build("val", file, img)?),
            _ => None,
        };

        // ── Step 5: Run directory ─────────────────────────────────────────────
        let run_dir = cfg.run_dir();
        let checkpoints = CheckpointManager::new(&run_dir)?;
        let metrics = MetricsLogger::new(&run_dir)?;
        let log = RunLog::create(&run_dir, "run", &cfg.flag_pairs())?;
        checkpoints.save_config(cfg)?;
        log.line(&format!("Run directory: {}", run_dir.display()))?;
        tracing::info!(
            "Run log at '{}', metrics at '{}'",
            log.path().display(),
            metrics.csv_path().display()
        );

        let out = RunOutputs { checkpoints: &checkpoints, metrics: &metrics, log: &log };

        // ── Step 6 + 7: Model and training loop ───────────────────────────────
        let device = burn::backend::wgpu::WgpuDevice::default();
        tracing::info!("Using WGPU device: {:?}", device);
        log.line(&format!(
            "Model '{}': image {}px, embed {}, hidden {}, {} classes",
            cfg.model.as_str(),
            model_cfg.image_size,
            model_cfg.embed_dim,
            model_cfg.hidden_dim,
            model_cfg.num_classes
        ))?;

        match cfg.model {
            ModelKind::Baseline => {
                let model = model_cfg.init_baseline::<MyBackend>(&device);
                self.train::<MyBackend, _>(model, train_set, val_set, &device, &out)
            }
            ModelKind::Attention => {
                let model = model_cfg.init_attention::<MyBackend>(&device);
                self.train::<MyBackend, _>(model, train_set, val_set, &device, &out)
            }
        }
    }

    fn train<B, M>(
        &self,
        model:     M,
        train_set: VqaDataset,
        val_set:   Option<VqaDataset>,
        device:    &B::Device,
        out:       &RunOutputs,
    ) -> Result<TrainSummary>
    where
        B: AutodiffBackend,
        M: AutodiffModule<B> + VqaNet<B>,
        M::InnerModule: VqaNet<B::InnerBackend>,
    {
        let cfg = &self.config;
        let model = match &cfg.model_ckpt {
            Some(path) => {
                let model = out.checkpoints.load_model(model, path, device)?;
                out.log.line(&format!(
                    "Model loaded from '{}'. Resuming training",
                    out.checkpoints.resolve(path).display()
                ))?;
                model
            }
            None => model,
        };

        let summary = train_loop(cfg, model, train_set, val_set, device, out)
            .with_context(|| format!("Training run '{}' failed", cfg.run_name))?;
        if let Some(best) = summary.best_accuracy {
            out.log.line(&format!("Best validation accuracy {:.2}%", best))?;
        }
        Ok(summary)
    }
}
