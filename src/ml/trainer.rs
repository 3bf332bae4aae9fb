// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Step-driven train + validation loop using Burn's DataLoader
// and Adam.
//
//   for each epoch:
//     reshuffle the whole split (seed + epoch), keep the longest
//     prefix that splits into full batches on every worker
//     for each full batch:
//       forward → cross-entropy → backward → Adam step, step += 1
//       step == 1 or step % log_interval == 0
//           → budgeted validation (val_size samples) + progress line
//       step % save_interval == 0
//           → checkpoint model_<step>
//     full validation pass → model_best when accuracy improves
//
// Key Burn insight:
//   - Training uses B (an AutodiffBackend) for gradients
//   - model.valid() returns the model on B::InnerBackend
//   - the validation batcher therefore also uses B::InnerBackend
//   - num_workers > 1 makes the loader cut the dataset into
//     contiguous shards, one per worker, so shuffling happens
//     before the loader sees the data
//
// A non-finite training loss stops the run with a Numeric error.

use anyhow::Result;
use burn::{
    data::{
        dataloader::{DataLoader, DataLoaderBuilder},
        dataset::{
            transform::{PartialDataset, ShuffledDataset},
            Dataset,
        },
    },
    module::AutodiffModule,
    nn::loss::CrossEntropyLossConfig,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::{backend::AutodiffBackend, ElementConversion},
};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::{VqaBatch, VqaBatcher},
    dataset::{SampleResult, VqaDataset},
};
use crate::domain::error::{VqaError, VqaResult};
use crate::infra::{
    checkpoint::{step_tag, CheckpointManager, BEST_TAG},
    metrics::{MetricsLogger, TRAIN_LOSS, VAL_ACCURACY, VAL_LOSS},
    run_log::RunLog,
};
use crate::ml::evaluator::{evaluate, EvalMetrics};
use crate::ml::model::VqaNet;

/// Validation passes draw their shuffle seeds from a separate range.
const VAL_SEED_OFFSET: u64 = 1 << 32;

/// Where a run reports to.
pub struct RunOutputs<'a> {
    pub checkpoints: &'a CheckpointManager,
    pub metrics:     &'a MetricsLogger,
    pub log:         &'a RunLog,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainSummary {
    pub steps:         usize,
    pub epochs:        usize,
    /// Best full-epoch validation accuracy, when validation ran
    pub best_accuracy: Option<f64>,
}

/// Remaining wall time if every step costs the average so far.
/// Unknown before the first step.
pub fn estimate_remaining(
    elapsed:         Duration,
    step:            usize,
    steps_per_epoch: usize,
    num_epochs:      usize,
) -> Option<Duration> {
    if step == 0 {
        return None;
    }
    let per_step = elapsed.as_secs_f64() / step as f64;
    let total    = per_step * (steps_per_epoch * num_epochs) as f64;
    Some(Duration::from_secs_f64((total - elapsed.as_secs_f64()).max(0.0)))
}

pub fn format_duration(d: Option<Duration>) -> String {
    match d {
        None => "unknown".to_string(),
        Some(d) => {
            let s = d.as_secs();
            format!("{:02}:{:02}:{:02}", s / 3600, (s / 60) % 60, s % 60)
        }
    }
}

fn is_log_step(step: usize, log_interval: usize) -> bool {
    step == 1 || step % log_interval == 0
}

/// Stop the run on a NaN or infinite value.
fn check_finite(quantity: &'static str, value: f64, step: usize) -> Result<(), VqaError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(VqaError::Numeric { quantity, step, value })
    }
}

/// How one pass over a split is cut into batches.
///
/// The loader hands each worker a contiguous shard and every shard
/// ends with its own short batch, so only `samples` items (a multiple
/// of `batch_size * workers`) of the reshuffled split are used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochPlan {
    pub workers: usize,
    pub samples: usize,
    pub steps:   usize,
}

impl EpochPlan {
    /// `None` when the split cannot fill a single batch.
    /// Workers are capped at the number of full batches available.
    pub fn new(len: usize, batch_size: usize, num_workers: usize) -> Option<Self> {
        let full_batches = len / batch_size;
        if full_batches == 0 {
            return None;
        }
        let workers = num_workers.clamp(1, full_batches);
        let round   = batch_size * workers;
        let samples = len / round * round;
        Some(Self { workers, samples, steps: samples / batch_size })
    }
}

/// Loader over a freshly shuffled view of `dataset`.
fn pass_loader<BB: Backend>(
    dataset:    &Arc<VqaDataset>,
    plan:       EpochPlan,
    seed:       u64,
    batch_size: usize,
    device:     &BB::Device,
) -> Arc<dyn DataLoader<VqaResult<VqaBatch<BB>>>> {
    let shuffled: ShuffledDataset<_, SampleResult> = ShuffledDataset::with_seed(Arc::clone(dataset), seed);
    let view = PartialDataset::new(shuffled, 0, plan.samples);
    DataLoaderBuilder::new(VqaBatcher::<BB>::new(device.clone()))
        .batch_size(batch_size)
        .num_workers(plan.workers)
        .build(view)
}

pub fn train_loop<B, M>(
    cfg:       &TrainConfig,
    mut model: M,
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
    // ── Sizes ─────────────────────────────────────────────────────────────────
    let train_plan = EpochPlan::new(train_set.len(), cfg.batch_size, cfg.num_workers).ok_or_else(|| {
        VqaError::config(format!(
            "training set has {} samples, fewer than one batch of {}",
            train_set.len(),
            cfg.batch_size
        ))
    })?;
    let val_plan = match &val_set {
        None => None,
        Some(v) => Some(EpochPlan::new(v.len(), cfg.batch_size, cfg.num_workers).ok_or_else(|| {
            VqaError::config(format!(
                "validation set has {} samples, fewer than one batch of {}",
                v.len(),
                cfg.batch_size
            ))
        })?),
    };
    let val_count = val_set.as_ref().map(|v| v.len()).unwrap_or(0);
    let steps_per_epoch = train_plan.steps;

    out.log.line(&format!(
        "Training on {} of {} samples per epoch ({} steps, {} workers), validating on {} samples",
        train_plan.samples,
        train_set.len(),
        steps_per_epoch,
        train_plan.workers,
        val_plan.map_or(0, |p| p.samples),
    ))?;
    if train_plan.workers < cfg.num_workers {
        tracing::warn!(
            "Using {} data-loader workers instead of {}: each worker needs at least one full batch",
            train_plan.workers,
            cfg.num_workers
        );
    }
    if val_set.is_some() {
        out.log.line(&format!(
            "Periodic validation accuracy uses up to {} samples, see --val-size",
            cfg.val_size
        ))?;
    }

    let train_set = Arc::new(train_set);
    let val_set   = val_set.map(Arc::new);

    let loss_fn   = CrossEntropyLossConfig::new().init(device);
    let mut optim = AdamConfig::new().init();

    let started = Instant::now();
    let mut step = 0usize;
    let mut best_accuracy: Option<f64> = None;

    // Validation on InnerBackend — no autodiff overhead
    let mut val_passes = 0u64;
    let mut validate = |model: &M, budget: usize| -> Result<Option<EvalMetrics>> {
        let (Some(ds), Some(plan)) = (&val_set, val_plan) else {
            return Ok(None);
        };
        val_passes += 1;
        let seed = cfg.seed.wrapping_add(VAL_SEED_OFFSET).wrapping_add(val_passes);
        let loader = pass_loader::<B::InnerBackend>(ds, plan, seed, cfg.batch_size, device);
        Ok(Some(evaluate(&model.valid(), loader.iter(), budget, cfg.batch_size)?))
    };

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=cfg.num_epochs {
        let seed = cfg.seed.wrapping_add(epoch as u64);
        let train_loader = pass_loader::<B>(&train_set, train_plan, seed, cfg.batch_size, device);
        let mut epoch_steps = 0usize;

        for batch in train_loader.iter() {
            let batch = batch?;
            if batch.len() < cfg.batch_size {
                continue;
            }

            let logits = model.forward(batch.images, batch.questions, batch.lengths);
            let loss   = loss_fn.forward(logits, batch.labels);
            let loss_value: f64 = loss.clone().into_scalar().elem::<f64>();
            check_finite("training loss", loss_value, step + 1)?;

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(cfg.learning_rate, model, grads);
            step += 1;
            epoch_steps += 1;

            // ── Log ───────────────────────────────────────────────────────────
            if is_log_step(step, cfg.log_interval) {
                if let Some(val) = validate(&model, cfg.val_size)? {
                    report_validation(out, step, &val, "Validation")?;
                }

                out.metrics.log_scalar(TRAIN_LOSS, step, loss_value)?;
                let elapsed = started.elapsed();
                out.log.line(&format!(
                    "Epoch {}/{} | step {}/{} | train_loss {:.4} | elapsed {} | remaining {}",
                    epoch,
                    cfg.num_epochs,
                    step,
                    steps_per_epoch * cfg.num_epochs,
                    loss_value,
                    format_duration(Some(elapsed)),
                    format_duration(estimate_remaining(elapsed, step, steps_per_epoch, cfg.num_epochs)),
                ))?;
            }

            // ── Checkpoint ────────────────────────────────────────────────────
            if step % cfg.save_interval == 0 {
                let path = out.checkpoints.save_model(&model, &step_tag(step))?;
                out.log.line(&format!("Saved checkpoint '{}'", path.display()))?;
            }
        }

        if epoch_steps == 0 {
            return Err(VqaError::config(format!(
                "epoch {epoch} produced no full batch of {} from {} training samples",
                cfg.batch_size,
                train_set.len()
            ))
            .into());
        }

        // ── End of epoch: full validation pass ────────────────────────────────
        if let Some(val) = validate(&model, val_count)? {
            report_validation(out, step, &val, &format!("Epoch {epoch} validation"))?;

            if best_accuracy.map_or(true, |best| val.accuracy > best) {
                best_accuracy = Some(val.accuracy);
                out.checkpoints.save_model(&model, BEST_TAG)?;
                out.log.line(&format!("New best validation accuracy {:.2}%", val.accuracy))?;
            }
        }
    }

    out.log.line(&format!("Training complete after {} steps over {} epochs", step, cfg.num_epochs))?;
    Ok(TrainSummary { steps: step, epochs: cfg.num_epochs, best_accuracy })
}

fn report_validation(out: &RunOutputs, step: usize, val: &EvalMetrics, label: &str) -> Result<()> {
    out.metrics.log_scalar(VAL_ACCURACY, step, val.accuracy)?;
    out.metrics.log_scalar(VAL_LOSS, step, val.loss)?;
    out.log.line(&format!(
        "{} | step {} | accuracy {:.2}% | loss {:.4} | {} batches",
        label, step, val.accuracy, val.loss, val.batches
    ))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::RunMode;
    use crate::data::{
        encoder::SampleEncoder, image::ImageTransform, tokenizer::BertWordTokenizer, vocab::Vocabulary,
    };
    use crate::domain::{record::CorpusRecord, traits::WordTokenizer};
    use crate::ml::model::{ModelKind, VqaModelConfig};
    use burn::backend::{Autodiff, NdArray};
    use image::{Rgb, RgbImage};
    use std::{path::Path, sync::Arc};

    type TestBackend = Autodiff<NdArray>;

    #[test]
    fn test_remaining_time() {
        assert_eq!(estimate_remaining(Duration::from_secs(5), 0, 10, 2), None);
        // 10 s for 5 of 20 steps → 30 s left
        assert_eq!(
            estimate_remaining(Duration::from_secs(10), 5, 10, 2),
            Some(Duration::from_secs(30))
        );
        assert_eq!(format_duration(None), "unknown");
        assert_eq!(format_duration(Some(Duration::from_secs(3723))), "01:02:03");
    }

    #[test]
    fn test_log_steps() {
        let logged: Vec<usize> = (1..=7).filter(|&s| is_log_step(s, 3)).collect();
        assert_eq!(logged, vec![1, 3, 6]);
    }

    #[test]
    fn test_non_finite_loss_is_fatal() {
        assert!(check_finite("training loss", 0.7, 3).is_ok());
        for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = check_finite("training loss", value, 12).unwrap_err();
            assert!(matches!(err, VqaError::Numeric { step: 12, .. }));
            let msg = err.to_string();
            assert!(msg.contains("12"), "{msg}");
            assert!(msg.contains("training loss"), "{msg}");
        }
    }

    #[test]
    fn test_epoch_plan_keeps_every_worker_shard_whole() {
        // 12 samples, batch 5, 3 workers: only two full batches exist
        let plan = EpochPlan::new(12, 5, 3).unwrap();
        assert_eq!(plan, EpochPlan { workers: 2, samples: 10, steps: 2 });

        let plan = EpochPlan::new(23, 2, 3).unwrap();
        assert_eq!(plan, EpochPlan { workers: 3, samples: 18, steps: 9 });
        assert_eq!(plan.samples % (2 * plan.workers), 0);

        assert_eq!(EpochPlan::new(6, 5, 2).unwrap().workers, 1);
        assert_eq!(EpochPlan::new(4, 5, 1), None);
    }

    fn config(dir: &Path) -> TrainConfig {
        TrainConfig {
            mode:          RunMode::Train,
            model:         ModelKind::Baseline,
            expt_dir:      dir.to_path_buf(),
            expt_name:     "smoke".into(),
            run_name:      "r1".into(),
            train_img:     dir.to_path_buf(),
            train_file:    dir.join("train.txt"),
            val_img:       Some(dir.to_path_buf()),
            val_file:      Some(dir.join("val.txt")),
            vocab_file:    dir.join("vocab.bin"),
            num_cls:       2,
            batch_size:    2,
            num_epochs:    2,
            learning_rate: 1e-3,
            log_interval:  2,
            save_interval: 3,
            val_size:      2,
            model_ckpt:    None,
            num_workers:   1,
            seed:          7,
            image_size:    Some(8),
        }
    }

    #[test]
    fn test_smoke_training_run() {
        let dir = tempfile::tempdir().unwrap();
        for (i, colour) in [[255, 0, 0], [0, 255, 0], [0, 0, 255]].iter().enumerate() {
            RgbImage::from_pixel(10, 10, Rgb(*colour)).save(dir.path().join(format!("{i}.png"))).unwrap();
        }
        let corpus = vec![
            CorpusRecord::new("0.png", "what colour is it", "red"),
            CorpusRecord::new("1.png", "what colour is it", "green"),
            CorpusRecord::new("2.png", "what colour is this image", "blue"),
            CorpusRecord::new("0.png", "is it red", "yes"),
            CorpusRecord::new("1.png", "is it red", "no"),
        ];

        let tokenizer: Arc<dyn WordTokenizer> = Arc::new(BertWordTokenizer::new());
        let vocab = Arc::new(Vocabulary::build(&corpus, tokenizer.as_ref(), 1, 2).unwrap());
        let encoder = SampleEncoder::new(vocab.clone(), tokenizer, Arc::new(ImageTransform::new(8)), dir.path());
        let train = VqaDataset::from_records("train", &corpus, encoder.clone()).unwrap();
        let val = VqaDataset::from_records("val", &corpus[..3], encoder).unwrap();

        let run_dir = dir.path().join("run");
        let checkpoints = CheckpointManager::new(&run_dir).unwrap();
        let metrics = MetricsLogger::new(&run_dir).unwrap();
        let log = RunLog::create(&run_dir, "run", &[]).unwrap();
        let out = RunOutputs { checkpoints: &checkpoints, metrics: &metrics, log: &log };

        let device = Default::default();
        let model = VqaModelConfig::new(vocab.words.len(), 3, 8, 4, 4).init_baseline::<TestBackend>(&device);
        let summary = train_loop(&config(dir.path()), model, train, Some(val), &device, &out).unwrap();

        // 5 samples, batch 2 → 2 full steps per epoch
        assert_eq!(summary.steps, 4);
        let best = summary.best_accuracy.unwrap();
        assert!((0.0..=100.0).contains(&best));

        assert!(run_dir.join("model_3.mpk").is_file());
        assert!(run_dir.join("model_best.mpk").is_file());

        let csv = std::fs::read_to_string(metrics.csv_path()).unwrap();
        assert!(csv.contains("Train/Loss,1,"));
        assert!(csv.contains("Train/Loss,2,"));
        assert!(csv.contains("Train/Loss,4,"));
        assert!(!csv.contains("Train/Loss,3,"));
        assert!(csv.contains("Val/Accuracy,"));
    }

    #[test]
    fn test_training_set_smaller_than_batch_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        RgbImage::new(4, 4).save(dir.path().join("a.png")).unwrap();
        let corpus = vec![CorpusRecord::new("a.png", "is it dark", "yes")];

        let tokenizer: Arc<dyn WordTokenizer> = Arc::new(BertWordTokenizer::new());
        let vocab = Arc::new(Vocabulary::build(&corpus, tokenizer.as_ref(), 1, 2).unwrap());
        let encoder = SampleEncoder::new(vocab.clone(), tokenizer, Arc::new(ImageTransform::new(8)), dir.path());
        let train = VqaDataset::from_records("train", &corpus, encoder).unwrap();

        let run_dir = dir.path().join("run");
        let checkpoints = CheckpointManager::new(&run_dir).unwrap();
        let metrics = MetricsLogger::new(&run_dir).unwrap();
        let log = RunLog::create(&run_dir, "run", &[]).unwrap();
        let out = RunOutputs { checkpoints: &checkpoints, metrics: &metrics, log: &log };

        let device = Default::default();
        let model = VqaModelConfig::new(vocab.words.len(), 3, 8, 4, 4).init_baseline::<TestBackend>(&device);
        let err = train_loop(&config(dir.path()), model, train, None, &device, &out).unwrap_err();
        assert!(matches!(err.downcast_ref::<VqaError>(), Some(VqaError::Config(_))));
    }

    /// `n` records over three solid-colour images.
    fn colour_corpus(dir: &Path, n: usize) -> Vec<CorpusRecord> {
        let colours = [("red", [255, 0, 0]), ("green", [0, 255, 0]), ("blue", [0, 0, 255])];
        for (i, (_, rgb)) in colours.iter().enumerate() {
            RgbImage::from_pixel(10, 10, Rgb(*rgb)).save(dir.join(format!("{i}.png"))).unwrap();
        }
        (0..n)
            .map(|i| CorpusRecord::new(&format!("{}.png", i % 3), "what colour is it", colours[i % 3].0))
            .collect()
    }

    #[test]
    fn test_several_workers_still_train_every_epoch() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = colour_corpus(dir.path(), 12);

        let tokenizer: Arc<dyn WordTokenizer> = Arc::new(BertWordTokenizer::new());
        let vocab = Arc::new(Vocabulary::build(&corpus, tokenizer.as_ref(), 1, 2).unwrap());
        let encoder = SampleEncoder::new(vocab.clone(), tokenizer, Arc::new(ImageTransform::new(8)), dir.path());
        let train = VqaDataset::from_records("train", &corpus, encoder.clone()).unwrap();
        let val = VqaDataset::from_records("val", &corpus[..6], encoder).unwrap();

        let run_dir = dir.path().join("run");
        let checkpoints = CheckpointManager::new(&run_dir).unwrap();
        let metrics = MetricsLogger::new(&run_dir).unwrap();
        let log = RunLog::create(&run_dir, "run", &[]).unwrap();
        let out = RunOutputs { checkpoints: &checkpoints, metrics: &metrics, log: &log };

        let cfg = TrainConfig {
            batch_size:    5,
            num_epochs:    3,
            num_workers:   3,
            val_size:      5,
            log_interval:  100,
            save_interval: 100,
            ..config(dir.path())
        };
        let device = Default::default();
        let model = VqaModelConfig::new(vocab.words.len(), 3, 8, 4, 4).init_baseline::<TestBackend>(&device);
        let summary = train_loop(&cfg, model, train, Some(val), &device, &out).unwrap();

        // 2 workers × 1 full batch each, every epoch
        assert_eq!(summary.steps, 6);
        assert_eq!(summary.epochs, 3);
        assert!(summary.best_accuracy.is_some());

        let text = std::fs::read_to_string(log.path()).unwrap();
        assert!(text.contains("Epoch 3 validation"));
    }
}
