// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights using Burn's CompactRecorder.
// A checkpoint holds weights only; optimiser state and step
// counters are not persisted, every run starts at step 0.
//
// File naming convention (inside the run directory):
//   model_3000.mpk         ← weights after step 3000
//   model_6000.mpk
//   model_best.mpk         ← best full-epoch validation accuracy
//   train_config.json      ← the run's configuration
//
// Burn's CompactRecorder:
//   - Serialises model parameters to named MessagePack
//   - Stores floats at half precision
//   - Type-safe: loading fails if the architecture doesn't match

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::CompactRecorder,
};
use serde::Serialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

pub const BEST_TAG: &str = "model_best";

/// Checkpoint tag for a step count.
pub fn step_tag(step: usize) -> String {
    format!("model_{step}")
}

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create the manager, creating its directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    /// Relative checkpoint paths are looked up inside the run directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.dir.join(path)
        }
    }

    /// Write `{dir}/{tag}.mpk`. The recorder adds the extension.
    pub fn save_model<B: Backend, M: Module<B>>(&self, model: &M, tag: &str) -> Result<PathBuf> {
        let path = self.dir.join(tag);
        model
            .clone()
            .save_file(path.clone(), &CompactRecorder::new())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        tracing::debug!("Saved checkpoint '{}'", tag);
        Ok(path)
    }

    /// Restore weights into `model` from a checkpoint path, with or
    /// without the recorder's extension.
    pub fn load_model<B: Backend, M: Module<B>>(
        &self,
        model:  M,
        path:   &Path,
        device: &B::Device,
    ) -> Result<M> {
        let path = self.resolve(path);
        let model = model
            .load_file(path.clone(), &CompactRecorder::new(), device)
            .with_context(|| {
                format!("Cannot load checkpoint '{}'. Does it match the selected model?", path.display())
            })?;

        tracing::info!("Restored weights from '{}'", path.display());
        Ok(model)
    }

    pub fn save_config<C: Serialize>(&self, cfg: &C) -> Result<()> {
        let path = self.dir.join("train_config.json");
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }
}
