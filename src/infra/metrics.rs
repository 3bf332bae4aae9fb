// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records scalar training metrics to a CSV file, one row per
// value, so curves can be plotted per tag:
//
//   tag,step,value
//   Train/Loss,1,6.907812
//   Val/Accuracy,100,12.500000
//   Val/Loss,100,5.120044
//
// Output file: <run dir>/metrics.csv (appended across runs)

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

pub const TRAIN_LOSS:   &str = "Train/Loss";
pub const VAL_ACCURACY: &str = "Val/Accuracy";
pub const VAL_LOSS:     &str = "Val/Loss";

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let csv_path = dir.join("metrics.csv");

        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "tag,step,value")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log_scalar(&self, tag: &str, step: usize, value: f64) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot append to '{}'", self.csv_path.display()))?;
        writeln!(f, "{tag},{step},{value:.6}")?;
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}
