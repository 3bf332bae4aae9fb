// ============================================================
// Layer 6 — Run Log
// ============================================================
// Human-readable record of one run, appended to
// <run dir>/train_log.txt:
//
//   run
//   --batch_size 8
//   --learning_rate 0.0001
//   ...
//   [2026-10-19 14:02:11] Epoch 1/50 | step 1 | train_loss 6.9078 ...
//
// Every progress line is also emitted through tracing.

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    /// Open (or create) the log and write the command header.
    pub fn create(dir: &Path, command: &str, flags: &[(String, String)]) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let log = Self { path: dir.join("train_log.txt") };

        let mut f = log.open()?;
        writeln!(f, "{command}")?;
        for (name, value) in flags {
            writeln!(f, "--{name} {value}")?;
        }
        Ok(log)
    }

    pub fn line(&self, message: &str) -> Result<()> {
        tracing::info!("{}", message);
        let stamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        writeln!(self.open()?, "[{stamp}] {message}")?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<fs::File> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Cannot open run log '{}'", self.path.display()))
    }
}
