// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with clap.
// All work is delegated to Layer 2 (application).
//
//   1. `prepare` — VQA JSON → corpus file (+ vocabulary)
//   2. `run`     — trains a model on prepared corpora

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, PrepareArgs, RunArgs};

#[derive(Parser, Debug)]
#[command(
    name = "vqa-trainer",
    version = "0.1.0",
    about = "Prepare VQA corpora and train visual question answering models."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Prepare(args) => Self::run_prepare(args),
            Commands::Run(args)     => Self::run_train(args),
        }
    }

    fn run_prepare(args: PrepareArgs) -> Result<()> {
        use crate::application::prepare_use_case::PrepareUseCase;

        tracing::info!("Preparing {:?} split from '{}'", args.split, args.annot_file.display());
        let report = PrepareUseCase::new(args.into()).execute()?;

        println!(
            "Wrote {} records ({} annotations skipped, {} filtered out).",
            report.written, report.rejected, report.filtered
        );
        Ok(())
    }

    fn run_train(args: RunArgs) -> Result<()> {
        use crate::application::train_use_case::TrainUseCase;

        tracing::info!("Starting run '{}' of experiment '{}'", args.run_name, args.expt_name);
        let summary = TrainUseCase::new(args.into()).execute()?;

        println!("Training complete after {} steps over {} epochs.", summary.steps, summary.epochs);
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_requires_exactly_one_image_naming() {
        let base = ["vqa-trainer", "prepare", "-s", "train", "-a", "a.json", "-q", "q.json", "-o", "out.txt"];
        assert!(Cli::try_parse_from(base).is_err());

        let both = [&base[..], &["--balanced-real-images", "--abstract-scene-images"][..]].concat();
        assert!(Cli::try_parse_from(both).is_err());

        let one = [&base[..], &["--abstract-scene-images"][..]].concat();
        assert!(Cli::try_parse_from(one).is_ok());
    }

    #[test]
    fn test_num_cls_minimum() {
        let args = [
            "vqa-trainer", "prepare", "-s", "val", "-a", "a", "-q", "q", "-o", "o",
            "--balanced-real-images", "-K", "1",
        ];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_run_defaults() {
        let cli = Cli::try_parse_from([
            "vqa-trainer", "run", "--mode", "train", "--model", "baseline",
            "--expt-dir", "e", "--expt-name", "n", "--run-name", "r",
            "--train-img", "img", "--train-file", "t.txt", "--vocab-file", "v.bin",
        ])
        .unwrap();

        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        let cfg: crate::application::train_use_case::TrainConfig = args.into();
        assert_eq!(cfg.batch_size, 8);
        assert_eq!(cfg.num_epochs, 50);
        assert_eq!(cfg.save_interval, 3000);
        assert_eq!(cfg.val_size, 10000);
        assert_eq!(cfg.num_cls, 1000);
        assert_eq!(cfg.seed, 42);
        assert!(cfg.val_file.is_none());
    }

    #[test]
    fn test_val_flags_come_together() {
        let result = Cli::try_parse_from([
            "vqa-trainer", "run", "--mode", "train", "--model", "attention",
            "--expt-dir", "e", "--expt-name", "n", "--run-name", "r",
            "--train-img", "img", "--train-file", "t.txt", "--vocab-file", "v.bin",
            "--val-file", "val.txt",
        ]);
        assert!(result.is_err());
    }
}
