// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `prepare` and `run`, and all
// their flags.
//
// clap's derive macros generate help text, error messages for
// missing or invalid args, and the string → value conversions.

use clap::{ArgGroup, Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::application::{
    prepare_use_case::PrepareConfig,
    train_use_case::{RunMode, TrainConfig},
};
use crate::data::annotations::{ImageNaming, Split};
use crate::ml::model::ModelKind;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a corpus file (and optionally the vocabulary) from VQA JSON
    Prepare(PrepareArgs),

    /// Train a model on prepared corpora
    Run(RunArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum SplitArg {
    Train,
    Val,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum ModeArg {
    Train,
    Test,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum ModelArg {
    Baseline,
    Attention,
}

fn int_min_two(s: &str) -> Result<usize, String> {
    let k: usize = s.parse().map_err(|_| format!("'{s}' is not a number"))?;
    if k < 2 {
        return Err(format!("must be at least 2, got {k}"));
    }
    Ok(k)
}

// ─── prepare ──────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
#[command(group(
    ArgGroup::new("images")
        .required(true)
        .args(["balanced_real_images", "abstract_scene_images"]),
))]
pub struct PrepareArgs {
    /// Which split the files belong to
    #[arg(short = 's', long, value_enum)]
    pub split: SplitArg,

    /// Annotations file (.json)
    #[arg(short = 'a', long)]
    pub annot_file: PathBuf,

    /// Questions file (.json)
    #[arg(short = 'q', long)]
    pub ques_file: PathBuf,

    /// Output corpus file: image \t question \t answer per line
    #[arg(short = 'o', long)]
    pub output_file: PathBuf,

    /// Also build the vocabulary and save it here (training split)
    #[arg(short = 'v', long)]
    pub vocab_file: Option<PathBuf>,

    /// Minimum word frequency for a word to enter the vocabulary
    #[arg(short = 'c', long, default_value_t = 5)]
    pub min_word_count: usize,

    /// Top-K most frequent answers become labels
    #[arg(short = 'K', long, default_value_t = 1000, value_parser = int_min_two)]
    pub num_cls: usize,

    /// Keep only records with one of these answers (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub keep_answers: Vec<String>,

    /// Images are named COCO_<split>2014_<id>.jpg
    #[arg(long)]
    pub balanced_real_images: bool,

    /// Images are named abstract_v002_train2015_<id>.png
    #[arg(long)]
    pub abstract_scene_images: bool,
}

impl From<PrepareArgs> for PrepareConfig {
    fn from(a: PrepareArgs) -> Self {
        PrepareConfig {
            split: match a.split {
                SplitArg::Train => Split::Train,
                SplitArg::Val   => Split::Val,
            },
            annot_file:     a.annot_file,
            ques_file:      a.ques_file,
            output_file:    a.output_file,
            vocab_file:     a.vocab_file,
            min_word_count: a.min_word_count,
            num_cls:        a.num_cls,
            naming: if a.abstract_scene_images {
                ImageNaming::AbstractScene
            } else {
                ImageNaming::BalancedReal
            },
            keep_answers:   a.keep_answers,
        }
    }
}

// ─── run ──────────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct RunArgs {
    /// train, or test (not implemented)
    #[arg(long, value_enum)]
    pub mode: ModeArg,

    /// Network to train
    #[arg(long, value_enum)]
    pub model: ModelArg,

    /// Root directory for experiments
    #[arg(long)]
    pub expt_dir: PathBuf,

    /// expt_dir/expt_name groups related runs
    #[arg(long)]
    pub expt_name: String,

    /// expt_dir/expt_name/run_name holds this run's outputs
    #[arg(long)]
    pub run_name: String,

    /// Directory of training images
    #[arg(long)]
    pub train_img: PathBuf,

    /// Training corpus file
    #[arg(long)]
    pub train_file: PathBuf,

    /// Directory of validation images
    #[arg(long, requires = "val_file")]
    pub val_img: Option<PathBuf>,

    /// Validation corpus file
    #[arg(long, requires = "val_img")]
    pub val_file: Option<PathBuf>,

    /// Vocabulary artifact written by `prepare`
    #[arg(long)]
    pub vocab_file: PathBuf,

    /// Top-K answers used as labels
    #[arg(short = 'K', long, default_value_t = 1000, value_parser = int_min_two)]
    pub num_cls: usize,

    #[arg(long, default_value_t = 8)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 50)]
    pub num_epochs: usize,

    #[arg(long, default_value_t = 1e-4)]
    pub learning_rate: f64,

    /// Log training progress every n steps
    #[arg(long, default_value_t = 100)]
    pub log_interval: usize,

    /// Save a checkpoint every n steps
    #[arg(long, default_value_t = 3000)]
    pub save_interval: usize,

    /// Validation samples used for the periodic accuracy
    #[arg(long, default_value_t = 10000)]
    pub val_size: usize,

    /// Checkpoint to start from, e.g. model_3000 (relative to the run directory)
    #[arg(long)]
    pub model_ckpt: Option<PathBuf>,

    /// Data-loader worker threads
    #[arg(long, default_value_t = 1)]
    pub num_workers: usize,

    /// Seed of the per-epoch shuffle
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Override the model's input image size
    #[arg(long)]
    pub image_size: Option<usize>,
}

impl From<RunArgs> for TrainConfig {
    fn from(a: RunArgs) -> Self {
        TrainConfig {
            mode: match a.mode {
                ModeArg::Train => RunMode::Train,
                ModeArg::Test  => RunMode::Test,
            },
            model: match a.model {
                ModelArg::Baseline  => ModelKind::Baseline,
                ModelArg::Attention => ModelKind::Attention,
            },
            expt_dir:      a.expt_dir,
            expt_name:     a.expt_name,
            run_name:      a.run_name,
            train_img:     a.train_img,
            train_file:    a.train_file,
            val_img:       a.val_img,
            val_file:      a.val_file,
            vocab_file:    a.vocab_file,
            num_cls:       a.num_cls,
            batch_size:    a.batch_size,
            num_epochs:    a.num_epochs,
            learning_rate: a.learning_rate,
            log_interval:  a.log_interval,
            save_interval: a.save_interval,
            val_size:      a.val_size,
            model_ckpt:    a.model_ckpt,
            num_workers:   a.num_workers,
            seed:          a.seed,
            image_size:    a.image_size,
        }
    }
}
