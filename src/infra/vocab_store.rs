// ============================================================
// Layer 6 — Vocabulary Artifact Store
// ============================================================
// Persists the Vocabulary built at prep time and loads it for
// every training run.
//
// File layout (bincode):
//   format : u32         — ARTIFACT_FORMAT, checked on load
//   vocab  : Vocabulary  — word index, label index, max_seq_length
//
// Writes go to a temp file in the target directory which is
// then renamed over the destination, so a crash mid-write
// never leaves a truncated artifact behind.

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

use crate::data::vocab::Vocabulary;
use crate::domain::error::{VqaError, VqaResult};

pub const ARTIFACT_FORMAT: u32 = 1;

#[derive(Serialize)]
struct ArtifactRef<'a> {
    format: u32,
    vocab:  &'a Vocabulary,
}

#[derive(Deserialize)]
struct Artifact {
    format: u32,
    vocab:  Vocabulary,
}

pub fn save_vocabulary(vocab: &Vocabulary, path: &Path) -> VqaResult<()> {
    let fail = |e: &dyn std::fmt::Display| VqaError::artifact(path, format!("cannot write: {e}"));

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| fail(&e))?;

    let mut temp = NamedTempFile::new_in(parent).map_err(|e| fail(&e))?;
    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        bincode::serialize_into(&mut writer, &ArtifactRef { format: ARTIFACT_FORMAT, vocab })
            .map_err(|e| fail(&e))?;
        writer.flush().map_err(|e| fail(&e))?;
    }
    temp.persist(path).map_err(|e| fail(&e))?;

    tracing::info!(
        "Saved vocabulary ({} words, {} labels, max_seq_length={}) to '{}'",
        vocab.words.len(),
        vocab.labels.len(),
        vocab.max_seq_length(),
        path.display()
    );
    Ok(())
}

/// Load and validate an artifact. A missing file, an unknown
/// format tag or broken index maps are all Artifact errors.
pub fn load_vocabulary(path: &Path) -> VqaResult<Vocabulary> {
    let file = File::open(path).map_err(|e| VqaError::artifact(path, format!("cannot open: {e}")))?;
    let artifact: Artifact = bincode::deserialize_from(BufReader::new(file))
        .map_err(|e| VqaError::artifact(path, format!("cannot decode: {e}")))?;

    if artifact.format != ARTIFACT_FORMAT {
        return Err(VqaError::artifact(
            path,
            format!("format {} is not supported (expected {})", artifact.format, ARTIFACT_FORMAT),
        ));
    }
    artifact
        .vocab
        .check_consistency()
        .map_err(|msg| VqaError::artifact(path, msg))?;

    tracing::info!("Loaded vocabulary from '{}'", path.display());
    Ok(artifact.vocab)
}
