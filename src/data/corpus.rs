// ============================================================
// Layer 4 — Corpus File
// ============================================================
// Reads and writes the flat `image \t question \t answer` corpus
// produced by `prepare` and consumed by vocabulary building and
// dataset construction.

use anyhow::{Context, Result};
use std::{
    collections::HashSet,
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use crate::domain::record::CorpusRecord;

/// Read every record of a corpus file.
/// Blank lines are ignored; a malformed line fails the whole read
/// with its `file:line` position.
pub fn read_corpus(path: &Path) -> Result<Vec<CorpusRecord>> {
    let file = File::open(path)
        .with_context(|| format!("Cannot open corpus file '{}'", path.display()))?;

    let mut records = Vec::new();
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line
            .with_context(|| format!("Cannot read line {} of '{}'", i + 1, path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let origin = format!("{}:{}", path.display(), i + 1);
        records.push(CorpusRecord::parse_line(&line, &origin)?);
    }

    tracing::debug!("Read {} records from '{}'", records.len(), path.display());
    Ok(records)
}

pub fn write_corpus(path: &Path, records: &[CorpusRecord]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create directory '{}'", parent.display()))?;
    }

    let file = File::create(path)
        .with_context(|| format!("Cannot create corpus file '{}'", path.display()))?;
    let mut out = BufWriter::new(file);
    for record in records {
        writeln!(out, "{}", record.to_line())?;
    }
    out.flush()
        .with_context(|| format!("Cannot write corpus file '{}'", path.display()))?;
    Ok(())
}

/// Keep only the records whose answer is one of `labels`
/// (e.g. the yes/no subset, or the top-K answers of a vocabulary).
pub fn filter_by_labels(records: Vec<CorpusRecord>, labels: &[&str]) -> Vec<CorpusRecord> {
    let keep: HashSet<&str> = labels.iter().copied().collect();
    records
        .into_iter()
        .filter(|r| keep.contains(r.answer.as_str()))
        .collect()
}
