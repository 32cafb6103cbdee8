//! Guess tables and their per-fold persistence.
//!
//! Each guesser directory holds one `guesses_{fold}.json` file per fold so
//! readers can load a single fold without touching the others.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::model::{Fold, Qnum};

/// One guess for one question prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuessRecord {
    pub qnum: Qnum,
    pub sentence: usize,
    pub token: usize,
    pub guess: String,
    pub score: f64,
    pub fold: Fold,
    /// Display name of the guesser that produced the row.
    pub guesser: String,
}

impl GuessRecord {
    /// JSON has no encoding for NaN or infinities, so such rows cannot be
    /// saved and loaded back.
    pub fn ensure_finite(&self) -> Result<(), PipelineError> {
        if self.score.is_finite() {
            Ok(())
        } else {
            Err(PipelineError::NonFiniteScore {
                guesser: self.guesser.clone(),
                qnum: self.qnum,
                sentence: self.sentence,
                token: self.token,
                guess: self.guess.clone(),
                score: self.score,
            })
        }
    }
}

/// Ordered collection of guess rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuessTable {
    rows: Vec<GuessRecord>,
}

impl GuessTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<GuessRecord>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[GuessRecord] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<GuessRecord> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push(&mut self, row: GuessRecord) {
        self.rows.push(row);
    }

    /// Concatenate another table after this one.
    pub fn append(&mut self, other: GuessTable) {
        self.rows.extend(other.rows);
    }

    /// Rows belonging to `fold`, in order.
    pub fn for_fold(&self, fold: Fold) -> GuessTable {
        Self::from_rows(self.rows.iter().filter(|r| r.fold == fold).cloned().collect())
    }

    /// Group rows by a key, keeping row order inside each group and ordering
    /// groups by key.
    pub fn group_by<K, F>(&self, key: F) -> BTreeMap<K, Vec<&GuessRecord>>
    where
        K: Ord,
        F: Fn(&GuessRecord) -> K,
    {
        let mut groups: BTreeMap<K, Vec<&GuessRecord>> = BTreeMap::new();
        for row in &self.rows {
            groups.entry(key(row)).or_default().push(row);
        }
        groups
    }
}

impl Extend<GuessRecord> for GuessTable {
    fn extend<I: IntoIterator<Item = GuessRecord>>(&mut self, iter: I) {
        self.rows.extend(iter);
    }
}

impl FromIterator<GuessRecord> for GuessTable {
    fn from_iter<I: IntoIterator<Item = GuessRecord>>(iter: I) -> Self {
        Self::from_rows(iter.into_iter().collect())
    }
}

/// Path of the guess file for `fold` inside a guesser directory.
pub fn guess_path(directory: &Path, fold: Fold) -> PathBuf {
    directory.join(format!("guesses_{fold}.json"))
}

/// Write `table` split by fold. Every fold gets a file, even when empty.
pub fn save_guesses(table: &GuessTable, directory: &Path) -> Result<()> {
    save_fold_guesses(table, directory, &Fold::ALL)
}

/// Write the rows of `folds` only, replacing those folds' files.
///
/// Files of other folds are left untouched; an empty file is created for
/// any of them that does not exist yet, so the directory always holds a
/// complete set.
pub fn save_fold_guesses(table: &GuessTable, directory: &Path, folds: &[Fold]) -> Result<()> {
    for row in table.rows() {
        row.ensure_finite()?;
    }

    std::fs::create_dir_all(directory)
        .with_context(|| format!("failed to create {}", directory.display()))?;

    for fold in Fold::ALL {
        let path = guess_path(directory, fold);
        if folds.contains(&fold) {
            write_fold(&table.for_fold(fold), fold, &path)?;
        } else if !path.exists() {
            write_fold(&GuessTable::new(), fold, &path)?;
        } else {
            tracing::debug!(fold = %fold, path = %path.display(), "keeping existing guesses");
        }
    }
    Ok(())
}

fn write_fold(fold_table: &GuessTable, fold: Fold, path: &Path) -> Result<()> {
    let json = serde_json::to_string(fold_table).context("failed to serialize guesses")?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write guesses to {}", path.display()))?;
    tracing::debug!(fold = %fold, rows = fold_table.len(), path = %path.display(), "saved guesses");
    Ok(())
}

/// Load and concatenate the guess files of `folds`, in the order given.
///
/// A missing fold file is an error: aggregation relies on every requested
/// fold being present.
pub fn load_guesses(directory: &Path, folds: &[Fold]) -> Result<GuessTable> {
    if folds.is_empty() {
        return Err(PipelineError::NoFoldsRequested.into());
    }

    let mut table = GuessTable::new();
    for &fold in folds {
        let path = guess_path(directory, fold);
        let content = std::fs::read_to_string(&path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                anyhow::Error::new(PipelineError::GuessFileNotFound {
                    fold,
                    path: path.clone(),
                })
            } else {
                anyhow::Error::new(e).context(format!("failed to read {}", path.display()))
            }
        })?;
        let fold_table: GuessTable = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse guesses in {}", path.display()))?;
        table.append(fold_table);
    }
    Ok(table)
}

/// Load every fold's guesses from a guesser directory.
pub fn load_all_guesses(directory: &Path) -> Result<GuessTable> {
    load_guesses(directory, &Fold::ALL)
}
