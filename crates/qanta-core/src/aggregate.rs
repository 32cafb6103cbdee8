//! Cross-guesser aggregation.
//!
//! Merges every enabled guesser's persisted guesses into a coverage index
//! (which guesser produced which guess where) and a per-question task list
//! for evaluation and reporting.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::guesses::{load_all_guesses, GuessTable};
use crate::model::{Fold, Qnum, Question};
use crate::questions::QuestionSource;

/// A guess at one question prefix, without the guesser.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CoverageKey {
    pub qnum: Qnum,
    pub sentence: usize,
    pub token: usize,
    pub guess: String,
}

/// Guesser display name → every guess it produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuesserIndex {
    coverage: BTreeMap<String, BTreeSet<CoverageKey>>,
}

impl GuesserIndex {
    pub fn insert(&mut self, guesser: &str, key: CoverageKey) {
        self.coverage
            .entry(guesser.to_string())
            .or_default()
            .insert(key);
    }

    pub fn covers(&self, guesser: &str, key: &CoverageKey) -> bool {
        self.coverage
            .get(guesser)
            .is_some_and(|keys| keys.contains(key))
    }

    pub fn coverage(&self, guesser: &str) -> Option<&BTreeSet<CoverageKey>> {
        self.coverage.get(guesser)
    }

    pub fn guessers(&self) -> impl Iterator<Item = &str> {
        self.coverage.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.coverage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coverage.is_empty()
    }
}

/// A guess row in a task, guesser column dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskGuess {
    pub guess: String,
    pub score: f64,
    pub fold: Fold,
    pub sentence: usize,
    pub token: usize,
    pub qnum: Qnum,
}

/// One question prefix paired with all guesses made on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub question: Question,
    pub guesses: Vec<TaskGuess>,
}

/// Output paths of aggregation.
#[derive(Debug, Clone)]
pub struct AggregateOutputs {
    pub guesser_index: PathBuf,
    pub guess_tasks: PathBuf,
}

/// Result of aggregating all guessers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregation {
    pub index: GuesserIndex,
    pub tasks: Vec<Task>,
}

impl Aggregation {
    /// Write the index and the task list as two JSON artifacts.
    ///
    /// Both are staged next to their targets first, so a serialization or
    /// write failure leaves the previous artifacts in place.
    pub fn save(&self, outputs: &AggregateOutputs) -> Result<()> {
        let staged_tasks = stage_json(&outputs.guess_tasks, &self.tasks)?;
        let staged_index = match stage_json(&outputs.guesser_index, &self.index) {
            Ok(path) => path,
            Err(e) => {
                let _ = std::fs::remove_file(&staged_tasks);
                return Err(e);
            }
        };

        if let Err(e) = commit(&staged_tasks, &outputs.guess_tasks) {
            let _ = std::fs::remove_file(&staged_index);
            return Err(e);
        }
        commit(&staged_index, &outputs.guesser_index)?;
        Ok(())
    }

    pub fn load(outputs: &AggregateOutputs) -> Result<Self> {
        Ok(Self {
            index: read_json(&outputs.guesser_index)?,
            tasks: read_json(&outputs.guess_tasks)?,
        })
    }

    /// Number of task rows across all tasks.
    pub fn guess_count(&self) -> usize {
        self.tasks.iter().map(|t| t.guesses.len()).sum()
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `value` to a temporary file beside `path` and return its path.
fn stage_json<T: Serialize>(path: &Path, value: &T) -> Result<PathBuf> {
    let json = serde_json::to_string(value).context("failed to serialize aggregation")?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let staged = staging_path(path);
    std::fs::write(&staged, json)
        .with_context(|| format!("failed to write {}", staged.display()))?;
    Ok(staged)
}

fn commit(staged: &Path, path: &Path) -> Result<()> {
    std::fs::rename(staged, path).map_err(|e| {
        let _ = std::fs::remove_file(staged);
        anyhow::Error::new(e).context(format!("failed to replace {}", path.display()))
    })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

/// Build the coverage index and task list from a combined guess table.
///
/// Rows are grouped by `(qnum, sentence, token)` in ascending order. Within
/// a group, rows that differ only by guesser collapse into one task row; the
/// index still records each guesser separately.
pub fn aggregate_guesses(
    table: &GuessTable,
    questions: &BTreeMap<Qnum, Question>,
) -> Result<Aggregation> {
    let mut index = GuesserIndex::default();
    let mut tasks = Vec::new();

    for ((qnum, sentence, token), group) in table.group_by(|r| (r.qnum, r.sentence, r.token)) {
        for row in &group {
            index.insert(
                &row.guesser,
                CoverageKey {
                    qnum,
                    sentence,
                    token,
                    guess: row.guess.clone(),
                },
            );
        }

        let question = questions
            .get(&qnum)
            .ok_or(PipelineError::UnknownQuestion(qnum))?;

        let mut seen = HashSet::new();
        let guesses = group
            .iter()
            .filter(|r| seen.insert((r.guess.as_str(), score_key(r.score), r.fold)))
            .map(|r| TaskGuess {
                guess: r.guess.clone(),
                score: r.score,
                fold: r.fold,
                sentence,
                token,
                qnum,
            })
            .collect();

        tasks.push(Task {
            question: question.clone(),
            guesses,
        });
    }

    Ok(Aggregation { index, tasks })
}

/// Bit pattern used to compare scores; `-0.0` counts as `0.0`.
fn score_key(score: f64) -> u64 {
    if score == 0.0 {
        0.0f64.to_bits()
    } else {
        score.to_bits()
    }
}

/// Load every guesser directory's guesses, aggregate them, and write the
/// artifacts to `outputs`.
pub fn preprocess_all_guesses(
    guesser_dirs: &[PathBuf],
    questions: &dyn QuestionSource,
    outputs: &AggregateOutputs,
) -> Result<Aggregation> {
    let question_map = questions.all_questions()?;

    let mut combined = GuessTable::new();
    for dir in guesser_dirs {
        let table = load_all_guesses(dir)
            .with_context(|| format!("failed to load guesses from {}", dir.display()))?;
        tracing::info!(dir = %dir.display(), rows = table.len(), "loaded guesser output");
        combined.append(table);
    }

    let aggregation = aggregate_guesses(&combined, &question_map)?;
    aggregation.save(outputs)?;

    tracing::info!(
        guessers = aggregation.index.len(),
        tasks = aggregation.tasks.len(),
        rows = aggregation.guess_count(),
        "aggregated guesses"
    );
    Ok(aggregation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guesses::{save_guesses, GuessRecord};
    use crate::questions::QuestionDatabase;

    fn row(guesser: &str, qnum: Qnum, token: usize, guess: &str, score: f64) -> GuessRecord {
        GuessRecord {
            qnum,
            sentence: 0,
            token,
            guess: guess.into(),
            score,
            fold: Fold::Dev,
            guesser: guesser.into(),
        }
    }

    fn question_map() -> BTreeMap<Qnum, Question> {
        [7, 8]
            .into_iter()
            .map(|qnum| {
                (
                    qnum,
                    Question::new(qnum, vec!["He lost at Waterloo".into()], "Napoleon", Fold::Dev),
                )
            })
            .collect()
    }

    #[test]
    fn agreeing_guessers_collapse_in_tasks_but_not_in_index() {
        let table = GuessTable::from_rows(vec![
            row("Frequency", 7, 2, "Napoleon", 0.9),
            row("Overlap", 7, 2, "Napoleon", 0.9),
            row("Overlap", 7, 2, "Caesar", 0.3),
        ]);
        let agg = aggregate_guesses(&table, &question_map()).unwrap();

        assert_eq!(agg.tasks.len(), 1);
        let guesses: Vec<_> = agg.tasks[0].guesses.iter().map(|g| g.guess.as_str()).collect();
        assert_eq!(guesses, vec!["Napoleon", "Caesar"]);

        let key = CoverageKey {
            qnum: 7,
            sentence: 0,
            token: 2,
            guess: "Napoleon".into(),
        };
        assert!(agg.index.covers("Frequency", &key));
        assert!(agg.index.covers("Overlap", &key));
        assert_eq!(agg.index.coverage("Overlap").unwrap().len(), 2);
    }

    #[test]
    fn different_scores_are_kept() {
        let table = GuessTable::from_rows(vec![
            row("Frequency", 7, 2, "Napoleon", 0.9),
            row("Overlap", 7, 2, "Napoleon", 0.4),
        ]);
        let agg = aggregate_guesses(&table, &question_map()).unwrap();
        assert_eq!(agg.tasks[0].guesses.len(), 2);
    }

    #[test]
    fn signed_zero_scores_collapse() {
        let table = GuessTable::from_rows(vec![
            row("Frequency", 7, 2, "Napoleon", 0.0),
            row("Overlap", 7, 2, "Napoleon", -0.0),
        ]);
        let agg = aggregate_guesses(&table, &question_map()).unwrap();
        assert_eq!(agg.tasks[0].guesses.len(), 1);
        assert_eq!(agg.index.len(), 2);
    }

    #[test]
    fn failed_save_keeps_previous_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let outputs = AggregateOutputs {
            guesser_index: dir.path().join("guess_index.json"),
            guess_tasks: dir.path().join("guess_tasks.json"),
        };
        let old = aggregate_guesses(
            &GuessTable::from_rows(vec![row("A", 7, 1, "X", 0.1)]),
            &question_map(),
        )
        .unwrap();
        old.save(&outputs).unwrap();
        let index_before = std::fs::read(&outputs.guesser_index).unwrap();

        // a directory in place of the task list makes the second save fail
        let blocked = AggregateOutputs {
            guesser_index: outputs.guesser_index.clone(),
            guess_tasks: dir.path().join("tasks_dir"),
        };
        std::fs::create_dir(&blocked.guess_tasks).unwrap();
        std::fs::write(blocked.guess_tasks.join("keep"), "x").unwrap();

        let new = aggregate_guesses(
            &GuessTable::from_rows(vec![row("B", 8, 1, "Y", 0.2)]),
            &question_map(),
        )
        .unwrap();
        assert!(new.save(&blocked).is_err());

        assert_eq!(std::fs::read(&outputs.guesser_index).unwrap(), index_before);
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn tasks_follow_position_order() {
        let table = GuessTable::from_rows(vec![
            row("A", 8, 1, "X", 0.1),
            row("A", 7, 3, "X", 0.1),
            row("A", 7, 1, "X", 0.1),
        ]);
        let agg = aggregate_guesses(&table, &question_map()).unwrap();
        let positions: Vec<_> = agg
            .tasks
            .iter()
            .map(|t| (t.question.qnum, t.guesses[0].token))
            .collect();
        assert_eq!(positions, vec![(7, 1), (7, 3), (8, 1)]);
    }

    #[test]
    fn unknown_question_is_fatal() {
        let table = GuessTable::from_rows(vec![row("A", 99, 1, "X", 0.1)]);
        let err = aggregate_guesses(&table, &question_map()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::UnknownQuestion(99))
        ));
    }

    #[test]
    fn preprocess_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let freq_dir = dir.path().join("FrequencyGuesser");
        let overlap_dir = dir.path().join("WordOverlapGuesser");
        save_guesses(
            &GuessTable::from_rows(vec![row("Frequency", 7, 2, "Napoleon", 0.9)]),
            &freq_dir,
        )
        .unwrap();
        save_guesses(
            &GuessTable::from_rows(vec![
                row("Overlap", 7, 2, "Napoleon", 0.9),
                row("Overlap", 8, 1, "Elba", 0.2),
            ]),
            &overlap_dir,
        )
        .unwrap();

        let questions =
            QuestionDatabase::from_questions(question_map().into_values()).unwrap();
        let outputs = AggregateOutputs {
            guesser_index: dir.path().join("guess_index.json"),
            guess_tasks: dir.path().join("guess_tasks.json"),
        };
        let dirs = vec![freq_dir, overlap_dir];

        let first = preprocess_all_guesses(&dirs, &questions, &outputs).unwrap();
        let index_bytes = std::fs::read(&outputs.guesser_index).unwrap();
        let tasks_bytes = std::fs::read(&outputs.guess_tasks).unwrap();

        let second = preprocess_all_guesses(&dirs, &questions, &outputs).unwrap();
        assert_eq!(first, second);
        assert_eq!(std::fs::read(&outputs.guesser_index).unwrap(), index_bytes);
        assert_eq!(std::fs::read(&outputs.guess_tasks).unwrap(), tasks_bytes);

        assert_eq!(Aggregation::load(&outputs).unwrap(), first);
        assert_eq!(first.tasks.len(), 2);
    }

    #[test]
    fn missing_guesser_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let questions = QuestionDatabase::default();
        let outputs = AggregateOutputs {
            guesser_index: dir.path().join("index.json"),
            guess_tasks: dir.path().join("tasks.json"),
        };
        let result = preprocess_all_guesses(&[dir.path().join("absent")], &questions, &outputs);
        assert!(result.is_err());
        assert!(!outputs.guesser_index.exists());
    }
}
