//! Core trait definitions for guessers and their training datasets.
//!
//! Concrete guessers live in the `qanta-guessers` crate. Everything in this
//! crate drives them through [`Guesser`] trait objects, so the generation
//! engine and aggregation never know which model produced a guess.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::questions::QuestionSource;

/// Question text as handed to a guesser.
pub type QuestionText = String;

/// Canonical answer label.
pub type Answer = String;

/// Key under which the quiz bowl training dataset is requested.
pub const QUIZ_BOWL: &str = "quizbowl";

// ---------------------------------------------------------------------------
// Guesser traits
// ---------------------------------------------------------------------------

/// Instance-level behaviour every guesser provides.
///
/// Construction must stay cheap and must not load data: a guesser is made
/// ready either by [`Guesser::train`] or by [`GuesserType::load`]. Calling
/// `guess` or `score` before one of those is a caller bug.
pub trait Guesser: Send {
    /// Stable, human-readable name. Unique among enabled guessers; used as
    /// the aggregation key.
    fn display_name(&self) -> &str;

    /// Whether independent instances may run as separate processes.
    fn parallel(&self) -> bool {
        false
    }

    /// Named datasets this guesser wants resolved before training.
    fn requested_datasets(&self) -> BTreeMap<String, Box<dyn Dataset>>;

    /// Train on resolved datasets, keyed like [`Guesser::requested_datasets`].
    fn train(&mut self, training_data: &BTreeMap<String, TrainingData>) -> anyhow::Result<()>;

    /// Up to `max_n_guesses` `(answer, score)` pairs per question, best first.
    ///
    /// The outer vector has exactly one entry per input question.
    fn guess(
        &self,
        questions: &[QuestionText],
        max_n_guesses: usize,
    ) -> anyhow::Result<Vec<Vec<(Answer, f64)>>>;

    /// Score each of `guesses` against `question`, preserving their order.
    fn score(&self, question: &str, guesses: &[Answer]) -> anyhow::Result<Vec<f64>>;

    /// Persist state into `directory`, writing exactly the type's targets.
    fn save(&self, directory: &Path) -> anyhow::Result<()>;
}

/// Type-level half of the guesser contract.
pub trait GuesserType: Guesser + Sized {
    /// File names `train` + `save` produce inside the output directory.
    fn targets() -> &'static [&'static str];

    /// Full paths of [`GuesserType::targets`] under `directory`.
    fn files(directory: &Path) -> Vec<PathBuf> {
        Self::targets()
            .iter()
            .map(|target| directory.join(target))
            .collect()
    }

    /// Rebuild a ready-to-guess instance from a directory written by `save`.
    fn load(directory: &Path) -> anyhow::Result<Self>;
}

// ---------------------------------------------------------------------------
// Datasets
// ---------------------------------------------------------------------------

/// A training dataset a guesser can request.
pub trait Dataset {
    fn name(&self) -> &str;

    /// Produce training data from the question corpus.
    fn training_data(&self, questions: &dyn QuestionSource) -> anyhow::Result<TrainingData>;
}

/// Parallel lists of examples and their canonical answers.
///
/// Each example is the ordered list of sentences (runs) of one question;
/// text is not preprocessed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingData {
    pub examples: Vec<Vec<QuestionText>>,
    pub answers: Vec<Answer>,
}

impl TrainingData {
    pub fn push(&mut self, example: Vec<QuestionText>, answer: Answer) {
        self.examples.push(example);
        self.answers.push(answer);
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[QuestionText], &str)> {
        self.examples
            .iter()
            .map(Vec::as_slice)
            .zip(self.answers.iter().map(String::as_str))
    }
}
