//! Pipeline error types.
//!
//! These represent contract violations between pipeline stages. They are
//! fatal: callers can downcast an `anyhow::Error` to `PipelineError` to tell
//! them apart from ordinary I/O or parse failures, but never recover from them.

use std::path::PathBuf;

use thiserror::Error;

use crate::model::{Fold, Qnum};

/// Errors raised when pipeline data is inconsistent.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A guesser returned a different number of guess lists than questions.
    #[error("guesser '{guesser}' returned {actual} guess lists for {expected} questions")]
    GuessCountMismatch {
        guesser: String,
        expected: usize,
        actual: usize,
    },

    /// `load_guesses` was called with an empty fold selection.
    #[error("at least one fold must be requested")]
    NoFoldsRequested,

    /// The guess file for a requested fold does not exist.
    #[error("guess file for fold '{fold}' not found: {}", path.display())]
    GuessFileNotFound { fold: Fold, path: PathBuf },

    /// A guess references a question missing from the question source.
    #[error("question {0} appears in guesses but not in the question source")]
    UnknownQuestion(Qnum),

    /// A guesser directory lacks files its type promises to write.
    #[error("guesser output in {} is missing targets: {}", directory.display(), missing.join(", "))]
    MissingTargets {
        directory: PathBuf,
        missing: Vec<String>,
    },

    /// Two questions in the source share an id.
    #[error("duplicate question id {0}")]
    DuplicateQuestion(Qnum),

    /// No guesser with the given class name is configured.
    #[error("unknown guesser: {0}")]
    UnknownGuesser(String),

    /// A guess score is NaN or infinite and cannot be persisted as JSON.
    #[error("guesser '{guesser}' returned non-finite score {score} for '{guess}' on question {qnum} at ({sentence}, {token})")]
    NonFiniteScore {
        guesser: String,
        qnum: Qnum,
        sentence: usize,
        token: usize,
        guess: String,
        score: f64,
    },
}

impl PipelineError {
    /// Returns `true` for errors caused by missing files on disk.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            PipelineError::GuessFileNotFound { .. } | PipelineError::MissingTargets { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_classification() {
        let err = PipelineError::GuessFileNotFound {
            fold: Fold::Dev,
            path: PathBuf::from("out/guesses_dev.json"),
        };
        assert!(err.is_not_found());
        assert!(err.to_string().contains("guesses_dev.json"));
        assert!(!PipelineError::UnknownQuestion(7).is_not_found());
    }

    #[test]
    fn missing_targets_lists_files() {
        let err = PipelineError::MissingTargets {
            directory: PathBuf::from("out"),
            missing: vec!["a.json".into(), "b.json".into()],
        };
        assert_eq!(
            err.to_string(),
            "guesser output in out is missing targets: a.json, b.json"
        );
    }
}
