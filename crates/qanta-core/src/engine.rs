//! Guess generation engine.
//!
//! Drives a trained or loaded guesser over every prefix of every question in
//! the requested folds and assembles the answers into a [`GuessTable`].

use std::time::Instant;

use anyhow::Result;

use crate::error::PipelineError;
use crate::guesses::{GuessRecord, GuessTable};
use crate::model::{Fold, Qnum};
use crate::questions::QuestionSource;
use crate::traits::Guesser;

/// Configuration for guess generation.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Maximum guesses kept per question prefix.
    pub max_n_guesses: usize,
    /// Token stride between prefixes; 1 is every token, 0 sentence ends only.
    pub token_step: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_n_guesses: 10,
            token_step: 1,
        }
    }
}

/// Where a batch entry came from.
#[derive(Debug, Clone, Copy)]
struct Position {
    fold: Fold,
    qnum: Qnum,
    sentence: usize,
    token: usize,
}

/// The guess generation engine.
pub struct GuessEngine {
    config: GenerationConfig,
}

impl GuessEngine {
    pub fn new(config: GenerationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Generate guesses for every question prefix in `folds`.
    ///
    /// The guesser is called once with the whole batch. It must already be
    /// trained or loaded.
    pub fn generate(
        &self,
        guesser: &dyn Guesser,
        questions: &dyn QuestionSource,
        folds: &[Fold],
    ) -> Result<GuessTable> {
        let start = Instant::now();
        let guesser_name = guesser.display_name().to_string();
        let questions_by_fold = questions.questions_by_fold()?;

        let mut positions = Vec::new();
        let mut texts = Vec::new();

        for &fold in folds {
            let Some(fold_questions) = questions_by_fold.get(&fold) else {
                tracing::warn!(fold = %fold, "no questions in fold");
                continue;
            };
            tracing::debug!(fold = %fold, questions = fold_questions.len(), "collecting partials");

            for question in fold_questions {
                for partial in question.partials_every(self.config.token_step) {
                    texts.push(partial.text());
                    positions.push(Position {
                        fold,
                        qnum: question.qnum,
                        sentence: partial.sentence,
                        token: partial.token,
                    });
                }
            }
        }

        tracing::info!(
            guesser = %guesser_name,
            batch = texts.len(),
            max_n_guesses = self.config.max_n_guesses,
            "generating guesses"
        );

        let guesses_per_question = guesser.guess(&texts, self.config.max_n_guesses)?;

        if guesses_per_question.len() != texts.len() {
            return Err(PipelineError::GuessCountMismatch {
                guesser: guesser_name,
                expected: texts.len(),
                actual: guesses_per_question.len(),
            }
            .into());
        }

        let mut table = GuessTable::new();
        let mut truncated = 0usize;

        for (position, mut guesses) in positions.iter().zip(guesses_per_question) {
            if guesses.len() > self.config.max_n_guesses {
                guesses.truncate(self.config.max_n_guesses);
                truncated += 1;
            }
            for (guess, score) in guesses {
                let row = GuessRecord {
                    qnum: position.qnum,
                    sentence: position.sentence,
                    token: position.token,
                    guess,
                    score,
                    fold: position.fold,
                    guesser: guesser_name.clone(),
                };
                row.ensure_finite()?;
                table.push(row);
            }
        }

        if truncated > 0 {
            tracing::warn!(
                guesser = %guesser_name,
                truncated,
                "guesser returned more than max_n_guesses for some prefixes"
            );
        }

        tracing::info!(
            guesser = %guesser_name,
            rows = table.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "guess generation complete"
        );

        Ok(table)
    }
}
