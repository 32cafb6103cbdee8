//! Question sources.
//!
//! The pipeline reads questions through [`QuestionSource`]. The bundled
//! [`QuestionDatabase`] is backed by a JSON export of the question store:
//!
//! ```json
//! {"questions": [{"qnum": 1, "sentences": ["..."], "page": "Napoleon", "fold": "dev"}]}
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::model::{Fold, Qnum, Question};

/// Anything that can hand out the question corpus.
pub trait QuestionSource {
    /// All answerable questions keyed by id.
    fn all_questions(&self) -> Result<BTreeMap<Qnum, Question>>;

    /// Questions grouped by fold, in id order within each fold.
    ///
    /// Folds without questions are absent from the map.
    fn questions_by_fold(&self) -> Result<BTreeMap<Fold, Vec<Question>>> {
        let mut by_fold: BTreeMap<Fold, Vec<Question>> = BTreeMap::new();
        for question in self.all_questions()?.into_values() {
            by_fold.entry(question.fold).or_default().push(question);
        }
        Ok(by_fold)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct QuestionFile {
    questions: Vec<Question>,
}

/// In-memory question store loaded from a JSON export.
#[derive(Debug, Clone, Default)]
pub struct QuestionDatabase {
    questions: BTreeMap<Qnum, Question>,
}

impl QuestionDatabase {
    /// Build a database from a list of questions. Duplicate ids are rejected.
    pub fn from_questions(questions: impl IntoIterator<Item = Question>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for question in questions {
            let qnum = question.qnum;
            if map.insert(qnum, question).is_some() {
                return Err(PipelineError::DuplicateQuestion(qnum).into());
            }
        }
        Ok(Self { questions: map })
    }

    /// Load a JSON question export.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read questions from {}", path.display()))?;
        let file: QuestionFile = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse questions in {}", path.display()))?;
        let db = Self::from_questions(file.questions)
            .with_context(|| format!("invalid question file {}", path.display()))?;
        tracing::info!(path = %path.display(), questions = db.len(), "loaded question database");
        Ok(db)
    }

    /// Write the database in the same layout `load_json` reads.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let file = QuestionFile {
            questions: self.questions.values().cloned().collect(),
        };
        let json = serde_json::to_string_pretty(&file).context("failed to serialize questions")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write questions to {}", path.display()))?;
        Ok(())
    }

    /// Every question, including those without an answer page.
    pub fn all_questions_unfiltered(&self) -> &BTreeMap<Qnum, Question> {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

impl QuestionSource for QuestionDatabase {
    /// Questions with an empty `page` cannot be scored and are left out.
    fn all_questions(&self) -> Result<BTreeMap<Qnum, Question>> {
        Ok(self
            .questions
            .iter()
            .filter(|(_, q)| !q.page.is_empty())
            .map(|(qnum, q)| (*qnum, q.clone()))
            .collect())
    }
}
