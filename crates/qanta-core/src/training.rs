//! Training support: dataset resolution, target verification and the
//! manifest written next to a trained guesser.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PipelineError;
use crate::model::Fold;
use crate::questions::QuestionSource;
use crate::traits::{Dataset, Guesser, TrainingData, QUIZ_BOWL};

/// File name of the training manifest inside a guesser directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Quiz bowl questions of one fold as guesser training data.
#[derive(Debug, Clone)]
pub struct QuizBowlDataset {
    /// Answers with fewer questions than this are dropped (when > 1).
    pub min_class_examples: usize,
    /// Fold the examples are drawn from.
    pub fold: Fold,
}

impl QuizBowlDataset {
    pub fn new(min_class_examples: usize) -> Self {
        Self {
            min_class_examples,
            fold: Fold::Train,
        }
    }
}

impl Dataset for QuizBowlDataset {
    fn name(&self) -> &str {
        QUIZ_BOWL
    }

    fn training_data(&self, questions: &dyn QuestionSource) -> Result<TrainingData> {
        let fold_questions: Vec<_> = questions
            .all_questions()?
            .into_values()
            .filter(|q| q.fold == self.fold)
            .collect();

        let mut class_sizes: HashMap<&str, usize> = HashMap::new();
        for q in &fold_questions {
            *class_sizes.entry(q.page.as_str()).or_default() += 1;
        }

        let mut data = TrainingData::default();
        for q in &fold_questions {
            if self.min_class_examples > 1 && class_sizes[q.page.as_str()] < self.min_class_examples
            {
                continue;
            }
            let (sentences, page) = q.to_example();
            data.push(sentences, page);
        }

        tracing::debug!(
            fold = %self.fold,
            examples = data.len(),
            dropped = fold_questions.len() - data.len(),
            "built quiz bowl training data"
        );
        Ok(data)
    }
}

/// Resolve every dataset a guesser requests against the question corpus.
pub fn resolve_training_data(
    guesser: &dyn Guesser,
    questions: &dyn QuestionSource,
) -> Result<BTreeMap<String, TrainingData>> {
    guesser
        .requested_datasets()
        .into_iter()
        .map(|(key, dataset)| {
            let data = dataset
                .training_data(questions)
                .with_context(|| format!("failed to build dataset '{}'", dataset.name()))?;
            Ok((key, data))
        })
        .collect()
}

/// Check that every target file exists in `directory`.
pub fn verify_targets(directory: &Path, targets: &[&str]) -> Result<()> {
    let missing: Vec<String> = targets
        .iter()
        .filter(|t| !directory.join(t).exists())
        .map(|t| t.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::MissingTargets {
            directory: directory.to_path_buf(),
            missing,
        }
        .into())
    }
}

/// Record of one training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingManifest {
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub display_name: String,
    pub guesser_class: String,
    pub parallel: bool,
    /// Examples per resolved dataset.
    pub datasets: BTreeMap<String, usize>,
    pub training_ms: u64,
}

impl TrainingManifest {
    pub fn new(
        guesser: &dyn Guesser,
        guesser_class: &str,
        training_data: &BTreeMap<String, TrainingData>,
        training_ms: u64,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            created_at: Utc::now(),
            display_name: guesser.display_name().to_string(),
            guesser_class: guesser_class.to_string(),
            parallel: guesser.parallel(),
            datasets: training_data
                .iter()
                .map(|(k, v)| (k.clone(), v.len()))
                .collect(),
            training_ms,
        }
    }

    pub fn save_json(&self, directory: &Path) -> Result<()> {
        let path = directory.join(MANIFEST_FILE);
        let json = serde_json::to_string_pretty(self).context("failed to serialize manifest")?;
        std::fs::create_dir_all(directory)?;
        std::fs::write(&path, json)
            .with_context(|| format!("failed to write manifest to {}", path.display()))?;
        Ok(())
    }

    pub fn load_json(directory: &Path) -> Result<Self> {
        let path = directory.join(MANIFEST_FILE);
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read manifest from {}", path.display()))?;
        serde_json::from_str(&content).context("failed to parse manifest JSON")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Question;
    use crate::questions::QuestionDatabase;

    fn corpus() -> QuestionDatabase {
        QuestionDatabase::from_questions(vec![
            Question::new(1, vec!["Waterloo".into()], "Napoleon", Fold::Train),
            Question::new(2, vec!["Elba".into()], "Napoleon", Fold::Train),
            Question::new(3, vec!["Rubicon".into()], "Julius_Caesar", Fold::Train),
            Question::new(4, vec!["Austerlitz".into()], "Napoleon", Fold::Dev),
        ])
        .unwrap()
    }

    struct NeedsQuizBowl;

    impl Guesser for NeedsQuizBowl {
        fn display_name(&self) -> &str {
            "NeedsQuizBowl"
        }

        fn requested_datasets(&self) -> BTreeMap<String, Box<dyn Dataset>> {
            let mut datasets: BTreeMap<String, Box<dyn Dataset>> = BTreeMap::new();
            datasets.insert(QUIZ_BOWL.into(), Box::new(QuizBowlDataset::new(2)));
            datasets
        }

        fn train(&mut self, _: &BTreeMap<String, TrainingData>) -> Result<()> {
            Ok(())
        }

        fn guess(&self, questions: &[String], _: usize) -> Result<Vec<Vec<(String, f64)>>> {
            Ok(vec![vec![]; questions.len()])
        }

        fn score(&self, _: &str, guesses: &[String]) -> Result<Vec<f64>> {
            Ok(vec![0.0; guesses.len()])
        }

        fn save(&self, _: &Path) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn quiz_bowl_dataset_filters_fold_and_small_classes() {
        let data = QuizBowlDataset::new(2).training_data(&corpus()).unwrap();
        assert_eq!(data.answers, vec!["Napoleon", "Napoleon"]);
        assert_eq!(data.examples[0], vec!["Waterloo".to_string()]);

        let all = QuizBowlDataset::new(1).training_data(&corpus()).unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn resolves_requested_datasets() {
        let resolved = resolve_training_data(&NeedsQuizBowl, &corpus()).unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[QUIZ_BOWL].len(), 2);
    }

    #[test]
    fn verify_targets_reports_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("model.json"), "{}").unwrap();
        verify_targets(dir.path(), &["model.json"]).unwrap();

        let err = verify_targets(dir.path(), &["model.json", "vocab.json"]).unwrap_err();
        match err.downcast_ref::<PipelineError>() {
            Some(PipelineError::MissingTargets { missing, .. }) => {
                assert_eq!(missing, &vec!["vocab.json".to_string()])
            }
            other => panic!("expected MissingTargets, got {other:?}"),
        }
    }

    #[test]
    fn manifest_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = resolve_training_data(&NeedsQuizBowl, &corpus()).unwrap();
        let manifest = TrainingManifest::new(&NeedsQuizBowl, "NeedsQuizBowl", &resolved, 12);
        manifest.save_json(dir.path()).unwrap();

        let loaded = TrainingManifest::load_json(dir.path()).unwrap();
        assert_eq!(loaded.run_id, manifest.run_id);
        assert_eq!(loaded.datasets[QUIZ_BOWL], 2);
        assert!(!loaded.parallel);
    }
}
