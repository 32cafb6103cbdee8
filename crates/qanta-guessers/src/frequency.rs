//! Answer-frequency baseline.
//!
//! Ignores the question text entirely and always proposes the answers seen
//! most often in training. Useful as a floor for every other guesser.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use qanta_core::training::QuizBowlDataset;
use qanta_core::traits::{Answer, Dataset, Guesser, GuesserType, TrainingData, QUIZ_BOWL};

use crate::text::quiz_bowl_data;

const MODEL_FILE: &str = "frequency.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AnswerCount {
    answer: Answer,
    count: u64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct FrequencyModel {
    /// Sorted by descending count, then answer.
    answers: Vec<AnswerCount>,
    total: u64,
}

/// Guesses the most frequent training answers, scored by relative frequency.
#[derive(Debug)]
pub struct FrequencyGuesser {
    min_class_examples: usize,
    model: FrequencyModel,
    lookup: HashMap<Answer, u64>,
}

impl FrequencyGuesser {
    pub fn new(min_class_examples: usize) -> Self {
        Self {
            min_class_examples,
            model: FrequencyModel::default(),
            lookup: HashMap::new(),
        }
    }

    fn from_model(model: FrequencyModel) -> Self {
        let lookup = model
            .answers
            .iter()
            .map(|a| (a.answer.clone(), a.count))
            .collect();
        Self {
            min_class_examples: 1,
            model,
            lookup,
        }
    }

    fn frequency(&self, count: u64) -> f64 {
        if self.model.total == 0 {
            0.0
        } else {
            count as f64 / self.model.total as f64
        }
    }
}

impl Guesser for FrequencyGuesser {
    fn display_name(&self) -> &str {
        "Frequency"
    }

    fn requested_datasets(&self) -> BTreeMap<String, Box<dyn Dataset>> {
        let mut datasets: BTreeMap<String, Box<dyn Dataset>> = BTreeMap::new();
        datasets.insert(
            QUIZ_BOWL.to_string(),
            Box::new(QuizBowlDataset::new(self.min_class_examples)),
        );
        datasets
    }

    fn train(&mut self, training_data: &BTreeMap<String, TrainingData>) -> Result<()> {
        let data = quiz_bowl_data(training_data)?;

        let mut counts: HashMap<&str, u64> = HashMap::new();
        for answer in &data.answers {
            *counts.entry(answer.as_str()).or_default() += 1;
        }

        let mut answers: Vec<AnswerCount> = counts
            .into_iter()
            .map(|(answer, count)| AnswerCount {
                answer: answer.to_string(),
                count,
            })
            .collect();
        answers.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.answer.cmp(&b.answer)));

        let model = FrequencyModel {
            total: data.len() as u64,
            answers,
        };
        tracing::info!(answers = model.answers.len(), examples = model.total, "trained frequency guesser");

        let min_class_examples = self.min_class_examples;
        *self = Self::from_model(model);
        self.min_class_examples = min_class_examples;
        Ok(())
    }

    fn guess(&self, questions: &[String], max_n_guesses: usize) -> Result<Vec<Vec<(Answer, f64)>>> {
        let top: Vec<(Answer, f64)> = self
            .model
            .answers
            .iter()
            .take(max_n_guesses)
            .map(|a| (a.answer.clone(), self.frequency(a.count)))
            .collect();
        Ok(vec![top; questions.len()])
    }

    fn score(&self, _question: &str, guesses: &[Answer]) -> Result<Vec<f64>> {
        Ok(guesses
            .iter()
            .map(|g| self.frequency(self.lookup.get(g).copied().unwrap_or(0)))
            .collect())
    }

    fn save(&self, directory: &Path) -> Result<()> {
        std::fs::create_dir_all(directory)?;
        let path = directory.join(MODEL_FILE);
        let json = serde_json::to_string(&self.model).context("failed to serialize frequency model")?;
        std::fs::write(&path, json)
            .with_context(|| format!("failed to write {}", path.display()))
    }
}

impl GuesserType for FrequencyGuesser {
    fn targets() -> &'static [&'static str] {
        &[MODEL_FILE]
    }

    fn load(directory: &Path) -> Result<Self> {
        let path = directory.join(MODEL_FILE);
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let model: FrequencyModel = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(Self::from_model(model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn training_data() -> BTreeMap<String, TrainingData> {
        let mut data = TrainingData::default();
        for answer in ["Napoleon", "Napoleon", "Julius_Caesar", "Napoleon", "Elba"] {
            data.push(vec!["some text".into()], answer.into());
        }
        BTreeMap::from([(QUIZ_BOWL.to_string(), data)])
    }

    #[test]
    fn guesses_most_frequent_answers() {
        let mut guesser = FrequencyGuesser::new(1);
        guesser.train(&training_data()).unwrap();

        let guesses = guesser
            .guess(&["anything".into(), "at all".into()], 2)
            .unwrap();
        assert_eq!(guesses.len(), 2);
        assert_eq!(guesses[0].len(), 2);
        assert_eq!(guesses[0][0].0, "Napoleon");
        assert!((guesses[0][0].1 - 0.6).abs() < 1e-9);
        // ties broken alphabetically
        assert_eq!(guesses[0][1].0, "Elba");
    }

    #[test]
    fn scores_in_input_order() {
        let mut guesser = FrequencyGuesser::new(1);
        guesser.train(&training_data()).unwrap();
        let scores = guesser
            .score("q", &["Unknown".into(), "Napoleon".into()])
            .unwrap();
        assert_eq!(scores[0], 0.0);
        assert!((scores[1] - 0.6).abs() < 1e-9);
    }

    #[test]
    fn train_without_dataset_fails() {
        let mut guesser = FrequencyGuesser::new(1);
        assert!(guesser.train(&BTreeMap::new()).is_err());
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut guesser = FrequencyGuesser::new(1);
        guesser.train(&training_data()).unwrap();
        guesser.save(dir.path()).unwrap();

        for file in FrequencyGuesser::files(dir.path()) {
            assert!(file.exists());
        }

        let loaded = FrequencyGuesser::load(dir.path()).unwrap();
        let questions = vec!["q".to_string()];
        assert_eq!(
            loaded.guess(&questions, 3).unwrap(),
            guesser.guess(&questions, 3).unwrap()
        );
    }
}
