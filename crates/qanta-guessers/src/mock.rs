//! Mock guesser for testing.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use qanta_core::traits::{Answer, Dataset, Guesser, GuesserType, TrainingData};

const MOCK_FILE: &str = "mock.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MockState {
    name: String,
    responses: Vec<(String, Vec<(Answer, f64)>)>,
    default_response: Vec<(Answer, f64)>,
}

/// A guesser with scripted answers, for exercising the pipeline without a
/// real model.
///
/// Each question gets the guesses of the first registered substring it
/// contains, or the default guesses otherwise.
pub struct MockGuesser {
    state: MockState,
    /// Number of `guess` calls made.
    call_count: AtomicU32,
    /// Questions passed to the last `guess` call.
    last_batch: Mutex<Vec<String>>,
    trained: bool,
}

impl MockGuesser {
    pub fn new(name: &str) -> Self {
        Self::from_state(MockState {
            name: name.to_string(),
            responses: Vec::new(),
            default_response: Vec::new(),
        })
    }

    fn from_state(state: MockState) -> Self {
        Self {
            state,
            call_count: AtomicU32::new(0),
            last_batch: Mutex::new(Vec::new()),
            trained: false,
        }
    }

    /// Answer questions containing `needle` with `guesses`.
    pub fn with_response(mut self, needle: &str, guesses: &[(&str, f64)]) -> Self {
        self.state
            .responses
            .push((needle.to_string(), to_owned_guesses(guesses)));
        self
    }

    /// Answer every other question with `guesses`.
    pub fn with_default(mut self, guesses: &[(&str, f64)]) -> Self {
        self.state.default_response = to_owned_guesses(guesses);
        self
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    pub fn last_batch(&self) -> Vec<String> {
        self.last_batch
            .lock()
            .map(|batch| batch.clone())
            .unwrap_or_default()
    }

    pub fn is_trained(&self) -> bool {
        self.trained
    }

    fn respond(&self, question: &str) -> &[(Answer, f64)] {
        self.state
            .responses
            .iter()
            .find(|(needle, _)| question.contains(needle.as_str()))
            .map(|(_, guesses)| guesses.as_slice())
            .unwrap_or(&self.state.default_response)
    }
}

fn to_owned_guesses(guesses: &[(&str, f64)]) -> Vec<(Answer, f64)> {
    guesses.iter().map(|(a, s)| (a.to_string(), *s)).collect()
}

impl Guesser for MockGuesser {
    fn display_name(&self) -> &str {
        &self.state.name
    }

    fn requested_datasets(&self) -> BTreeMap<String, Box<dyn Dataset>> {
        BTreeMap::new()
    }

    fn train(&mut self, _training_data: &BTreeMap<String, TrainingData>) -> Result<()> {
        self.trained = true;
        Ok(())
    }

    fn guess(&self, questions: &[String], max_n_guesses: usize) -> Result<Vec<Vec<(Answer, f64)>>> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut last) = self.last_batch.lock() {
            *last = questions.to_vec();
        }

        Ok(questions
            .iter()
            .map(|q| {
                let mut guesses = self.respond(q).to_vec();
                guesses.sort_by(|a, b| b.1.total_cmp(&a.1));
                guesses.truncate(max_n_guesses);
                guesses
            })
            .collect())
    }

    fn score(&self, question: &str, guesses: &[Answer]) -> Result<Vec<f64>> {
        let known = self.respond(question);
        Ok(guesses
            .iter()
            .map(|g| {
                known
                    .iter()
                    .find(|(answer, _)| answer == g)
                    .map(|(_, score)| *score)
                    .unwrap_or(0.0)
            })
            .collect())
    }

    fn save(&self, directory: &Path) -> Result<()> {
        std::fs::create_dir_all(directory)?;
        let json = serde_json::to_string(&self.state).context("failed to serialize mock guesser")?;
        std::fs::write(directory.join(MOCK_FILE), json)?;
        Ok(())
    }
}

impl GuesserType for MockGuesser {
    fn targets() -> &'static [&'static str] {
        &[MOCK_FILE]
    }

    fn load(directory: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(directory.join(MOCK_FILE))
            .with_context(|| format!("failed to read mock guesser from {}", directory.display()))?;
        let state: MockState = serde_json::from_str(&content)?;
        let mut guesser = Self::from_state(state);
        guesser.trained = true;
        Ok(guesser)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_responses() {
        let guesser = MockGuesser::new("Mock")
            .with_response("Waterloo", &[("Caesar", 0.3), ("Napoleon", 0.9)])
            .with_default(&[("Paris", 0.1)]);

        let batch = vec!["lost at Waterloo".to_string(), "a city".to_string()];
        let guesses = guesser.guess(&batch, 5).unwrap();
        assert_eq!(guesses[0][0], ("Napoleon".to_string(), 0.9));
        assert_eq!(guesses[1], vec![("Paris".to_string(), 0.1)]);
        assert_eq!(guesser.call_count(), 1);
        assert_eq!(guesser.last_batch(), batch);

        let scores = guesser
            .score("lost at Waterloo", &["Napoleon".into(), "Paris".into()])
            .unwrap();
        assert_eq!(scores, vec![0.9, 0.0]);
    }

    #[test]
    fn respects_max_n_guesses() {
        let guesser = MockGuesser::new("Mock").with_default(&[("A", 0.1), ("B", 0.2), ("C", 0.3)]);
        let guesses = guesser.guess(&["q".into()], 2).unwrap();
        assert_eq!(guesses[0], vec![("C".to_string(), 0.3), ("B".to_string(), 0.2)]);
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let guesser = MockGuesser::new("Mock").with_default(&[("A", 0.5)]);
        guesser.save(dir.path()).unwrap();

        let loaded = MockGuesser::load(dir.path()).unwrap();
        assert!(loaded.is_trained());
        assert_eq!(loaded.display_name(), "Mock");
        assert_eq!(loaded.guess(&["q".into()], 1).unwrap()[0][0].0, "A");
    }
}
