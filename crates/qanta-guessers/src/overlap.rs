//! Word-overlap guesser.
//!
//! Each answer is profiled by the set of words appearing in its training
//! questions. A question prefix scores an answer by the idf-weighted share of
//! its words found in that answer's profile.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use qanta_core::training::QuizBowlDataset;
use qanta_core::traits::{Answer, Dataset, Guesser, GuesserType, TrainingData, QUIZ_BOWL};

use crate::text::{quiz_bowl_data, tokenize};

const MODEL_FILE: &str = "word_overlap.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct OverlapModel {
    profiles: BTreeMap<Answer, BTreeSet<String>>,
    idf: BTreeMap<String, f64>,
}

/// Ranks answers by idf-weighted word overlap with the question prefix.
#[derive(Debug)]
pub struct WordOverlapGuesser {
    min_class_examples: usize,
    model: OverlapModel,
    answers: Vec<Answer>,
    /// word → indices into `answers`.
    postings: HashMap<String, Vec<usize>>,
}

impl WordOverlapGuesser {
    pub fn new(min_class_examples: usize) -> Self {
        Self {
            min_class_examples,
            model: OverlapModel::default(),
            answers: Vec::new(),
            postings: HashMap::new(),
        }
    }

    fn from_model(model: OverlapModel, min_class_examples: usize) -> Self {
        let answers: Vec<Answer> = model.profiles.keys().cloned().collect();
        let mut postings: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, words) in model.profiles.values().enumerate() {
            for word in words {
                postings.entry(word.clone()).or_default().push(i);
            }
        }
        Self {
            min_class_examples,
            model,
            answers,
            postings,
        }
    }

    /// Per-answer scores for one question; answers without overlap are absent.
    fn rank(&self, question: &str) -> Vec<(usize, f64)> {
        let words: BTreeSet<String> = tokenize(question).collect();
        let total: f64 = words.iter().map(|w| self.idf(w)).sum();
        if total == 0.0 {
            return Vec::new();
        }

        let mut scores: HashMap<usize, f64> = HashMap::new();
        for word in &words {
            let Some(answers) = self.postings.get(word) else {
                continue;
            };
            let weight = self.idf(word);
            for &answer in answers {
                *scores.entry(answer).or_default() += weight;
            }
        }

        let mut ranked: Vec<(usize, f64)> = scores
            .into_iter()
            .map(|(answer, score)| (answer, score / total))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked
    }

    /// Unseen words get the weight of a word seen in no profile.
    fn idf(&self, word: &str) -> f64 {
        self.model
            .idf
            .get(word)
            .copied()
            .unwrap_or_else(|| idf_weight(self.answers.len(), 0))
    }
}

fn idf_weight(n_answers: usize, document_frequency: usize) -> f64 {
    ((n_answers as f64 + 1.0) / (document_frequency as f64 + 1.0)).ln() + 1.0
}

impl Guesser for WordOverlapGuesser {
    fn display_name(&self) -> &str {
        "WordOverlap"
    }

    fn parallel(&self) -> bool {
        true
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
        anyhow::ensure!(!data.is_empty(), "word overlap guesser needs at least one training example");

        let mut profiles: BTreeMap<Answer, BTreeSet<String>> = BTreeMap::new();
        for (sentences, answer) in data.iter() {
            let profile = profiles.entry(answer.to_string()).or_default();
            for sentence in sentences {
                profile.extend(tokenize(sentence));
            }
        }

        let mut document_frequency: HashMap<&str, usize> = HashMap::new();
        for words in profiles.values() {
            for word in words {
                *document_frequency.entry(word.as_str()).or_default() += 1;
            }
        }
        let idf = document_frequency
            .into_iter()
            .map(|(word, df)| (word.to_string(), idf_weight(profiles.len(), df)))
            .collect();

        tracing::info!(answers = profiles.len(), examples = data.len(), "trained word overlap guesser");
        *self = Self::from_model(OverlapModel { profiles, idf }, self.min_class_examples);
        Ok(())
    }

    fn guess(&self, questions: &[String], max_n_guesses: usize) -> Result<Vec<Vec<(Answer, f64)>>> {
        Ok(questions
            .iter()
            .map(|question| {
                self.rank(question)
                    .into_iter()
                    .take(max_n_guesses)
                    .map(|(answer, score)| (self.answers[answer].clone(), score))
                    .collect()
            })
            .collect())
    }

    fn score(&self, question: &str, guesses: &[Answer]) -> Result<Vec<f64>> {
        let ranked: HashMap<&str, f64> = self
            .rank(question)
            .into_iter()
            .map(|(answer, score)| (self.answers[answer].as_str(), score))
            .collect();
        Ok(guesses
            .iter()
            .map(|g| ranked.get(g.as_str()).copied().unwrap_or(0.0))
            .collect())
    }

    fn save(&self, directory: &Path) -> Result<()> {
        std::fs::create_dir_all(directory)?;
        let path = directory.join(MODEL_FILE);
        let json = serde_json::to_string(&self.model).context("failed to serialize overlap model")?;
        std::fs::write(&path, json)
            .with_context(|| format!("failed to write {}", path.display()))
    }
}

impl GuesserType for WordOverlapGuesser {
    fn targets() -> &'static [&'static str] {
        &[MODEL_FILE]
    }

    fn load(directory: &Path) -> Result<Self> {
        let path = directory.join(MODEL_FILE);
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let model: OverlapModel = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(Self::from_model(model, 1))
    }
}
