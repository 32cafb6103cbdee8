//! Core data model types for qanta.
//!
//! Questions are immutable records split into ordered sentences. Guessers
//! never see a whole question at once: they see its partials, every
//! incremental prefix of the text, which simulates a question being read
//! aloud word by word.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Question identifier, unique across the corpus.
pub type Qnum = u64;

/// Named partition of the question corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fold {
    Train,
    Dev,
    Test,
    Devtest,
}

impl Fold {
    /// Every fold, in the order guess files are written.
    pub const ALL: [Fold; 4] = [Fold::Train, Fold::Dev, Fold::Test, Fold::Devtest];

    pub fn as_str(&self) -> &'static str {
        match self {
            Fold::Train => "train",
            Fold::Dev => "dev",
            Fold::Test => "test",
            Fold::Devtest => "devtest",
        }
    }
}

impl fmt::Display for Fold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Fold {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "train" => Ok(Fold::Train),
            "dev" => Ok(Fold::Dev),
            "test" => Ok(Fold::Test),
            "devtest" => Ok(Fold::Devtest),
            other => Err(format!("unknown fold: {other}")),
        }
    }
}

/// Parse a comma-separated fold list such as `"train,dev"`.
pub fn parse_folds(s: &str) -> Result<Vec<Fold>, String> {
    s.split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::parse)
        .collect()
}

/// A quiz bowl question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Unique question id.
    pub qnum: Qnum,
    /// Sentences in reading order; the index is the sentence number.
    #[serde(rename = "sentences")]
    pub text: Vec<String>,
    /// Canonical answer label.
    pub page: String,
    /// Fold this question belongs to.
    pub fold: Fold,
    /// Raw answer line as written by the question author.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tournaments: Option<String>,
}

impl Question {
    pub fn new(qnum: Qnum, text: Vec<String>, page: impl Into<String>, fold: Fold) -> Self {
        Self {
            qnum,
            text,
            page: page.into(),
            fold,
            answer: String::new(),
            category: None,
            tournaments: None,
        }
    }

    /// Every token-level prefix of the question.
    ///
    /// Yields one partial per token of every sentence, so the sequence length
    /// is the total token count. Calling it again restarts the sequence.
    pub fn partials(&self) -> Partials<'_> {
        self.partials_every(1)
    }

    /// Prefixes at every `step`-th token of each sentence, plus each
    /// sentence's final token. A `step` of zero yields sentence ends only.
    pub fn partials_every(&self, step: usize) -> Partials<'_> {
        Partials {
            sentences: self
                .text
                .iter()
                .map(|s| s.split_whitespace().collect())
                .collect(),
            step,
            sentence: 0,
            token: 0,
        }
    }

    /// All sentences joined with a single space.
    pub fn flatten_text(&self) -> String {
        self.text.join(" ")
    }

    /// Text revealed at `(sentence, token)`: all earlier sentences plus the
    /// first `token` tokens of `sentence`.
    pub fn text_at(&self, sentence: usize, token: usize) -> String {
        let mut words: Vec<&str> = self
            .text
            .iter()
            .take(sentence)
            .flat_map(|s| s.split_whitespace())
            .collect();
        if let Some(current) = self.text.get(sentence) {
            words.extend(current.split_whitespace().take(token));
        }
        words.join(" ")
    }

    /// The question as a `(sentences, page)` training example.
    pub fn to_example(&self) -> (Vec<String>, String) {
        (self.text.clone(), self.page.clone())
    }
}

/// One incremental prefix of a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partial<'a> {
    /// Sentence the prefix ends in.
    pub sentence: usize,
    /// Number of tokens of `sentence` included.
    pub token: usize,
    /// Tokens revealed so far, across all sentences.
    pub prefix: Vec<&'a str>,
}

impl Partial<'_> {
    pub fn text(&self) -> String {
        self.prefix.join(" ")
    }
}

/// Lazy iterator over a question's partials. See [`Question::partials`].
#[derive(Debug, Clone)]
pub struct Partials<'a> {
    sentences: Vec<Vec<&'a str>>,
    step: usize,
    sentence: usize,
    token: usize,
}

impl<'a> Iterator for Partials<'a> {
    type Item = Partial<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let tokens = self.sentences.get(self.sentence)?;
            let n = tokens.len();
            if self.token >= n {
                self.sentence += 1;
                self.token = 0;
                continue;
            }

            self.token = if self.step == 0 {
                n
            } else {
                (self.token + self.step).min(n)
            };

            let prefix = self.sentences[..self.sentence]
                .iter()
                .flatten()
                .copied()
                .chain(tokens[..self.token].iter().copied())
                .collect();

            return Some(Partial {
                sentence: self.sentence,
                token: self.token,
                prefix,
            });
        }
    }
}
