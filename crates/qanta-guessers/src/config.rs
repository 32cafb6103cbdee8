//! Guesser registry configuration and factory.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use qanta_core::aggregate::AggregateOutputs;
use qanta_core::engine::GenerationConfig;
use qanta_core::model::Fold;
use qanta_core::traits::{Guesser, GuesserType};
use qanta_core::PipelineError;

use crate::frequency::FrequencyGuesser;
use crate::overlap::WordOverlapGuesser;

/// Configuration for a single guesser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GuesserConfig {
    Frequency {
        #[serde(default = "default_enabled")]
        enabled: bool,
        #[serde(default = "default_min_class_examples")]
        min_class_examples: usize,
    },
    WordOverlap {
        #[serde(default = "default_enabled")]
        enabled: bool,
        #[serde(default = "default_min_class_examples")]
        min_class_examples: usize,
    },
}

fn default_enabled() -> bool {
    true
}
fn default_min_class_examples() -> usize {
    1
}

impl GuesserConfig {
    /// Name used on the command line and for the output directory.
    pub fn class_name(&self) -> &'static str {
        match self {
            GuesserConfig::Frequency { .. } => "FrequencyGuesser",
            GuesserConfig::WordOverlap { .. } => "WordOverlapGuesser",
        }
    }

    fn type_tag(&self) -> &'static str {
        match self {
            GuesserConfig::Frequency { .. } => "frequency",
            GuesserConfig::WordOverlap { .. } => "word_overlap",
        }
    }

    pub fn enabled(&self) -> bool {
        match self {
            GuesserConfig::Frequency { enabled, .. } | GuesserConfig::WordOverlap { enabled, .. } => {
                *enabled
            }
        }
    }

    /// Case-insensitive match on the class name or the `type` tag.
    pub fn matches(&self, name: &str) -> bool {
        self.class_name().eq_ignore_ascii_case(name) || self.type_tag().eq_ignore_ascii_case(name)
    }

    /// Directory holding this guesser's model and guess files.
    pub fn directory(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(self.class_name())
    }

    pub fn targets(&self) -> &'static [&'static str] {
        match self {
            GuesserConfig::Frequency { .. } => FrequencyGuesser::targets(),
            GuesserConfig::WordOverlap { .. } => WordOverlapGuesser::targets(),
        }
    }

    /// Untrained guesser instance.
    pub fn create(&self) -> Box<dyn Guesser> {
        match self {
            GuesserConfig::Frequency {
                min_class_examples, ..
            } => Box::new(FrequencyGuesser::new(*min_class_examples)),
            GuesserConfig::WordOverlap {
                min_class_examples, ..
            } => Box::new(WordOverlapGuesser::new(*min_class_examples)),
        }
    }

    /// Guesser restored from a directory written by `save`.
    pub fn load(&self, directory: &Path) -> Result<Box<dyn Guesser>> {
        let guesser: Box<dyn Guesser> = match self {
            GuesserConfig::Frequency { .. } => Box::new(FrequencyGuesser::load(directory)?),
            GuesserConfig::WordOverlap { .. } => Box::new(WordOverlapGuesser::load(directory)?),
        };
        Ok(guesser)
    }

    pub fn is_parallel(&self) -> bool {
        self.create().parallel()
    }
}

/// Top-level qanta configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QantaConfig {
    /// Question database JSON.
    #[serde(default = "default_questions")]
    pub questions: PathBuf,
    /// Root of the per-guesser output directories.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Coverage index path; defaults to `guess_index.json` under `output_dir`.
    #[serde(default)]
    pub guesser_index: Option<PathBuf>,
    /// Task list path; defaults to `guess_tasks.json` under `output_dir`.
    #[serde(default)]
    pub guess_tasks: Option<PathBuf>,
    #[serde(default = "default_max_n_guesses")]
    pub max_n_guesses: usize,
    #[serde(default = "default_token_step")]
    pub token_step: usize,
    /// Folds guesses are generated for.
    #[serde(default = "default_folds")]
    pub folds: Vec<Fold>,
    #[serde(default)]
    pub guessers: Vec<GuesserConfig>,
}

fn default_questions() -> PathBuf {
    PathBuf::from("data/questions.json")
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("output/guesser")
}
fn default_max_n_guesses() -> usize {
    10
}
fn default_token_step() -> usize {
    1
}
fn default_folds() -> Vec<Fold> {
    Fold::ALL.to_vec()
}

impl Default for QantaConfig {
    fn default() -> Self {
        Self {
            questions: default_questions(),
            output_dir: default_output_dir(),
            guesser_index: None,
            guess_tasks: None,
            max_n_guesses: default_max_n_guesses(),
            token_step: default_token_step(),
            folds: default_folds(),
            guessers: Vec::new(),
        }
    }
}

impl QantaConfig {
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.max_n_guesses >= 1, "max_n_guesses must be at least 1");

        let mut seen = HashSet::new();
        for guesser in self.enabled_guessers() {
            anyhow::ensure!(
                seen.insert(guesser.class_name()),
                "guesser {} is enabled more than once",
                guesser.class_name()
            );
        }
        Ok(())
    }

    pub fn enabled_guessers(&self) -> impl Iterator<Item = &GuesserConfig> {
        self.guessers.iter().filter(|g| g.enabled())
    }

    /// First enabled guesser matching `name`.
    pub fn find_guesser(&self, name: &str) -> Result<&GuesserConfig> {
        self.enabled_guessers()
            .find(|g| g.matches(name))
            .ok_or_else(|| PipelineError::UnknownGuesser(name.to_string()).into())
    }

    /// Output directories of all enabled guessers, in configuration order.
    pub fn guesser_dirs(&self) -> Vec<PathBuf> {
        self.enabled_guessers()
            .map(|g| g.directory(&self.output_dir))
            .collect()
    }

    pub fn aggregate_outputs(&self) -> AggregateOutputs {
        AggregateOutputs {
            guesser_index: self
                .guesser_index
                .clone()
                .unwrap_or_else(|| self.output_dir.join("guess_index.json")),
            guess_tasks: self
                .guess_tasks
                .clone()
                .unwrap_or_else(|| self.output_dir.join("guess_tasks.json")),
        }
    }

    pub fn generation_config(&self) -> GenerationConfig {
        GenerationConfig {
            max_n_guesses: self.max_n_guesses,
            token_step: self.token_step,
        }
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `qanta.toml` in the current directory
/// 2. `~/.config/qanta/config.toml`
///
/// Environment variable overrides: `QANTA_QUESTIONS`, `QANTA_OUTPUT_DIR`.
pub fn load_config() -> Result<QantaConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<QantaConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("qanta.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            tracing::debug!(path = %path.display(), "loaded config");
            toml::from_str::<QantaConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => QantaConfig::default(),
    };

    if let Ok(questions) = std::env::var("QANTA_QUESTIONS") {
        config.questions = PathBuf::from(questions);
    }
    if let Ok(output_dir) = std::env::var("QANTA_OUTPUT_DIR") {
        config.output_dir = PathBuf::from(output_dir);
    }

    config.validate()?;
    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("qanta"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
questions = "corpus/questions.json"
output_dir = "out"
max_n_guesses = 5
folds = ["dev", "test"]

[[guessers]]
type = "frequency"

[[guessers]]
type = "word_overlap"
min_class_examples = 2

[[guessers]]
type = "frequency"
enabled = false
"#;

    #[test]
    fn default_config() {
        let config = QantaConfig::default();
        assert_eq!(config.max_n_guesses, 10);
        assert_eq!(config.folds, Fold::ALL.to_vec());
        assert!(config.guessers.is_empty());
        assert_eq!(
            config.aggregate_outputs().guess_tasks,
            PathBuf::from("output/guesser/guess_tasks.json")
        );
    }

    #[test]
    fn parse_guesser_config() {
        let config: QantaConfig = toml::from_str(SAMPLE).unwrap();
        config.validate().unwrap();

        assert_eq!(config.guessers.len(), 3);
        assert_eq!(config.folds, vec![Fold::Dev, Fold::Test]);
        assert_eq!(config.token_step, 1);
        assert_eq!(
            config.guessers[1],
            GuesserConfig::WordOverlap {
                enabled: true,
                min_class_examples: 2
            }
        );
        assert_eq!(
            config.guesser_dirs(),
            vec![
                PathBuf::from("out/FrequencyGuesser"),
                PathBuf::from("out/WordOverlapGuesser")
            ]
        );
    }

    #[test]
    fn find_guesser_by_class_or_type() {
        let config: QantaConfig = toml::from_str(SAMPLE).unwrap();
        assert_eq!(
            config.find_guesser("wordoverlapguesser").unwrap().class_name(),
            "WordOverlapGuesser"
        );
        assert_eq!(config.find_guesser("frequency").unwrap().class_name(), "FrequencyGuesser");

        let err = config.find_guesser("ElasticSearchGuesser").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::UnknownGuesser(_))
        ));
    }

    #[test]
    fn duplicate_enabled_guessers_rejected() {
        let config = QantaConfig {
            guessers: vec![
                GuesserConfig::Frequency {
                    enabled: true,
                    min_class_examples: 1,
                },
                GuesserConfig::Frequency {
                    enabled: true,
                    min_class_examples: 3,
                },
            ],
            ..QantaConfig::default()
        };
        assert!(config.validate().is_err());

        let zero = QantaConfig {
            max_n_guesses: 0,
            ..QantaConfig::default()
        };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn factory_matches_registry() {
        let config = GuesserConfig::WordOverlap {
            enabled: true,
            min_class_examples: 1,
        };
        assert_eq!(config.create().display_name(), "WordOverlap");
        assert_eq!(config.targets(), &["word_overlap.json"]);
        assert!(config.is_parallel());

        let frequency = GuesserConfig::Frequency {
            enabled: true,
            min_class_examples: 1,
        };
        assert!(!frequency.is_parallel());
    }

    #[test]
    fn explicit_missing_path_fails() {
        let err = load_config_from(Some(Path::new("/nonexistent/qanta.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn load_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qanta.toml");
        std::fs::write(&path, SAMPLE).unwrap();
        let config = load_config_from(Some(&path)).unwrap();
        assert_eq!(config.max_n_guesses, 5);
    }
}
