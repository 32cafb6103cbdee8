//! The `qanta init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    if Path::new("qanta.toml").exists() {
        println!("qanta.toml already exists, skipping.");
    } else {
        std::fs::write("qanta.toml", SAMPLE_CONFIG)?;
        println!("Created qanta.toml");
    }

    std::fs::create_dir_all("data")?;
    let questions_path = Path::new("data/questions.json");
    if questions_path.exists() {
        println!("data/questions.json already exists, skipping.");
    } else {
        std::fs::write(questions_path, SAMPLE_QUESTIONS)?;
        println!("Created data/questions.json");
    }

    println!("\nNext steps:");
    println!("  1. Replace data/questions.json with your question export");
    println!("  2. Run: qanta train --guesser FrequencyGuesser");
    println!("  3. Run: qanta generate --guesser FrequencyGuesser");
    println!("  4. Run: qanta aggregate");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# qanta configuration

questions = "data/questions.json"
output_dir = "output/guesser"
max_n_guesses = 10
token_step = 1
folds = ["train", "dev", "test", "devtest"]

[[guessers]]
type = "frequency"

[[guessers]]
type = "word_overlap"
min_class_examples = 1
"#;

const SAMPLE_QUESTIONS: &str = r#"{
  "questions": [
    {
      "qnum": 1,
      "sentences": ["This emperor lost the Battle of Waterloo.", "He was exiled to Elba."],
      "page": "Napoleon",
      "fold": "train"
    },
    {
      "qnum": 2,
      "sentences": ["This general crossed the Rubicon.", "He was stabbed on the Ides of March."],
      "page": "Julius_Caesar",
      "fold": "train"
    },
    {
      "qnum": 3,
      "sentences": ["This leader crowned himself emperor at Notre Dame."],
      "page": "Napoleon",
      "fold": "train"
    },
    {
      "qnum": 4,
      "sentences": ["His defeat at Waterloo ended the Hundred Days."],
      "page": "Napoleon",
      "fold": "dev"
    },
    {
      "qnum": 5,
      "sentences": ["He wrote commentaries on the Gallic Wars."],
      "page": "Julius_Caesar",
      "fold": "test"
    }
  ]
}
"#;
