//! The `qanta generate` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use qanta_core::engine::GuessEngine;
use qanta_core::guesses::save_fold_guesses;
use qanta_core::model::{parse_folds, Fold};
use qanta_core::questions::QuestionDatabase;
use qanta_guessers::load_config_from;

pub fn execute(
    guesser_name: String,
    folds_str: Option<String>,
    max_n_guesses: Option<usize>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let guesser_config = config.find_guesser(&guesser_name)?;

    let folds: Vec<Fold> = match folds_str {
        Some(s) => parse_folds(&s).map_err(anyhow::Error::msg)?,
        None => config.folds.clone(),
    };
    anyhow::ensure!(!folds.is_empty(), "at least one fold must be given");

    let mut generation = config.generation_config();
    if let Some(k) = max_n_guesses {
        anyhow::ensure!(k >= 1, "max-n-guesses must be at least 1");
        generation.max_n_guesses = k;
    }

    let directory = guesser_config.directory(&config.output_dir);
    let guesser = guesser_config.load(&directory).with_context(|| {
        format!(
            "failed to load {}; run `qanta train --guesser {}` first",
            guesser_config.class_name(),
            guesser_config.class_name()
        )
    })?;
    let questions = QuestionDatabase::load_json(&config.questions)?;

    let engine = GuessEngine::new(generation);
    let table = engine.generate(guesser.as_ref(), &questions, &folds)?;
    save_fold_guesses(&table, &directory, &folds)?;

    for fold in &folds {
        println!(
            "{}: {} guesses for fold {fold}",
            guesser.display_name(),
            table.for_fold(*fold).len()
        );
    }
    println!("Saved guesses to {}", directory.display());

    Ok(())
}
