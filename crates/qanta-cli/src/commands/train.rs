//! The `qanta train` command.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};

use qanta_core::questions::QuestionDatabase;
use qanta_core::training::{resolve_training_data, verify_targets, TrainingManifest};
use qanta_guessers::load_config_from;

pub fn execute(guesser_name: String, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let guesser_config = config.find_guesser(&guesser_name)?;
    let questions = QuestionDatabase::load_json(&config.questions)?;

    let mut guesser = guesser_config.create();
    let training_data = resolve_training_data(guesser.as_ref(), &questions)?;

    let start = Instant::now();
    guesser
        .train(&training_data)
        .with_context(|| format!("training {} failed", guesser_config.class_name()))?;
    let training_ms = start.elapsed().as_millis() as u64;

    let directory = guesser_config.directory(&config.output_dir);
    guesser.save(&directory)?;
    verify_targets(&directory, guesser_config.targets())?;

    let manifest = TrainingManifest::new(
        guesser.as_ref(),
        guesser_config.class_name(),
        &training_data,
        training_ms,
    );
    manifest.save_json(&directory)?;

    tracing::info!(
        guesser = guesser_config.class_name(),
        run_id = %manifest.run_id,
        training_ms,
        "training complete"
    );
    println!(
        "Trained {} ({}) in {}ms -> {}",
        guesser_config.class_name(),
        guesser.display_name(),
        training_ms,
        directory.display()
    );

    Ok(())
}
