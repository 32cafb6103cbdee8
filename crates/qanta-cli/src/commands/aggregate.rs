//! The `qanta aggregate` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use qanta_core::aggregate::preprocess_all_guesses;
use qanta_core::questions::QuestionDatabase;
use qanta_guessers::load_config_from;

pub fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let guesser_dirs = config.guesser_dirs();
    anyhow::ensure!(
        !guesser_dirs.is_empty(),
        "no guessers enabled. Add [[guessers]] entries to qanta.toml"
    );

    let questions = QuestionDatabase::load_json(&config.questions)?;
    let outputs = config.aggregate_outputs();
    let aggregation = preprocess_all_guesses(&guesser_dirs, &questions, &outputs)?;

    let mut table = Table::new();
    table.set_header(vec!["Guesser", "Covered guesses"]);
    for guesser in aggregation.index.guessers() {
        let covered = aggregation.index.coverage(guesser).map_or(0, |c| c.len());
        table.add_row(vec![Cell::new(guesser), Cell::new(covered)]);
    }
    println!("{table}");

    println!(
        "\n{} tasks, {} task guesses",
        aggregation.tasks.len(),
        aggregation.guess_count()
    );
    println!("Guesser index: {}", outputs.guesser_index.display());
    println!("Guess tasks: {}", outputs.guess_tasks.display());

    Ok(())
}
