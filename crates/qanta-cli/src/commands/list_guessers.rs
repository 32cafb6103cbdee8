//! The `qanta list-guessers` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use qanta_guessers::load_config_from;

pub fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;

    if config.guessers.is_empty() {
        println!("No guessers configured. Run `qanta init` to create a config file.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Class", "Name", "Parallel", "Enabled", "Trained"]);

    for guesser in &config.guessers {
        let directory = guesser.directory(&config.output_dir);
        let trained = guesser
            .targets()
            .iter()
            .all(|target| directory.join(target).exists());

        table.add_row(vec![
            Cell::new(guesser.class_name()),
            Cell::new(guesser.create().display_name()),
            Cell::new(yes_no(guesser.is_parallel())),
            Cell::new(yes_no(guesser.enabled())),
            Cell::new(yes_no(trained)),
        ]);
    }

    println!("{table}");
    Ok(())
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}
