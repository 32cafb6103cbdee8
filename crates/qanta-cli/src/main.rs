//! qanta CLI: train guessers, generate guesses and aggregate them.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "qanta", version, about = "Quiz bowl guesser pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a guesser and save it to its output directory
    Train {
        /// Guesser class name (e.g. "FrequencyGuesser")
        #[arg(long)]
        guesser: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Generate guesses for every question prefix with a trained guesser
    Generate {
        /// Guesser class name
        #[arg(long)]
        guesser: String,

        /// Folds to generate (comma-separated, default: from config)
        #[arg(long)]
        folds: Option<String>,

        /// Max guesses per question prefix (default: from config)
        #[arg(long)]
        max_n_guesses: Option<usize>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Merge the guesses of all enabled guessers into the index and task list
    Aggregate {
        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List configured guessers
    ListGuessers {
        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create starter config and sample questions
    Init,
}

fn main() {
    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = "qanta=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Train { guesser, config } => commands::train::execute(guesser, config),
        Commands::Generate {
            guesser,
            folds,
            max_n_guesses,
            config,
        } => commands::generate::execute(guesser, folds, max_n_guesses, config),
        Commands::Aggregate { config } => commands::aggregate::execute(config),
        Commands::ListGuessers { config } => commands::list_guessers::execute(config),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
