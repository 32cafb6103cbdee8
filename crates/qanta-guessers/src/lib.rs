//! qanta-guessers: Baseline guessers and the guesser registry.
//!
//! Implements the `Guesser` contract for a frequency baseline and a
//! word-overlap model, and builds configured guessers from `qanta.toml`.

pub mod config;
pub mod frequency;
pub mod mock;
pub mod overlap;
mod text;

pub use config::{load_config, load_config_from, GuesserConfig, QantaConfig};
pub use frequency::FrequencyGuesser;
pub use mock::MockGuesser;
pub use overlap::WordOverlapGuesser;
