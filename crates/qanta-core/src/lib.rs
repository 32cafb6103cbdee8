//! qanta-core: Guesser contract, guess generation, persistence and aggregation.
//!
//! This crate defines the question data model, the capability interface every
//! guesser implements, and the generic machinery that drives any guesser over
//! question prefixes and merges the results across guessers.

pub mod aggregate;
pub mod engine;
pub mod error;
pub mod guesses;
pub mod model;
pub mod questions;
pub mod traits;
pub mod training;

pub use error::PipelineError;
