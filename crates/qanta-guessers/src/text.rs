//! Text helpers shared by the baseline guessers.

use std::collections::BTreeMap;

use anyhow::Result;

use qanta_core::traits::{TrainingData, QUIZ_BOWL};

/// Lowercased whitespace tokens with punctuation removed.
pub(crate) fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(char::to_lowercase)
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
}

/// The quiz bowl dataset out of resolved training data.
pub(crate) fn quiz_bowl_data(
    training_data: &BTreeMap<String, TrainingData>,
) -> Result<&TrainingData> {
    training_data
        .get(QUIZ_BOWL)
        .ok_or_else(|| anyhow::anyhow!("training data is missing the '{QUIZ_BOWL}' dataset"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_strips_punctuation_and_case() {
        let tokens: Vec<_> = tokenize("This EMPEROR, lost at Waterloo! --").collect();
        assert_eq!(tokens, vec!["this", "emperor", "lost", "at", "waterloo"]);
    }
}
