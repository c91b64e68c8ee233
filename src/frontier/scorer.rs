//! Keyword priority scoring

use crate::catalog::{MAX_PRIORITY, clamp_priority};

/// Assigns a queue priority to a new keyword
pub trait KeywordScorer: Send + Sync {
    fn score(&self, text: &str, category: &str) -> u8;
}

/// Rule-of-thumb scorer: short, trending terms in favoured categories first
#[derive(Debug, Clone)]
pub struct HeuristicScorer {
    pub base: i32,
    pub favoured_categories: Vec<String>,
    pub trending_words: Vec<String>,
}

impl Default for HeuristicScorer {
    fn default() -> Self {
        Self {
            base: 5,
            favoured_categories: vec!["Electronics".to_string(), "Home & Kitchen".to_string()],
            trending_words: ["wireless", "smart", "portable", "gaming", "bluetooth"]
                .iter()
                .map(|w| w.to_string())
                .collect(),
        }
    }
}

impl KeywordScorer for HeuristicScorer {
    fn score(&self, text: &str, category: &str) -> u8 {
        let mut score = self.base;

        match text.split_whitespace().count() {
            1 => score += 1,
            2 => score += 2,
            _ => {}
        }

        if self.favoured_categories.iter().any(|c| c == category) {
            score += 1;
        }

        let lower = text.to_lowercase();
        if self.trending_words.iter().any(|w| lower.contains(w.as_str())) {
            score += 1;
        }

        clamp_priority(score.min(MAX_PRIORITY as i32))
    }
}

/// Same priority for every keyword
#[derive(Debug, Clone, Copy)]
pub struct FixedScorer(pub u8);

impl KeywordScorer for FixedScorer {
    fn score(&self, _text: &str, _category: &str) -> u8 {
        clamp_priority(self.0 as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heuristic_scores() {
        let scorer = HeuristicScorer::default();
        // 5 + 2 (two words) + 1 (category) + 1 (trending)
        assert_eq!(scorer.score("wireless headphones", "Electronics"), 9);
        // 5 + 1 (one word)
        assert_eq!(scorer.score("notebook", "Office Products"), 6);
        // 5 only
        assert_eq!(scorer.score("kitchen knife set", "Books"), 5);
        // 5 + 1 + 1 + 1
        assert_eq!(scorer.score("smartphone", "Electronics"), 8);
    }

    #[test]
    fn test_heuristic_is_capped() {
        let scorer = HeuristicScorer {
            base: 9,
            ..HeuristicScorer::default()
        };
        assert_eq!(scorer.score("gaming mouse", "Electronics"), 10);
    }

    #[test]
    fn test_fixed_scorer_clamps() {
        assert_eq!(FixedScorer(8).score("anything", "Manual"), 8);
        assert_eq!(FixedScorer(0).score("anything", "Manual"), 1);
        assert_eq!(FixedScorer(200).score("anything", "Manual"), 10);
    }
}
