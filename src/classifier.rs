//! Content classifier.
//!
//! Scores raw content against keyword bags per category, a
//! case-insensitive substring-counting approach generalized the way
//! `pipeline::strategy::classify_by_heuristics` generalizes a single
//! three-way heuristic into a reusable, testable function rather than an
//! inline method on one strategy class.
//!
//! The keyword tables need to be configurable without recompilation,
//! rather than baked in as Rust match arms, so the table lives in
//! `config/keyword_categories.json`, embedded via `include_str!` and
//! parsed once into a `OnceLock` the first time
//! [`ContentClassifier::classify`] runs.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::types::Category;

const KEYWORD_CONFIG_JSON: &str = include_str!("../config/keyword_categories.json");

fn keyword_table() -> &'static HashMap<Category, Vec<String>> {
    static TABLE: OnceLock<HashMap<Category, Vec<String>>> = OnceLock::new();
    TABLE.get_or_init(|| {
        serde_json::from_str::<HashMap<Category, Vec<String>>>(KEYWORD_CONFIG_JSON)
            .expect("config/keyword_categories.json must decode to {category: [keyword, ...]}")
    })
}

/// Result of classifying a piece of content: every scored category with its
/// normalized confidence, and the subset whose score is nonzero, sorted
/// descending by confidence.
#[derive(Debug, Clone)]
pub struct Classification {
    pub confidence: HashMap<Category, f32>,
    pub matched_categories: Vec<Category>,
}

impl Classification {
    /// Categories whose confidence meets `threshold`, sorted descending.
    /// The composite strategy's selection step uses `0.2`; callers needing
    /// a different cutoff can filter `confidence` directly.
    pub fn above_threshold(&self, threshold: f32) -> Vec<Category> {
        self.matched_categories
            .iter()
            .copied()
            .filter(|c| self.confidence.get(c).copied().unwrap_or(0.0) >= threshold)
            .collect()
    }
}

pub struct ContentClassifier;

impl ContentClassifier {
    /// Classify `content` against the fixed category keyword bags.
    ///
    /// When no keyword matches anything, every category gets a uniform
    /// confidence of `1 / n_categories` and `matched_categories` is empty —
    /// a "no signal" fallback to uniform confidence rather than refusing
    /// to answer.
    pub fn classify(content: &str) -> Classification {
        let content_lower = content.to_lowercase();
        let table = keyword_table();

        let mut raw_scores: HashMap<Category, usize> = HashMap::new();
        for (category, keywords) in table.iter() {
            let score = keywords
                .iter()
                .map(|kw| content_lower.matches(kw.as_str()).count())
                .sum();
            raw_scores.insert(*category, score);
        }

        let total: usize = raw_scores.values().sum();

        let mut confidence = HashMap::new();
        if total == 0 {
            let uniform = 1.0 / table.len() as f32;
            for (category, _) in table.iter() {
                confidence.insert(*category, uniform);
            }
            return Classification {
                confidence,
                matched_categories: Vec::new(),
            };
        }

        for (category, score) in &raw_scores {
            confidence.insert(*category, *score as f32 / total as f32);
        }

        let mut matched: Vec<Category> = raw_scores
            .iter()
            .filter(|(_, score)| **score > 0)
            .map(|(category, _)| *category)
            .collect();
        matched.sort_by(|a, b| {
            confidence[b]
                .partial_cmp(&confidence[a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Classification {
            confidence,
            matched_categories: matched,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_crypto_content() {
        let c = ContentClassifier::classify(
            "Bitcoin and Ethereum prices surged as the blockchain wallet exchange reported record trading volume",
        );
        assert_eq!(c.matched_categories.first(), Some(&Category::Crypto));
    }

    #[test]
    fn classifies_academic_content() {
        let c = ContentClassifier::classify(
            "This research paper presents a study with methodology, findings, and a peer-reviewed conclusion based on experimental data analysis",
        );
        assert_eq!(c.matched_categories.first(), Some(&Category::Academic));
    }

    #[test]
    fn no_matches_yields_uniform_confidence() {
        let c = ContentClassifier::classify("the quick brown fox jumps over the lazy dog");
        assert!(c.matched_categories.is_empty());
        let uniform = 1.0 / 6.0;
        for score in c.confidence.values() {
            assert!((score - uniform).abs() < 0.001);
        }
    }

    #[test]
    fn above_threshold_filters_low_confidence_categories() {
        let c = ContentClassifier::classify("bitcoin token coin mining wallet exchange defi");
        let selected = c.above_threshold(0.2);
        assert!(selected.contains(&Category::Crypto));
    }
}
