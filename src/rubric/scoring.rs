use super::config::{RubricConfig, Scale};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Integer scores keyed by criterion key.
///
/// Seeded by the auto-scorer, then overwritten per key by the evaluator; an
/// override fully replaces the suggestion for that key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreSet {
    scores: HashMap<String, i32>,
}

impl ScoreSet {
    pub fn get(&self, key: &str) -> Option<i32> {
        self.scores.get(key).copied()
    }

    pub fn insert(&mut self, key: impl Into<String>, score: i32) {
        self.scores.insert(key.into(), score);
    }

    /// Stores an evaluator override, clamped to the rubric scale.
    pub fn override_score(&mut self, key: impl Into<String>, score: i32, scale: Scale) {
        self.scores.insert(key.into(), scale.clamp(score));
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

impl From<HashMap<String, i32>> for ScoreSet {
    fn from(scores: HashMap<String, i32>) -> Self {
        Self { scores }
    }
}

/// Keyword-presence heuristic suggesting a starting score for one criterion.
///
/// Matching is case-insensitive whole-word presence; each keyword counts at
/// most once regardless of how often it occurs. Rounding uses `f64::round`
/// (half away from zero). Total: empty text or an empty keyword list yields
/// `scale_min`.
pub fn auto_score(text: &str, keywords: &[String], scale_min: i32, scale_max: i32) -> i32 {
    if keywords.is_empty() {
        return scale_min;
    }

    let haystack = text.to_lowercase();
    let mut hits = 0usize;
    for keyword in keywords {
        let needle = keyword.trim().to_lowercase();
        if needle.is_empty() {
            continue;
        }
        let pattern = format!(r"\b{}\b", regex::escape(&needle));
        if let Ok(matcher) = Regex::new(&pattern) {
            if matcher.is_match(&haystack) {
                hits += 1;
            }
        }
    }

    let ratio = (hits as f64 / keywords.len() as f64).min(1.0);
    scale_min + (ratio * f64::from(scale_max - scale_min)).round() as i32
}

/// Builds the initial ScoreSet by applying the heuristic to every criterion
/// in declared order.
pub fn suggest_scores(config: &RubricConfig, text: &str) -> ScoreSet {
    let mut scores = ScoreSet::default();
    for criterion in &config.criteria {
        let score = auto_score(text, &criterion.keywords, config.scale.min, config.scale.max);
        scores.insert(criterion.key.clone(), score);
    }
    scores
}

/// Weighted-compliance percentage for a ScoreSet.
///
/// Criteria are summed in declared order; a key missing from `scores`
/// contributes zero. With every score at `scale.max` and weights summing to
/// 100 the result is exactly 100.0.
pub fn aggregate(scores: &ScoreSet, config: &RubricConfig) -> f64 {
    config
        .criteria
        .iter()
        .map(|criterion| contribution(scores.get(&criterion.key), criterion.weight, config.scale))
        .sum()
}

pub(super) fn contribution(score: Option<i32>, weight: f64, scale: Scale) -> f64 {
    let score = score.unwrap_or(0);
    (f64::from(score) / f64::from(scale.max)) * weight
}
