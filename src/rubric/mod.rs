mod config;
mod scoring;
mod verdict;

pub use config::{Criterion, RubricConfig, RubricError, Scale, Thresholds};
pub use scoring::{aggregate, auto_score, suggest_scores, ScoreSet};
pub use verdict::Verdict;

use serde::{Deserialize, Serialize};

/// Stateless facade applying the rubric configuration to report text and
/// evaluator scores. Holds the config for the process lifetime; every call is
/// recomputed from its inputs.
pub struct RubricEngine {
    config: RubricConfig,
}

impl RubricEngine {
    pub fn new(config: RubricConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RubricConfig {
        &self.config
    }

    /// Auto-score suggestion for every criterion, from extracted report text.
    pub fn suggest(&self, text: &str) -> ScoreSet {
        scoring::suggest_scores(&self.config, text)
    }

    /// Resolves a ScoreSet into the rubric table, compliance percentage, and
    /// verdict. Rows follow the rubric's declared criterion order.
    pub fn evaluate(&self, scores: &ScoreSet) -> Evaluation {
        let rows = self
            .config
            .criteria
            .iter()
            .map(|criterion| {
                let score = scores.get(&criterion.key).unwrap_or(0);
                CriterionRow {
                    key: criterion.key.clone(),
                    label: criterion.label.clone(),
                    score,
                    weight: criterion.weight,
                    contribution: scoring::contribution(
                        Some(score),
                        criterion.weight,
                        self.config.scale,
                    ),
                }
            })
            .collect();

        let percentage = scoring::aggregate(scores, &self.config);
        let verdict = Verdict::classify(percentage, &self.config.thresholds);

        Evaluation {
            rows,
            percentage,
            verdict,
        }
    }
}

/// One resolved line of the rubric table, ready for display or export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionRow {
    pub key: String,
    pub label: String,
    pub score: i32,
    pub weight: f64,
    pub contribution: f64,
}

/// Fully resolved evaluation result for one ScoreSet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub rows: Vec<CriterionRow>,
    pub percentage: f64,
    pub verdict: Verdict,
}
