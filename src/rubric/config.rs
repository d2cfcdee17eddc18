use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Integer score bounds shared by every criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scale {
    pub min: i32,
    pub max: i32,
}

impl Scale {
    pub fn clamp(&self, score: i32) -> i32 {
        score.clamp(self.min, self.max)
    }
}

/// Compliance percentage cutoffs for the three-way verdict.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub approve: f64,
    pub approve_with_observations: f64,
}

/// One rubric dimension: stable key, display label, weight on the intended
/// percentage scale, and the keyword list driving the auto-score suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    pub key: String,
    pub label: String,
    pub weight: f64,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Rubric definition loaded once at startup and immutable afterwards.
///
/// Criteria are declared as an ordered list; declaration order is the display
/// and export order and fixes the summation order of the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubricConfig {
    pub scale: Scale,
    pub thresholds: Thresholds,
    pub criteria: Vec<Criterion>,
}

impl RubricConfig {
    pub fn from_path(path: &Path) -> Result<Self, RubricError> {
        let raw = fs::read_to_string(path).map_err(|source| RubricError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&raw)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, RubricError> {
        let config: Self = serde_yaml::from_str(raw).map_err(RubricError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), RubricError> {
        if self.criteria.is_empty() {
            return Err(RubricError::NoCriteria);
        }
        if self.scale.min >= self.scale.max {
            return Err(RubricError::InvalidScale {
                min: self.scale.min,
                max: self.scale.max,
            });
        }

        let mut seen = HashSet::new();
        for criterion in &self.criteria {
            if !seen.insert(criterion.key.as_str()) {
                return Err(RubricError::DuplicateKey(criterion.key.clone()));
            }
            if criterion.label.trim().is_empty() {
                return Err(RubricError::EmptyLabel(criterion.key.clone()));
            }
            if criterion.weight < 0.0 || !criterion.weight.is_finite() {
                return Err(RubricError::InvalidWeight {
                    key: criterion.key.clone(),
                    weight: criterion.weight,
                });
            }
        }

        // Accepted but flagged: a reversed pair makes the three-way split
        // non-monotonic, and silently reordering would mask the config bug.
        if self.thresholds.approve < self.thresholds.approve_with_observations {
            warn!(
                approve = self.thresholds.approve,
                approve_with_observations = self.thresholds.approve_with_observations,
                "rubric thresholds are not monotonic"
            );
        }

        Ok(())
    }

    pub fn criterion(&self, key: &str) -> Option<&Criterion> {
        self.criteria.iter().find(|criterion| criterion.key == key)
    }

    pub fn weight_total(&self) -> f64 {
        self.criteria.iter().map(|criterion| criterion.weight).sum()
    }
}

#[derive(Debug)]
pub enum RubricError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_yaml::Error),
    NoCriteria,
    InvalidScale {
        min: i32,
        max: i32,
    },
    DuplicateKey(String),
    EmptyLabel(String),
    InvalidWeight {
        key: String,
        weight: f64,
    },
}

impl fmt::Display for RubricError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RubricError::Read { path, .. } => {
                write!(f, "failed to read rubric config at {}", path.display())
            }
            RubricError::Parse(err) => write!(f, "failed to parse rubric config: {err}"),
            RubricError::NoCriteria => write!(f, "rubric config declares no criteria"),
            RubricError::InvalidScale { min, max } => {
                write!(f, "rubric scale must satisfy min < max (got {min}..{max})")
            }
            RubricError::DuplicateKey(key) => {
                write!(f, "rubric criterion key '{key}' is declared twice")
            }
            RubricError::EmptyLabel(key) => {
                write!(f, "rubric criterion '{key}' has an empty label")
            }
            RubricError::InvalidWeight { key, weight } => {
                write!(f, "rubric criterion '{key}' has invalid weight {weight}")
            }
        }
    }
}

impl std::error::Error for RubricError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RubricError::Read { source, .. } => Some(source),
            RubricError::Parse(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_yaml() -> &'static str {
        r#"
scale: { min: 0, max: 4 }
thresholds: { approve: 70.0, approve_with_observations: 50.0 }
criteria:
  - key: objetivos
    label: Objetivos
    weight: 60.0
    keywords: [meta, indicador]
  - key: metodologia
    label: Metodologia
    weight: 40.0
"#
    }

    #[test]
    fn parses_and_keeps_declaration_order() {
        let config = RubricConfig::from_yaml(minimal_yaml()).expect("valid rubric parses");
        let keys: Vec<&str> = config
            .criteria
            .iter()
            .map(|criterion| criterion.key.as_str())
            .collect();
        assert_eq!(keys, vec!["objetivos", "metodologia"]);
        assert_eq!(config.scale, Scale { min: 0, max: 4 });
        assert_eq!(config.weight_total(), 100.0);
    }

    #[test]
    fn missing_keywords_default_to_empty() {
        let config = RubricConfig::from_yaml(minimal_yaml()).expect("valid rubric parses");
        let metodologia = config.criterion("metodologia").expect("criterion present");
        assert!(metodologia.keywords.is_empty());
    }

    #[test]
    fn rejects_duplicate_keys() {
        let yaml = r#"
scale: { min: 0, max: 4 }
thresholds: { approve: 70.0, approve_with_observations: 50.0 }
criteria:
  - { key: objetivos, label: Objetivos, weight: 50.0 }
  - { key: objetivos, label: Otra vez, weight: 50.0 }
"#;
        let result = RubricConfig::from_yaml(yaml);
        assert!(matches!(result, Err(RubricError::DuplicateKey(key)) if key == "objetivos"));
    }

    #[test]
    fn rejects_degenerate_scale() {
        let yaml = r#"
scale: { min: 4, max: 4 }
thresholds: { approve: 70.0, approve_with_observations: 50.0 }
criteria:
  - { key: objetivos, label: Objetivos, weight: 100.0 }
"#;
        let result = RubricConfig::from_yaml(yaml);
        assert!(matches!(
            result,
            Err(RubricError::InvalidScale { min: 4, max: 4 })
        ));
    }

    #[test]
    fn rejects_missing_thresholds() {
        let yaml = r#"
scale: { min: 0, max: 4 }
criteria:
  - { key: objetivos, label: Objetivos, weight: 100.0 }
"#;
        assert!(matches!(
            RubricConfig::from_yaml(yaml),
            Err(RubricError::Parse(_))
        ));
    }

    #[test]
    fn rejects_negative_weight() {
        let yaml = r#"
scale: { min: 0, max: 4 }
thresholds: { approve: 70.0, approve_with_observations: 50.0 }
criteria:
  - { key: objetivos, label: Objetivos, weight: -5.0 }
"#;
        assert!(matches!(
            RubricConfig::from_yaml(yaml),
            Err(RubricError::InvalidWeight { .. })
        ));
    }

    #[test]
    fn accepts_non_monotonic_thresholds() {
        let yaml = r#"
scale: { min: 0, max: 4 }
thresholds: { approve: 40.0, approve_with_observations: 60.0 }
criteria:
  - { key: objetivos, label: Objetivos, weight: 100.0 }
"#;
        RubricConfig::from_yaml(yaml).expect("reversed thresholds load with a warning");
    }
}
