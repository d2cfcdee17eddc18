use crate::rubric::{Evaluation, RubricEngine, ScoreSet};

/// Per-upload evaluation context.
///
/// Created when a report is uploaded and discarded when the next upload
/// replaces it; nothing about a session outlives it. The only state shared
/// across sessions is the read-only rubric configuration.
#[derive(Debug, Clone)]
pub struct EvaluationSession {
    project_name: String,
    source_text: String,
    suggested: ScoreSet,
    scores: ScoreSet,
    commentary: String,
}

impl EvaluationSession {
    /// Opens a session for one report: the auto-scorer seeds the suggestion,
    /// and the working ScoreSet starts as a copy of it.
    pub fn begin(
        engine: &RubricEngine,
        project_name: impl Into<String>,
        source_text: impl Into<String>,
    ) -> Self {
        let source_text = source_text.into();
        let suggested = engine.suggest(&source_text);
        let scores = suggested.clone();
        Self {
            project_name: project_name.into(),
            source_text,
            suggested,
            scores,
            commentary: String::new(),
        }
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    /// Empty when extraction was unavailable; the evaluator then proceeds
    /// with manual scoring over all-minimum suggestions.
    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    pub fn suggested(&self) -> &ScoreSet {
        &self.suggested
    }

    pub fn scores(&self) -> &ScoreSet {
        &self.scores
    }

    pub fn commentary(&self) -> &str {
        &self.commentary
    }

    pub fn set_commentary(&mut self, commentary: impl Into<String>) {
        self.commentary = commentary.into();
    }

    /// Records an evaluator override for one criterion. The override fully
    /// replaces the suggestion for that key and is clamped to the scale.
    pub fn override_score(&mut self, engine: &RubricEngine, key: &str, score: i32) {
        self.scores
            .override_score(key, score, engine.config().scale);
    }

    pub fn evaluate(&self, engine: &RubricEngine) -> Evaluation {
        engine.evaluate(&self.scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rubric::{RubricConfig, Verdict};

    fn engine() -> RubricEngine {
        let yaml = r#"
scale: { min: 0, max: 4 }
thresholds: { approve: 70.0, approve_with_observations: 50.0 }
criteria:
  - { key: objetivos, label: Objetivos, weight: 60.0, keywords: [meta, indicador] }
  - { key: metodologia, label: Metodologia, weight: 40.0, keywords: [muestra] }
"#;
        RubricEngine::new(RubricConfig::from_yaml(yaml).expect("valid rubric"))
    }

    #[test]
    fn session_seeds_scores_from_suggestion() {
        let engine = engine();
        let session = EvaluationSession::begin(&engine, "Proyecto X", "meta y muestra");
        assert_eq!(session.suggested(), session.scores());
        assert_eq!(session.scores().get("objetivos"), Some(2));
        assert_eq!(session.scores().get("metodologia"), Some(4));
    }

    #[test]
    fn override_replaces_suggestion_without_merging() {
        let engine = engine();
        let mut session = EvaluationSession::begin(&engine, "Proyecto X", "meta y muestra");
        session.override_score(&engine, "objetivos", 4);
        assert_eq!(session.scores().get("objetivos"), Some(4));
        // The read-only suggestion is untouched.
        assert_eq!(session.suggested().get("objetivos"), Some(2));
    }

    #[test]
    fn empty_extraction_still_allows_manual_evaluation() {
        let engine = engine();
        let mut session = EvaluationSession::begin(&engine, "Proyecto X", "");
        assert_eq!(session.suggested().get("objetivos"), Some(0));

        session.override_score(&engine, "objetivos", 4);
        session.override_score(&engine, "metodologia", 4);
        let evaluation = session.evaluate(&engine);
        assert_eq!(evaluation.percentage, 100.0);
        assert_eq!(evaluation.verdict, Verdict::Approved);
    }
}
