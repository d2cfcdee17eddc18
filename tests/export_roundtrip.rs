use chrono::NaiveDate;
use report_grader::export::render_document;
use report_grader::extract::extract_text;
use report_grader::rubric::{RubricConfig, RubricEngine, ScoreSet};

fn engine() -> RubricEngine {
    let yaml = r#"
scale: { min: 0, max: 4 }
thresholds: { approve: 70.0, approve_with_observations: 50.0 }
criteria:
  - { key: objetivos, label: Objetivos, weight: 40.0, keywords: [meta] }
  - { key: metodologia, label: Metodologia, weight: 35.0, keywords: [muestra] }
  - { key: resultados, label: Resultados, weight: 25.0, keywords: [resultado] }
"#;
    RubricEngine::new(RubricConfig::from_yaml(yaml).expect("valid rubric"))
}

fn evaluation_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 8, 25).expect("valid date")
}

#[test]
fn rubric_table_round_trips_through_the_document() {
    let engine = engine();
    let mut scores = ScoreSet::default();
    scores.insert("objetivos", 3);
    scores.insert("metodologia", 2);
    scores.insert("resultados", 4);
    let evaluation = engine.evaluate(&scores);

    let bytes = render_document("Proyecto Andes", &evaluation, "", evaluation_date())
        .expect("document renders");
    let text = extract_text(&bytes, "docx");

    let table_lines: Vec<&str> = text.lines().filter(|line| line.contains('|')).collect();
    assert_eq!(table_lines[0], "Criterion|Score|Weight|Contribution");

    let round_tripped: Vec<(String, i32)> = table_lines[1..]
        .iter()
        .map(|line| {
            let cells: Vec<&str> = line.split('|').collect();
            let score = cells[1].parse().expect("score cell is an integer");
            (cells[0].to_string(), score)
        })
        .collect();

    let expected: Vec<(String, i32)> = evaluation
        .rows
        .iter()
        .map(|row| (row.label.clone(), row.score))
        .collect();
    assert_eq!(round_tripped, expected);
}

#[test]
fn document_carries_percentage_verdict_and_project() {
    let engine = engine();
    let mut scores = ScoreSet::default();
    scores.insert("objetivos", 4);
    scores.insert("metodologia", 4);
    scores.insert("resultados", 4);
    let evaluation = engine.evaluate(&scores);

    let bytes = render_document("Proyecto Andes", &evaluation, "", evaluation_date())
        .expect("document renders");
    let text = extract_text(&bytes, "docx");

    assert!(text.contains("Project: Proyecto Andes"));
    assert!(text.contains("Evaluated on: 2026-08-25"));
    assert!(text.contains("Compliance: 100.0%"));
    assert!(text.contains("Verdict: Approved"));
}

#[test]
fn commentary_paragraphs_render_with_soft_joins() {
    let engine = engine();
    let evaluation = engine.evaluate(&ScoreSet::default());
    let commentary = "Paragraph one.\n\nParagraph two line A\nline B";

    let bytes = render_document("Proyecto Andes", &evaluation, commentary, evaluation_date())
        .expect("document renders");
    let text = extract_text(&bytes, "docx");

    let lines: Vec<&str> = text.lines().collect();
    let first = lines
        .iter()
        .position(|line| *line == "Paragraph one.")
        .expect("first paragraph present");
    assert_eq!(lines[first + 1], "Paragraph two line A line B");
}

#[test]
fn long_commentary_is_never_truncated() {
    let engine = engine();
    let evaluation = engine.evaluate(&ScoreSet::default());
    let commentary = "El dictamen repite esta frase para crecer. ".repeat(500);

    let bytes = render_document("", &evaluation, &commentary, evaluation_date())
        .expect("document renders");
    let text = extract_text(&bytes, "docx");

    let expected = commentary.trim_end();
    assert!(text.contains(expected), "commentary must appear in full");
    assert!(!text.contains("..."), "no ellipsis may be inserted");
}
