use super::{write_package, ExportError};
use crate::rubric::Evaluation;
use chrono::NaiveDate;
use quick_xml::escape::escape;

const CONTENT_TYPES: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
    r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
    r#"<Default Extension="xml" ContentType="application/xml"/>"#,
    r#"<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#,
    r#"</Types>"#
);

const PACKAGE_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>"#,
    r#"</Relationships>"#
);

/// Renders the final evaluation record as a DOCX file.
///
/// The rubric table keeps the rubric's declared order, and the evaluator
/// commentary is reproduced verbatim and in full: blank lines separate
/// paragraphs, single newlines inside a block soft-join, and nothing is ever
/// truncated or elided.
pub fn render_document(
    project_name: &str,
    evaluation: &Evaluation,
    commentary: &str,
    evaluated_on: NaiveDate,
) -> Result<Vec<u8>, ExportError> {
    let mut body = String::new();
    body.push_str(&centered_paragraph("Progress Report Evaluation"));
    body.push_str(&paragraph(""));

    if !project_name.trim().is_empty() {
        body.push_str(&paragraph(&format!("Project: {project_name}")));
    }
    body.push_str(&paragraph(&format!("Evaluated on: {evaluated_on}")));
    body.push_str(&paragraph(""));

    let mut rows: Vec<Vec<String>> = Vec::with_capacity(evaluation.rows.len() + 1);
    rows.push(vec![
        "Criterion".to_string(),
        "Score".to_string(),
        "Weight".to_string(),
        "Contribution".to_string(),
    ]);
    for row in &evaluation.rows {
        rows.push(vec![
            row.label.clone(),
            row.score.to_string(),
            format!("{}", row.weight),
            format!("{:.2}", row.contribution),
        ]);
    }
    body.push_str(&table(&rows));

    body.push_str(&paragraph(""));
    body.push_str(&paragraph(&format!(
        "Compliance: {:.1}%",
        evaluation.percentage
    )));
    body.push_str(&paragraph(&format!(
        "Verdict: {}",
        evaluation.verdict.label()
    )));

    if !commentary.is_empty() {
        body.push_str(&paragraph(""));
        body.push_str(&paragraph("Commentary"));
        for block in commentary_paragraphs(commentary) {
            body.push_str(&paragraph(&block));
        }
    }

    let document = format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
            "<w:body>{}</w:body></w:document>"
        ),
        body
    );

    write_package(&[
        ("[Content_Types].xml", CONTENT_TYPES.to_string()),
        ("_rels/.rels", PACKAGE_RELS.to_string()),
        ("word/document.xml", document),
    ])
}

/// Splits authored commentary into rendered paragraphs: a blank line starts a
/// new paragraph, single newlines within a block join with a space.
fn commentary_paragraphs(text: &str) -> Vec<String> {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    normalized
        .split("\n\n")
        .map(|block| block.split('\n').collect::<Vec<_>>().join(" "))
        .collect()
}

fn paragraph(text: &str) -> String {
    if text.is_empty() {
        return "<w:p/>".to_string();
    }
    format!(
        r#"<w:p><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
        escape(text)
    )
}

fn centered_paragraph(text: &str) -> String {
    format!(
        r#"<w:p><w:pPr><w:jc w:val="center"/></w:pPr><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
        escape(text)
    )
}

fn table(rows: &[Vec<String>]) -> String {
    let mut xml = String::from("<w:tbl>");
    for row in rows {
        xml.push_str("<w:tr>");
        for cell in row {
            xml.push_str("<w:tc>");
            xml.push_str(&paragraph(cell));
            xml.push_str("</w:tc>");
        }
        xml.push_str("</w:tr>");
    }
    xml.push_str("</w:tbl>");
    xml
}
