use super::{write_package, ExportError};
use crate::rubric::Evaluation;
use quick_xml::escape::escape;

/// XLSX sheet names reject a handful of characters and cap out at 31 chars.
const SHEET_NAME_LIMIT: usize = 31;
const SHEET_NAME_FORBIDDEN: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];

const CONTENT_TYPES: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
    r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
    r#"<Default Extension="xml" ContentType="application/xml"/>"#,
    r#"<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
    r#"<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
    r#"<Override PartName="/xl/worksheets/sheet2.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
    r#"</Types>"#
);

const PACKAGE_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>"#,
    r#"</Relationships>"#
);

const WORKBOOK_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>"#,
    r#"<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet2.xml"/>"#,
    r#"</Relationships>"#
);

/// Renders the evaluation as an XLSX workbook: a results sheet with one row
/// per criterion and a summary sheet carrying the total, verdict, and the
/// full commentary.
pub fn render_spreadsheet(
    project_name: &str,
    evaluation: &Evaluation,
    commentary: &str,
) -> Result<Vec<u8>, ExportError> {
    let sheet_names = dedupe_sheet_names(&["Results", "Summary"]);

    let mut results_rows: Vec<String> = Vec::with_capacity(evaluation.rows.len() + 1);
    results_rows.push(row(
        1,
        &[
            text_cell('A', 1, "Criterion"),
            text_cell('B', 1, "Score"),
            text_cell('C', 1, "Weight"),
            text_cell('D', 1, "Contribution"),
        ],
    ));
    for (index, entry) in evaluation.rows.iter().enumerate() {
        let line = index + 2;
        results_rows.push(row(
            line,
            &[
                text_cell('A', line, &entry.label),
                number_cell('B', line, f64::from(entry.score)),
                number_cell('C', line, entry.weight),
                number_cell('D', line, entry.contribution),
            ],
        ));
    }

    let summary_rows = vec![
        row(
            1,
            &[
                text_cell('A', 1, "Project"),
                text_cell('B', 1, project_name),
            ],
        ),
        row(
            2,
            &[
                text_cell('A', 2, "Compliance (%)"),
                number_cell('B', 2, evaluation.percentage),
            ],
        ),
        row(
            3,
            &[
                text_cell('A', 3, "Verdict"),
                text_cell('B', 3, evaluation.verdict.label()),
            ],
        ),
        row(
            4,
            &[
                text_cell('A', 4, "Commentary"),
                text_cell('B', 4, commentary),
            ],
        ),
    ];

    let workbook = format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" "#,
            r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
            r#"<sheets>"#,
            r#"<sheet name="{}" sheetId="1" r:id="rId1"/>"#,
            r#"<sheet name="{}" sheetId="2" r:id="rId2"/>"#,
            r#"</sheets></workbook>"#
        ),
        escape(&sheet_names[0]),
        escape(&sheet_names[1])
    );

    write_package(&[
        ("[Content_Types].xml", CONTENT_TYPES.to_string()),
        ("_rels/.rels", PACKAGE_RELS.to_string()),
        ("xl/workbook.xml", workbook),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.to_string()),
        ("xl/worksheets/sheet1.xml", worksheet(&results_rows)),
        ("xl/worksheets/sheet2.xml", worksheet(&summary_rows)),
    ])
}

/// Drops forbidden characters and enforces the length cap. An all-forbidden
/// name falls back to "Sheet".
fn sanitize_sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !SHEET_NAME_FORBIDDEN.contains(c))
        .collect();
    let cleaned = cleaned.trim();
    let base = if cleaned.is_empty() { "Sheet" } else { cleaned };
    base.chars().take(SHEET_NAME_LIMIT).collect()
}

/// Sanitizes every requested name and resolves collisions with a numeric
/// suffix, re-truncating so the suffixed name still fits the cap.
fn dedupe_sheet_names(names: &[&str]) -> Vec<String> {
    let mut resolved: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        let mut candidate = sanitize_sheet_name(name);
        let mut suffix = 2;
        while resolved
            .iter()
            .any(|existing| existing.eq_ignore_ascii_case(&candidate))
        {
            let tag = format!(" ({suffix})");
            let keep = SHEET_NAME_LIMIT.saturating_sub(tag.chars().count());
            let stem: String = sanitize_sheet_name(name).chars().take(keep).collect();
            candidate = format!("{stem}{tag}");
            suffix += 1;
        }
        resolved.push(candidate);
    }
    resolved
}

fn worksheet(rows: &[String]) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
            "<sheetData>{}</sheetData></worksheet>"
        ),
        rows.concat()
    )
}

fn row(line: usize, cells: &[String]) -> String {
    format!(r#"<row r="{line}">{}</row>"#, cells.concat())
}

fn text_cell(column: char, line: usize, value: &str) -> String {
    format!(
        r#"<c r="{column}{line}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
        escape(value)
    )
}

fn number_cell(column: char, line: usize, value: f64) -> String {
    format!(r#"<c r="{column}{line}"><v>{value}</v></c>"#)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rubric::{RubricConfig, RubricEngine};
    use std::io::Read;
    use zip::ZipArchive;

    fn sample_evaluation() -> crate::rubric::Evaluation {
        let yaml = r#"
scale: { min: 0, max: 4 }
thresholds: { approve: 70.0, approve_with_observations: 50.0 }
criteria:
  - { key: objetivos, label: Objetivos, weight: 60.0, keywords: [meta] }
  - { key: metodologia, label: Metodologia, weight: 40.0, keywords: [muestra] }
"#;
        let engine = RubricEngine::new(RubricConfig::from_yaml(yaml).expect("valid rubric"));
        let scores = engine.suggest("meta y muestra");
        engine.evaluate(&scores)
    }

    fn read_part(bytes: &[u8], name: &str) -> String {
        let mut archive =
            ZipArchive::new(std::io::Cursor::new(bytes.to_vec())).expect("workbook is a zip");
        let mut part = archive.by_name(name).expect("part present");
        let mut content = String::new();
        part.read_to_string(&mut content).expect("part is utf-8");
        content
    }

    #[test]
    fn sanitize_strips_forbidden_characters() {
        assert_eq!(sanitize_sheet_name("Res[ul]ts: *final?*"), "Results final");
    }

    #[test]
    fn sanitize_truncates_to_limit() {
        let long = "x".repeat(40);
        assert_eq!(sanitize_sheet_name(&long).chars().count(), 31);
    }

    #[test]
    fn sanitize_falls_back_when_nothing_survives() {
        assert_eq!(sanitize_sheet_name("[:*?]"), "Sheet");
    }

    #[test]
    fn colliding_names_get_numeric_suffixes() {
        let names = dedupe_sheet_names(&["Results", "Res*ults", "Results"]);
        assert_eq!(names, vec!["Results", "Results (2)", "Results (3)"]);
        assert!(names.iter().all(|name| name.chars().count() <= 31));
    }

    #[test]
    fn workbook_contains_expected_parts() {
        let bytes = render_spreadsheet("Proyecto X", &sample_evaluation(), "ok")
            .expect("workbook renders");
        let workbook = read_part(&bytes, "xl/workbook.xml");
        assert!(workbook.contains(r#"name="Results""#));
        assert!(workbook.contains(r#"name="Summary""#));
        let results = read_part(&bytes, "xl/worksheets/sheet1.xml");
        assert!(results.contains("Objetivos"));
        assert!(results.contains("Metodologia"));
    }

    #[test]
    fn commentary_is_reproduced_verbatim() {
        let commentary = "linea uno\nlinea dos & <tres>\n\nbloque final";
        let bytes = render_spreadsheet("Proyecto X", &sample_evaluation(), commentary)
            .expect("workbook renders");
        let summary = read_part(&bytes, "xl/worksheets/sheet2.xml");
        assert!(summary.contains("linea uno\nlinea dos &amp; &lt;tres&gt;\n\nbloque final"));
    }
}
