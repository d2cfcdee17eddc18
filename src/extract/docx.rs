use quick_xml::events::Event;
use quick_xml::Reader;
use std::fmt;
use std::io::{Cursor, Read};
use tracing::warn;
use zip::ZipArchive;

/// Paragraph texts in document order, one per line, followed by each table's
/// rows as pipe-joined cell text. Empty string on any parsing failure.
pub(super) fn extract(bytes: &[u8]) -> String {
    match read_document(bytes) {
        Ok(text) => text,
        Err(err) => {
            warn!(%err, "docx text extraction failed");
            String::new()
        }
    }
}

fn read_document(bytes: &[u8]) -> Result<String, DocxError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(DocxError::Zip)?;
    let mut part = archive
        .by_name("word/document.xml")
        .map_err(DocxError::Zip)?;

    let mut xml = String::new();
    part.read_to_string(&mut xml).map_err(DocxError::Io)?;

    collect_text(&xml).map_err(DocxError::Xml)
}

fn collect_text(xml: &str) -> Result<String, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();

    let mut paragraphs: Vec<String> = Vec::new();
    let mut table_rows: Vec<String> = Vec::new();

    let mut paragraph = String::new();
    let mut cell = String::new();
    let mut row_cells: Vec<String> = Vec::new();
    let mut table_depth = 0usize;
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => match e.name().as_ref() {
                b"w:tbl" => table_depth += 1,
                b"w:tr" if table_depth > 0 => row_cells.clear(),
                b"w:tc" if table_depth > 0 => cell.clear(),
                b"w:t" => in_text = true,
                b"w:tab" => target(table_depth, &mut paragraph, &mut cell).push('\t'),
                b"w:br" => target(table_depth, &mut paragraph, &mut cell).push('\n'),
                _ => {}
            },
            Event::Empty(ref e) => match e.name().as_ref() {
                b"w:tab" => target(table_depth, &mut paragraph, &mut cell).push('\t'),
                b"w:br" => target(table_depth, &mut paragraph, &mut cell).push('\n'),
                _ => {}
            },
            Event::Text(e) => {
                if in_text {
                    let value = e.unescape()?;
                    target(table_depth, &mut paragraph, &mut cell).push_str(&value);
                }
            }
            Event::End(ref e) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => {
                    if table_depth == 0 {
                        paragraphs.push(std::mem::take(&mut paragraph));
                    } else if !cell.is_empty() && !cell.ends_with(' ') {
                        // Multiple paragraphs inside one cell soft-join.
                        cell.push(' ');
                    }
                }
                b"w:tc" if table_depth > 0 => {
                    row_cells.push(cell.trim().to_string());
                }
                b"w:tr" if table_depth > 0 => {
                    table_rows.push(row_cells.join("|"));
                }
                b"w:tbl" => table_depth = table_depth.saturating_sub(1),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    let mut output = paragraphs.join("\n");
    if !table_rows.is_empty() {
        if !output.is_empty() {
            output.push('\n');
        }
        output.push_str(&table_rows.join("\n"));
    }
    Ok(output)
}

fn target<'a>(table_depth: usize, paragraph: &'a mut String, cell: &'a mut String) -> &'a mut String {
    if table_depth > 0 {
        cell
    } else {
        paragraph
    }
}

#[derive(Debug)]
enum DocxError {
    Zip(zip::result::ZipError),
    Io(std::io::Error),
    Xml(quick_xml::Error),
}

impl fmt::Display for DocxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocxError::Zip(err) => write!(f, "invalid docx package: {err}"),
            DocxError::Io(err) => write!(f, "failed to read document part: {err}"),
            DocxError::Xml(err) => write!(f, "failed to parse document xml: {err}"),
        }
    }
}
