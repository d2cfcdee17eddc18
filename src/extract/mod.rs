mod docx;
mod pdf;

/// Best-effort plain-text extraction from an uploaded report.
///
/// Returns an empty string when nothing can be extracted; callers treat that
/// as "extraction unavailable" and fall back to manual scoring. Failures are
/// logged, never propagated.
pub fn extract_text(bytes: &[u8], declared_extension: &str) -> String {
    let extension = declared_extension
        .trim_start_matches('.')
        .to_ascii_lowercase();

    match extension.as_str() {
        "pdf" => pdf::extract(bytes),
        "docx" => docx::extract(bytes),
        // Unknown formats: attempt a plain-text read.
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_fallback_decodes_lossily() {
        let text = extract_text("informe de avance\n".as_bytes(), "txt");
        assert_eq!(text, "informe de avance\n");
    }

    #[test]
    fn corrupt_pdf_degrades_to_empty_string() {
        assert_eq!(extract_text(b"not a pdf at all", "pdf"), "");
    }

    #[test]
    fn corrupt_docx_degrades_to_empty_string() {
        assert_eq!(extract_text(b"not a zip archive", ".DOCX"), "");
    }
}
