use tracing::warn;

/// Page-ordered text from a PDF byte stream; pages without a text layer
/// contribute nothing. Empty string on any parsing failure.
pub(super) fn extract(bytes: &[u8]) -> String {
    match pdf_extract::extract_text_from_mem(bytes) {
        Ok(text) => text,
        Err(err) => {
            warn!(%err, "pdf text extraction failed");
            String::new()
        }
    }
}
