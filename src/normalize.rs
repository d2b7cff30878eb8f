//! Recognized-text normalization.
//!
//! OCR engines emit multi-line text; the service contract is a single line
//! per item. Normalization is a character-for-character replacement, not a
//! whitespace collapse: consumers that diff engine output expect the length
//! to be preserved.

/// Replace every line-break character (`\n`, `\r`) with a single space.
///
/// Runs are not collapsed, so CRLF becomes two spaces. Idempotent: text
/// without line breaks passes through unchanged.
pub fn flatten_lines(text: &str) -> String {
    text.replace(['\n', '\r'], " ")
}
