//! Correlation id derivation for image references.
//!
//! Every batch item is tagged with an id derived from its reference so
//! callers can match results back to requests without positional bookkeeping
//! alone. Derivation is purely textual: no URL parsing, no query-string
//! special cases.

/// Derive a correlation id from an image reference.
///
/// Takes the last path component of the reference and strips the final
/// filename extension (everything after the last `.` in that component).
/// References without a path separator are treated as a single component.
///
/// Derivation never fails. When the result would be empty (reference ends in
/// `/`, or the component is all extension like `.gitignore`), the raw
/// reference is used as the id instead so every result carries a non-empty
/// id for a non-empty reference.
///
/// ```
/// use textlift::derive_id;
///
/// assert_eq!(derive_id("http://example.com/image1.jpg"), "image1");
/// assert_eq!(derive_id("scan.png"), "scan");
/// assert_eq!(derive_id("http://example.com/reports/"), "http://example.com/reports/");
/// ```
pub fn derive_id(reference: &str) -> String {
    let component = reference.rsplit('/').next().unwrap_or(reference);
    let stem = match component.rsplit_once('.') {
        Some((stem, _extension)) => stem,
        None => component,
    };

    if stem.is_empty() {
        reference.to_string()
    } else {
        stem.to_string()
    }
}
