use std::sync::LazyLock;

use regex::Regex;

use crate::document::{Document, ValidationVerdict};

static REFERENCE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z]{2}/[0-9]{4}/[0-9]+$").unwrap());

/// Primary-record keys that carry a case reference number.
const REFERENCE_FIELDS: &[&str] = &["referenceNumber", "reference", "applicationReference"];

/// Check a document against the structural and format rules. All rules run;
/// errors come back in rule order.
pub fn validate(document: &Document) -> ValidationVerdict {
    let mut errors = Vec::new();

    if document.metadata.identifier.trim().is_empty() {
        errors.push("metadata.identifier is missing".to_string());
    }

    let primary = document.primary();
    if primary.map_or(true, |r| r.is_empty()) {
        errors.push(format!(
            "primary section '{}' is missing or empty",
            document.metadata.primary_section
        ));
    }

    if let Some(record) = primary {
        for field in REFERENCE_FIELDS {
            if let Some(Some(value)) = record.get(*field) {
                if !REFERENCE_RE.is_match(value.trim()) {
                    errors.push(format!(
                        "field '{}' has malformed reference number '{}' (expected AA/YYYY/N)",
                        field, value
                    ));
                }
            }
        }
    }

    ValidationVerdict::from_errors(errors)
}

/// Validate and store the verdict on the document.
pub fn annotate(document: &mut Document) {
    document.metadata.validation = validate(document);
}
