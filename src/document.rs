use std::collections::BTreeMap;

use serde::Serialize;

/// One flat label → value mapping. `None` means "present but empty".
pub type FieldRecord = BTreeMap<String, Option<String>>;

/// Rows of a repeating table, in source order.
pub type RecordSet = Vec<FieldRecord>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SectionData {
    Record(FieldRecord),
    Rows(RecordSet),
}

impl SectionData {
    pub fn is_empty(&self) -> bool {
        match self {
            SectionData::Record(r) => r.is_empty(),
            SectionData::Rows(rows) => rows.is_empty(),
        }
    }

    pub fn as_record(&self) -> Option<&FieldRecord> {
        match self {
            SectionData::Record(r) => Some(r),
            SectionData::Rows(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationVerdict {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl ValidationVerdict {
    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }

    /// Placeholder carried until the validator runs.
    pub fn pending() -> Self {
        Self::from_errors(vec!["document has not been validated".to_string()])
    }
}

/// A non-fatal section failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionWarning {
    pub section: String,
    pub code: &'static str,
    pub message: String,
}

pub const SECTION_EXTRACTION_FAILED: &str = "SECTION_EXTRACTION_FAILED";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub identifier: String,
    pub source: String,
    pub source_url: String,
    pub generated_at: String,
    pub pipeline_version: String,
    pub primary_section: String,
    pub case_type: Option<String>,
    pub case_type_description: Option<String>,
    pub validation: ValidationVerdict,
    pub warnings: Vec<SectionWarning>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub metadata: Metadata,
    #[serde(flatten)]
    pub sections: BTreeMap<String, Option<SectionData>>,
}

impl Document {
    pub fn section(&self, name: &str) -> Option<&SectionData> {
        self.sections.get(name).and_then(Option::as_ref)
    }

    pub fn primary(&self) -> Option<&FieldRecord> {
        self.section(&self.metadata.primary_section)
            .and_then(SectionData::as_record)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn serializes_sections_next_to_metadata() {
        let mut doc = document("FP/2025/0159", Some(record(&[("status", "Ongoing")])));
        doc.sections.insert("history".to_string(), None);
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["metadata"]["identifier"], "FP/2025/0159");
        assert_eq!(json["metadata"]["validation"]["isValid"], false);
        assert_eq!(json["summary"]["status"], "Ongoing");
        assert!(json["history"].is_null());
    }

    #[test]
    fn verdict_validity_tracks_errors() {
        assert!(ValidationVerdict::from_errors(vec![]).is_valid);
        assert!(!ValidationVerdict::from_errors(vec!["x".into()]).is_valid);
    }
}
