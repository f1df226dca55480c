use std::collections::BTreeMap;

use indicatif::ProgressBar;
use tracing::{info, warn};

use crate::document::{
    Document, Metadata, SectionData, SectionWarning, ValidationVerdict, SECTION_EXTRACTION_FAILED,
};
use crate::error::Result;
use crate::parser;
use crate::sources::{SectionSpec, SourceProfile};
use crate::transport::{FetchRequest, Transport};

/// Fetches every section of a source in order and merges them into one document.
pub struct Aggregator<'a> {
    transport: &'a dyn Transport,
    profile: &'a SourceProfile,
    progress: ProgressBar,
}

impl<'a> Aggregator<'a> {
    pub fn new(transport: &'a dyn Transport, profile: &'a SourceProfile) -> Self {
        Self {
            transport,
            profile,
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// `prefetched` is the primary section's body when the session step
    /// already has it in hand.
    pub async fn run(&self, identifier: &str, prefetched: Option<String>) -> Result<Document> {
        let source_url = self.profile.target_url(identifier)?;
        let mut prefetched = prefetched;
        let mut sections = BTreeMap::new();
        let mut warnings = Vec::new();

        for spec in &self.profile.sections {
            self.progress.set_message(format!("{} {}", identifier, spec.name));
            let cached = if spec.name == self.profile.primary {
                prefetched.take()
            } else {
                None
            };

            let data = match self.section(identifier, spec, cached).await {
                Ok(data) if data.is_empty() => {
                    info!("Section {} has no data", spec.name);
                    None
                }
                Ok(data) => Some(data),
                Err(message) => {
                    warn!("Section {} failed: {}", spec.name, message);
                    warnings.push(SectionWarning {
                        section: spec.name.to_string(),
                        code: SECTION_EXTRACTION_FAILED,
                        message,
                    });
                    None
                }
            };
            sections.insert(spec.name.to_string(), data);
            self.progress.inc(1);
        }

        let primary = sections
            .get(self.profile.primary)
            .and_then(Option::as_ref)
            .and_then(SectionData::as_record);
        let (case_type, case_type_description) = self.profile.case_type(identifier, primary);

        Ok(Document {
            metadata: Metadata {
                identifier: identifier.to_string(),
                source: self.profile.name.to_string(),
                source_url: source_url.to_string(),
                generated_at: chrono::Utc::now().to_rfc3339(),
                pipeline_version: env!("CARGO_PKG_VERSION").to_string(),
                primary_section: self.profile.primary.to_string(),
                case_type,
                case_type_description,
                validation: ValidationVerdict::pending(),
                warnings,
            },
            sections,
        })
    }

    async fn section(
        &self,
        identifier: &str,
        spec: &SectionSpec,
        cached: Option<String>,
    ) -> std::result::Result<SectionData, String> {
        let body = match cached {
            Some(body) => body,
            None => {
                let url = self
                    .profile
                    .section_url(identifier, spec.tab)
                    .map_err(|e| e.to_string())?;
                let body = self
                    .transport
                    .fetch(url.as_str(), FetchRequest::get())
                    .await
                    .map_err(|e| e.to_string())?
                    .body;
                if self.profile.gate.as_ref().is_some_and(|gate| gate.is_gate(&body)) {
                    return Err(format!("gate page served for {} (session lost)", url));
                }
                body
            }
        };
        Ok(parser::extract_section(&body, &spec.shape, self.profile.strategies))
    }
}
