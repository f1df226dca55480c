use reqwest::Url;

use crate::config::GateConfig;
use crate::document::FieldRecord;
use crate::error::{Result, ScrapeError};
use crate::parser::record::Strategy;
use crate::parser::table::TableSpec;
use crate::parser::SectionShape;

pub const PLANNING_BASE_URL: &str = "https://publicaccess.planning.gov.example/online-applications";
pub const WARRANT_BASE_URL: &str = "https://eservices.building.gov.example/portal";

#[derive(Debug, Clone, Copy)]
pub struct SectionSpec {
    pub name: &'static str,
    pub tab: &'static str,
    pub shape: SectionShape,
}

impl SectionSpec {
    const fn record(name: &'static str, tab: &'static str) -> Self {
        Self {
            name,
            tab,
            shape: SectionShape::Record,
        }
    }

    const fn rows(name: &'static str, tab: &'static str, spec: TableSpec) -> Self {
        Self {
            name,
            tab,
            shape: SectionShape::Rows(spec),
        }
    }
}

/// Everything the pipeline needs to know about one portal.
#[derive(Debug, Clone)]
pub struct SourceProfile {
    pub name: &'static str,
    pub base_url: String,
    page_path: &'static str,
    id_param: &'static str,
    tab_param: &'static str,
    pub gate: Option<GateConfig>,
    /// Fetched in this order.
    pub sections: Vec<SectionSpec>,
    pub strategies: &'static [Strategy],
    pub primary: &'static str,
    type_fields: &'static [&'static str],
    case_types: &'static [(&'static str, &'static str)],
}

const PLANNING_SECTIONS: &[SectionSpec] = &[
    SectionSpec::record("summary", "summary"),
    SectionSpec::record("dates", "dates"),
    SectionSpec::record("contacts", "contacts"),
    SectionSpec::rows(
        "relatedCases",
        "relatedCases",
        TableSpec::new(&["reference", "case"]).min_fields(2),
    ),
    SectionSpec::rows("history", "history", TableSpec::new(&["date", "event"]).min_fields(2)),
];

const WARRANT_SECTIONS: &[SectionSpec] = &[
    SectionSpec::record("details", "details"),
    SectionSpec::rows("plots", "plots", TableSpec::new(&["plot"])),
    SectionSpec::rows("certificates", "certificates", TableSpec::new(&["certificate"])),
    SectionSpec::rows("relatedCases", "related", TableSpec::new(&["reference"])),
];

const PLANNING_CASE_TYPES: &[(&str, &str)] = &[
    ("FP", "Full Planning Permission"),
    ("PP", "Planning Permission in Principle"),
    ("MS", "Approval of Matters Specified in Conditions"),
    ("LB", "Listed Building Consent"),
    ("CA", "Conservation Area Consent"),
    ("AD", "Advertisement Consent"),
    ("CL", "Certificate of Lawfulness"),
    ("TP", "Works to Protected Trees"),
    ("PN", "Prior Notification"),
];

const WARRANT_CASE_TYPES: &[(&str, &str)] = &[
    ("BW", "Building Warrant"),
    ("AW", "Amendment to Building Warrant"),
    ("CC", "Completion Certificate"),
    ("LW", "Late Building Warrant"),
    ("DW", "Demolition Warrant"),
];

impl SourceProfile {
    /// Site A: disclaimer-gated HTML pages, one page per tab.
    pub fn planning(base_url: Option<&str>) -> Self {
        Self {
            name: "planning",
            base_url: trim_base(base_url.unwrap_or(PLANNING_BASE_URL)),
            page_path: "/applicationDetails.do",
            id_param: "reference",
            tab_param: "activeTab",
            gate: Some(GateConfig {
                markers: vec!["disclaimer".to_string(), "terms and conditions".to_string()],
                accept_path: "/disclaimer/accept".to_string(),
                return_param: "returnUrl".to_string(),
                max_accept_attempts: 2,
            }),
            sections: PLANNING_SECTIONS.to_vec(),
            strategies: &[
                Strategy::SpanInCell,
                Strategy::DefinitionList,
                Strategy::HeaderDataPair,
            ],
            primary: "summary",
            type_fields: &["caseType", "applicationType", "type"],
            case_types: PLANNING_CASE_TYPES,
        }
    }

    /// Site B: client-rendered tabs reached through a browser.
    pub fn warrant(base_url: Option<&str>) -> Self {
        Self {
            name: "warrant",
            base_url: trim_base(base_url.unwrap_or(WARRANT_BASE_URL)),
            page_path: "/warrant",
            id_param: "id",
            tab_param: "tab",
            gate: None,
            sections: WARRANT_SECTIONS.to_vec(),
            strategies: &[Strategy::HeaderDataPair],
            primary: "details",
            type_fields: &["warrantType", "caseType", "applicationType", "type"],
            case_types: WARRANT_CASE_TYPES,
        }
    }

    pub fn section_url(&self, identifier: &str, tab: &str) -> Result<Url> {
        let page = format!("{}{}", self.base_url, self.page_path);
        Url::parse_with_params(&page, &[(self.id_param, identifier), (self.tab_param, tab)])
            .map_err(|e| ScrapeError::failed(identifier, format!("invalid URL {}: {}", page, e)))
    }

    /// URL of the primary section, the one the session gate guards.
    pub fn target_url(&self, identifier: &str) -> Result<Url> {
        let tab = self
            .sections
            .iter()
            .find(|s| s.name == self.primary)
            .map(|s| s.tab)
            .unwrap_or(self.primary);
        self.section_url(identifier, tab)
    }

    /// Resolve the case type code and its description, first from the
    /// primary record, then from the identifier prefix (`FP/2025/0159` → `FP`).
    pub fn case_type(&self, identifier: &str, primary: Option<&FieldRecord>) -> (Option<String>, Option<String>) {
        let from_record = primary.and_then(|record| {
            self.type_fields
                .iter()
                .find_map(|field| record.get(*field).cloned().flatten())
        });

        if let Some(value) = from_record {
            if let Some((code, desc)) = self.lookup(&value) {
                return (Some(code.to_string()), Some(desc.to_string()));
            }
            return (Some(value), None);
        }

        let prefix = identifier.split('/').next().unwrap_or("").trim();
        match self.lookup(prefix) {
            Some((code, desc)) => (Some(code.to_string()), Some(desc.to_string())),
            None => (None, None),
        }
    }

    fn lookup(&self, value: &str) -> Option<(&'static str, &'static str)> {
        let value = value.trim();
        self.case_types
            .iter()
            .find(|(code, desc)| code.eq_ignore_ascii_case(value) || desc.eq_ignore_ascii_case(value))
            .copied()
    }
}

fn trim_base(base: &str) -> String {
    base.trim_end_matches('/').to_string()
}
