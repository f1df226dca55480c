pub mod record;
pub mod table;
pub mod text;

use scraper::Html;

use crate::document::SectionData;
use record::Strategy;
use table::TableSpec;

/// Expected layout of one section.
#[derive(Debug, Clone, Copy)]
pub enum SectionShape {
    Record,
    Rows(TableSpec),
}

/// Parse a fetched page and pull out the section's data. Never fails; a page
/// with no matching markup yields an empty record or row set.
pub fn extract_section(body: &str, shape: &SectionShape, chain: &[Strategy]) -> SectionData {
    let html = Html::parse_document(body);
    match shape {
        SectionShape::Record => SectionData::Record(record::extract_record(&html, chain)),
        SectionShape::Rows(spec) => SectionData::Rows(table::extract_rows(&html, spec)),
    }
}
