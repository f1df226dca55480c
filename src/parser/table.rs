use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use super::record::element_text;
use super::text::{clean_text, normalize_label};
use crate::document::{FieldRecord, RecordSet};

static TABLE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table").unwrap());
static CAPTION_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("caption").unwrap());
static TH_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("th").unwrap());
static ROW_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());

/// How to recognise one repeating table on a page.
#[derive(Debug, Clone, Copy)]
pub struct TableSpec {
    /// Lower-case fragments; a table matches when its caption or any header
    /// cell normalizes to a key containing one of them.
    pub vocabulary: &'static [&'static str],
    /// Rows with fewer usable cells are dropped.
    pub min_fields: usize,
}

impl TableSpec {
    pub const fn new(vocabulary: &'static [&'static str]) -> Self {
        Self {
            vocabulary,
            min_fields: 1,
        }
    }

    pub const fn min_fields(mut self, min_fields: usize) -> Self {
        self.min_fields = min_fields;
        self
    }

    fn matches_label(&self, raw: &str) -> bool {
        let key = normalize_label(raw).to_ascii_lowercase();
        !key.is_empty() && self.vocabulary.iter().any(|word| key.contains(word))
    }

    fn matches(&self, table: ElementRef) -> bool {
        table
            .select(&CAPTION_SEL)
            .chain(table.select(&TH_SEL))
            .filter(|el| owned_by(*el, table))
            .any(|el| self.matches_label(&element_text(el)))
    }
}

/// True when `table` is the nearest enclosing table of `el`, so cells of a
/// nested table are not counted against the layout table around it.
fn owned_by(el: ElementRef, table: ElementRef) -> bool {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| a.value().name() == "table")
        .is_some_and(|a| a.id() == table.id())
}

/// Extract every data row of the first table matching `spec`, in document order.
pub fn extract_rows(html: &Html, spec: &TableSpec) -> RecordSet {
    let Some(table) = html.select(&TABLE_SEL).find(|t| spec.matches(*t)) else {
        return RecordSet::new();
    };

    let mut headers: Option<Vec<String>> = None;
    let mut rows = RecordSet::new();

    for row in table.select(&ROW_SEL).filter(|r| owned_by(*r, table)) {
        let cells: Vec<ElementRef> = row
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|c| matches!(c.value().name(), "th" | "td"))
            .collect();
        if cells.is_empty() {
            continue;
        }

        let is_header_row = cells.iter().all(|c| c.value().name() == "th");
        if is_header_row {
            if headers.is_none() {
                headers = Some(
                    cells
                        .iter()
                        .map(|c| normalize_label(&element_text(*c)))
                        .collect(),
                );
            }
            continue;
        }

        let record = row_record(&cells, headers.as_deref().unwrap_or(&[]));
        if record.len() >= spec.min_fields.max(1) {
            rows.push(record);
        }
    }

    rows
}

fn row_record(cells: &[ElementRef], headers: &[String]) -> FieldRecord {
    let mut record = FieldRecord::new();
    for (index, cell) in cells.iter().enumerate() {
        let value = clean_text(&element_text(*cell));
        if value.is_empty() || value == "-" {
            continue;
        }
        let key = match headers.get(index) {
            Some(h) if !h.is_empty() => h.clone(),
            _ => format!("column_{}", index),
        };
        record.insert(key, Some(value));
    }
    record
}
