use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use super::text::{clean_text, normalize_label, strip_colon};
use crate::document::FieldRecord;

static CELL_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());
static SPAN_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("span").unwrap());
static DL_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("dl").unwrap());
static DT_DD_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("dt, dd").unwrap());
static ROW_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());

/// Source placeholder for "no value".
const PLACEHOLDER: &str = "-";

/// One label/value heuristic. Markup differs between pages of the same portal,
/// so a source lists several and the first non-empty result wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// `<td>Label <span>Value</span></td>`
    SpanInCell,
    /// `<dl><dt>Label:</dt><dd>Value</dd></dl>`
    DefinitionList,
    /// `<tr><th>Label:</th><td>Value</td></tr>`
    HeaderDataPair,
}

impl Strategy {
    pub fn extract(self, html: &Html) -> FieldRecord {
        match self {
            Strategy::SpanInCell => span_in_cell(html),
            Strategy::DefinitionList => definition_list(html),
            Strategy::HeaderDataPair => header_data_pairs(html),
        }
    }
}

/// Run `chain` in order and keep the first record that has at least one field.
pub fn extract_record(html: &Html, chain: &[Strategy]) -> FieldRecord {
    for strategy in chain {
        let record = strategy.extract(html);
        if !record.is_empty() {
            tracing::debug!("{:?} produced {} fields", strategy, record.len());
            return record;
        }
    }
    FieldRecord::new()
}

/// Text nodes joined by a space so `<br>` and inline tags keep words apart.
/// Callers run the result through `clean_text`.
pub fn element_text(element: ElementRef) -> String {
    element.text().collect::<Vec<_>>().join(" ")
}

fn span_in_cell(html: &Html) -> FieldRecord {
    let mut record = FieldRecord::new();
    for cell in html.select(&CELL_SEL) {
        let Some(span) = cell.select(&SPAN_SEL).next() else {
            continue;
        };
        let value_raw = element_text(span);
        let cell_raw = element_text(cell);
        let label = clean_text(&cell_raw.replacen(&value_raw, "", 1));
        let key = normalize_label(strip_colon(&label));
        if key.is_empty() {
            continue;
        }
        record.insert(key, non_empty(clean_text(&value_raw)));
    }
    record
}

fn definition_list(html: &Html) -> FieldRecord {
    let mut record = FieldRecord::new();
    for list in html.select(&DL_SEL) {
        let mut label: Option<String> = None;
        for item in list.select(&DT_DD_SEL) {
            match item.value().name() {
                "dt" => {
                    let text = clean_text(&element_text(item));
                    label = Some(normalize_label(strip_colon(&text)));
                }
                _ => {
                    if let Some(key) = label.take().filter(|k| !k.is_empty()) {
                        record.insert(key, non_empty(clean_text(&element_text(item))));
                    }
                }
            }
        }
    }
    record
}

fn header_data_pairs(html: &Html) -> FieldRecord {
    let mut record = FieldRecord::new();
    for row in html.select(&ROW_SEL) {
        let cells: Vec<ElementRef> = row.children().filter_map(ElementRef::wrap).collect();
        let headers: Vec<&ElementRef> = cells.iter().filter(|c| c.value().name() == "th").collect();
        let data: Vec<&ElementRef> = cells.iter().filter(|c| c.value().name() == "td").collect();
        if headers.len() != 1 || data.len() != 1 {
            continue;
        }

        let label = clean_text(&element_text(*headers[0]));
        let key = normalize_label(strip_colon(&label));
        let value = clean_text(&element_text(*data[0]));
        if key.is_empty() || value.is_empty() || value == PLACEHOLDER {
            continue;
        }
        record.insert(key, Some(value));
    }
    record
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(body: &str) -> Html {
        Html::parse_document(&format!("<html><body>{}</body></html>", body))
    }

    #[test]
    fn span_in_cell_splits_label_and_value() {
        let html = doc("<table><tr><td>Status <br/><div><span>Ongoing</span></div></td></tr></table>");
        let record = Strategy::SpanInCell.extract(&html);
        assert_eq!(record.get("status"), Some(&Some("Ongoing".to_string())));
    }

    #[test]
    fn line_breaks_separate_words() {
        let html = doc("<table><tr><th>Site Address:</th><td>12 High St<br>Anytown</td></tr></table>");
        let record = Strategy::HeaderDataPair.extract(&html);
        assert_eq!(record.get("siteAddress"), Some(&Some("12 High St Anytown".to_string())));
    }

    #[test]
    fn span_in_cell_skips_cell_without_label() {
        let html = doc("<table><tr><td><span>Orphan value</span></td></tr></table>");
        assert!(Strategy::SpanInCell.extract(&html).is_empty());
    }

    #[test]
    fn span_in_cell_keeps_empty_value_as_null() {
        let html = doc("<table><tr><td>Decision <span>  </span></td></tr></table>");
        let record = Strategy::SpanInCell.extract(&html);
        assert_eq!(record.get("decision"), Some(&None));
    }

    #[test]
    fn definition_list_pairs() {
        let html = doc("<dl><dt>Case Officer:</dt><dd>Euan\n  Crombie</dd><dt>Ward:</dt><dd>Central</dd></dl>");
        let record = Strategy::DefinitionList.extract(&html);
        assert_eq!(record.get("caseOfficer"), Some(&Some("Euan Crombie".to_string())));
        assert_eq!(record.get("ward"), Some(&Some("Central".to_string())));
    }

    #[test]
    fn header_data_pair_omits_placeholder() {
        let html = doc("<table><tr><th>Case Officer:</th><td>-</td></tr></table>");
        assert!(Strategy::HeaderDataPair.extract(&html).is_empty());

        let html = doc("<table><tr><th>Case Officer:</th><td>Euan Crombie</td></tr></table>");
        let record = Strategy::HeaderDataPair.extract(&html);
        assert_eq!(record.get("caseOfficer"), Some(&Some("Euan Crombie".to_string())));
    }

    #[test]
    fn header_data_pair_ignores_wide_rows() {
        let html = doc("<table><tr><th>A</th><th>B</th></tr><tr><td>1</td><td>2</td></tr></table>");
        assert!(Strategy::HeaderDataPair.extract(&html).is_empty());
    }

    #[test]
    fn chain_falls_back_in_order() {
        let html = doc("<table><tr><th>Ward</th><td>North</td></tr></table><dl><dt>Ward</dt><dd>South</dd></dl>");
        let chain = [Strategy::SpanInCell, Strategy::DefinitionList, Strategy::HeaderDataPair];
        let record = extract_record(&html, &chain);
        assert_eq!(record.len(), 1);
        assert_eq!(record.get("ward"), Some(&Some("South".to_string())));
    }

    #[test]
    fn later_duplicate_label_wins() {
        let html = doc("<dl><dt>Status</dt><dd>Pending</dd><dt>Status:</dt><dd>Decided</dd></dl>");
        let record = Strategy::DefinitionList.extract(&html);
        assert_eq!(record.get("status"), Some(&Some("Decided".to_string())));
    }

    #[test]
    fn no_markup_yields_empty_record() {
        let html = doc("<p>Nothing here</p>");
        let chain = [Strategy::SpanInCell, Strategy::DefinitionList, Strategy::HeaderDataPair];
        assert!(extract_record(&html, &chain).is_empty());
    }
}
