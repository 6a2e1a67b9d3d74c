//! Header-driven extraction of the registry's data tables.
//!
//! The registry renders every data table with the same `tableBlock` markup
//! but the column set varies by listing type. Extraction is two-phase: the
//! header row is resolved against a header-text to field-name mapping once,
//! building an immutable column map, and that map is then applied to every
//! body row.

use std::collections::{HashMap, HashSet};

use scraper::{ElementRef, Selector};

use crate::normalize::normalize_text;
use crate::{Error, Result};

/// Header text to field name. Many-to-one is fine; the registry renames
/// columns across listing types.
pub type HeaderMapping = [(&'static str, &'static str)];

pub(crate) fn create_selector(sel_str: &str) -> Result<Selector> {
    Selector::parse(sel_str).map_err(|_| Error::InvalidSelector(sel_str.into()))
}

/// Column positions resolved from a table's first header group.
#[derive(Debug, Default)]
struct ColumnMap {
    fields: HashMap<usize, &'static str>,
    excluded: HashSet<usize>,
}

impl ColumnMap {
    fn from_header_cells<'a>(
        cells: impl Iterator<Item = ElementRef<'a>>,
        mapping: &HeaderMapping,
        url: &str,
    ) -> Self {
        let mut map = Self::default();
        for (idx, cell) in cells.enumerate() {
            // Unlike body cells, a header resolves from its first text node
            // only; footnote marks and other trailing markup are not part
            // of the header text.
            let text = cell.text().next().map(str::trim).unwrap_or_default();
            match mapping.iter().find(|entry| entry.0 == text) {
                Some(entry) => {
                    map.fields.insert(idx, entry.1);
                }
                None => {
                    map.excluded.insert(idx);
                    if !text.is_empty() {
                        tracing::warn!(column = %text, %url, "column mapping not found");
                    }
                }
            }
        }
        map
    }

    fn field(&self, idx: usize) -> Option<&'static str> {
        self.fields.get(&idx).copied()
    }

    fn is_excluded(&self, idx: usize) -> bool {
        self.excluded.contains(&idx)
    }
}

/// Extracts one flat record per body row of `table`.
///
/// Header cells resolve against the mapping by their first text node,
/// trimmed. Body cells at mapped column indices land in the record under the
/// mapped field name, with all descendant text joined and normalized. Row
/// iteration stops quietly at a nested `table` where a row was expected,
/// which guards against the registry's occasionally mis-nested markup.
/// `None` yields an empty vector.
pub fn extract_table(
    table: Option<ElementRef<'_>>,
    mapping: &HeaderMapping,
    url: &str,
) -> Result<Vec<HashMap<&'static str, String>>> {
    let Some(table) = table else {
        return Ok(Vec::new());
    };

    let thead = create_selector("thead")?;
    let header_cells = create_selector("th, td")?;
    let body = create_selector("tbody.tableBlock__body")?;
    let rows = create_selector("tr.tableBlock__row, table")?;
    let cells = create_selector("td.tableBlock__col")?;

    // First header group wins when the table repeats its thead.
    let columns = match table.select(&thead).next() {
        Some(head) => ColumnMap::from_header_cells(head.select(&header_cells), mapping, url),
        None => ColumnMap::default(),
    };

    let mut records = Vec::new();
    let Some(body) = table.select(&body).next() else {
        return Ok(records);
    };
    for row in body.select(&rows) {
        if row.value().name() == "table" {
            break;
        }
        let mut record = HashMap::new();
        for (idx, cell) in row.select(&cells).enumerate() {
            match columns.field(idx) {
                Some(field) => {
                    let text = cell.text().collect::<Vec<_>>().join(" ");
                    record.insert(field, normalize_text(&text));
                }
                None => {
                    if !columns.is_excluded(idx) {
                        tracing::debug!(idx, %url, "column name for index not found");
                    }
                }
            }
        }
        records.push(record);
    }
    Ok(records)
}
