//! CSV parsing for spreadsheet exports.

use csv::{ReaderBuilder, Trim};
use tracing::{debug, warn};

/// One parsed row. Rows carry no fixed arity.
pub type SheetRow = Vec<String>;

const BYTE_ORDER_MARK: char = '\u{feff}';

/// Parse exported CSV text into rows of trimmed cells.
///
/// Empty lines never become rows and ragged rows are kept as-is. Blank input
/// yields no rows. A record the reader cannot decode is skipped with a warning.
pub fn parse_csv_rows(text: &str) -> Vec<SheetRow> {
    let text = text.strip_prefix(BYTE_ORDER_MARK).unwrap_or(text);
    if text.is_empty() {
        return Vec::new();
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        match record {
            Ok(record) => {
                if record.len() == 1 && record[0].is_empty() {
                    continue;
                }
                rows.push(record.iter().map(str::to_string).collect());
            }
            Err(e) => {
                warn!(record_index = index, error = %e, "csv_record_skipped");
            }
        }
    }

    debug!(rows = rows.len(), "csv_parsed");
    rows
}
