// crates/tablehub-core/src/core/export.rs
// ============================================================================
// Module: Tablehub CSV Export
// Description: CSV rendering for exported tables.
// Purpose: Turn a full-table row set into a downloadable CSV document.
// Dependencies: crate::core::query
// ============================================================================

//! ## Overview
//! Exports are written as a header row followed by one record per row.
//! Fields are separated by `,` and records by CRLF. A field containing a
//! comma, a double quote, CR, or LF is wrapped in double quotes with embedded
//! quotes doubled. NULL renders as an empty field and blobs as base64.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::query::RowSet;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Content type of CSV exports.
pub const CSV_CONTENT_TYPE: &str = "text/csv";
/// Record separator.
const RECORD_SEPARATOR: &str = "\r\n";

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Renders a row set as a CSV document.
#[must_use]
pub fn render_csv(rows: &RowSet) -> String {
    let mut out = String::new();
    push_record(&mut out, rows.columns.iter().map(String::as_str));
    for row in &rows.rows {
        let fields: Vec<String> = row.0.iter().map(|cell| cell.value.to_text()).collect();
        push_record(&mut out, fields.iter().map(String::as_str));
    }
    out
}

/// Appends one record followed by the record separator.
fn push_record<'a>(out: &mut String, fields: impl Iterator<Item = &'a str>) {
    for (index, field) in fields.enumerate() {
        if index > 0 {
            out.push(',');
        }
        push_field(out, field);
    }
    out.push_str(RECORD_SEPARATOR);
}

/// Appends one field, quoting it when required.
fn push_field(out: &mut String, field: &str) {
    if field.contains([',', '"', '\r', '\n']) {
        out.push('"');
        out.push_str(&field.replace('"', "\"\""));
        out.push('"');
    } else {
        out.push_str(field);
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::render_csv;
    use crate::core::query::Cell;
    use crate::core::query::CellValue;
    use crate::core::query::Row;
    use crate::core::query::RowSet;

    fn cell(name: &str, value: CellValue) -> Cell {
        Cell {
            name: name.to_string(),
            value,
        }
    }

    #[test]
    fn quotes_only_fields_that_need_it() {
        let rows = RowSet {
            table: "t".to_string(),
            tables: vec!["t".to_string()],
            columns: vec!["id".to_string(), "note".to_string()],
            rows: vec![
                Row(vec![
                    cell("id", CellValue::Integer(1)),
                    cell("note", CellValue::Text("plain".to_string())),
                ]),
                Row(vec![
                    cell("id", CellValue::Integer(2)),
                    cell("note", CellValue::Text("say \"hi\", then\nleave".to_string())),
                ]),
                Row(vec![cell("id", CellValue::Null), cell("note", CellValue::Real(1.5))]),
            ],
            row_count: 3,
            total_rows: 3,
        };
        assert_eq!(
            render_csv(&rows),
            "id,note\r\n1,plain\r\n2,\"say \"\"hi\"\", then\nleave\"\r\n,1.5\r\n"
        );
    }

    #[test]
    fn empty_table_still_has_header() {
        let rows = RowSet {
            table: "t".to_string(),
            tables: vec!["t".to_string()],
            columns: vec!["a".to_string(), "b".to_string()],
            rows: Vec::new(),
            row_count: 0,
            total_rows: 0,
        };
        assert_eq!(render_csv(&rows), "a,b\r\n");
    }
}
