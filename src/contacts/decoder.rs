//! Tabular decoders: file bytes to string-keyed rows.
//!
//! The ingestor only sees `Row`s, so any decoder can feed a campaign.
//! CSV, Excel workbooks (first sheet) and JSON row arrays ship here.
//! Headers are trimmed and lower-cased; two headers that collide after
//! that are rejected.
//!
//! CHANGELOG:
//! - 10/18/2026 - CSV on the csv crate (quoted newlines, strict UTF-8); xlsx/xls via calamine
//! - 10/18/2026 - Initial CSV and JSON-rows decoders

use crate::errors::ValidationError;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use serde_json::Value;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;

/// One decoded data row, keyed by header.
pub type Row = HashMap<String, String>;

/// Turns a file's bytes into data rows (header excluded).
pub trait TabularDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<Vec<Row>, ValidationError>;
}

/// Pick a decoder from the file extension.
pub fn decoder_for_path(path: &Path) -> anyhow::Result<Box<dyn TabularDecoder>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "csv" => Ok(Box::new(CsvDecoder)),
        "json" => Ok(Box::new(JsonRowsDecoder)),
        "xlsx" | "xls" => Ok(Box::new(XlsxDecoder)),
        other => Err(anyhow::anyhow!(
            "Invalid file extension: .{}. Please use .csv, .xlsx, .xls or .json files.",
            other
        )),
    }
}

/// Trim and lower-case header cells, rejecting duplicates.
fn normalize_headers<I, S>(cells: I) -> Result<Vec<String>, ValidationError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut headers: Vec<String> = Vec::new();
    for cell in cells {
        let header = cell.as_ref().trim().to_lowercase();
        if !header.is_empty() && headers.contains(&header) {
            return Err(ValidationError::MalformedRow {
                row: 1,
                reason: format!("duplicate column '{}'", header),
            });
        }
        headers.push(header);
    }
    Ok(headers)
}

// ============================================================================
// CSV
// ============================================================================

/// Comma-separated values with a header line.
///
/// Quoted fields may hold commas and line breaks. Fields are trimmed and
/// blank lines ignored. Input must be UTF-8; a leading BOM is dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct CsvDecoder;

impl TabularDecoder for CsvDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Vec<Row>, ValidationError> {
        let bytes = bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(bytes);
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(false)
            .from_reader(bytes);

        let headers = normalize_headers(reader.headers().map_err(|e| csv_error(e, 1))?)?;

        let mut rows = Vec::new();
        for (i, record) in reader.records().enumerate() {
            // +2: header counts as row 1
            let record = record.map_err(|e| csv_error(e, i + 2))?;
            rows.push(
                headers
                    .iter()
                    .cloned()
                    .zip(record.iter().map(str::to_string))
                    .collect(),
            );
        }

        if rows.is_empty() {
            return Err(ValidationError::EmptyInput);
        }
        Ok(rows)
    }
}

/// Map a csv error to the line it starts on, or `fallback_row` when the
/// reader has no position for it.
fn csv_error(error: csv::Error, fallback_row: usize) -> ValidationError {
    let row = error
        .position()
        .map(|pos| pos.line() as usize)
        .unwrap_or(fallback_row);
    let reason = match error.kind() {
        csv::ErrorKind::UnequalLengths {
            expected_len, len, ..
        } => format!("expected {} columns, found {}", expected_len, len),
        csv::ErrorKind::Utf8 { err, .. } => {
            format!("invalid UTF-8 in column {}", err.field() + 1)
        }
        _ => error.to_string(),
    };
    ValidationError::MalformedRow { row, reason }
}

// ============================================================================
// Spreadsheets
// ============================================================================

/// First worksheet of an .xlsx/.xls workbook; row 1 holds the headers.
///
/// Cells are stringified as displayed (`15551234567` for a numeric phone).
/// Empty cells are left out of the row and fully empty rows are skipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct XlsxDecoder;

impl TabularDecoder for XlsxDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Vec<Row>, ValidationError> {
        let unreadable = |reason: String| ValidationError::MalformedRow { row: 1, reason };

        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
            .map_err(|e| unreadable(format!("unreadable workbook: {}", e)))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| unreadable("workbook has no sheets".to_string()))?
            .map_err(|e| unreadable(format!("unreadable sheet: {}", e)))?;

        let mut sheet_rows = range.rows();
        let Some(header_cells) = sheet_rows.next() else {
            return Err(ValidationError::EmptyInput);
        };
        let headers = normalize_headers(header_cells.iter().map(Data::to_string))?;

        let rows: Vec<Row> = sheet_rows
            .map(|cells| {
                headers
                    .iter()
                    .zip(cells)
                    .filter(|(header, cell)| !header.is_empty() && !matches!(cell, Data::Empty))
                    .map(|(header, cell)| (header.clone(), cell.to_string().trim().to_string()))
                    .filter(|(_, value)| !value.is_empty())
                    .collect::<Row>()
            })
            .filter(|row| !row.is_empty())
            .collect();

        if rows.is_empty() {
            return Err(ValidationError::EmptyInput);
        }
        Ok(rows)
    }
}

// ============================================================================
// JSON
// ============================================================================

/// A JSON array of flat objects, e.g. an exported sheet.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonRowsDecoder;

impl TabularDecoder for JsonRowsDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Vec<Row>, ValidationError> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| ValidationError::MalformedRow {
                row: e.line(),
                reason: e.to_string(),
            })?;
        rows_from_json(value)
    }
}

/// Rows from an already-parsed JSON array of flat objects.
pub fn rows_from_json(value: Value) -> Result<Vec<Row>, ValidationError> {
    let Value::Array(items) = value else {
        return Err(ValidationError::MalformedRow {
            row: 1,
            reason: "expected a JSON array of row objects".to_string(),
        });
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(map) => Ok(map
                .into_iter()
                .filter_map(|(k, v)| cell_to_string(v).map(|s| (k, s)))
                .collect()),
            // +2: header counts as row 1
            _ => Err(ValidationError::MalformedRow {
                row: i + 2,
                reason: "row is not an object".to_string(),
            }),
        })
        .collect()
}

fn cell_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_basic() {
        let csv = "Phone,Name,Message,City\n+15551234567,Ann,Hi {{name}} from {{city}},Rome\n";
        let rows = CsvDecoder.decode(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["phone"], "+15551234567");
        assert_eq!(rows[0]["city"], "Rome");
    }

    #[test]
    fn test_csv_quoted_fields() {
        let csv = "phone,name,message\n+1555,\"Doe, Ann\",\"She said \"\"hi\"\"\"\n";
        let rows = CsvDecoder.decode(csv.as_bytes()).unwrap();
        assert_eq!(rows[0]["name"], "Doe, Ann");
        assert_eq!(rows[0]["message"], "She said \"hi\"");
    }

    #[test]
    fn test_csv_blank_lines_and_crlf() {
        let csv = "phone,name,message\r\n\r\n+1555,Ann,Hi\r\n\r\n";
        let rows = CsvDecoder.decode(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["message"], "Hi");
    }

    #[test]
    fn test_csv_header_only_is_empty_input() {
        let err = CsvDecoder.decode(b"phone,name,message\n").unwrap_err();
        assert_eq!(err, ValidationError::EmptyInput);
    }

    #[test]
    fn test_csv_column_mismatch_is_malformed() {
        let csv = "phone,name,message\n+1555,Ann\n";
        let err = CsvDecoder.decode(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, ValidationError::MalformedRow { row: 2, .. }));
    }

    #[test]
    fn test_csv_quoted_line_breaks() {
        let csv = "phone,name,message\n+1555,Ann,\"Hi {{name}},\nsee you soon\"\n+1556,Bob,Hi\n";
        let rows = CsvDecoder.decode(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["message"], "Hi {{name}},\nsee you soon");
        assert_eq!(rows[1]["name"], "Bob");
    }

    #[test]
    fn test_csv_rejects_invalid_utf8() {
        let err = CsvDecoder
            .decode(b"phone,name,message\n+1555,Ren\xe9e,Hi\n")
            .unwrap_err();
        match err {
            ValidationError::MalformedRow { row, reason } => {
                assert_eq!(row, 2);
                assert!(reason.contains("UTF-8"), "{}", reason);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_csv_bom_and_duplicate_headers() {
        let rows = CsvDecoder
            .decode("\u{feff}Phone,Name,Message\n+1555,Ann,Hi\n".as_bytes())
            .unwrap();
        assert_eq!(rows[0]["phone"], "+1555");

        let err = CsvDecoder
            .decode(b"Phone,name, phone ,message\n+1555,Ann,+1556,Hi\n")
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::MalformedRow {
                row: 1,
                reason: "duplicate column 'phone'".to_string()
            }
        );
    }

    const XLSX_FIXTURE: &[u8] =
        include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/contacts.xlsx"));

    #[test]
    fn test_xlsx_first_sheet() {
        let rows = XlsxDecoder.decode(XLSX_FIXTURE).unwrap();
        // Row 3 of the sheet is empty and skipped
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["phone"], "15551234567");
        assert_eq!(rows[0]["name"], "Ann");
        assert_eq!(rows[0]["message"], "Hi {{name}} from {{city}}");
        assert_eq!(rows[0]["city"], "Rome");
        assert_eq!(rows[1]["phone"], "+15557654321");
        assert!(!rows[1].contains_key("city"));
    }

    #[test]
    fn test_xlsx_garbage_is_malformed() {
        let err = XlsxDecoder.decode(b"phone,name\n").unwrap_err();
        assert!(matches!(err, ValidationError::MalformedRow { row: 1, .. }));
    }

    #[test]
    fn test_json_rows() {
        let json = r#"[{"phone": 15551234567, "name": "Ann", "message": "Hi", "vip": true, "note": null}]"#;
        let rows = JsonRowsDecoder.decode(json.as_bytes()).unwrap();
        assert_eq!(rows[0]["phone"], "15551234567");
        assert_eq!(rows[0]["vip"], "true");
        assert!(!rows[0].contains_key("note"));
    }

    #[test]
    fn test_json_non_object_row() {
        let err = JsonRowsDecoder.decode(br#"[{"phone":"1"}, 3]"#).unwrap_err();
        assert!(matches!(err, ValidationError::MalformedRow { row: 3, .. }));
    }

    #[test]
    fn test_decoder_for_path() {
        assert!(decoder_for_path(Path::new("list.CSV")).is_ok());
        assert!(decoder_for_path(Path::new("list.json")).is_ok());
        assert!(decoder_for_path(Path::new("list.xlsx")).is_ok());
        assert!(decoder_for_path(Path::new("list.XLS")).is_ok());
        let err = decoder_for_path(Path::new("list.txt")).err().unwrap();
        assert!(err.to_string().contains("Invalid file extension: .txt"));
    }
}
