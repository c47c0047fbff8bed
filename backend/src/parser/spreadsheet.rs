//! Spreadsheet (`.xlsx`) reader.
//!
//! The first worksheet is read; its first row is the header. No encoding or
//! delimiter detection is involved.

use calamine::{Data, Reader, Xlsx};
use serde_json::{json, Number, Value};
use std::io::Cursor;

use super::reader::normalize_headers;
use crate::error::{ReadError, ReadResult};
use crate::models::{Record, Table};

/// Parse workbook bytes into a [`Table`].
pub fn read_workbook(bytes: &[u8]) -> ReadResult<Table> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))
        .map_err(|e| ReadError::Spreadsheet(format!("cannot open workbook: {}", e)))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ReadError::Spreadsheet("no worksheet found".to_string()))?
        .map_err(|e| ReadError::Spreadsheet(format!("cannot read worksheet: {}", e)))?;

    let mut rows = range.rows();
    let header_row = rows.next().ok_or(ReadError::Empty)?;
    let headers = normalize_headers(header_row.iter().map(header_text).collect())?;

    let records: Vec<Record> = rows
        .filter(|row| !row.iter().all(|c| matches!(c, Data::Empty)))
        .map(|row| {
            headers
                .iter()
                .enumerate()
                .map(|(i, header)| (header.clone(), row.get(i).map(cell_value).unwrap_or(Value::Null)))
                .collect()
        })
        .collect();

    Ok(Table {
        headers,
        records,
        skipped: Vec::new(),
    })
}

fn header_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Map a cell to a JSON value. Whole floats become integers so that numeric
/// codes read back the way they were typed.
fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty | Data::Error(_) => Value::Null,
        Data::String(s) => match s.trim() {
            "" => Value::Null,
            text => json!(text),
        },
        Data::Int(i) => json!(i),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => json!(*f as i64),
        Data::Float(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
        Data::Bool(b) => json!(b),
        other => json!(other.to_string()),
    }
}
