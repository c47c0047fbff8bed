//! Domain models for the Meta2 analysis pipeline.
//!
//! - [`RawFile`] - uploaded bytes plus their declared file name
//! - [`FileFormat`] - delimited text or spreadsheet, chosen by extension
//! - [`Table`] - header + parsed rows, as produced by the reader
//! - [`ValidatedTable`] - rows guaranteed to carry the required columns
//! - [`ClassifiedRecord`] - a validated row with its Meta2 flag
//! - [`AggregateRow`] - count and percentage for one task name

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

use crate::error::{ReadError, ReadResult, RowParseError};

/// Column holding the process number (`<seq>-<year>.<court>...`).
pub const PROCESS_NUMBER_COLUMN: &str = "numeroProcesso";

/// Column holding the task name.
pub const TASK_NAME_COLUMN: &str = "nomeTarefa";

/// Columns every input file must provide.
pub const REQUIRED_COLUMNS: [&str; 2] = [PROCESS_NUMBER_COLUMN, TASK_NAME_COLUMN];

/// Column holding the computed flag in classified output.
pub const META2_COLUMN: &str = "Meta2";

/// One parsed row: column name to raw value (string, number or null).
pub type Record = Map<String, Value>;

// =============================================================================
// Raw input
// =============================================================================

/// Supported input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    /// Delimited text (`.csv`).
    Csv,
    /// Spreadsheet workbook (`.xlsx`).
    Xlsx,
}

impl FileFormat {
    /// Pick the format from a file name's extension (case-insensitive).
    pub fn from_name(name: &str) -> ReadResult<Self> {
        let extension = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "csv" => Ok(FileFormat::Csv),
            "xlsx" => Ok(FileFormat::Xlsx),
            _ => Err(ReadError::UnsupportedFormat(if extension.is_empty() {
                name.to_string()
            } else {
                extension
            })),
        }
    }
}

/// An uploaded file. Stages only ever borrow its bytes.
#[derive(Debug, Clone)]
pub struct RawFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl RawFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, keeping its file name for format selection.
    pub fn from_path<P: AsRef<Path>>(path: P) -> ReadResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(Self { name, bytes })
    }

    pub fn format(&self) -> ReadResult<FileFormat> {
        FileFormat::from_name(&self.name)
    }
}

// =============================================================================
// Tables
// =============================================================================

/// Output of the reader: header row plus every row that parsed.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub headers: Vec<String>,
    pub records: Vec<Record>,
    /// Rows dropped because they could not be parsed.
    pub skipped: Vec<RowParseError>,
}

/// Rows that passed schema validation.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedTable {
    pub headers: Vec<String>,
    pub records: Vec<Record>,
    /// Rows dropped because a required value was null.
    pub dropped: usize,
}

// =============================================================================
// Classification & aggregation
// =============================================================================

/// A validated row augmented with its Meta2 flag.
///
/// Serializes as the input columns plus a `Meta2` column. `fields` never
/// holds a `Meta2` key of its own.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedRecord {
    #[serde(flatten)]
    pub fields: Record,
    #[serde(rename = "Meta2")]
    pub is_meta2: bool,
}

impl ClassifiedRecord {
    /// Value of a column rendered as text; `None` when null or absent.
    pub fn text(&self, column: &str) -> Option<String> {
        value_as_text(self.fields.get(column)?)
    }

    pub fn process_number(&self) -> Option<String> {
        self.text(PROCESS_NUMBER_COLUMN)
    }

    pub fn task_name(&self) -> Option<String> {
        self.text(TASK_NAME_COLUMN)
    }
}

/// One line of the frequency table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateRow {
    pub task_name: String,
    pub count: usize,
    pub percentage: f64,
}

/// Render a cell as text. Strings are returned as-is, numbers and booleans
/// via their JSON form; null yields `None`.
pub fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
