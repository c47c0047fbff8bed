//! File ingestion: encoding detection, delimiter inference and table reading.
//!
//! ```text
//! .csv  → detect_encoding → sniff → decode_content → read_text ─┐
//! .xlsx → read_workbook ────────────────────────────────────────┴→ Table
//! ```
//!
//! # Example
//! ```ignore
//! use meta2::parser::{read_file, ReadOptions};
//! use meta2::RawFile;
//!
//! let file = RawFile::new("tarefas.csv", "numeroProcesso;nomeTarefa\n1-2019.8;Triagem");
//! let parsed = read_file(&file, &ReadOptions::default())?;
//! assert_eq!(parsed.delimiter.as_deref(), Some(";"));
//! assert_eq!(parsed.table.records.len(), 1);
//! ```

pub mod delimiter;
pub mod encoding;
pub mod reader;
pub mod spreadsheet;

use serde::Serialize;

pub use delimiter::{detect_delimiter, parse_candidates, sniff, Delimiter, CANDIDATES, DEFAULT_DELIMITER};
pub use encoding::{decode_content, decode_sample, detect_encoding, DEFAULT_ENCODING, SAMPLE_SIZE};
pub use reader::{read_text, DEFAULT_QUOTE};
pub use spreadsheet::read_workbook;

use crate::error::{OptionsError, ReadResult};
use crate::models::{FileFormat, RawFile, Table};

/// Delimiter and quoting configuration for text files.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadOptions {
    /// User-chosen delimiter; `None` means sniff it.
    pub delimiter: Option<Delimiter>,
    pub quote: char,
}

impl ReadOptions {
    /// Build options from the raw configuration values.
    pub fn new(delimiter_candidates: Option<&str>, quote: char) -> Result<Self, OptionsError> {
        if !quote.is_ascii() || quote.is_ascii_control() {
            return Err(OptionsError::InvalidQuoteChar(quote.to_string()));
        }

        let delimiter = delimiter_candidates
            .map(Delimiter::from_candidates)
            .transpose()?;

        Ok(Self { delimiter, quote })
    }
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            quote: DEFAULT_QUOTE,
        }
    }
}

/// A parsed table with what was detected along the way.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseResult {
    pub table: Table,
    pub format: FileFormat,
    /// Encoding used for text files.
    pub encoding: Option<String>,
    /// Delimiter used for text files.
    pub delimiter: Option<String>,
}

/// Read a file into a [`Table`], choosing the reader by extension.
pub fn read_file(file: &RawFile, options: &ReadOptions) -> ReadResult<ParseResult> {
    match file.format()? {
        FileFormat::Xlsx => Ok(ParseResult {
            table: read_workbook(&file.bytes)?,
            format: FileFormat::Xlsx,
            encoding: None,
            delimiter: None,
        }),
        FileFormat::Csv => {
            let encoding = detect_encoding(&file.bytes);
            let delimiter = match &options.delimiter {
                Some(delimiter) => delimiter.clone(),
                // Candidates are not involved, so sniffing cannot fail.
                None => sniff(&file.bytes, &encoding, None).unwrap_or(Delimiter::Single(DEFAULT_DELIMITER)),
            };
            let table = read_table(&file.bytes, &encoding, &delimiter, options.quote)?;

            Ok(ParseResult {
                table,
                format: FileFormat::Csv,
                encoding: Some(encoding),
                delimiter: Some(delimiter.to_string()),
            })
        }
    }
}

/// Decode `bytes` in `encoding` and parse them with the given delimiter and quote.
pub fn read_table(bytes: &[u8], encoding: &str, delimiter: &Delimiter, quote: char) -> ReadResult<Table> {
    let content = decode_content(bytes, encoding)?;
    read_text(&content, delimiter, quote)
}
