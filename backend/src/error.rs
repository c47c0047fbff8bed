//! Error types for the Meta2 analysis pipeline.
//!
//! - [`ReadError`] - file-level read failures (format, decoding, parsing)
//! - [`RowParseError`] - a single unparseable row, absorbed by the reader
//! - [`SchemaError`] - a required column is missing
//! - [`OptionsError`] - invalid analysis configuration
//! - [`PipelineError`] - top-level orchestration errors
//! - [`ServerError`] - HTTP layer errors
//!
//! Every message is written for direct display to an end user.

use serde::Serialize;
use thiserror::Error;

// =============================================================================
// Read Errors
// =============================================================================

/// Errors while turning a raw file into a table.
#[derive(Debug, Error)]
pub enum ReadError {
    /// File extension is neither `.csv` nor `.xlsx`.
    #[error("Unsupported file format '{0}'. Use .csv or .xlsx")]
    UnsupportedFormat(String),

    /// Bytes cannot be interpreted under any attempted encoding.
    #[error("Cannot decode file: {0}")]
    Decode(String),

    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// The delimited text could not be parsed at all.
    #[error("Invalid CSV format: {0}")]
    Csv(String),

    /// The workbook could not be opened or has no worksheet.
    #[error("Invalid spreadsheet: {0}")]
    Spreadsheet(String),

    /// Empty file.
    #[error("File is empty")]
    Empty,

    /// No headers found.
    #[error("No header row found")]
    NoHeaders,
}

/// A row the reader could not parse. Never escalated; the row is dropped and
/// reported alongside the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(rename_all = "camelCase")]
#[error("Line {line}: {reason}")]
pub struct RowParseError {
    pub line: u64,
    pub reason: String,
}

impl RowParseError {
    pub fn new(line: u64, reason: impl Into<String>) -> Self {
        Self {
            line,
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Schema Errors
// =============================================================================

/// Errors during schema validation.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A required column is absent from the header.
    #[error("The column '{0}' is required in the file")]
    MissingColumn(String),

    /// The generated row schema could not be compiled.
    #[error("Invalid row schema: {0}")]
    InvalidSchema(String),
}

// =============================================================================
// Options Errors
// =============================================================================

/// Invalid analysis configuration.
#[derive(Debug, Error, PartialEq)]
pub enum OptionsError {
    #[error("Cutoff year {0} is out of range (1900-2100)")]
    CutoffYearOutOfRange(i64),

    #[error("Quote character must be a single ASCII character, got '{0}'")]
    InvalidQuoteChar(String),

    #[error("Delimiter candidates cannot be empty")]
    EmptyDelimiterSet,

    #[error("Delimiter '{0}' must be a single ASCII character")]
    InvalidDelimiter(char),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline errors. Any of these aborts the invocation.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Error reading the file: {0}")]
    Read(#[from] ReadError),

    #[error("{0}")]
    Schema(#[from] SchemaError),

    #[error("Invalid options: {0}")]
    Options(#[from] OptionsError),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("{0}")]
    Pipeline(#[from] PipelineError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Server internal error.
    #[error("Internal server error")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for read operations.
pub type ReadResult<T> = Result<T, ReadError>;

/// Result type for schema validation.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        let read_err = ReadError::UnsupportedFormat("txt".into());
        let pipeline_err: PipelineError = read_err.into();
        assert!(pipeline_err.to_string().contains(".csv or .xlsx"));

        let schema_err = SchemaError::MissingColumn("nomeTarefa".into());
        let pipeline_err: PipelineError = schema_err.into();
        assert!(pipeline_err.to_string().contains("'nomeTarefa'"));
    }

    #[test]
    fn test_row_parse_error_format() {
        let err = RowParseError::new(7, "expected 2 fields, found 3");
        assert_eq!(err.to_string(), "Line 7: expected 2 fields, found 3");
    }

    #[test]
    fn test_internal_error_hides_details() {
        let err = ServerError::Internal("task join failed: panicked".into());
        assert_eq!(err.to_string(), "Internal server error");
    }
}
