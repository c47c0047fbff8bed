//! # Meta2 - legal-process task analysis
//!
//! Meta2 reads a spreadsheet of legal-process records (`.csv` or `.xlsx`),
//! flags the processes whose case year precedes a cutoff year ("Meta2"), and
//! summarizes them per task name.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  CSV / XLSX │────▶│   Parser    │────▶│  Validation │────▶│  Classify   │
//! │  (any enc.) │     │ (enc + sep) │     │ (required)  │     │  (Meta2)    │
//! └─────────────┘     └─────────────┘     └─────────────┘     └──────┬──────┘
//!                                                                    ▼
//!                                         ┌─────────────┐     ┌─────────────┐
//!                                         │  Summary    │◀────│  Selection  │
//!                                         │ (per task)  │     │ (filters)   │
//!                                         └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use meta2::{analyze_file, AnalysisOptions, RawFile};
//!
//! let file = RawFile::from_path("processos.csv")?;
//! let result = analyze_file(&file, &AnalysisOptions::default())?;
//! println!("{} Meta2 processes", result.meta2_count());
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types per layer
//! - [`models`] - Files, tables, classified records, summary rows
//! - [`parser`] - Encoding detection, delimiter sniffing, CSV/XLSX reading
//! - [`validation`] - Required columns and values
//! - [`transform`] - Classification, selection, aggregation, pipeline
//! - [`config`] - Environment-driven settings
//! - [`api`] - HTTP API server and log streaming

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Validation
pub mod validation;

// Classification and aggregation
pub mod transform;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Errors
// =============================================================================

pub use error::{OptionsError, PipelineError, ReadError, RowParseError, SchemaError, ServerError};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    AggregateRow, ClassifiedRecord, FileFormat, RawFile, Record, Table, ValidatedTable,
    META2_COLUMN, PROCESS_NUMBER_COLUMN, REQUIRED_COLUMNS, TASK_NAME_COLUMN,
};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{
    decode_content, detect_delimiter, detect_encoding, read_file, read_table, sniff, Delimiter,
    ParseResult, ReadOptions,
};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::validate_table;

// =============================================================================
// Re-exports - Classification & pipeline
// =============================================================================

pub use transform::{aggregate, classify_table, is_meta2, parse_case_year, select, task_names, Selection};

pub use transform::pipeline::{
    analyze_bytes, analyze_file, analyze_loaded, load_file, AnalysisOptions, AnalysisResult,
    AnalysisStatus, FileInfo, LoadedTable,
};

// =============================================================================
// Re-exports - Config
// =============================================================================

pub use config::Settings;

// Server
pub mod server {
    pub use crate::api::server::{router, start_server};
}
