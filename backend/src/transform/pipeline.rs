//! High-level pipeline API: file in, classified records and task summary out.
//!
//! ```text
//! RawFile ─▶ read_file ─▶ validate_table ─▶ classify_table ─▶ select ─▶ aggregate
//!            (parser)     (validation)      (classify)        (filter)   (aggregate)
//! ```
//!
//! [`load_file`] stops after validation so the same [`LoadedTable`] can be
//! classified again with another cutoff year without re-reading the file.
//!
//! # Example
//!
//! ```rust,ignore
//! use meta2::{analyze_file, AnalysisOptions, RawFile};
//!
//! let file = RawFile::from_path("tarefas.csv")?;
//! let result = analyze_file(&file, &AnalysisOptions::default())?;
//! for row in &result.summary {
//!     println!("{}: {} ({}%)", row.task_name, row.count, row.percentage);
//! }
//! ```

use serde::{Deserialize, Serialize};

use super::aggregate::aggregate;
use super::classify::{classify_table, CUTOFF_YEAR_RANGE, DEFAULT_CUTOFF_YEAR};
use super::filter::{meta2_scope, select, task_names, Selection};
use crate::api::logs::{log_info, log_success, log_warning};
use crate::error::{OptionsError, PipelineResult, RowParseError};
use crate::models::{
    AggregateRow, ClassifiedRecord, FileFormat, RawFile, ValidatedTable, REQUIRED_COLUMNS,
    TASK_NAME_COLUMN,
};
use crate::parser::{read_file, ReadOptions, DEFAULT_QUOTE};
use crate::validation::validate_table;

/// Skipped rows whose reasons are logged individually.
const LOGGED_SKIPS: usize = 3;

/// Options for one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisOptions {
    /// Process years strictly before this are Meta2.
    pub cutoff_year: i64,
    /// Candidate delimiters (`\t` for tab); `None` means sniff.
    pub delimiter_candidates: Option<String>,
    pub quote_char: char,
    #[serde(flatten)]
    pub selection: Selection,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            cutoff_year: DEFAULT_CUTOFF_YEAR,
            delimiter_candidates: None,
            quote_char: DEFAULT_QUOTE,
            selection: Selection::default(),
        }
    }
}

impl AnalysisOptions {
    /// Check ranges and build the reader configuration.
    pub fn read_options(&self) -> Result<ReadOptions, OptionsError> {
        check_cutoff_year(self.cutoff_year)?;
        ReadOptions::new(self.delimiter_candidates.as_deref(), self.quote_char)
    }
}

/// Reject cutoff years outside 1900..=2100.
pub fn check_cutoff_year(cutoff_year: i64) -> Result<(), OptionsError> {
    if CUTOFF_YEAR_RANGE.contains(&cutoff_year) {
        Ok(())
    } else {
        Err(OptionsError::CutoffYearOutOfRange(cutoff_year))
    }
}

/// What was read from the file.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub name: String,
    pub format: FileFormat,
    pub encoding: Option<String>,
    pub delimiter: Option<String>,
    pub headers: Vec<String>,
    /// Rows parsed from the file.
    pub row_count: usize,
    /// Rows that could not be parsed.
    pub skipped_rows: Vec<RowParseError>,
    /// Parsed rows dropped for missing required values.
    pub dropped_rows: usize,
}

/// A validated table plus its file metadata; reusable across cutoff years.
#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub info: FileInfo,
    pub table: ValidatedTable,
}

/// Whether the working set has anything to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Ready,
    /// Nothing left after filtering. Informational, not a failure.
    Empty,
}

/// Result of a complete analysis.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub file_info: FileInfo,
    pub cutoff_year: i64,
    /// Every validated record with its Meta2 flag.
    pub records: Vec<ClassifiedRecord>,
    /// Records remaining after selection.
    pub working_set: Vec<ClassifiedRecord>,
    /// Task names available for selection.
    pub task_names: Vec<String>,
    pub summary: Vec<AggregateRow>,
    pub status: AnalysisStatus,
}

impl AnalysisResult {
    pub fn meta2_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_meta2).count()
    }
}

/// Read and validate a file.
///
/// Fails on unsupported formats, unreadable files and missing required
/// columns. Malformed rows and rows with missing values are absorbed.
pub fn load_file(file: &RawFile, options: &ReadOptions) -> PipelineResult<LoadedTable> {
    log_info(format!("📖 Reading {} ({} bytes)...", file.name, file.bytes.len()));
    let parsed = read_file(file, options)?;

    if let Some(encoding) = &parsed.encoding {
        log_success(format!("Detected encoding: {}", encoding));
    }
    if let Some(delimiter) = &parsed.delimiter {
        log_success(format!("Delimiter: '{}'", delimiter));
    }
    log_success(format!("Read {} rows", parsed.table.records.len()));
    print_skipped(&parsed.table.skipped);

    log_info("✔️  Checking required columns...");
    let table = validate_table(&parsed.table, &REQUIRED_COLUMNS)?;
    log_success(format!("{} valid rows", table.records.len()));

    let info = FileInfo {
        name: file.name.clone(),
        format: parsed.format,
        encoding: parsed.encoding,
        delimiter: parsed.delimiter,
        headers: parsed.table.headers,
        row_count: parsed.table.records.len(),
        skipped_rows: parsed.table.skipped,
        dropped_rows: table.dropped,
    };

    Ok(LoadedTable { info, table })
}

/// Classify, select and aggregate an already loaded table.
pub fn analyze_loaded(loaded: &LoadedTable, cutoff_year: i64, selection: &Selection) -> PipelineResult<AnalysisResult> {
    check_cutoff_year(cutoff_year)?;

    log_info(format!("🏷️  Classifying with cutoff year {}...", cutoff_year));
    let records = classify_table(&loaded.table, cutoff_year);
    let meta2 = records.iter().filter(|r| r.is_meta2).count();
    log_success(format!("{} of {} records are Meta2", meta2, records.len()));

    let task_names = task_names(&meta2_scope(&records, selection.show_only_meta2));
    let working_set = select(&records, selection);
    let summary = aggregate(&working_set, TASK_NAME_COLUMN);

    let status = if working_set.is_empty() {
        log_warning("No records match the current selection");
        AnalysisStatus::Empty
    } else {
        log_success(format!("{} records in {} task(s)", working_set.len(), summary.len()));
        AnalysisStatus::Ready
    };

    Ok(AnalysisResult {
        file_info: loaded.info.clone(),
        cutoff_year,
        records,
        working_set,
        task_names,
        summary,
        status,
    })
}

/// Run the whole pipeline on one file.
pub fn analyze_file(file: &RawFile, options: &AnalysisOptions) -> PipelineResult<AnalysisResult> {
    let read_options = options.read_options()?;
    let loaded = load_file(file, &read_options)?;
    analyze_loaded(&loaded, options.cutoff_year, &options.selection)
}

/// Same as [`analyze_file`] for bytes that are not on disk.
pub fn analyze_bytes(name: &str, bytes: &[u8], options: &AnalysisOptions) -> PipelineResult<AnalysisResult> {
    analyze_file(&RawFile::new(name, bytes), options)
}

fn print_skipped(skipped: &[RowParseError]) {
    if skipped.is_empty() {
        return;
    }
    log_warning(format!("{} malformed row(s) skipped", skipped.len()));
    for row in skipped.iter().take(LOGGED_SKIPS) {
        log_warning(format!("• {}", row));
    }
}
