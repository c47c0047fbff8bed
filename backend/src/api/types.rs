//! REST API types.
//!
//! The response carries everything the presentation layer renders: the
//! classified table, the task summary (table and pie chart) and the task
//! names offered for selection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::RowParseError;
use crate::models::{AggregateRow, ClassifiedRecord, FileFormat};
use crate::transform::pipeline::{AnalysisResult, AnalysisStatus};

/// Response sent after a file has been analyzed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    /// Unique identifier of this analysis
    pub analysis_id: String,

    /// "ready", or "empty" when nothing matches the selection
    pub status: AnalysisStatus,

    pub generated_at: DateTime<Utc>,

    pub cutoff_year: i64,

    pub file: FileMetadata,

    /// Working set, one object per row with a `Meta2` column
    pub records: Vec<ClassifiedRecord>,

    /// Count and percentage per task name
    pub summary: Vec<AggregateRow>,

    /// Task names available for selection
    pub task_names: Vec<String>,

    pub totals: Totals,
}

/// Metadata about the uploaded file
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub name: String,
    pub format: FileFormat,
    pub encoding: Option<String>,
    pub delimiter: Option<String>,
    pub columns: Vec<String>,
    pub row_count: usize,
    pub skipped_rows: Vec<RowParseError>,
    pub dropped_rows: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub records: usize,
    pub meta2: usize,
    pub selected: usize,
}

impl From<AnalysisResult> for AnalysisResponse {
    fn from(result: AnalysisResult) -> Self {
        let totals = Totals {
            records: result.records.len(),
            meta2: result.meta2_count(),
            selected: result.working_set.len(),
        };
        let info = result.file_info;

        AnalysisResponse {
            analysis_id: Uuid::new_v4().to_string(),
            status: result.status,
            generated_at: Utc::now(),
            cutoff_year: result.cutoff_year,
            file: FileMetadata {
                name: info.name,
                format: info.format,
                encoding: info.encoding,
                delimiter: info.delimiter,
                columns: info.headers,
                row_count: info.row_count,
                skipped_rows: info.skipped_rows,
                dropped_rows: info.dropped_rows,
            },
            records: result.working_set,
            summary: result.summary,
            task_names: result.task_names,
            totals,
        }
    }
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "analysisId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
        "records": [],
        "summary": [],
        "taskNames": []
    })
}
