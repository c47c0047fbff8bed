//! Meta2 classification.
//!
//! A process number has the form `<seq>-<year>.<court>...`. A record is Meta2
//! when its year is strictly earlier than the cutoff year. Anything that does
//! not parse is not Meta2; classification never fails.

use serde_json::Value;

use crate::models::{ClassifiedRecord, ValidatedTable, META2_COLUMN, PROCESS_NUMBER_COLUMN};

/// Cutoff year used when none is configured.
pub const DEFAULT_CUTOFF_YEAR: i64 = 2021;

/// Accepted cutoff years, inclusive.
pub const CUTOFF_YEAR_RANGE: std::ops::RangeInclusive<i64> = 1900..=2100;

/// Extract the case year from a process number.
///
/// The year is the text after the first `-`, up to the next `-` and then up
/// to the first `.`, ignoring surrounding whitespace.
pub fn parse_case_year(process_number: &str) -> Option<i64> {
    let (_, after_dash) = process_number.split_once('-')?;
    let segment = after_dash.split('-').next()?;
    let year = segment.split('.').next()?;
    year.trim().parse().ok()
}

/// `true` iff the process number's year is strictly before `cutoff_year`.
pub fn is_meta2(process_number: &str, cutoff_year: i64) -> bool {
    match parse_case_year(process_number) {
        Some(year) => year < cutoff_year,
        None => false,
    }
}

/// Classify a raw cell. Only text cells can carry a process number.
pub fn is_meta2_value(value: Option<&Value>, cutoff_year: i64) -> bool {
    match value {
        Some(Value::String(process_number)) => is_meta2(process_number, cutoff_year),
        _ => false,
    }
}

/// Classify every row of a validated table into a new collection.
///
/// An input `Meta2` column is replaced by the computed flag.
pub fn classify_table(table: &ValidatedTable, cutoff_year: i64) -> Vec<ClassifiedRecord> {
    table
        .records
        .iter()
        .map(|record| {
            let mut fields = record.clone();
            fields.shift_remove(META2_COLUMN);
            ClassifiedRecord {
                is_meta2: is_meta2_value(fields.get(PROCESS_NUMBER_COLUMN), cutoff_year),
                fields,
            }
        })
        .collect()
}
