//! Schema validation for parsed tables.
//!
//! Two levels:
//!
//! - **Columns**: every required column must appear in the header, otherwise
//!   the whole file is rejected with [`SchemaError::MissingColumn`].
//! - **Rows**: each row is checked against a JSON Schema (draft 7) generated
//!   from the required columns; rows with a null or absent required value are
//!   dropped and counted.
//!
//! # Example
//!
//! ```rust,ignore
//! use meta2::validation::validate_table;
//! use meta2::models::REQUIRED_COLUMNS;
//!
//! let validated = validate_table(&table, &REQUIRED_COLUMNS)?;
//! println!("{} rows kept, {} dropped", validated.records.len(), validated.dropped);
//! ```

use serde_json::{json, Map, Value};

use crate::api::logs::log_warning;
use crate::error::{SchemaError, SchemaResult};
use crate::models::{Table, ValidatedTable};

/// Dropped rows whose reasons are logged individually.
const LOGGED_DROPS: usize = 3;

/// JSON Schema accepting objects where every `required` column holds a
/// non-null value.
pub fn row_schema(required: &[&str]) -> Value {
    let properties: Map<String, Value> = required
        .iter()
        .map(|column| (column.to_string(), json!({ "not": { "type": "null" } })))
        .collect();

    json!({
        "type": "object",
        "required": required,
        "properties": properties,
    })
}

/// Validate a JSON value against a schema, collecting every error message.
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator =
        jsonschema::draft7::new(schema).map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator.iter_errors(data).map(|e| e.to_string()).collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Check that every required column is present in the header.
pub fn check_columns(headers: &[String], required: &[&str]) -> SchemaResult<()> {
    match required
        .iter()
        .find(|column| !headers.iter().any(|h| h.as_str() == **column))
    {
        Some(missing) => Err(SchemaError::MissingColumn(missing.to_string())),
        None => Ok(()),
    }
}

/// Keep the rows of `table` that carry every required value.
///
/// Fails only when a required column is missing from the header. The input
/// table is left untouched.
pub fn validate_table(table: &Table, required: &[&str]) -> SchemaResult<ValidatedTable> {
    check_columns(&table.headers, required)?;

    let schema = row_schema(required);
    let validator = jsonschema::draft7::new(&schema)
        .map_err(|e| SchemaError::InvalidSchema(e.to_string()))?;

    let mut records = Vec::with_capacity(table.records.len());
    let mut dropped = 0;

    for (index, record) in table.records.iter().enumerate() {
        let row = Value::Object(record.clone());

        if validator.is_valid(&row) {
            if let Value::Object(fields) = row {
                records.push(fields);
            }
            continue;
        }

        dropped += 1;
        if dropped <= LOGGED_DROPS {
            if let Err(reasons) = validate(&schema, &row) {
                log_warning(format!("Row {} dropped: {}", index + 1, reasons.join(", ")));
            }
        }
    }

    if dropped > 0 {
        log_warning(format!("{} row(s) dropped for missing required values", dropped));
    }

    Ok(ValidatedTable {
        headers: table.headers.clone(),
        records,
        dropped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Record, REQUIRED_COLUMNS};

    fn table(headers: &[&str], rows: Vec<Value>) -> Table {
        Table {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            records: rows
                .into_iter()
                .filter_map(|v| match v {
                    Value::Object(map) => Some(map),
                    _ => None,
                })
                .collect::<Vec<Record>>(),
            skipped: Vec::new(),
        }
    }

    #[test]
    fn test_missing_column_is_schema_error() {
        let t = table(&["numeroProcesso", "outra"], vec![json!({"numeroProcesso": "1-2019.8", "outra": "x"})]);
        let err = validate_table(&t, &REQUIRED_COLUMNS).unwrap_err();
        assert!(matches!(err, SchemaError::MissingColumn(ref c) if c == "nomeTarefa"));
        assert!(err.to_string().contains("'nomeTarefa'"));
    }

    #[test]
    fn test_null_rows_dropped() {
        let t = table(
            &["numeroProcesso", "nomeTarefa", "extra"],
            vec![
                json!({"numeroProcesso": "1-2019.8", "nomeTarefa": "Triagem", "extra": null}),
                json!({"numeroProcesso": null, "nomeTarefa": "Triagem", "extra": "x"}),
                json!({"numeroProcesso": "3-2020.8", "nomeTarefa": null, "extra": "y"}),
                json!({"numeroProcesso": "4-2021.8", "nomeTarefa": "Decisão", "extra": "z"}),
            ],
        );

        let validated = validate_table(&t, &REQUIRED_COLUMNS).unwrap();
        assert_eq!(validated.records.len(), 2);
        assert_eq!(validated.dropped, 2);
        assert_eq!(validated.records[1]["nomeTarefa"], "Decisão");
        // Input untouched.
        assert_eq!(t.records.len(), 4);
    }

    #[test]
    fn test_optional_nulls_kept() {
        let t = table(
            &["numeroProcesso", "nomeTarefa", "extra"],
            vec![json!({"numeroProcesso": "malformed", "nomeTarefa": "X", "extra": null})],
        );
        let validated = validate_table(&t, &REQUIRED_COLUMNS).unwrap();
        assert_eq!(validated.records.len(), 1);
    }

    #[test]
    fn test_column_order_preserved() {
        let t = table(&["nomeTarefa", "z", "numeroProcesso"], vec![]);
        let validated = validate_table(&t, &REQUIRED_COLUMNS).unwrap();
        assert_eq!(validated.headers, vec!["nomeTarefa", "z", "numeroProcesso"]);
    }

    #[test]
    fn test_drop_reason_logged() {
        use crate::api::logs::LOG_BROADCASTER;
        use tokio::sync::broadcast::error::TryRecvError;

        let mut rx = LOG_BROADCASTER.subscribe();
        let t = table(
            &["numeroProcesso", "nomeTarefa"],
            vec![
                json!({"numeroProcesso": "1-2019.8", "nomeTarefa": "Triagem"}),
                json!({"numeroProcesso": "2-2019.8", "nomeTarefa": "Triagem"}),
                json!({"numeroProcesso": "3-2019.8"}),
            ],
        );
        let validated = validate_table(&t, &REQUIRED_COLUMNS).unwrap();
        assert_eq!(validated.dropped, 1);

        let mut messages = Vec::new();
        loop {
            match rx.try_recv() {
                Ok(entry) => messages.push(entry.message),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
        assert!(messages
            .iter()
            .any(|m| m.starts_with("Row 3 dropped") && m.contains("nomeTarefa")));
    }

    #[test]
    fn test_generic_validate_reports_errors() {
        let schema = row_schema(&["a"]);
        assert!(validate(&schema, &json!({"a": 1})).is_ok());
        let errors = validate(&schema, &json!({"b": 1})).unwrap_err();
        assert!(!errors.is_empty());
    }
}
