//! Working-set selection between classification and aggregation.

use serde::{Deserialize, Serialize};

use crate::models::ClassifiedRecord;

/// Which classified records take part in aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Selection {
    /// Keep only Meta2 records.
    pub show_only_meta2: bool,
    /// Keep only these task names; `None` keeps every observed name.
    pub task_names: Option<Vec<String>>,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            show_only_meta2: true,
            task_names: None,
        }
    }
}

impl Selection {
    /// Everything, Meta2 or not.
    pub fn all() -> Self {
        Self {
            show_only_meta2: false,
            task_names: None,
        }
    }

    pub fn matches(&self, record: &ClassifiedRecord) -> bool {
        if self.show_only_meta2 && !record.is_meta2 {
            return false;
        }
        match &self.task_names {
            Some(names) => record
                .task_name()
                .is_some_and(|task| names.iter().any(|n| *n == task)),
            None => true,
        }
    }
}

/// Records passing the Meta2 filter only; the pool task names are offered from.
pub fn meta2_scope(records: &[ClassifiedRecord], show_only_meta2: bool) -> Vec<ClassifiedRecord> {
    records
        .iter()
        .filter(|r| !show_only_meta2 || r.is_meta2)
        .cloned()
        .collect()
}

/// Build the working set as a new collection.
pub fn select(records: &[ClassifiedRecord], selection: &Selection) -> Vec<ClassifiedRecord> {
    records
        .iter()
        .filter(|r| selection.matches(r))
        .cloned()
        .collect()
}

/// Distinct task names in first-seen order.
pub fn task_names(records: &[ClassifiedRecord]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in records.iter().filter_map(ClassifiedRecord::task_name) {
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Record;
    use serde_json::json;

    fn record(task: &str, is_meta2: bool) -> ClassifiedRecord {
        let mut fields = Record::new();
        fields.insert("numeroProcesso".into(), json!("1-2019.8"));
        fields.insert("nomeTarefa".into(), json!(task));
        ClassifiedRecord { fields, is_meta2 }
    }

    #[test]
    fn test_default_shows_only_meta2() {
        let records = vec![record("A", true), record("B", false)];
        let selected = select(&records, &Selection::default());
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].task_name().as_deref(), Some("A"));
    }

    #[test]
    fn test_all_keeps_everything() {
        let records = vec![record("A", true), record("B", false)];
        assert_eq!(select(&records, &Selection::all()).len(), 2);
    }

    #[test]
    fn test_task_name_selection() {
        let records = vec![record("A", true), record("B", true), record("C", true)];
        let selection = Selection {
            show_only_meta2: true,
            task_names: Some(vec!["A".into(), "C".into()]),
        };
        let names = task_names(&select(&records, &selection));
        assert_eq!(names, vec!["A", "C"]);
    }

    #[test]
    fn test_empty_task_selection_yields_empty_set() {
        let records = vec![record("A", true)];
        let selection = Selection {
            show_only_meta2: false,
            task_names: Some(vec![]),
        };
        assert!(select(&records, &selection).is_empty());
    }

    #[test]
    fn test_task_names_first_seen_order() {
        let records = vec![record("B", true), record("A", false), record("B", true)];
        assert_eq!(task_names(&records), vec!["B", "A"]);
        assert_eq!(task_names(&meta2_scope(&records, true)), vec!["B"]);
    }

    #[test]
    fn test_selection_deserializes_with_defaults() {
        let selection: Selection = serde_json::from_str(r#"{"taskNames": ["A"]}"#).unwrap();
        assert!(selection.show_only_meta2);
        assert_eq!(selection.task_names, Some(vec!["A".to_string()]));
    }
}
