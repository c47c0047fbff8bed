//! Frequency table of classified records.
//!
//! ```text
//! nomeTarefa            AggregateRow
//! ┌──────────┐          ┌──────────────────────┐
//! │ A        │          │ A   2   66.7         │
//! │ B        │    →     │ B   1   33.3         │
//! │ A        │          └──────────────────────┘
//! └──────────┘
//! ```
//!
//! Rows are ordered by descending count; equal counts keep first-seen order.

use std::collections::HashMap;

use crate::models::{AggregateRow, ClassifiedRecord};

/// Group `records` by the text value of `group_by`.
///
/// Records whose group value is null or absent are not counted. Percentages
/// are relative to the counted records and rounded to one decimal place.
pub fn aggregate(records: &[ClassifiedRecord], group_by: &str) -> Vec<AggregateRow> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, usize)> = Vec::new();

    for key in records.iter().filter_map(|r| r.text(group_by)) {
        match index.get(&key) {
            Some(&i) => groups[i].1 += 1,
            None => {
                index.insert(key.clone(), groups.len());
                groups.push((key, 1));
            }
        }
    }

    let total: usize = groups.iter().map(|(_, count)| count).sum();
    if total == 0 {
        return Vec::new();
    }

    // Stable sort keeps first-seen order among ties.
    groups.sort_by(|a, b| b.1.cmp(&a.1));

    groups
        .into_iter()
        .map(|(task_name, count)| AggregateRow {
            task_name,
            count,
            percentage: round1(100.0 * count as f64 / total as f64),
        })
        .collect()
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
