// src/transform/aggregate.rs

use std::collections::HashMap;

use crate::data::{Dataset, Value};
use crate::error::TransformError;

/// Name of the count column produced by the aggregations below.
pub const COUNT_COLUMN: &str = "count";

impl Dataset {
    /// Frequency table of `column`: `[column, count]`, most frequent first,
    /// ties in order of first appearance. Nulls are not counted.
    ///
    /// Values are bucketed by their flat-file rendering: `Int(1)` and
    /// `Text("1")` share a bucket (the first one seen is kept), while
    /// `Int(1)` and `Float(1.0)` render as `1` and `1.0` and stay apart.
    pub fn value_counts(&self, column: &str) -> Result<Dataset, TransformError> {
        let idx = self.column_index(column)?;
        let mut order: Vec<(Value, i64)> = Vec::new();
        let mut slot: HashMap<String, usize> = HashMap::new();

        for row in &self.rows {
            let v = &row[idx];
            if v.is_null() {
                continue;
            }
            let key = v.to_string();
            match slot.get(&key) {
                Some(&i) => order[i].1 += 1,
                None => {
                    slot.insert(key, order.len());
                    order.push((v.clone(), 1));
                }
            }
        }
        // stable, so ties keep first-appearance order
        order.sort_by(|a, b| b.1.cmp(&a.1));

        Ok(Dataset::from_rows(
            [column, COUNT_COLUMN],
            order
                .into_iter()
                .map(|(v, n)| vec![v, Value::Int(n)])
                .collect(),
        ))
    }

    /// Group by `columns` and count: `[columns.., count]`, sorted by key.
    /// Rows with a null in any key column are skipped. Keys group by their
    /// flat-file rendering, as in `value_counts`.
    pub fn count_by(&self, columns: &[String]) -> Result<Dataset, TransformError> {
        let idx = columns
            .iter()
            .map(|c| self.column_index(c))
            .collect::<Result<Vec<_>, _>>()?;

        let mut groups: Vec<(Vec<Value>, i64)> = Vec::new();
        let mut slot: HashMap<Vec<String>, usize> = HashMap::new();
        for row in &self.rows {
            if idx.iter().any(|&i| row[i].is_null()) {
                continue;
            }
            let key: Vec<String> = idx.iter().map(|&i| row[i].to_string()).collect();
            match slot.get(&key) {
                Some(&g) => groups[g].1 += 1,
                None => {
                    slot.insert(key, groups.len());
                    groups.push((idx.iter().map(|&i| row[i].clone()).collect(), 1));
                }
            }
        }
        groups.sort_by(|a, b| cmp_keys(&a.0, &b.0));

        let mut out = Dataset::new(columns.iter().map(String::as_str).chain([COUNT_COLUMN]));
        for (mut key, n) in groups {
            key.push(Value::Int(n));
            out.push_row(key);
        }
        Ok(out)
    }

    /// Count matrix with one row per distinct `row_column` value and one
    /// column per distinct `col_column` value, both sorted. Missing
    /// combinations are zero. Keys group by their flat-file rendering.
    pub fn pivot_counts(&self, row_column: &str, col_column: &str) -> Result<Dataset, TransformError> {
        let pairs = self.count_by(&[row_column.to_string(), col_column.to_string()])?;

        let mut col_values: Vec<Value> = Vec::new();
        for row in &pairs.rows {
            if !col_values.iter().any(|v| v.to_string() == row[1].to_string()) {
                col_values.push(row[1].clone());
            }
        }
        col_values.sort_by(|a, b| a.total_cmp(b));
        let col_slot: HashMap<String, usize> = col_values
            .iter()
            .enumerate()
            .map(|(i, v)| (v.to_string(), i + 1))
            .collect();

        let mut out = Dataset::new(
            std::iter::once(row_column.to_string()).chain(col_values.iter().map(Value::to_string)),
        );
        let width = out.width();
        // `pairs` is sorted by row key, so equal keys are adjacent
        for pair in &pairs.rows {
            let (key, col, n) = (&pair[0], &pair[1], &pair[2]);
            let start_new = out
                .rows
                .last()
                .map_or(true, |last| last[0].to_string() != key.to_string());
            if start_new {
                let mut fresh = vec![Value::Int(0); width];
                fresh[0] = key.clone();
                out.rows.push(fresh);
            }
            if let (Some(last), Some(&c)) = (out.rows.last_mut(), col_slot.get(&col.to_string())) {
                last[c] = n.clone();
            }
        }
        Ok(out)
    }
}

fn cmp_keys(a: &[Value], b: &[Value]) -> std::cmp::Ordering {
    a.iter()
        .zip(b)
        .map(|(x, y)| x.total_cmp(y))
        .find(|o| o.is_ne())
        .unwrap_or(std::cmp::Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn games() -> Dataset {
        Dataset::from_rows(
            ["platform", "year"],
            vec![
                vec!["Flash".into(), Value::Int(2008)],
                vec!["HTML5".into(), Value::Int(2015)],
                vec!["Flash".into(), Value::Int(2007)],
                vec!["Unity".into(), Value::Null],
                vec!["Flash".into(), Value::Int(2008)],
                vec![Value::Null, Value::Int(2008)],
                vec!["Unity".into(), Value::Int(2015)],
            ],
        )
    }

    #[test]
    fn test_value_counts_order() {
        let counts = games().value_counts("platform").unwrap();
        assert_eq!(counts.columns(), &["platform", "count"]);
        assert_eq!(
            counts.rows(),
            &[
                vec!["Flash".into(), Value::Int(3)],
                vec!["Unity".into(), Value::Int(2)],
                vec!["HTML5".into(), Value::Int(1)],
            ]
        );
    }

    #[test]
    fn test_count_by_sorted_by_key() {
        let counts = games()
            .count_by(&["year".to_string(), "platform".to_string()])
            .unwrap();
        assert_eq!(counts.columns(), &["year", "platform", "count"]);
        assert_eq!(
            counts.rows(),
            &[
                vec![Value::Int(2007), "Flash".into(), Value::Int(1)],
                vec![Value::Int(2008), "Flash".into(), Value::Int(2)],
                vec![Value::Int(2015), "HTML5".into(), Value::Int(1)],
                vec![Value::Int(2015), "Unity".into(), Value::Int(1)],
            ]
        );
    }

    #[test]
    fn test_pivot_zero_fills() {
        let pivot = games().pivot_counts("year", "platform").unwrap();
        assert_eq!(pivot.columns(), &["year", "Flash", "HTML5", "Unity"]);
        assert_eq!(
            pivot.rows(),
            &[
                vec![Value::Int(2007), Value::Int(1), Value::Int(0), Value::Int(0)],
                vec![Value::Int(2008), Value::Int(2), Value::Int(0), Value::Int(0)],
                vec![Value::Int(2015), Value::Int(0), Value::Int(1), Value::Int(1)],
            ]
        );
    }

    #[test]
    fn test_missing_column() {
        assert!(games().value_counts("genre").is_err());
    }

    #[test]
    fn test_value_counts_groups_by_rendering() {
        let ds = Dataset::from_rows(
            ["id"],
            vec![
                vec![Value::Int(1)],
                vec!["1".into()],
                vec![Value::Float(1.0)],
            ],
        );
        let counts = ds.value_counts("id").unwrap();
        assert_eq!(
            counts.rows(),
            &[
                vec![Value::Int(1), Value::Int(2)],
                vec![Value::Float(1.0), Value::Int(1)],
            ]
        );
    }
}
