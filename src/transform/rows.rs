// src/transform/rows.rs

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::data::{Dataset, Row, Value};
use crate::error::TransformError;

/// Row filter. Comparisons use the cell's flat-file rendering, so
/// `equals: { column: year, value: "2020" }` matches an integer cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// Neither null nor the empty string.
    NonEmpty { column: String },
    Equals { column: String, value: String },
    OneOf { column: String, values: Vec<String> },
    Not(Box<Predicate>),
}

impl Predicate {
    fn column(&self) -> &str {
        match self {
            Predicate::NonEmpty { column }
            | Predicate::Equals { column, .. }
            | Predicate::OneOf { column, .. } => column,
            Predicate::Not(inner) => inner.column(),
        }
    }

    fn matches(&self, value: &Value) -> bool {
        match self {
            Predicate::NonEmpty { .. } => !value.is_empty(),
            Predicate::Equals { value: want, .. } => !value.is_null() && value.to_string() == *want,
            Predicate::OneOf { values, .. } => {
                !value.is_null() && values.iter().any(|v| *v == value.to_string())
            }
            Predicate::Not(inner) => !inner.matches(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub column: String,
    #[serde(default)]
    pub descending: bool,
}

impl SortKey {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: false,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: true,
        }
    }
}

impl Dataset {
    pub fn filter(&mut self, predicate: &Predicate) -> Result<(), TransformError> {
        let idx = self.column_index(predicate.column())?;
        let before = self.rows.len();
        self.rows.retain(|row| predicate.matches(&row[idx]));
        debug!(kept = self.rows.len(), dropped = before - self.rows.len(), "filter");
        Ok(())
    }

    /// Keep the first row of every distinct key. The key is the whole row
    /// when `columns` is `None`.
    pub fn dedup(&mut self, columns: Option<&[String]>) -> Result<(), TransformError> {
        let key_idx = self.target_columns(columns)?;
        let mut seen: HashSet<Vec<String>> = HashSet::new();
        self.rows.retain(|row| {
            let key = key_idx.iter().map(|&i| dedup_key(&row[i])).collect();
            seen.insert(key)
        });
        Ok(())
    }

    /// Stable multi-key sort. Nulls go last regardless of direction.
    pub fn sort(&mut self, by: &[SortKey]) -> Result<(), TransformError> {
        let keys = by
            .iter()
            .map(|k| self.column_index(&k.column).map(|i| (i, k.descending)))
            .collect::<Result<Vec<_>, _>>()?;

        self.rows.sort_by(|a, b| {
            keys.iter()
                .map(|&(i, descending)| compare(&a[i], &b[i], descending))
                .find(|o| o.is_ne())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(())
    }

    pub fn head(&mut self, n: usize) {
        self.rows.truncate(n);
    }

    /// Drop rows with a null in any of `columns`. Returns how many went.
    pub fn drop_nulls(&mut self, columns: &[String]) -> Result<usize, TransformError> {
        let idx = columns
            .iter()
            .map(|c| self.column_index(c))
            .collect::<Result<Vec<_>, _>>()?;
        let before = self.rows.len();
        self.rows.retain(|row| idx.iter().all(|&i| !row[i].is_null()));
        Ok(before - self.rows.len())
    }

    /// Drop `leading` rows from the top and `trailing` from the bottom.
    pub fn trim_rows(&mut self, leading: usize, trailing: usize) {
        if leading == 0 && trailing == 0 {
            return;
        }
        warn!(
            leading,
            trailing,
            rows = self.rows.len(),
            "dropping rows by position"
        );
        let end = self.rows.len().saturating_sub(trailing);
        let start = leading.min(end);
        let kept: Vec<Row> = self.rows.drain(start..end).collect();
        self.rows = kept;
    }
}

fn compare(a: &Value, b: &Value, descending: bool) -> std::cmp::Ordering {
    match (a.is_null(), b.is_null()) {
        (false, false) if descending => b.total_cmp(a),
        _ => a.total_cmp(b),
    }
}

fn dedup_key(v: &Value) -> String {
    match v {
        // keep null and "" apart
        Value::Null => "\0".to_string(),
        other => other.to_string(),
    }
}
