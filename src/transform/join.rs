// src/transform/join.rs

use std::collections::HashMap;

use crate::data::{Dataset, Row, Value};
use crate::error::TransformError;

impl Dataset {
    /// Inner join on `key`. Output rows follow the left side's order, each
    /// left row repeated once per right match. The key appears once; other
    /// names present on both sides get `_x` (left) and `_y` (right).
    /// Keys compare by their flat-file rendering; null keys never match.
    pub fn inner_join(&self, other: &Dataset, key: &str) -> Result<Dataset, TransformError> {
        let lk = self.column_index(key)?;
        let rk = other.column_index(key)?;

        let mut index: HashMap<String, Vec<&Row>> = HashMap::new();
        for row in &other.rows {
            if !row[rk].is_null() {
                index.entry(row[rk].to_string()).or_default().push(row);
            }
        }

        let suffix = |name: &String, side: &str, them: &Dataset| {
            if name != key && them.has_column(name) {
                format!("{name}{side}")
            } else {
                name.clone()
            }
        };
        let columns: Vec<String> = self
            .columns
            .iter()
            .map(|c| suffix(c, "_x", other))
            .chain(
                other
                    .columns
                    .iter()
                    .enumerate()
                    .filter(|&(i, _)| i != rk)
                    .map(|(_, c)| suffix(c, "_y", self)),
            )
            .collect();

        let mut out = Dataset::new(columns);
        for left in &self.rows {
            if left[lk].is_null() {
                continue;
            }
            let Some(matches) = index.get(&left[lk].to_string()) else {
                continue;
            };
            for right in matches {
                let row: Vec<Value> = left
                    .iter()
                    .cloned()
                    .chain(
                        right
                            .iter()
                            .enumerate()
                            .filter(|&(i, _)| i != rk)
                            .map(|(_, v)| v.clone()),
                    )
                    .collect();
                out.rows.push(row);
            }
        }
        Ok(out)
    }
}
