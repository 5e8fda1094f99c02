// src/transform/remap.rs

use regex::Regex;
use tracing::debug;

use crate::data::{Dataset, Value};
use crate::error::TransformError;

impl Dataset {
    /// Indices of `columns`, or of every column when `None`.
    pub(crate) fn target_columns(&self, columns: Option<&[String]>) -> Result<Vec<usize>, TransformError> {
        match columns {
            Some(names) => names.iter().map(|n| self.column_index(n)).collect(),
            None => Ok((0..self.width()).collect()),
        }
    }

    /// Replace text cells equal to `from` with `to`. Returns the number of
    /// cells changed.
    pub fn replace_exact(
        &mut self,
        columns: Option<&[String]>,
        from: &str,
        to: &str,
    ) -> Result<usize, TransformError> {
        let targets = self.target_columns(columns)?;
        let mut changed = 0;
        for row in self.rows.iter_mut() {
            for &i in &targets {
                if row[i].as_str() == Some(from) {
                    row[i] = Value::text(to);
                    changed += 1;
                }
            }
        }
        debug!(from, to, changed, "replace_exact");
        Ok(changed)
    }

    /// Regex-replace every match inside text cells. `replacement` may use
    /// `$1`-style group references.
    pub fn replace_regex(
        &mut self,
        columns: Option<&[String]>,
        pattern: &str,
        replacement: &str,
    ) -> Result<usize, TransformError> {
        let re = Regex::new(pattern).map_err(|source| TransformError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        let targets = self.target_columns(columns)?;
        let mut changed = 0;
        for row in self.rows.iter_mut() {
            for &i in &targets {
                let replaced = match &row[i] {
                    Value::Text(s) if re.is_match(s) => re.replace_all(s, replacement).into_owned(),
                    _ => continue,
                };
                row[i] = Value::Text(replaced);
                changed += 1;
            }
        }
        debug!(pattern, changed, "replace_regex");
        Ok(changed)
    }

    /// Split `column` on any of `delimiters` and emit one row per piece,
    /// copying every other field. Pieces are trimmed and empty ones dropped;
    /// text with no pieces left becomes a single null row. Non-text cells
    /// are kept as they are.
    pub fn explode(&mut self, column: &str, delimiters: &[String]) -> Result<(), TransformError> {
        let idx = self.column_index(column)?;
        let rows = std::mem::take(&mut self.rows);

        for mut row in rows {
            let Some(pieces) = row[idx].as_str().map(|s| split_any(s, delimiters)) else {
                self.rows.push(row);
                continue;
            };
            if pieces.is_empty() {
                row[idx] = Value::Null;
                self.rows.push(row);
                continue;
            }
            for piece in pieces {
                let mut r = row.clone();
                r[idx] = Value::Text(piece);
                self.rows.push(r);
            }
        }
        Ok(())
    }
}

fn split_any(s: &str, delimiters: &[String]) -> Vec<String> {
    let mut pieces = vec![s.to_string()];
    for d in delimiters.iter().filter(|d| !d.is_empty()) {
        pieces = pieces
            .iter()
            .flat_map(|p| p.split(d.as_str()))
            .map(str::to_string)
            .collect();
    }
    pieces
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}
