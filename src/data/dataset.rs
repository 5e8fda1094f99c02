// src/data/dataset.rs

use std::collections::HashMap;

use super::Value;
use crate::error::TransformError;

/// One row, aligned with `Dataset::columns`.
pub type Row = Vec<Value>;

/// An ordered table: named columns plus rows of equal width.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub(crate) columns: Vec<String>,
    pub(crate) rows: Vec<Row>,
}

impl Dataset {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Build from column names and rows; short rows are padded with nulls,
    /// long rows truncated.
    pub fn from_rows<I, S>(columns: I, rows: Vec<Row>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ds = Self::new(columns);
        for row in rows {
            ds.push_row(row);
        }
        ds
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn push_row(&mut self, mut row: Row) {
        row.resize(self.columns.len(), Value::Null);
        self.rows.push(row);
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn column_index(&self, name: &str) -> Result<usize, TransformError> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| TransformError::ColumnNotFound(name.to_string()))
    }

    /// Values of one column, top to bottom.
    pub fn column(&self, name: &str) -> Result<Vec<&Value>, TransformError> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(|r| &r[idx]).collect())
    }

    pub fn record(&self, index: usize) -> Option<Record<'_>> {
        self.rows.get(index).map(|values| Record {
            columns: &self.columns,
            values,
        })
    }

    pub fn records(&self) -> impl Iterator<Item = Record<'_>> {
        self.rows.iter().map(move |values| Record {
            columns: &self.columns,
            values,
        })
    }

    /// Set `name` to `value` on every row, appending the column if missing.
    pub fn set_constant(&mut self, name: &str, value: Value) {
        match self.columns.iter().position(|c| c == name) {
            Some(idx) => self.rows.iter_mut().for_each(|r| r[idx] = value.clone()),
            None => {
                self.columns.push(name.to_string());
                self.rows.iter_mut().for_each(|r| r.push(value.clone()));
            }
        }
    }

    /// Append `other`'s rows, aligning columns by name. Columns only present
    /// on one side are null on the other.
    pub fn append(&mut self, other: Dataset) {
        if self.columns.is_empty() && self.rows.is_empty() {
            *self = other;
            return;
        }

        let added: Vec<String> = other
            .columns
            .iter()
            .filter(|c| !self.has_column(c))
            .cloned()
            .collect();
        if !added.is_empty() {
            self.columns.extend(added);
            let width = self.columns.len();
            self.rows.iter_mut().for_each(|r| r.resize(width, Value::Null));
        }

        let positions: HashMap<&str, usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.as_str(), i))
            .collect();
        let targets: Vec<usize> = other.columns.iter().map(|c| positions[c.as_str()]).collect();
        let width = self.columns.len();

        for row in other.rows {
            let mut aligned = vec![Value::Null; width];
            for (value, &target) in row.into_iter().zip(&targets) {
                aligned[target] = value;
            }
            self.rows.push(aligned);
        }
    }
}

/// Borrowed view of one row as a field name → value mapping.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    columns: &'a [String],
    values: &'a [Value],
}

impl<'a> Record<'a> {
    pub fn get(&self, field: &str) -> Option<&'a Value> {
        self.columns
            .iter()
            .position(|c| c == field)
            .map(|i| &self.values[i])
    }

    pub fn values(&self) -> &'a [Value] {
        self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a Value)> {
        self.columns.iter().map(String::as_str).zip(self.values.iter())
    }
}
