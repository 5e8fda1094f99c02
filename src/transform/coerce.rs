// src/transform/coerce.rs

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

use super::date_parser::parse_date;
use crate::data::{Dataset, Value};
use crate::error::TransformError;

/// Target type of a coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoerceKind {
    Int,
    Float,
    Date,
}

impl fmt::Display for CoerceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CoerceKind::Int => "integer",
            CoerceKind::Float => "float",
            CoerceKind::Date => "date",
        })
    }
}

/// What a value that does not convert turns into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnFailure {
    /// Abort with `TransformError::Coercion`.
    #[default]
    Fail,
    /// Store a null and carry on.
    Null,
}

impl Dataset {
    /// Reinterpret `column` as `kind`. Returns how many cells were nulled.
    pub fn coerce(
        &mut self,
        column: &str,
        kind: CoerceKind,
        on_failure: OnFailure,
    ) -> Result<usize, TransformError> {
        let idx = self.column_index(column)?;
        let mut nulled = 0;

        for (row, values) in self.rows.iter_mut().enumerate() {
            let cell = &mut values[idx];
            match convert(cell, kind) {
                Some(v) => *cell = v,
                None if on_failure == OnFailure::Null => {
                    if !cell.is_null() {
                        nulled += 1;
                    }
                    *cell = Value::Null;
                }
                None => {
                    return Err(TransformError::Coercion {
                        column: column.to_string(),
                        row,
                        value: cell.to_string(),
                        kind,
                    })
                }
            }
        }

        if nulled > 0 {
            warn!(column, %kind, nulled, "values did not convert and were nulled");
        }
        Ok(nulled)
    }
}

/// `None` when the value does not convert. Nulls only survive where the
/// target type has a missing marker (float, date).
fn convert(value: &Value, kind: CoerceKind) -> Option<Value> {
    match (kind, value) {
        (CoerceKind::Int, Value::Int(n)) => Some(Value::Int(*n)),
        (CoerceKind::Int, Value::Float(x)) => whole_to_i64(*x).map(Value::Int),
        (CoerceKind::Int, Value::Text(s)) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(whole_to_i64))
                .map(Value::Int)
        }
        (CoerceKind::Int, _) => None,

        (CoerceKind::Float, Value::Null) => Some(Value::Null),
        (CoerceKind::Float, Value::Int(n)) => Some(Value::Float(*n as f64)),
        (CoerceKind::Float, Value::Float(x)) => Some(Value::Float(*x)),
        (CoerceKind::Float, Value::Text(s)) => s.trim().parse::<f64>().ok().map(Value::Float),
        (CoerceKind::Float, Value::Date(_)) => None,

        (CoerceKind::Date, Value::Null) => Some(Value::Null),
        (CoerceKind::Date, Value::Date(d)) => Some(Value::Date(*d)),
        (CoerceKind::Date, Value::Text(s)) => parse_date(s).map(Value::Date),
        (CoerceKind::Date, Value::Int(y)) => i32::try_from(*y)
            .ok()
            .filter(|y| (1000..=9999).contains(y))
            .and_then(|y| chrono::NaiveDate::from_ymd_opt(y, 1, 1))
            .map(Value::Date),
        (CoerceKind::Date, Value::Float(_)) => None,
    }
}

/// Whole floats inside the i64 range; `as` would saturate the rest.
fn whole_to_i64(x: f64) -> Option<i64> {
    (x.is_finite() && x.fract() == 0.0 && x >= i64::MIN as f64 && x < i64::MAX as f64)
        .then_some(x as i64)
}

impl Dataset {
    /// Replace dates (or date-like text) in `column` with their year.
    pub fn year_bucket(&mut self, column: &str) -> Result<(), TransformError> {
        let idx = self.column_index(column)?;
        for values in self.rows.iter_mut() {
            let cell = &mut values[idx];
            let year = match cell {
                Value::Date(d) => Some(d.year()),
                Value::Text(s) => parse_date(s).map(|d| d.year()),
                Value::Int(_) => continue,
                _ => None,
            };
            *cell = year.map(|y| Value::Int(y as i64)).unwrap_or(Value::Null);
        }
        Ok(())
    }
}
