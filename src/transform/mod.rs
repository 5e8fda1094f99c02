// src/transform/mod.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::data::Dataset;
use crate::error::TransformError;

pub mod aggregate;
pub mod coerce;
pub mod columns;
pub mod date_parser;
pub mod join;
pub mod remap;
pub mod rows;

pub use aggregate::COUNT_COLUMN;
pub use coerce::{CoerceKind, OnFailure};
pub use rows::{Predicate, SortKey};

/// One declarative row/column operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    DropColumns {
        columns: Vec<String>,
        #[serde(default)]
        tolerant: bool,
    },
    SelectColumns {
        columns: Vec<String>,
    },
    RenameColumns {
        mapping: BTreeMap<String, String>,
    },
    Coerce {
        column: String,
        kind: CoerceKind,
        #[serde(default)]
        on_failure: OnFailure,
    },
    ReplaceExact {
        #[serde(default)]
        columns: Option<Vec<String>>,
        from: String,
        to: String,
    },
    ReplaceRegex {
        #[serde(default)]
        columns: Option<Vec<String>>,
        pattern: String,
        replacement: String,
    },
    Explode {
        column: String,
        delimiters: Vec<String>,
    },
    Filter {
        #[serde(with = "serde_yaml::with::singleton_map_recursive")]
        predicate: Predicate,
    },
    Dedup {
        #[serde(default)]
        columns: Option<Vec<String>>,
    },
    Sort {
        by: Vec<SortKey>,
    },
    Head {
        n: usize,
    },
    YearBucket {
        column: String,
    },
    DropNulls {
        columns: Vec<String>,
    },
    /// Drop rows by position. Tied to the shape of one data snapshot.
    TrimRows {
        #[serde(default)]
        leading: usize,
        #[serde(default)]
        trailing: usize,
    },
    /// Replace the dataset with a `value,count` frequency table.
    ValueCounts {
        column: String,
    },
}

impl Step {
    pub fn apply(&self, ds: &mut Dataset) -> Result<(), TransformError> {
        match self {
            Step::DropColumns { columns, tolerant } => ds.drop_columns(columns, *tolerant),
            Step::SelectColumns { columns } => ds.select_columns(columns),
            Step::RenameColumns { mapping } => ds.rename_columns(mapping),
            Step::Coerce {
                column,
                kind,
                on_failure,
            } => ds.coerce(column, *kind, *on_failure).map(|_| ()),
            Step::ReplaceExact { columns, from, to } => {
                ds.replace_exact(columns.as_deref(), from, to).map(|_| ())
            }
            Step::ReplaceRegex {
                columns,
                pattern,
                replacement,
            } => ds
                .replace_regex(columns.as_deref(), pattern, replacement)
                .map(|_| ()),
            Step::Explode { column, delimiters } => ds.explode(column, delimiters),
            Step::Filter { predicate } => ds.filter(predicate),
            Step::Dedup { columns } => ds.dedup(columns.as_deref()),
            Step::Sort { by } => ds.sort(by),
            Step::Head { n } => {
                ds.head(*n);
                Ok(())
            }
            Step::YearBucket { column } => ds.year_bucket(column),
            Step::DropNulls { columns } => ds.drop_nulls(columns).map(|_| ()),
            Step::TrimRows { leading, trailing } => {
                ds.trim_rows(*leading, *trailing);
                Ok(())
            }
            Step::ValueCounts { column } => {
                *ds = ds.value_counts(column)?;
                Ok(())
            }
        }
    }
}

/// Apply `steps` in order; the first failure aborts.
pub fn apply_all(steps: &[Step], ds: &mut Dataset) -> Result<(), TransformError> {
    for step in steps {
        step.apply(ds)?;
        debug!(?step, rows = ds.len(), "applied");
    }
    Ok(())
}
