// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

use crate::transform::CoerceKind;

/// Failures while retrieving a payload.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("building HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("GET {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("GET {url} timed out")]
    Timeout { url: String },
    #[error("GET {url} returned {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("no payload registered for {url}")]
    NotFound { url: String },
    #[error("saving download to {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures while turning a payload into a `Dataset`.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no table at index {index} (page has {found} tables)")]
    NoTableAtIndex { index: usize, found: usize },
    #[error("no {element} element matches {lookup}")]
    NoMatchingElement {
        element: &'static str,
        lookup: String,
    },
    #[error("pattern `{pattern}` not found: {detail}")]
    PatternNotFound { pattern: String, detail: String },
    #[error("malformed JSON assigned to `{variable}`: {source}")]
    MalformedJson {
        variable: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("JSON pointer `{pointer}` does not address an array of objects")]
    NotAnArray { pointer: String },
    #[error("record {index} has no field `{field}`")]
    MissingField { index: usize, field: String },
    #[error("invalid CSS selector `{selector}`: {reason}")]
    InvalidSelector { selector: String, reason: String },
    #[error("delimiter {0:?} is not a single ASCII character")]
    InvalidDelimiter(char),
    #[error("reading delimited data: {0}")]
    Delimited(#[from] csv::Error),
    #[error("reading SQLite table `{table}`: {source}")]
    Sqlite {
        table: String,
        #[source]
        source: rusqlite::Error,
    },
}

/// Failures of row/column operations.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("column `{0}` not found")]
    ColumnNotFound(String),
    #[error("cannot coerce {value:?} in column `{column}` (row {row}) to {kind}")]
    Coercion {
        column: String,
        row: usize,
        value: String,
        kind: CoerceKind,
    },
    #[error("invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Failures while writing a flat file.
#[derive(Debug, Error)]
pub enum EmitError {
    #[error("writing {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("encoding CSV for {path:?}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("delimiter {0:?} is not a single ASCII character")]
    InvalidDelimiter(char),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("unknown preset `{0}`")]
    UnknownPreset(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Run-level error; the Display names the stage that failed.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("fetch stage failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("parse stage failed: {0}")]
    Parse(#[from] ParseError),
    #[error("transform stage failed: {0}")]
    Transform(#[from] TransformError),
    #[error("emit stage failed: {0}")]
    Emit(#[from] EmitError),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}
