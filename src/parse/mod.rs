// src/parse/mod.rs

use scraper::{ElementRef, Selector};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::data::Dataset;
use crate::error::ParseError;

pub mod delimited;
pub mod script;
pub mod sqlite;
pub mod table;
mod text;

pub use delimited::{read_csv_file, read_delimited};
pub use script::{extract_assignment, parse_embedded_json, project};
pub use sqlite::read_sqlite_table;
pub use table::{extract_tables, parse_table};

/// How to pick one element (table, script block) out of a page.
///
/// `ByPosition` counts elements in document order and silently picks the
/// wrong one when the page layout changes upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lookup {
    ByPosition(usize),
    /// First candidate matching a CSS selector.
    BySelector(String),
    /// First candidate whose text contains the needle.
    ByText(String),
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lookup::ByPosition(n) => write!(f, "position {}", n),
            Lookup::BySelector(s) => write!(f, "selector `{}`", s),
            Lookup::ByText(t) => write!(f, "text {:?}", t),
        }
    }
}

impl Lookup {
    /// Pick among `candidates`. `Ok(None)` means nothing matched.
    pub(crate) fn pick<'a>(
        &self,
        candidates: &[ElementRef<'a>],
    ) -> Result<Option<ElementRef<'a>>, ParseError> {
        match self {
            Lookup::ByPosition(n) => Ok(candidates.get(*n).copied()),
            Lookup::BySelector(css) => {
                let sel = Selector::parse(css).map_err(|e| ParseError::InvalidSelector {
                    selector: css.clone(),
                    reason: format!("{:?}", e),
                })?;
                Ok(candidates.iter().copied().find(|el| sel.matches(el)))
            }
            Lookup::ByText(needle) => Ok(candidates
                .iter()
                .copied()
                .find(|el| el.text().collect::<String>().contains(needle.as_str()))),
        }
    }
}

/// Maps a source field onto an output column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMap {
    pub from: String,
    pub to: String,
}

impl FieldMap {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

fn default_delimiter() -> char {
    ','
}

/// Strategy that turns a raw payload into a `Dataset`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParseSpec {
    /// One HTML `<table>`.
    Table {
        #[serde(with = "serde_yaml::with::singleton_map")]
        select: Lookup,
    },
    /// A `<variable>=<JSON>;` assignment inside a `<script>` block, projected
    /// from the array at JSON pointer `rows`.
    EmbeddedJson {
        #[serde(with = "serde_yaml::with::singleton_map")]
        script: Lookup,
        variable: String,
        rows: String,
        fields: Vec<FieldMap>,
    },
    /// Delimited text with a header row.
    Delimited {
        #[serde(default = "default_delimiter")]
        delimiter: char,
        #[serde(default)]
        infer_types: bool,
    },
}

impl ParseSpec {
    pub fn parse(&self, payload: &str) -> Result<Dataset, ParseError> {
        match self {
            ParseSpec::Table { select } => parse_table(payload, select),
            ParseSpec::EmbeddedJson {
                script,
                variable,
                rows,
                fields,
            } => {
                let json = parse_embedded_json(payload, script, variable)?;
                project(&json, rows, fields)
            }
            ParseSpec::Delimited {
                delimiter,
                infer_types,
            } => {
                let d = delimiter_byte(*delimiter).ok_or(ParseError::InvalidDelimiter(*delimiter))?;
                read_delimited(payload.as_bytes(), d, *infer_types)
            }
        }
    }
}

pub(crate) fn delimiter_byte(c: char) -> Option<u8> {
    if c.is_ascii() {
        Some(c as u8)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_yaml_shape() {
        let spec: ParseSpec = serde_yaml::from_str(
            "kind: table\nselect:\n  by_position: 4\n",
        )
        .unwrap();
        assert_eq!(
            spec,
            ParseSpec::Table {
                select: Lookup::ByPosition(4)
            }
        );

        let spec: ParseSpec = serde_yaml::from_str("kind: delimited\n").unwrap();
        assert_eq!(
            spec,
            ParseSpec::Delimited {
                delimiter: ',',
                infer_types: false
            }
        );
    }

    #[test]
    fn test_delimited_spec_parses_payload() {
        let spec = ParseSpec::Delimited {
            delimiter: ';',
            infer_types: true,
        };
        let ds = spec.parse("id;Play Count\nabc;12\n").unwrap();
        assert_eq!(ds.columns(), &["id", "Play Count"]);
        assert_eq!(ds.rows()[0][1], crate::data::Value::Int(12));
    }
}
