//! Built-in pipelines for the sites this tool was written against.
//!
//! All of them locate their data by position on the page, so a layout
//! change upstream surfaces as `NoTableAtIndex` / `PatternNotFound` (or,
//! worse, as the wrong table). `datapull show-config <name>` dumps a preset
//! as YAML for tweaking.

use super::{BranchConfig, ItemFailure, PipelineConfig, SourceConfig, YearRange};
use crate::emit::SinkConfig;
use crate::error::ConfigError;
use crate::parse::{FieldMap, Lookup, ParseSpec};
use crate::transform::{CoerceKind, OnFailure, SortKey, Step};

pub const PRESETS: &[&str] = &["serie-a", "qualita-vita", "unesco"];

pub fn preset(name: &str) -> Result<PipelineConfig, ConfigError> {
    match name {
        "serie-a" => Ok(serie_a()),
        "qualita-vita" => Ok(qualita_vita()),
        "unesco" => Ok(unesco()),
        other => Err(ConfigError::UnknownPreset(other.to_string())),
    }
}

/// Final standings of the 2021-22 Serie A season.
pub fn serie_a() -> PipelineConfig {
    PipelineConfig {
        name: "serie-a".into(),
        source: SourceConfig::new("https://it.wikipedia.org/wiki/Serie_A_2021-2022"),
        branches: vec![BranchConfig {
            name: "standings".into(),
            parse: ParseSpec::Table {
                select: Lookup::ByPosition(4),
            },
            steps: vec![
                Step::DropColumns {
                    columns: vec!["Unnamed: 0".into()],
                    tolerant: false,
                },
                Step::Coerce {
                    column: "Pos.".into(),
                    kind: CoerceKind::Int,
                    on_failure: OnFailure::Fail,
                },
            ],
            sink: SinkConfig::csv("data.csv"),
        }],
    }
}

/// Il Sole 24 Ore quality-of-life ranking of Italian provinces, one page
/// per year.
pub fn qualita_vita() -> PipelineConfig {
    PipelineConfig {
        name: "qualita-vita".into(),
        source: SourceConfig {
            url: "https://lab24.ilsole24ore.com/qualita-della-vita/tabelle/{year}/classifica-finale"
                .into(),
            years: Some(YearRange {
                from: 1990,
                to: 2023,
            }),
            tag_column: Some("year".into()),
            on_item_failure: ItemFailure::Abort,
            timeout_secs: None,
        },
        branches: vec![BranchConfig {
            name: "scores".into(),
            parse: ParseSpec::EmbeddedJson {
                script: Lookup::ByPosition(18),
                variable: "datiTabella".into(),
                rows: "/righe".into(),
                fields: vec![FieldMap::new("nome", "name"), FieldMap::new("punti", "score")],
            },
            steps: vec![Step::Sort {
                by: vec![SortKey::asc("name"), SortKey::asc("year")],
            }],
            sink: SinkConfig::csv("data.csv"),
        }],
    }
}

/// UNESCO World Heritage statistics: sites by region and by country.
pub fn unesco() -> PipelineConfig {
    PipelineConfig {
        name: "unesco".into(),
        source: SourceConfig::new("https://whc.unesco.org/en/list/stat/"),
        branches: vec![
            BranchConfig {
                name: "sites_by_region".into(),
                parse: ParseSpec::Table {
                    select: Lookup::ByPosition(2),
                },
                steps: vec![Step::ReplaceRegex {
                    columns: None,
                    // NBSP followed by a footnote asterisk
                    pattern: r"\x{A0}\*".into(),
                    replacement: String::new(),
                }],
                sink: SinkConfig::csv("sites_by_region.csv"),
            },
            BranchConfig {
                name: "sites_by_country".into(),
                parse: ParseSpec::Table {
                    select: Lookup::ByPosition(7),
                },
                steps: country_renames([
                    ("Netherlands (Kingdom of the)", "Netherlands"),
                    ("Türkiye", "Turkey"),
                ]),
                sink: SinkConfig::csv("sites_by_country.csv"),
            },
        ],
    }
}

fn country_renames<const N: usize>(pairs: [(&str, &str); N]) -> Vec<Step> {
    pairs
        .into_iter()
        .map(|(from, to)| Step::ReplaceExact {
            columns: None,
            from: from.into(),
            to: to.into(),
        })
        .collect()
}
