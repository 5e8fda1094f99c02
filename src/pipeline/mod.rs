// src/pipeline/mod.rs

use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    fs,
    ops::RangeInclusive,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::{info, instrument, warn};

use crate::data::{Dataset, Value};
use crate::emit::{write_csv, SinkConfig};
use crate::error::{ConfigError, PipelineError};
use crate::fetch::Fetcher;
use crate::parse::ParseSpec;
use crate::transform::{apply_all, Step};

pub mod presets;

pub use presets::{preset, PRESETS};

/// Placeholder substituted with the loop year in `SourceConfig::url`.
pub const YEAR_PLACEHOLDER: &str = "{year}";

/// Inclusive year range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub from: i32,
    pub to: i32,
}

impl YearRange {
    pub fn iter(&self) -> RangeInclusive<i32> {
        self.from..=self.to
    }
}

/// What a failing iteration of a year loop does to the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemFailure {
    #[default]
    Abort,
    /// Log, record in the summary, and carry on with the next item.
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub years: Option<YearRange>,
    /// Column that receives the loop year on every parsed row.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_column: Option<String>,
    #[serde(default)]
    pub on_item_failure: ItemFailure,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl SourceConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            years: None,
            tag_column: None,
            on_item_failure: ItemFailure::default(),
            timeout_secs: None,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// One `(year, url)` per fetch, in order.
    pub fn items(&self) -> Vec<(Option<i32>, String)> {
        match self.years {
            Some(range) => range
                .iter()
                .map(|y| (Some(y), self.url.replace(YEAR_PLACEHOLDER, &y.to_string())))
                .collect(),
            None => vec![(None, self.url.clone())],
        }
    }
}

/// Parse, clean and write one output from a shared payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchConfig {
    pub name: String,
    pub parse: ParseSpec,
    #[serde(default)]
    pub steps: Vec<Step>,
    pub sink: SinkConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    pub source: SourceConfig,
    pub branches: Vec<BranchConfig>,
}

impl PipelineConfig {
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = serde_yaml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.branches.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "pipeline `{}` has no branches",
                self.name
            )));
        }
        let templated = self.source.url.contains(YEAR_PLACEHOLDER);
        match self.source.years {
            Some(r) if r.from > r.to => {
                return Err(ConfigError::Invalid(format!(
                    "empty year range {}..={}",
                    r.from, r.to
                )))
            }
            Some(_) if !templated => {
                return Err(ConfigError::Invalid(format!(
                    "year range given but url has no {YEAR_PLACEHOLDER} placeholder"
                )))
            }
            None if templated => {
                return Err(ConfigError::Invalid(format!(
                    "url contains {YEAR_PLACEHOLDER} but no year range is set"
                )))
            }
            _ => {}
        }
        if self.source.tag_column.is_some() && self.source.years.is_none() {
            return Err(ConfigError::Invalid(
                "tag_column needs a year range".to_string(),
            ));
        }

        let mut names = HashSet::new();
        let mut paths = HashSet::new();
        for b in &self.branches {
            if !names.insert(b.name.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate branch `{}`", b.name)));
            }
            if !paths.insert(b.sink.path.as_path()) {
                return Err(ConfigError::Invalid(format!(
                    "branches share output {:?}",
                    b.sink.path
                )));
            }
        }
        Ok(())
    }

    /// Resolve relative sink paths against `dir`.
    pub fn with_output_dir(mut self, dir: impl AsRef<Path>) -> Self {
        for b in self.branches.iter_mut() {
            if b.sink.path.is_relative() {
                b.sink.path = dir.as_ref().join(&b.sink.path);
            }
        }
        self
    }
}

/// An iteration left out under `ItemFailure::Skip`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedItem {
    pub year: Option<i32>,
    pub url: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub outputs: Vec<PathBuf>,
    pub skipped: Vec<SkippedItem>,
}

/// Fetch every item, parse it once per branch, then clean and write each
/// branch. Nothing is written unless every branch made it through its steps.
#[instrument(skip_all, fields(pipeline = %config.name))]
pub fn run(config: &PipelineConfig, fetcher: &dyn Fetcher) -> Result<RunSummary, PipelineError> {
    config.validate()?;

    let mut acc = vec![Dataset::default(); config.branches.len()];
    let mut summary = RunSummary::default();
    let mut succeeded = 0;
    let mut last_err = None;

    for (year, url) in config.source.items() {
        if let Some(y) = year {
            info!("parsing year {}", y);
        }
        match fetch_item(config, fetcher, &url, year) {
            Ok(parsed) => {
                for (acc, ds) in acc.iter_mut().zip(parsed) {
                    acc.append(ds);
                }
                succeeded += 1;
            }
            Err(e) if config.source.on_item_failure == ItemFailure::Skip => {
                warn!(?year, %url, error = %e, "skipping item");
                summary.skipped.push(SkippedItem {
                    year,
                    url,
                    error: e.to_string(),
                });
                last_err = Some(e);
            }
            Err(e) => return Err(e),
        }
    }
    if succeeded == 0 {
        if let Some(e) = last_err {
            return Err(e);
        }
    }

    for (branch, ds) in config.branches.iter().zip(acc.iter_mut()) {
        apply_all(&branch.steps, ds)?;
        info!(branch = %branch.name, rows = ds.len(), columns = ds.width(), "cleaned");
    }
    for (branch, ds) in config.branches.iter().zip(&acc) {
        summary.outputs.push(write_csv(ds, &branch.sink)?);
    }

    info!(
        outputs = summary.outputs.len(),
        skipped = summary.skipped.len(),
        "run finished"
    );
    Ok(summary)
}

fn fetch_item(
    config: &PipelineConfig,
    fetcher: &dyn Fetcher,
    url: &str,
    year: Option<i32>,
) -> Result<Vec<Dataset>, PipelineError> {
    let payload = fetcher.get_text(url)?;
    config
        .branches
        .iter()
        .map(|branch| -> Result<Dataset, PipelineError> {
            let mut ds = branch.parse.parse(&payload)?;
            if let (Some(tag), Some(y)) = (&config.source.tag_column, year) {
                ds.set_constant(tag, Value::Int(i64::from(y)));
            }
            Ok(ds)
        })
        .collect()
}
