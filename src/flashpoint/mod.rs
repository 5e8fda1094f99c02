//! Descriptive statistics over the Flashpoint game catalogue.
//!
//! Downloads the Flashpoint SQLite database, loads the `game` table and
//! writes a set of frequency tables (developers, publishers, platforms,
//! languages, genres), a cleaned list of release dates, a year × platform
//! count matrix and, when the play-count export is present, the most played
//! games. Each frequency table also gets a text bar chart.

use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::{info, instrument};

use crate::data::Dataset;
use crate::emit::{render_bars, write_csv, write_text, SinkConfig};
use crate::error::{ConfigError, EmitError, PipelineError, TransformError};
use crate::fetch::{download, Fetcher};
use crate::parse::{read_csv_file, read_sqlite_table};
use crate::transform::{CoerceKind, OnFailure, Predicate, SortKey, COUNT_COLUMN};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlashpointConfig {
    pub database_url: String,
    pub database_path: PathBuf,
    pub table: String,
    pub keep_columns: Vec<String>,
    /// CSV export of the play-count statistics (`category`, `Play Count`).
    pub most_played_path: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub top_n: usize,
    pub top_platforms: usize,
    pub most_played_limit: usize,
    /// Unparseable release dates are nulled (and then dropped) by default.
    pub release_date_failure: OnFailure,
    /// Rows cut from the ends of the date-sorted release list. Tuned to one
    /// snapshot of the database (a test entry first, a typo last).
    pub discard_leading: usize,
    pub discard_trailing: usize,
    /// Separators inside the multi-valued `language` and `tagsStr` fields.
    pub list_delimiters: Vec<String>,
    pub excluded_languages: Vec<String>,
    pub highlight_platform: String,
    pub chart_width: usize,
    pub timeout_secs: Option<u64>,
}

impl Default for FlashpointConfig {
    fn default() -> Self {
        Self {
            database_url: "http://infinity.unstable.life/Flashpoint/Data/flashpoint.sqlite".into(),
            database_path: PathBuf::from("data/flashpoint.sqlite"),
            table: "game".into(),
            keep_columns: [
                "id",
                "title",
                "developer",
                "publisher",
                "platform",
                "releaseDate",
                "language",
                "library",
                "tagsStr",
            ]
            .map(String::from)
            .to_vec(),
            most_played_path: Some(PathBuf::from("data/most_played.csv")),
            output_dir: PathBuf::from("output"),
            top_n: 10,
            top_platforms: 5,
            most_played_limit: 40,
            release_date_failure: OnFailure::Null,
            discard_leading: 1,
            discard_trailing: 1,
            list_delimiters: vec![";".into(), ",".into()],
            excluded_languages: vec!["en".into()],
            highlight_platform: "Flash".into(),
            chart_width: 40,
            timeout_secs: None,
        }
    }
}

impl FlashpointConfig {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_yaml::from_str(&text)?)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// A named output table, with a chart when it is a frequency table.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub name: &'static str,
    pub table: Dataset,
    pub chart: Option<String>,
}

/// Every section of the analysis, in output order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    pub sections: Vec<Section>,
}

impl Report {
    pub fn get(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }
}

/// Download (unless `skip_download`), analyze and write every section to
/// `config.output_dir`. Returns the written paths.
#[instrument(skip_all, fields(db = %config.database_path.display()))]
pub fn run(
    config: &FlashpointConfig,
    fetcher: &dyn Fetcher,
    skip_download: bool,
) -> Result<Vec<PathBuf>, PipelineError> {
    if skip_download {
        info!("using existing database");
    } else {
        download(fetcher, &config.database_url, &config.database_path)?;
    }

    let mut games = read_sqlite_table(&config.database_path, &config.table)?;
    games.select_columns(&config.keep_columns)?;
    let most_played = match &config.most_played_path {
        Some(p) => Some(read_csv_file(p, true)?),
        None => None,
    };

    let report = analyze(&games, most_played.as_ref(), config)?;

    let dir = &config.output_dir;
    fs::create_dir_all(dir).map_err(|source| EmitError::Io {
        path: dir.clone(),
        source,
    })?;
    let mut written = Vec::new();
    for section in &report.sections {
        let csv = dir.join(format!("{}.csv", section.name));
        written.push(write_csv(&section.table, &SinkConfig::csv(csv))?);
        if let Some(chart) = &section.chart {
            written.push(write_text(dir.join(format!("{}.txt", section.name)), chart)?);
        }
    }
    info!(files = written.len(), dir = %dir.display(), "report written");
    Ok(written)
}

/// Build the report from the (column-trimmed) `game` table and the optional
/// play-count table.
pub fn analyze(
    games: &Dataset,
    most_played: Option<&Dataset>,
    config: &FlashpointConfig,
) -> Result<Report, TransformError> {
    let mut report = Report::default();
    let n = config.top_n;
    let none: &[String] = &[];

    let developers = top_values(games, "developer", None, none, n)?;
    report.push_counted(config, "top_developers", "developer", developers, "Top developers distribution")?;
    let publishers = top_values(games, "publisher", None, none, n)?;
    report.push_counted(config, "top_publishers", "publisher", publishers, "Top publishers distribution")?;

    let dates = release_dates(games, config)?;

    let mut flash = dates.clone();
    flash.filter(&Predicate::Equals {
        column: "platform".into(),
        value: config.highlight_platform.clone(),
    })?;

    let platforms = top_values(&dates, "platform", None, none, config.top_platforms)?;
    let by_year = platforms_by_year(&dates, &platforms)?;

    report.push("release_dates", dates, None);
    report.push("flash_releases", flash, None);
    report.push_counted(config, "top_platforms", "platform", platforms, "Top platforms distribution")?;
    report.push("platforms_by_year", by_year, None);

    let delimiters = Some(config.list_delimiters.as_slice());
    let languages = top_values(games, "language", delimiters, &config.excluded_languages, n)?;
    report.push_counted(config, "top_languages", "language", languages, "Top languages distribution")?;
    let genres = top_values(games, "tagsStr", delimiters, none, n)?;
    report.push_counted(config, "top_genres", "tagsStr", genres, "Top genres distribution")?;

    if let Some(plays) = most_played {
        let ranked = most_played_games(games, plays, config.most_played_limit)?;
        report.push("most_played", ranked, None);
    }
    Ok(report)
}

impl Report {
    fn push(&mut self, name: &'static str, table: Dataset, chart: Option<String>) {
        info!(section = name, rows = table.len(), "section ready");
        self.sections.push(Section { name, table, chart });
    }

    fn push_counted(
        &mut self,
        config: &FlashpointConfig,
        name: &'static str,
        label: &str,
        table: Dataset,
        title: &str,
    ) -> Result<(), TransformError> {
        let chart = render_bars(&table, label, COUNT_COLUMN, config.chart_width, Some(title))?;
        self.push(name, table, Some(chart));
        Ok(())
    }
}

/// Most frequent non-empty values of `column`, optionally splitting
/// multi-valued cells first.
fn top_values(
    games: &Dataset,
    column: &str,
    delimiters: Option<&[String]>,
    exclude: &[String],
    n: usize,
) -> Result<Dataset, TransformError> {
    let mut values = Dataset::from_rows(
        [column],
        games.column(column)?.into_iter().map(|v| vec![v.clone()]).collect(),
    );
    values.filter(&Predicate::NonEmpty {
        column: column.into(),
    })?;
    if let Some(d) = delimiters {
        values.explode(column, d)?;
    }
    if !exclude.is_empty() {
        values.filter(&Predicate::Not(Box::new(Predicate::OneOf {
            column: column.into(),
            values: exclude.to_vec(),
        })))?;
    }
    let mut counts = values.value_counts(column)?;
    counts.head(n);
    Ok(counts)
}

/// Games with a usable release date, oldest first.
fn release_dates(games: &Dataset, config: &FlashpointConfig) -> Result<Dataset, TransformError> {
    let columns: Vec<String> = ["title", "releaseDate", "platform", "library"]
        .map(String::from)
        .to_vec();
    let mut dates = games.clone();
    dates.filter(&Predicate::NonEmpty {
        column: "releaseDate".into(),
    })?;
    dates.select_columns(&columns)?;
    dates.coerce("releaseDate", CoerceKind::Date, config.release_date_failure)?;
    dates.drop_nulls(&columns)?;
    dates.sort(&[SortKey::asc("releaseDate")])?;
    dates.trim_rows(config.discard_leading, config.discard_trailing);
    Ok(dates)
}

/// Release year × platform counts, restricted to the top platforms.
fn platforms_by_year(dates: &Dataset, top: &Dataset) -> Result<Dataset, TransformError> {
    let names: Vec<String> = top.column("platform")?.iter().map(|v| v.to_string()).collect();
    let mut ds = dates.clone();
    ds.filter(&Predicate::OneOf {
        column: "platform".into(),
        values: names,
    })?;
    ds.year_bucket("releaseDate")?;
    ds.rename_columns(&BTreeMap::from([("releaseDate".to_string(), "year".to_string())]))?;
    ds.pivot_counts("year", "platform")
}

fn most_played_games(games: &Dataset, plays: &Dataset, limit: usize) -> Result<Dataset, TransformError> {
    let mut plays = plays.clone();
    if plays.has_column("category") {
        plays.rename_columns(&BTreeMap::from([("category".to_string(), "id".to_string())]))?;
    }
    let mut ranked = games.inner_join(&plays, "id")?;
    ranked.sort(&[SortKey::desc("Play Count")])?;
    ranked.head(limit);
    Ok(ranked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Value;
    use crate::fetch::StaticFetcher;
    use rusqlite::Connection;
    use tempfile::tempdir;

    const GAMES: &str = "
        CREATE TABLE game (id TEXT, title TEXT, developer TEXT, publisher TEXT, platform TEXT,
                           releaseDate TEXT, language TEXT, library TEXT, tagsStr TEXT, notes TEXT);
        INSERT INTO game VALUES ('g1', 'Blastar', '', '', 'HTML5', '1984', 'en', 'arcade', 'Arcade; Shooter', 'x');
        INSERT INTO game VALUES ('g2', 'Idle Johnny', 'Dev A', 'Pub X', 'Shockwave', '1993', 'en', 'theatre', 'Comedy', 'x');
        INSERT INTO game VALUES ('g3', 'Claus.com', 'Dev A', 'Pub X', 'Flash', '1995-06-01', 'en; ja', 'arcade', 'Puzzle', 'x');
        INSERT INTO game VALUES ('g4', 'Age of War', 'Louissi', 'Armor Games', 'Flash', '2007-01-15', 'en,ko', 'arcade', 'Strategy; Arcade', 'x');
        INSERT INTO game VALUES ('g5', 'Poptropica', 'Pearson', 'Pearson', 'Flash', '2007', 'ja', 'arcade', 'Adventure,Arcade', 'x');
        INSERT INTO game VALUES ('g6', 'Bad Date', 'Dev A', 'Pub Y', 'Unity', 'not-a-date', 'it', 'arcade', '', 'x');
        INSERT INTO game VALUES ('g7', 'No Date', 'Dev B', '', 'HTML5', '', '', 'arcade', 'Puzzle', 'x');
        INSERT INTO game VALUES ('g8', 'Typo', 'Dev B', 'Pub Y', 'Flash', '2999-01-01', 'en', 'arcade', 'Arcade', 'x');
    ";

    fn setup(dir: &Path) -> FlashpointConfig {
        let db = dir.join("data").join("flashpoint.sqlite");
        fs::create_dir_all(db.parent().unwrap()).unwrap();
        Connection::open(&db).unwrap().execute_batch(GAMES).unwrap();
        let plays = dir.join("data").join("most_played.csv");
        fs::write(&plays, "category,Play Count\ng5,49000\ng4,1200\ngX,5\n").unwrap();

        FlashpointConfig {
            database_path: db,
            most_played_path: Some(plays),
            output_dir: dir.join("out"),
            chart_width: 10,
            ..FlashpointConfig::default()
        }
    }

    fn load(config: &FlashpointConfig) -> (Dataset, Dataset) {
        let mut games = read_sqlite_table(&config.database_path, "game").unwrap();
        games.select_columns(&config.keep_columns).unwrap();
        let plays = read_csv_file(config.most_played_path.as_ref().unwrap(), true).unwrap();
        (games, plays)
    }

    fn counts(report: &Report, name: &str) -> Vec<(String, i64)> {
        report
            .get(name)
            .unwrap()
            .table
            .rows()
            .iter()
            .map(|r| match &r[1] {
                Value::Int(n) => (r[0].to_string(), *n),
                other => panic!("count is {other:?}"),
            })
            .collect()
    }

    fn pairs(items: &[(&str, i64)]) -> Vec<(String, i64)> {
        items.iter().map(|(s, n)| (s.to_string(), *n)).collect()
    }

    #[test]
    fn test_frequency_tables() {
        let tmp = tempdir().unwrap();
        let config = setup(tmp.path());
        let (games, plays) = load(&config);
        let report = analyze(&games, Some(&plays), &config).unwrap();

        assert_eq!(
            counts(&report, "top_developers"),
            pairs(&[("Dev A", 3), ("Dev B", 2), ("Louissi", 1), ("Pearson", 1)])
        );
        assert_eq!(
            counts(&report, "top_languages"),
            pairs(&[("ja", 2), ("ko", 1), ("it", 1)])
        );
        assert_eq!(counts(&report, "top_genres")[0], ("Arcade".to_string(), 4));
        assert_eq!(
            counts(&report, "top_platforms"),
            pairs(&[("Flash", 3), ("Shockwave", 1)])
        );
    }

    #[test]
    fn test_release_dates_are_cleaned_and_trimmed() {
        let tmp = tempdir().unwrap();
        let config = setup(tmp.path());
        let (games, _) = load(&config);
        let report = analyze(&games, None, &config).unwrap();

        let dates = &report.get("release_dates").unwrap().table;
        assert_eq!(dates.columns(), &["title", "releaseDate", "platform", "library"]);
        let titles: Vec<String> = dates.column("title").unwrap().iter().map(|v| v.to_string()).collect();
        // Blastar (first) and Typo (last) are cut, Bad Date and No Date never make it
        assert_eq!(titles, vec!["Idle Johnny", "Claus.com", "Poptropica", "Age of War"]);
        assert_eq!(report.get("flash_releases").unwrap().table.len(), 3);
        assert!(report.get("most_played").is_none());

        let by_year = &report.get("platforms_by_year").unwrap().table;
        assert_eq!(by_year.columns(), &["year", "Flash", "Shockwave"]);
        assert_eq!(
            by_year.rows()[2],
            vec![Value::Int(2007), Value::Int(2), Value::Int(0)]
        );
    }

    #[test]
    fn test_run_writes_report() {
        let tmp = tempdir().unwrap();
        let config = setup(tmp.path());
        let written = run(&config, &StaticFetcher::new(), true).unwrap();

        let out = tmp.path().join("out");
        assert!(written.contains(&out.join("top_genres.txt")));
        let played = fs::read_to_string(out.join("most_played.csv")).unwrap();
        let lines: Vec<&str> = played.lines().collect();
        assert_eq!(
            lines[0],
            "id,title,developer,publisher,platform,releaseDate,language,library,tagsStr,Play Count"
        );
        assert!(lines[1].starts_with("g5,Poptropica,"));
        assert!(lines[2].starts_with("g4,Age of War,"));
        assert_eq!(lines.len(), 3);

        let dates = fs::read_to_string(out.join("release_dates.csv")).unwrap();
        assert_eq!(dates.lines().nth(1), Some("Idle Johnny,1993-01-01,Shockwave,theatre"));

        let chart = fs::read_to_string(out.join("top_platforms.txt")).unwrap();
        assert!(chart.contains("Flash - 75.0%"));
    }

    #[test]
    fn test_run_downloads_database() {
        let tmp = tempdir().unwrap();
        let seeded = setup(tmp.path());
        let bytes = fs::read(&seeded.database_path).unwrap();

        let config = FlashpointConfig {
            database_path: tmp.path().join("fresh").join("flashpoint.sqlite"),
            most_played_path: None,
            ..seeded
        };
        let fetcher = StaticFetcher::new().with(config.database_url.clone(), bytes);
        run(&config, &fetcher, false).unwrap();

        assert_eq!(fetcher.requests(), vec![config.database_url.clone()]);
        assert!(config.output_dir.join("top_developers.csv").exists());
        assert!(!config.output_dir.join("most_played.csv").exists());
    }

    #[test]
    fn test_config_yaml_defaults() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("fp.yaml");
        fs::write(&path, "top_n: 3\nmost_played_path: null\n").unwrap();
        let config = FlashpointConfig::from_yaml_file(&path).unwrap();
        assert_eq!(config.top_n, 3);
        assert_eq!(config.most_played_path, None);
        assert_eq!(config.table, "game");
        assert_eq!(config.release_date_failure, OnFailure::Null);
    }
}
