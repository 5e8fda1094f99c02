// src/emit/mod.rs

use csv::WriterBuilder;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;
use tracing::{info, instrument};

use crate::data::Dataset;
use crate::error::EmitError;
use crate::parse::delimiter_byte;

pub mod chart;

pub use chart::render_bars;

fn default_delimiter() -> char {
    ','
}

/// Where and how a dataset is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkConfig {
    pub path: PathBuf,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    /// Prepend a 0-based row number column with an empty header.
    #[serde(default)]
    pub include_index: bool,
}

impl SinkConfig {
    pub fn csv(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delimiter: default_delimiter(),
            include_index: false,
        }
    }
}

/// Encode `ds` (header first) into `out`.
pub(crate) fn write_delimited<W: Write>(
    ds: &Dataset,
    out: W,
    delimiter: u8,
    include_index: bool,
) -> Result<(), csv::Error> {
    let mut w = WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(out);

    let index_header = include_index.then_some("");
    w.write_record(index_header.into_iter().chain(ds.columns().iter().map(String::as_str)))?;
    for (i, row) in ds.rows().iter().enumerate() {
        let index = include_index.then(|| i.to_string());
        w.write_record(index.into_iter().chain(row.iter().map(|v| v.to_string())))?;
    }
    w.flush()?;
    Ok(())
}

/// Write `ds` to `sink.path`. The parent directory must exist; the file
/// is written next to the destination and renamed into place, so a failed
/// run never leaves a partial file behind.
///
/// Reading the file back is lossy in two places: empty text and null both
/// become an empty field (read back as null), and numeric-looking text reads
/// back as a number when types are inferred.
#[instrument(skip(ds), fields(path = %sink.path.display(), rows = ds.len()))]
pub fn write_csv(ds: &Dataset, sink: &SinkConfig) -> Result<PathBuf, EmitError> {
    let delimiter =
        delimiter_byte(sink.delimiter).ok_or(EmitError::InvalidDelimiter(sink.delimiter))?;
    let path = sink.path.as_path();
    write_atomic(path, |file| {
        write_delimited(ds, file, delimiter, sink.include_index).map_err(|source| {
            EmitError::Csv {
                path: path.to_path_buf(),
                source,
            }
        })
    })?;

    info!(columns = ds.width(), "wrote file");
    Ok(path.to_path_buf())
}

/// Write `contents` to `path`, same guarantees as `write_csv`.
pub fn write_text(path: impl AsRef<Path>, contents: &str) -> Result<PathBuf, EmitError> {
    let path = path.as_ref();
    write_atomic(path, |file| {
        file.write_all(contents.as_bytes())
            .map_err(|source| EmitError::Io {
                path: path.to_path_buf(),
                source,
            })
    })?;
    Ok(path.to_path_buf())
}

fn write_atomic<F>(path: &Path, fill: F) -> Result<(), EmitError>
where
    F: FnOnce(&mut File) -> Result<(), EmitError>,
{
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let io_err = |source| EmitError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
    fill(tmp.as_file_mut())?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Value;
    use crate::parse::read_csv_file;
    use std::fs;
    use tempfile::tempdir;

    fn standings() -> Dataset {
        Dataset::from_rows(
            ["Pos.", "Team", "Pts"],
            vec![
                vec![Value::Int(1), "A".into(), Value::Float(86.0)],
                vec![Value::Int(2), "B".into(), Value::Null],
            ],
        )
    }

    #[test]
    fn test_scenario_line_two() {
        let tmp = tempdir().unwrap();
        let ds = Dataset::from_rows(
            ["Pos.", "Team"],
            vec![vec![Value::Int(1), "A".into()], vec![Value::Int(2), "B".into()]],
        );
        let path = write_csv(&ds, &SinkConfig::csv(tmp.path().join("data.csv"))).unwrap();
        let text = fs::read_to_string(path).unwrap();
        assert_eq!(text.lines().nth(1), Some("1,A"));
        assert_eq!(text, "Pos.,Team\n1,A\n2,B\n");
    }

    #[test]
    fn test_round_trip() {
        let tmp = tempdir().unwrap();
        let ds = standings();
        let path = write_csv(&ds, &SinkConfig::csv(tmp.path().join("out.csv"))).unwrap();

        let back = read_csv_file(&path, true).unwrap();
        assert_eq!(back.columns(), ds.columns());
        assert_eq!(back.rows(), ds.rows());
    }

    #[test]
    fn test_round_trip_loses_empty_text_and_text_numbers() {
        let tmp = tempdir().unwrap();
        let ds = Dataset::from_rows(
            ["note", "code"],
            vec![vec![Value::text(""), "98".into()], vec![Value::Null, "x".into()]],
        );
        let path = write_csv(&ds, &SinkConfig::csv(tmp.path().join("lossy.csv"))).unwrap();

        let back = read_csv_file(&path, true).unwrap();
        assert_eq!(
            back.rows(),
            &[
                vec![Value::Null, Value::Int(98)],
                vec![Value::Null, Value::text("x")],
            ]
        );
        let untyped = read_csv_file(&path, false).unwrap();
        assert_eq!(untyped.rows()[0][1], Value::text("98"));
    }

    #[test]
    fn test_non_ascii_delimiter_rejected() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("data.csv");
        let sink = SinkConfig {
            delimiter: '§',
            ..SinkConfig::csv(&path)
        };
        let err = write_csv(&standings(), &sink).unwrap_err();
        assert!(matches!(err, EmitError::InvalidDelimiter('§')));
        assert!(!path.exists());
    }

    #[test]
    fn test_index_column() {
        let mut buf = Vec::new();
        write_delimited(&standings(), &mut buf, b';', true).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            ";Pos.;Team;Pts\n0;1;A;86.0\n1;2;B;\n"
        );
    }

    #[test]
    fn test_missing_directory_writes_nothing() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("nope").join("data.csv");
        let err = write_csv(&standings(), &SinkConfig::csv(&path)).unwrap_err();
        assert!(matches!(err, EmitError::Io { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn test_write_text_replaces() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("chart.txt");
        write_text(&path, "old").unwrap();
        write_text(&path, "new\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new\n");
    }

    #[test]
    fn test_sink_yaml_defaults() {
        let sink: SinkConfig = serde_yaml::from_str("path: out/data.csv").unwrap();
        assert_eq!(sink, SinkConfig::csv("out/data.csv"));
    }
}
