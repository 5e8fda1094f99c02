use std::fmt::Write;

use crate::data::Dataset;
use crate::error::TransformError;

/// Horizontal text bar chart of a frequency table. Each line reads
/// `label - 12.3% |#####`, bars scaled so the largest count spans `width`.
/// Rows whose count is not numeric are skipped.
pub fn render_bars(
    table: &Dataset,
    label: &str,
    count: &str,
    width: usize,
    title: Option<&str>,
) -> Result<String, TransformError> {
    let labels = table.column(label)?;
    let counts = table.column(count)?;

    let bars: Vec<(String, f64)> = labels
        .iter()
        .zip(&counts)
        .filter_map(|(l, c)| c.as_f64().map(|n| (l.to_string(), n)))
        .collect();
    let total: f64 = bars.iter().map(|(_, n)| n).sum();
    let max = bars.iter().map(|(_, n)| *n).fold(0.0, f64::max);

    let legends: Vec<String> = bars
        .iter()
        .map(|(l, n)| {
            let share = if total > 0.0 { n / total * 100.0 } else { 0.0 };
            format!("{l} - {share:.1}%")
        })
        .collect();
    let pad = legends.iter().map(|s| s.chars().count()).max().unwrap_or(0);

    let mut out = String::new();
    if let Some(t) = title {
        let _ = writeln!(out, "{t}");
    }
    for (legend, (_, n)) in legends.iter().zip(&bars) {
        let len = if max > 0.0 {
            (n / max * width as f64).round() as usize
        } else {
            0
        };
        let _ = writeln!(out, "{legend:<pad$} |{}", "#".repeat(len));
    }
    Ok(out)
}
