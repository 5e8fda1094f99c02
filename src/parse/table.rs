// src/parse/table.rs

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, instrument};

use super::text::{element_text, span_attr};
use super::Lookup;
use crate::data::{Dataset, Value};
use crate::error::ParseError;

static TABLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("table").expect("table selector should parse"));

struct Cell {
    text: String,
    colspan: usize,
    rowspan: usize,
}

/// Every table carrying visible text, in document order (nested tables
/// included), converted to datasets.
pub fn extract_tables(html: &str) -> Vec<Dataset> {
    let doc = Html::parse_document(html);
    candidates(&doc).into_iter().map(table_to_dataset).collect()
}

/// Convert the table chosen by `lookup`.
#[instrument(level = "debug", skip(html), fields(html_len = html.len()))]
pub fn parse_table(html: &str, lookup: &Lookup) -> Result<Dataset, ParseError> {
    let doc = Html::parse_document(html);
    let tables = candidates(&doc);
    debug!(count = tables.len(), "tables on page");

    match lookup.pick(&tables)? {
        Some(table) => Ok(table_to_dataset(table)),
        None => Err(match lookup {
            Lookup::ByPosition(index) => ParseError::NoTableAtIndex {
                index: *index,
                found: tables.len(),
            },
            other => ParseError::NoMatchingElement {
                element: "table",
                lookup: other.to_string(),
            },
        }),
    }
}

fn candidates(doc: &Html) -> Vec<ElementRef<'_>> {
    doc.select(&TABLE)
        .filter(|t| t.text().any(|s| !s.trim().is_empty()))
        .collect()
}

fn child_elements<'a>(el: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    el.children().filter_map(ElementRef::wrap)
}

fn rows_in<'a>(section: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    child_elements(section).filter(|e| e.value().name() == "tr")
}

fn cell_elements<'a>(tr: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    child_elements(tr).filter(|e| matches!(e.value().name(), "td" | "th"))
}

fn is_all_th(tr: ElementRef<'_>) -> bool {
    let mut any = false;
    for cell in cell_elements(tr) {
        if cell.value().name() != "th" {
            return false;
        }
        any = true;
    }
    any
}

fn cells(tr: ElementRef<'_>) -> Vec<Cell> {
    cell_elements(tr)
        .map(|td| Cell {
            text: element_text(&td),
            colspan: span_attr(&td, "colspan"),
            rowspan: span_attr(&td, "rowspan"),
        })
        .collect()
}

fn table_to_dataset(table: ElementRef<'_>) -> Dataset {
    let mut head = Vec::new();
    let mut body = Vec::new();
    let mut foot = Vec::new();
    for child in child_elements(table) {
        match child.value().name() {
            "thead" => head.extend(rows_in(child)),
            "tbody" => body.extend(rows_in(child)),
            "tfoot" => foot.extend(rows_in(child)),
            "tr" => body.push(child),
            _ => {}
        }
    }
    // no <thead>: leading all-<th> rows are the header
    if head.is_empty() {
        let n = body.iter().take_while(|tr| is_all_th(**tr)).count();
        head = body.drain(..n).collect();
    }
    body.extend(foot);

    let header = expand_spans(head.into_iter().map(cells).collect());
    let body: Vec<Vec<String>> = expand_spans(body.into_iter().map(cells).collect())
        .into_iter()
        .filter(|r| !r.is_empty())
        .collect();

    let width = header
        .iter()
        .chain(body.iter())
        .map(Vec::len)
        .max()
        .unwrap_or(0);

    let mut ds = Dataset::new(column_names(&header, width));
    for row in body {
        ds.push_row(
            row.into_iter()
                .map(|t| if t.is_empty() { Value::Null } else { Value::Text(t) })
                .collect(),
        );
    }
    ds
}

/// Repeat each cell across its `colspan` columns and down its `rowspan` rows.
fn expand_spans(rows: Vec<Vec<Cell>>) -> Vec<Vec<String>> {
    let mut out = Vec::with_capacity(rows.len());
    // (column, text, rows left to fill)
    let mut pending: VecDeque<(usize, String, usize)> = VecDeque::new();

    for row in rows {
        let mut texts = Vec::new();
        let mut next = VecDeque::new();
        let mut col = 0;

        for cell in row {
            while matches!(pending.front(), Some((c, _, _)) if *c <= col) {
                if let Some((c, text, left)) = pending.pop_front() {
                    texts.push(text.clone());
                    if left > 1 {
                        next.push_back((c, text, left - 1));
                    }
                    col += 1;
                }
            }
            for _ in 0..cell.colspan {
                texts.push(cell.text.clone());
                if cell.rowspan > 1 {
                    next.push_back((col, cell.text.clone(), cell.rowspan - 1));
                }
                col += 1;
            }
        }
        for (c, text, left) in pending.drain(..) {
            texts.push(text.clone());
            if left > 1 {
                next.push_back((c, text, left - 1));
            }
        }

        out.push(texts);
        pending = next;
    }

    // rows that only exist because a rowspan ran past the last <tr>
    while !pending.is_empty() {
        let mut texts = Vec::new();
        let mut next = VecDeque::new();
        for (c, text, left) in pending.drain(..) {
            texts.push(text.clone());
            if left > 1 {
                next.push_back((c, text, left - 1));
            }
        }
        out.push(texts);
        pending = next;
    }

    out
}

fn column_names(header: &[Vec<String>], width: usize) -> Vec<String> {
    let mut names = Vec::with_capacity(width);
    for i in 0..width {
        let mut parts: Vec<&str> = Vec::new();
        for row in header {
            if let Some(t) = row.get(i) {
                if !t.is_empty() && !parts.contains(&t.as_str()) {
                    parts.push(t);
                }
            }
        }
        names.push(if !parts.is_empty() {
            parts.join(" ")
        } else if header.is_empty() {
            i.to_string()
        } else {
            format!("Unnamed: {}", i)
        });
    }
    mangle_duplicates(names)
}

/// `A, A, A` → `A, A.1, A.2`
fn mangle_duplicates(names: Vec<String>) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut used: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(names.len());

    for name in names {
        let mut candidate = name.clone();
        if used.contains(&candidate) {
            let n = counts.entry(name.clone()).or_insert(0);
            loop {
                *n += 1;
                candidate = format!("{}.{}", name, n);
                if !used.contains(&candidate) {
                    break;
                }
            }
        }
        used.insert(candidate.clone());
        out.push(candidate);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const STANDINGS: &str = r#"<html><body>
        <table class="wikitable">
          <tr><th>Pos.</th><th>Team</th></tr>
          <tr><td>1</td><td>A</td></tr>
          <tr><td>2</td><td>B</td></tr>
        </table>
    </body></html>"#;

    #[test]
    fn test_single_table_fixture() {
        let ds = parse_table(STANDINGS, &Lookup::ByPosition(0)).unwrap();
        assert_eq!(ds.columns(), &["Pos.", "Team"]);
        assert_eq!(
            ds.rows(),
            &[
                vec![Value::text("1"), Value::text("A")],
                vec![Value::text("2"), Value::text("B")],
            ]
        );
    }

    #[test]
    fn test_index_past_last_table_fails() {
        let err = parse_table(STANDINGS, &Lookup::ByPosition(4)).unwrap_err();
        assert!(matches!(
            err,
            ParseError::NoTableAtIndex { index: 4, found: 1 }
        ));
    }

    #[test]
    fn test_spans_and_unnamed_headers() {
        let html = r#"<table>
          <thead><tr><th></th><th>Region</th><th colspan="2">Sites</th></tr></thead>
          <tbody>
            <tr><td rowspan="2">x</td><td>Europe</td><td>1</td><td>2</td></tr>
            <tr><td>Asia</td><td>3</td><td>4</td></tr>
          </tbody>
        </table>"#;
        let ds = parse_table(html, &Lookup::ByPosition(0)).unwrap();
        assert_eq!(ds.columns(), &["Unnamed: 0", "Region", "Sites", "Sites.1"]);
        assert_eq!(
            ds.rows()[1],
            vec![
                Value::text("x"),
                Value::text("Asia"),
                Value::text("3"),
                Value::text("4")
            ]
        );
    }

    #[test]
    fn test_textless_tables_do_not_count() {
        let html = r#"<table><tr><td> </td></tr></table>
            <table><tr><td>a</td><td></td></tr></table>"#;
        let tables = extract_tables(html);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].columns(), &["0", "1"]);
        assert_eq!(tables[0].rows()[0], vec![Value::text("a"), Value::Null]);
    }

    #[test]
    fn test_alternative_lookups() {
        let html = r#"<table><tr><td>noise</td></tr></table>
            <table id="stats"><tr><th>Region</th></tr><tr><td>Africa</td></tr></table>"#;

        let by_sel = parse_table(html, &Lookup::BySelector("#stats".into())).unwrap();
        let by_text = parse_table(html, &Lookup::ByText("Region".into())).unwrap();
        assert_eq!(by_sel, by_text);
        assert_eq!(by_sel.columns(), &["Region"]);

        let err = parse_table(html, &Lookup::ByText("Oceania".into())).unwrap_err();
        assert!(matches!(err, ParseError::NoMatchingElement { .. }));
    }

    #[test]
    fn test_whitespace_is_collapsed_in_cells() {
        let html = "<table><tr><th>Name</th></tr><tr><td>\n  Italy\u{A0}*\n</td></tr></table>";
        let ds = parse_table(html, &Lookup::ByPosition(0)).unwrap();
        assert_eq!(ds.rows()[0][0], Value::text("Italy\u{A0}*"));
    }
}
