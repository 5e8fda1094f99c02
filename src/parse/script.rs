// src/parse/script.rs

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value as Json;
use tracing::{debug, instrument, trace};

use super::{FieldMap, Lookup};
use crate::data::{Dataset, Value};
use crate::error::ParseError;

static SCRIPT: Lazy<Selector> =
    Lazy::new(|| Selector::parse("script").expect("script selector should parse"));

/// Locate the script block chosen by `lookup` and decode the JSON literal
/// assigned to `variable` inside it.
#[instrument(level = "debug", skip(html), fields(html_len = html.len()))]
pub fn parse_embedded_json(html: &str, lookup: &Lookup, variable: &str) -> Result<Json, ParseError> {
    let doc = Html::parse_document(html);
    let scripts: Vec<_> = doc.select(&SCRIPT).collect();
    debug!(count = scripts.len(), "script blocks on page");

    let block = lookup.pick(&scripts)?.ok_or_else(|| ParseError::PatternNotFound {
        pattern: format!("{}=…;", variable),
        detail: format!("no script block at {} ({} on page)", lookup, scripts.len()),
    })?;

    let source: String = block.text().collect();
    extract_assignment(&source, variable)
}

/// Find `<variable>=<JSON literal>;` in `source` and decode the literal.
pub fn extract_assignment(source: &str, variable: &str) -> Result<Json, ParseError> {
    let pattern = format!(r"{}\s*=\s*", regex::escape(variable));
    let not_found = |detail: &str| ParseError::PatternNotFound {
        pattern: format!("{}=…;", variable),
        detail: detail.to_string(),
    };
    let re = Regex::new(&pattern).map_err(|e| not_found(&e.to_string()))?;

    // skip `==` comparisons
    let start = re
        .find_iter(source)
        .map(|m| m.end())
        .find(|&end| !source[end..].starts_with('='))
        .ok_or_else(|| not_found("no assignment in script block"))?;
    trace!(offset = start, "assignment found");

    let rest = &source[start..];
    let mut stream = serde_json::Deserializer::from_str(rest).into_iter::<Json>();
    let value = match stream.next() {
        Some(Ok(v)) => v,
        Some(Err(source)) => {
            return Err(ParseError::MalformedJson {
                variable: variable.to_string(),
                source,
            })
        }
        None => return Err(not_found("nothing assigned")),
    };

    if !rest[stream.byte_offset()..].trim_start().starts_with(';') {
        return Err(not_found("assignment is not terminated by `;`"));
    }
    Ok(value)
}

/// Flatten the array at JSON pointer `rows` into one record per element,
/// keeping only `fields`.
pub fn project(json: &Json, rows: &str, fields: &[FieldMap]) -> Result<Dataset, ParseError> {
    let not_array = || ParseError::NotAnArray {
        pointer: rows.to_string(),
    };
    let items = json.pointer(rows).and_then(Json::as_array).ok_or_else(not_array)?;

    let mut ds = Dataset::new(fields.iter().map(|f| f.to.clone()));
    for (index, item) in items.iter().enumerate() {
        let obj = item.as_object().ok_or_else(not_array)?;
        let row = fields
            .iter()
            .map(|f| {
                obj.get(&f.from)
                    .map(scalar)
                    .ok_or_else(|| ParseError::MissingField {
                        index,
                        field: f.from.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        ds.push_row(row);
    }
    debug!(rows = ds.len(), "projected JSON records");
    Ok(ds)
}

fn scalar(v: &Json) -> Value {
    match v {
        Json::Null => Value::Null,
        Json::String(s) => Value::Text(s.clone()),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
        },
        Json::Bool(b) => Value::Text(b.to_string()),
        other => Value::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(filler_scripts: usize, payload: &str) -> String {
        let mut html = String::from("<html><head>");
        for i in 0..filler_scripts {
            html.push_str(&format!("<script>var x{} = {};</script>", i, i));
        }
        html.push_str(&format!("<script>{}</script></head><body></body></html>", payload));
        html
    }

    const PAYLOAD: &str = r#"var datiTabella={"righe":[{"nome":"Bologna","punti":612.5,"pos":1},{"nome":"Milano; centro","punti":600,"pos":2}]};"#;

    #[test]
    fn test_extracts_and_projects() {
        let html = page(18, PAYLOAD);
        let json = parse_embedded_json(&html, &Lookup::ByPosition(18), "datiTabella").unwrap();
        let ds = project(
            &json,
            "/righe",
            &[FieldMap::new("nome", "name"), FieldMap::new("punti", "score")],
        )
        .unwrap();

        assert_eq!(ds.columns(), &["name", "score"]);
        assert_eq!(
            ds.rows(),
            &[
                vec![Value::text("Bologna"), Value::Float(612.5)],
                vec![Value::text("Milano; centro"), Value::Int(600)],
            ]
        );
    }

    #[test]
    fn test_missing_script_block_is_pattern_not_found() {
        let html = page(3, PAYLOAD);
        let err = parse_embedded_json(&html, &Lookup::ByPosition(18), "datiTabella").unwrap_err();
        assert!(matches!(err, ParseError::PatternNotFound { .. }));
    }

    #[test]
    fn test_wrong_script_block_is_pattern_not_found() {
        let html = page(18, PAYLOAD);
        let err = parse_embedded_json(&html, &Lookup::ByPosition(2), "datiTabella").unwrap_err();
        assert!(matches!(err, ParseError::PatternNotFound { .. }));
    }

    #[test]
    fn test_malformed_literal() {
        let err = extract_assignment(r#"datiTabella={"righe":[{"nome":}]};"#, "datiTabella")
            .unwrap_err();
        assert!(matches!(err, ParseError::MalformedJson { .. }));
    }

    #[test]
    fn test_comparison_is_not_an_assignment() {
        let src = r#"if (datiTabella == null) {} datiTabella = {"righe": []};"#;
        let json = extract_assignment(src, "datiTabella").unwrap();
        assert_eq!(json["righe"], serde_json::json!([]));
    }

    #[test]
    fn test_lookup_by_text_finds_the_block() {
        let html = page(5, PAYLOAD);
        let json =
            parse_embedded_json(&html, &Lookup::ByText("datiTabella".into()), "datiTabella").unwrap();
        assert!(json["righe"].is_array());
    }

    #[test]
    fn test_missing_field() {
        let json = serde_json::json!({"righe": [{"nome": "Roma"}]});
        let err = project(&json, "/righe", &[FieldMap::new("punti", "score")]).unwrap_err();
        assert!(matches!(err, ParseError::MissingField { index: 0, .. }));
    }
}
