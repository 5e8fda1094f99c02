use scraper::ElementRef;

/// Collapse runs of ASCII whitespace to a single space and trim.
/// Non-breaking spaces are content and survive untouched.
pub fn collapse_ws(raw: &str) -> String {
    raw.split_ascii_whitespace().collect::<Vec<_>>().join(" ")
}

/// All text below `el`, whitespace-collapsed.
pub fn element_text(el: &ElementRef<'_>) -> String {
    collapse_ws(&el.text().collect::<String>())
}

/// Integer attribute such as `colspan`, defaulting to 1 when absent or junk.
pub fn span_attr(el: &ElementRef<'_>, name: &str) -> usize {
    el.value()
        .attr(name)
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(1)
}
