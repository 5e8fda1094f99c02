use chrono::NaiveDate;

/// Lenient date parse for hand-entered release dates.
///
/// Accepts `YYYY-MM-DD`, `YYYY/MM/DD`, `YYYY-MM`, `YYYY` and `MM/DD/YYYY`,
/// plus ISO datetimes (the time part is dropped). Missing month/day default
/// to the first, so `"1993"` is 1993-01-01.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    // `2008-05-12T10:00:00` / `2008-05-12 10:00:00`
    let s = match s.find(|c: char| c == 'T' || c == ' ') {
        Some(i) if i >= 4 => &s[..i],
        _ => s,
    };
    let b = s.as_bytes();

    if b.len() == 4 && b.iter().all(u8::is_ascii_digit) {
        let year: i32 = s.parse().ok()?;
        return NaiveDate::from_ymd_opt(year, 1, 1);
    }

    if b.len() == 7 && b[4] == b'-' {
        let year: i32 = s[0..4].parse().ok()?;
        let month: u32 = s[5..7].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, 1);
    }

    ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_partial_dates() {
        assert_eq!(parse_date("1993"), Some(ymd(1993, 1, 1)));
        assert_eq!(parse_date("1994-02"), Some(ymd(1994, 2, 1)));
        assert_eq!(parse_date("1994-02-01"), Some(ymd(1994, 2, 1)));
        assert_eq!(parse_date("2011/7/4"), Some(ymd(2011, 7, 4)));
        assert_eq!(parse_date("2008-05-12T10:00:00Z"), Some(ymd(2008, 5, 12)));
    }

    #[test]
    fn test_rejects_junk() {
        assert_eq!(parse_date("not-a-date"), None);
        assert_eq!(parse_date("2005-13-01"), None);
        assert_eq!(parse_date("2005-02-30"), None);
        assert_eq!(parse_date(""), None);
    }
}
