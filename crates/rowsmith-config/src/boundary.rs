use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

/// Accepted timestamp layouts, tried in order before the ISO-8601 fallback.
const TIMESTAMP_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%d.%m.%Y %H:%M:%S"];
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d.%m.%Y"];

/// Parse a range boundary into a timestamp.
///
/// Cascade: `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DD`, `YYYY-MM-DD HH:MM`,
/// `DD.MM.YYYY`, `DD.MM.YYYY HH:MM:SS`, then ISO-8601 (with `T`, fractional
/// seconds or an offset). Date-only values start at midnight.
pub fn parse_boundary_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(parsed) = NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMATS[0]) {
        return Some(parsed);
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, DATE_FORMATS[0]) {
        return Some(date.and_time(NaiveTime::MIN));
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMATS[1]) {
        return Some(parsed);
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, DATE_FORMATS[1]) {
        return Some(date.and_time(NaiveTime::MIN));
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMATS[2]) {
        return Some(parsed);
    }

    parse_iso(value)
}

/// Parse a range boundary into a calendar date using the same cascade.
pub fn parse_boundary_date(value: &str) -> Option<NaiveDate> {
    parse_boundary_timestamp(value).map(|parsed| parsed.date())
}

fn parse_iso(value: &str) -> Option<NaiveDateTime> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.naive_utc());
    }
    let normalized = value.replacen(' ', "T", 1);
    if let Ok(parsed) = DateTime::parse_from_rfc3339(&normalized) {
        return Some(parsed.naive_utc());
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(parsed);
    }
    NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(value: &str) -> String {
        parse_boundary_timestamp(value)
            .map(|parsed| parsed.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "none".to_string())
    }

    #[test]
    fn accepts_every_cascade_format() {
        assert_eq!(ts("2023-05-06 07:08:09"), "2023-05-06 07:08:09");
        assert_eq!(ts("2023-05-06"), "2023-05-06 00:00:00");
        assert_eq!(ts("2023-05-06 07:08"), "2023-05-06 07:08:00");
        assert_eq!(ts("06.05.2023"), "2023-05-06 00:00:00");
        assert_eq!(ts("06.05.2023 07:08:09"), "2023-05-06 07:08:09");
        assert_eq!(ts("2023-05-06T07:08:09"), "2023-05-06 07:08:09");
        assert_eq!(ts("2023-05-06T07:08:09.250"), "2023-05-06 07:08:09");
        assert_eq!(ts("2023-05-06T07:08:09+02:00"), "2023-05-06 05:08:09");
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(ts(""), "none");
        assert_eq!(ts("yesterday"), "none");
        assert_eq!(ts("2023-13-01"), "none");
    }

    #[test]
    fn date_boundaries_drop_time() {
        let date = parse_boundary_date("2023-01-10 23:59:59").expect("date");
        assert_eq!(date.to_string(), "2023-01-10");
    }
}
