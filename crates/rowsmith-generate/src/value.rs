use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rowsmith_core::TypeFamily;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// Generated value for a cell.
#[derive(Debug, Clone, PartialEq)]
pub enum GeneratedValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
}

impl GeneratedValue {
    pub fn is_null(&self) -> bool {
        matches!(self, GeneratedValue::Null)
    }

    /// Text literal accepted by Postgres for the value, `None` for null.
    pub fn to_sql_text(&self) -> Option<String> {
        match self {
            GeneratedValue::Null => None,
            GeneratedValue::Bool(value) => Some(value.to_string()),
            GeneratedValue::Int(value) => Some(value.to_string()),
            GeneratedValue::Float(value) => Some(value.to_string()),
            GeneratedValue::Text(value) => Some(value.clone()),
            GeneratedValue::Date(value) => Some(value.format(DATE_FORMAT).to_string()),
            GeneratedValue::Time(value) => Some(value.format(TIME_FORMAT).to_string()),
            GeneratedValue::Timestamp(value) => Some(value.format(TIMESTAMP_FORMAT).to_string()),
        }
    }

    /// Identity used for uniqueness and pool membership.
    ///
    /// Values that render to the same SQL text are the same key, so `Int(5)`
    /// read back as `Text("5")` still matches.
    pub fn key(&self) -> String {
        self.to_sql_text().unwrap_or_else(|| "\u{0}null".to_string())
    }

    /// Parse a text literal read back from the database.
    pub fn from_text(text: &str, family: TypeFamily) -> Self {
        let parsed = match family {
            TypeFamily::Integer => text.parse().ok().map(GeneratedValue::Int),
            TypeFamily::Float => text.parse().ok().map(GeneratedValue::Float),
            TypeFamily::Boolean => match text {
                "t" | "true" => Some(GeneratedValue::Bool(true)),
                "f" | "false" => Some(GeneratedValue::Bool(false)),
                _ => None,
            },
            TypeFamily::Date => NaiveDate::parse_from_str(text, DATE_FORMAT)
                .ok()
                .map(GeneratedValue::Date),
            TypeFamily::Timestamp => NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT)
                .ok()
                .map(GeneratedValue::Timestamp),
            TypeFamily::Time => NaiveTime::parse_from_str(text, TIME_FORMAT)
                .ok()
                .map(GeneratedValue::Time),
            // numeric keeps its exact text; binding it back needs no float round trip
            TypeFamily::Decimal
            | TypeFamily::Character
            | TypeFamily::Uuid
            | TypeFamily::Other => None,
        };
        parsed.unwrap_or_else(|| GeneratedValue::Text(text.to_string()))
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            GeneratedValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            GeneratedValue::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Cut text values to at most `max_chars` characters.
    pub fn truncated(self, max_chars: usize) -> Self {
        match self {
            GeneratedValue::Text(value) if value.chars().count() > max_chars => {
                GeneratedValue::Text(value.chars().take(max_chars).collect())
            }
            other => other,
        }
    }
}

impl fmt::Display for GeneratedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_sql_text() {
            Some(text) => f.write_str(&text),
            None => f.write_str("NULL"),
        }
    }
}

/// One generated row, cells in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratedRow {
    cells: Vec<(String, GeneratedValue)>,
}

impl GeneratedRow {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cells: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, column: impl Into<String>, value: GeneratedValue) {
        self.cells.push((column.into(), value));
    }

    pub fn get(&self, column: &str) -> Option<&GeneratedValue> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &GeneratedValue)> {
        self.cells.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn values(&self) -> impl Iterator<Item = &GeneratedValue> {
        self.cells.iter().map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sql_text_rendering() {
        let date = NaiveDate::from_ymd_opt(2023, 1, 9).expect("date");
        assert_eq!(
            GeneratedValue::Date(date).to_sql_text().as_deref(),
            Some("2023-01-09")
        );
        let ts = date.and_hms_opt(7, 5, 3).expect("time");
        assert_eq!(
            GeneratedValue::Timestamp(ts).to_sql_text().as_deref(),
            Some("2023-01-09 07:05:03")
        );
        assert_eq!(GeneratedValue::Null.to_sql_text(), None);
        assert_eq!(GeneratedValue::Bool(true).to_string(), "true");
    }

    #[test]
    fn read_back_parsing_by_family() {
        assert_eq!(
            GeneratedValue::from_text("42", TypeFamily::Integer),
            GeneratedValue::Int(42)
        );
        assert_eq!(
            GeneratedValue::from_text("t", TypeFamily::Boolean),
            GeneratedValue::Bool(true)
        );
        assert_eq!(
            GeneratedValue::from_text("12.50", TypeFamily::Decimal),
            GeneratedValue::Text("12.50".to_string())
        );
        assert_eq!(
            GeneratedValue::from_text("oops", TypeFamily::Integer),
            GeneratedValue::Text("oops".to_string())
        );
    }

    #[test]
    fn keys_match_across_representations() {
        assert_eq!(
            GeneratedValue::Int(5).key(),
            GeneratedValue::Text("5".to_string()).key()
        );
        assert_ne!(GeneratedValue::Null.key(), GeneratedValue::Text(String::new()).key());
    }

    #[test]
    fn truncation_counts_characters() {
        let value = GeneratedValue::Text("ёжикёжик".to_string()).truncated(3);
        assert_eq!(value, GeneratedValue::Text("ёжи".to_string()));
        assert_eq!(GeneratedValue::Int(123456).truncated(2), GeneratedValue::Int(123456));
    }
}
