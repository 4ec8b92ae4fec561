use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Complete generation configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GenerationConfig {
    /// Target database connection.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Tables to populate, in processing preference order.
    #[serde(default)]
    pub tables: Vec<TableRule>,
    /// Settings shared by every table.
    #[serde(default)]
    pub global_settings: GlobalSettings,
}

impl GenerationConfig {
    pub fn table(&self, name: &str) -> Option<&TableRule> {
        self.tables.iter().find(|table| table.table_name == name)
    }
}

/// PostgreSQL connection parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    /// Schema (namespace) holding the target tables.
    pub schema: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            database: "postgres".to_string(),
            user: "postgres".to_string(),
            password: String::new(),
            schema: "public".to_string(),
        }
    }
}

/// Settings applied to every table unless a table overrides them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct GlobalSettings {
    /// Null probability for tables without their own value.
    pub default_null_probability: f64,
    /// Attempts made to draw an unseen value for a unique column.
    pub max_retry_unique: u32,
    /// Rows per insert statement.
    pub batch_size: usize,
    /// Bind foreign-key columns to parent values.
    pub enable_foreign_keys: bool,
    /// Log filter used when `RUST_LOG` is not set.
    pub log_level: String,
    /// Seed for reproducible runs. A random seed is drawn when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Probes made by the integer uniqueness fallback before it jumps past the maximum.
    pub fallback_scan_limit: u64,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            default_null_probability: 0.1,
            max_retry_unique: 100,
            batch_size: 100,
            enable_foreign_keys: true,
            log_level: "info".to_string(),
            seed: None,
            fallback_scan_limit: 10_000,
        }
    }
}

/// Generation instructions for one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TableRule {
    pub table_name: String,
    #[serde(default = "default_rows_to_generate")]
    pub rows_to_generate: u64,
    /// Probability that a nullable column is null. Falls back to the global default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub null_probability: Option<f64>,
    #[serde(default)]
    pub unique_columns: Vec<String>,
    #[serde(default)]
    pub column_rules: BTreeMap<String, ColumnRule>,
}

fn default_rows_to_generate() -> u64 {
    100
}

impl TableRule {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            rows_to_generate: default_rows_to_generate(),
            null_probability: None,
            unique_columns: Vec::new(),
            column_rules: BTreeMap::new(),
        }
    }

    pub fn effective_null_probability(&self, settings: &GlobalSettings) -> f64 {
        self.null_probability
            .unwrap_or(settings.default_null_probability)
    }

    pub fn is_unique(&self, column: &str) -> bool {
        self.unique_columns.iter().any(|name| name == column)
    }
}

/// Typed value rule for a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ColumnRule {
    Int(IntRule),
    Decimal(DecimalRule),
    Boolean(BooleanRule),
    Date(DateRule),
    Timestamp(TimestampRule),
    Email(EmailRule),
    Pattern(PatternRule),
    Enum(EnumRule),
    Text(TextRule),
}

impl ColumnRule {
    /// Tag used in configuration files and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            ColumnRule::Int(_) => "int",
            ColumnRule::Decimal(_) => "decimal",
            ColumnRule::Boolean(_) => "boolean",
            ColumnRule::Date(_) => "date",
            ColumnRule::Timestamp(_) => "timestamp",
            ColumnRule::Email(_) => "email",
            ColumnRule::Pattern(_) => "pattern",
            ColumnRule::Enum(_) => "enum",
            ColumnRule::Text(_) => "text",
        }
    }

    /// Tags accepted in the `type` field.
    pub const KINDS: [&'static str; 9] = [
        "int",
        "decimal",
        "boolean",
        "date",
        "timestamp",
        "email",
        "pattern",
        "enum",
        "text",
    ];
}

/// Uniform integer in `[min_value, max_value]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct IntRule {
    pub min_value: i64,
    pub max_value: i64,
}

impl Default for IntRule {
    fn default() -> Self {
        Self {
            min_value: 1,
            max_value: 100,
        }
    }
}

/// Uniform real in `[min_value, max_value]` rounded to `precision` digits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DecimalRule {
    pub min_value: f64,
    pub max_value: f64,
    pub precision: u32,
}

impl Default for DecimalRule {
    fn default() -> Self {
        Self {
            min_value: 1.0,
            max_value: 1000.0,
            precision: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct BooleanRule {
    pub true_probability: f64,
}

impl Default for BooleanRule {
    fn default() -> Self {
        Self {
            true_probability: 0.5,
        }
    }
}

/// Calendar date range; both ends inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DateRule {
    pub start_date: String,
    pub end_date: String,
}

impl Default for DateRule {
    fn default() -> Self {
        Self {
            start_date: "2020-01-01".to_string(),
            end_date: "2024-12-31".to_string(),
        }
    }
}

/// Timestamp range with second resolution; both ends inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct TimestampRule {
    pub start_date: String,
    pub end_date: String,
}

impl Default for TimestampRule {
    fn default() -> Self {
        Self {
            start_date: "2020-01-01 00:00:00".to_string(),
            end_date: "2024-12-31 23:59:59".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct EmailRule {
    pub domains: Vec<String>,
}

impl Default for EmailRule {
    fn default() -> Self {
        Self {
            domains: vec![
                "gmail.com".to_string(),
                "mail.ru".to_string(),
                "yandex.ru".to_string(),
            ],
        }
    }
}

/// Character template: `#` digit, `A` uppercase letter, `a` lowercase letter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PatternRule {
    pub pattern: String,
}

impl Default for PatternRule {
    fn default() -> Self {
        Self {
            pattern: "#####".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct EnumRule {
    pub values: Vec<String>,
}

impl Default for EnumRule {
    fn default() -> Self {
        Self {
            values: vec!["value1".to_string(), "value2".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct TextRule {
    pub min_words: u32,
    pub max_words: u32,
    /// Words always placed in the text (up to the drawn word count).
    pub include_words: Vec<String>,
}

impl Default for TextRule {
    fn default() -> Self {
        Self {
            min_words: 5,
            max_words: 20,
            include_words: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_rule_defaults_fill_missing_fields() {
        let rule: ColumnRule = serde_json::from_str(r#"{"type": "int"}"#).expect("rule");
        assert_eq!(rule, ColumnRule::Int(IntRule::default()));

        let rule: ColumnRule =
            serde_json::from_str(r#"{"type": "decimal", "precision": 3}"#).expect("rule");
        match rule {
            ColumnRule::Decimal(decimal) => {
                assert_eq!(decimal.precision, 3);
                assert_eq!(decimal.min_value, 1.0);
                assert_eq!(decimal.max_value, 1000.0);
            }
            other => panic!("unexpected rule {other:?}"),
        }
    }

    #[test]
    fn unknown_rule_type_is_rejected() {
        let result: std::result::Result<ColumnRule, _> =
            serde_json::from_str(r#"{"type": "uuid"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn table_rule_defaults() {
        let rule: TableRule = serde_json::from_str(r#"{"table_name": "users"}"#).expect("rule");
        assert_eq!(rule.rows_to_generate, 100);
        assert!(rule.unique_columns.is_empty());
        let settings = GlobalSettings::default();
        assert_eq!(rule.effective_null_probability(&settings), 0.1);
    }
}
