//! Generation rule contracts: loading, validation and scaffolding.

pub mod boundary;
pub mod errors;
pub mod load;
pub mod model;
pub mod redaction;
pub mod scaffold;
pub mod schema;
pub mod validate;

pub use boundary::{parse_boundary_date, parse_boundary_timestamp};
pub use errors::{ConfigError, IssueSeverity, Result, ValidationIssue, ValidationReport};
pub use load::{
    ConfigFormat, LoadedConfig, RejectedTable, load_config, parse_config_str, parse_config_value,
};
pub use model::{
    BooleanRule, ColumnRule, DatabaseConfig, DateRule, DecimalRule, EmailRule, EnumRule,
    GenerationConfig, GlobalSettings, IntRule, PatternRule, TableRule, TextRule, TimestampRule,
};
pub use redaction::RedactedConnection;
pub use scaffold::{ScaffoldOptions, scaffold_config, scaffold_table_rule};
pub use schema::config_json_schema;
pub use validate::{
    decimal_span_is_samplable, validate_config, validate_config_json, validate_loaded_config,
    validate_rule_against_schema, validate_table_rule,
};
