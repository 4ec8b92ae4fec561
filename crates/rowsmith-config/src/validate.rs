use std::collections::BTreeSet;

use jsonschema::JSONSchema;
use rowsmith_core::{TableSchema, TypeFamily};
use serde_json::Value;

use crate::boundary::{parse_boundary_date, parse_boundary_timestamp};
use crate::errors::{ConfigError, ValidationIssue, ValidationReport};
use crate::load::LoadedConfig;
use crate::model::{ColumnRule, GenerationConfig, GlobalSettings, TableRule};
use crate::schema::config_json_schema;

/// Largest supported decimal precision. Beyond this `f64` scaling is lossy.
pub const MAX_DECIMAL_PRECISION: u32 = 12;

/// Whether uniform sampling over `[min, max]` stays finite. The sampler
/// scales the span slightly up, so spans beyond half of `f64::MAX` are refused.
pub fn decimal_span_is_samplable(min: f64, max: f64) -> bool {
    let span = max - min;
    span.is_finite() && span <= f64::MAX / 2.0
}

/// Validate a raw configuration document against the configuration JSON Schema.
pub fn validate_config_json(document: &Value) -> Result<ValidationReport, ConfigError> {
    let schema = serde_json::to_value(config_json_schema())?;
    let compiled = JSONSchema::compile(&schema).map_err(|err| ConfigError::Schema(err.to_string()))?;

    let mut report = ValidationReport::default();
    if let Err(errors) = compiled.validate(document) {
        for error in errors {
            let pointer = error.instance_path.to_string();
            let path = if pointer.is_empty() { "/".to_string() } else { pointer };
            report.push(ValidationIssue::error("schema_violation", path, error.to_string()));
        }
    }
    Ok(report)
}

/// Structural validation of a loaded document.
///
/// Entries already listed in `loaded.rejected` are skipped: they abort only
/// their own table, which the generation report records as `table_rejected`.
pub fn validate_loaded_config(loaded: &LoadedConfig) -> Result<ValidationReport, ConfigError> {
    let full = validate_config_json(&loaded.raw)?;
    let rejected: BTreeSet<usize> = loaded.rejected.iter().map(|table| table.index).collect();

    let mut report = ValidationReport::default();
    for issue in full.errors.into_iter().chain(full.warnings) {
        if table_index(&issue.path).is_some_and(|index| rejected.contains(&index)) {
            continue;
        }
        report.push(issue);
    }
    Ok(report)
}

/// Index of the `tables` entry a JSON pointer points into.
fn table_index(pointer: &str) -> Option<usize> {
    let rest = pointer.strip_prefix("/tables/")?;
    rest.split('/').next()?.parse().ok()
}

/// Validate global settings and every table rule.
pub fn validate_config(config: &GenerationConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_global_settings(&config.global_settings, &mut report);

    let mut seen = BTreeSet::new();
    for rule in &config.tables {
        if !seen.insert(rule.table_name.as_str()) {
            report.push(ValidationIssue::error(
                "duplicate_table",
                format!("tables/{}", rule.table_name),
                format!("table `{}` is configured more than once", rule.table_name),
            ));
        }
        report.merge(validate_table_rule(rule));
    }

    report
}

fn validate_global_settings(settings: &GlobalSettings, report: &mut ValidationReport) {
    if !is_probability(settings.default_null_probability) {
        report.push(ValidationIssue::error(
            "invalid_probability",
            "global_settings/default_null_probability",
            format!(
                "probability must be within [0, 1], got {}",
                settings.default_null_probability
            ),
        ));
    }
    if settings.batch_size == 0 {
        report.push(ValidationIssue::error(
            "invalid_batch_size",
            "global_settings/batch_size",
            "batch size must be at least 1",
        ));
    }
    if settings.max_retry_unique == 0 {
        report.push(
            ValidationIssue::warning(
                "no_unique_retries",
                "global_settings/max_retry_unique",
                "unique columns will go straight to the fallback",
            )
            .with_hint("set max_retry_unique to a positive value"),
        );
    }
}

/// Validate one table rule in isolation. Errors here reject the table.
pub fn validate_table_rule(rule: &TableRule) -> ValidationReport {
    let mut report = ValidationReport::default();
    let base = format!("tables/{}", rule.table_name);

    if rule.table_name.trim().is_empty() {
        report.push(ValidationIssue::error(
            "missing_table_name",
            "tables",
            "table_name must not be empty",
        ));
    }

    if let Some(probability) = rule.null_probability {
        if !is_probability(probability) {
            report.push(ValidationIssue::error(
                "invalid_probability",
                format!("{base}/null_probability"),
                format!("probability must be within [0, 1], got {probability}"),
            ));
        }
    }

    let mut unique = BTreeSet::new();
    for column in &rule.unique_columns {
        if !unique.insert(column.as_str()) {
            report.push(ValidationIssue::warning(
                "duplicate_unique_column",
                format!("{base}/unique_columns"),
                format!("column `{column}` is listed twice"),
            ));
        }
    }

    for (column, column_rule) in &rule.column_rules {
        let path = format!("{base}/column_rules/{column}");
        validate_column_rule(column_rule, &path, &mut report);
        if rule.is_unique(column) {
            check_unique_domain(column_rule, rule.rows_to_generate, &path, &mut report);
        }
    }

    report
}

fn validate_column_rule(rule: &ColumnRule, path: &str, report: &mut ValidationReport) {
    match rule {
        ColumnRule::Int(int) => {
            if int.min_value > int.max_value {
                report.push(range_error(path, int.min_value, int.max_value));
            }
        }
        ColumnRule::Decimal(decimal) => {
            if !decimal.min_value.is_finite() || !decimal.max_value.is_finite() {
                report.push(ValidationIssue::error(
                    "invalid_range",
                    path,
                    "decimal bounds must be finite",
                ));
            } else if decimal.min_value > decimal.max_value {
                report.push(range_error(path, decimal.min_value, decimal.max_value));
            } else if !decimal_span_is_samplable(decimal.min_value, decimal.max_value) {
                report.push(ValidationIssue::error(
                    "invalid_range",
                    path,
                    "decimal range is too wide to sample",
                ));
            }
            if decimal.precision > MAX_DECIMAL_PRECISION {
                report.push(ValidationIssue::error(
                    "invalid_precision",
                    path,
                    format!(
                        "precision {} exceeds the supported maximum of {MAX_DECIMAL_PRECISION}",
                        decimal.precision
                    ),
                ));
            }
        }
        ColumnRule::Boolean(boolean) => {
            if !is_probability(boolean.true_probability) {
                report.push(ValidationIssue::error(
                    "invalid_probability",
                    path,
                    format!(
                        "true_probability must be within [0, 1], got {}",
                        boolean.true_probability
                    ),
                ));
            }
        }
        ColumnRule::Date(date) => {
            let start = parse_boundary_date(&date.start_date);
            let end = parse_boundary_date(&date.end_date);
            check_boundaries(path, &date.start_date, start, &date.end_date, end, report);
        }
        ColumnRule::Timestamp(timestamp) => {
            let start = parse_boundary_timestamp(&timestamp.start_date);
            let end = parse_boundary_timestamp(&timestamp.end_date);
            check_boundaries(
                path,
                &timestamp.start_date,
                start,
                &timestamp.end_date,
                end,
                report,
            );
        }
        ColumnRule::Email(email) => {
            if email.domains.is_empty() || email.domains.iter().any(|d| d.trim().is_empty()) {
                report.push(ValidationIssue::error(
                    "empty_choices",
                    path,
                    "email rule needs at least one non-empty domain",
                ));
            }
        }
        ColumnRule::Pattern(pattern) => {
            if pattern.pattern.is_empty() {
                report.push(ValidationIssue::warning(
                    "empty_pattern",
                    path,
                    "pattern is empty; every value will be an empty string",
                ));
            }
        }
        ColumnRule::Enum(choices) => {
            if choices.values.is_empty() {
                report.push(ValidationIssue::error(
                    "empty_choices",
                    path,
                    "enum rule needs at least one value",
                ));
            }
        }
        ColumnRule::Text(text) => {
            if text.min_words > text.max_words {
                report.push(range_error(path, text.min_words, text.max_words));
            }
        }
    }
}

fn check_boundaries<T: PartialOrd>(
    path: &str,
    start_raw: &str,
    start: Option<T>,
    end_raw: &str,
    end: Option<T>,
    report: &mut ValidationReport,
) {
    match (start, end) {
        (Some(start), Some(end)) => {
            if start > end {
                report.push(range_error(path, start_raw, end_raw));
            }
        }
        (start, end) => {
            for (raw, parsed) in [(start_raw, start.is_some()), (end_raw, end.is_some())] {
                if !parsed {
                    report.push(
                        ValidationIssue::error(
                            "invalid_date",
                            path,
                            format!("cannot parse `{raw}` as a date"),
                        )
                        .with_hint("use YYYY-MM-DD or YYYY-MM-DD HH:MM:SS"),
                    );
                }
            }
        }
    }
}

/// Warn when a unique column's domain cannot hold the requested row count.
fn check_unique_domain(rule: &ColumnRule, rows: u64, path: &str, report: &mut ValidationReport) {
    let capacity: Option<u128> = match rule {
        ColumnRule::Int(int) if int.min_value <= int.max_value => {
            Some((i128::from(int.max_value) - i128::from(int.min_value) + 1) as u128)
        }
        ColumnRule::Boolean(_) => Some(2),
        ColumnRule::Enum(choices) => Some(
            choices
                .values
                .iter()
                .collect::<BTreeSet<_>>()
                .len() as u128,
        ),
        _ => None,
    };

    if let Some(capacity) = capacity {
        if capacity < u128::from(rows) {
            report.push(
                ValidationIssue::warning(
                    "unique_domain_too_small",
                    path,
                    format!(
                        "{} rule yields at most {capacity} distinct values for {rows} rows",
                        rule.kind()
                    ),
                )
                .with_hint("fallback values outside the declared domain will be used"),
            );
        }
    }
}

/// Cross-check a table rule with the live table structure. Findings are warnings.
pub fn validate_rule_against_schema(rule: &TableRule, table: &TableSchema) -> ValidationReport {
    let mut report = ValidationReport::default();
    let base = format!("tables/{}", rule.table_name);

    for (name, column_rule) in &rule.column_rules {
        let path = format!("{base}/column_rules/{name}");
        match table.column(name) {
            None => report.push(ValidationIssue::warning(
                "unknown_column",
                path,
                format!("column `{name}` does not exist in {}", table.qualified_name()),
            )),
            Some(column) if column.is_computed() => report.push(ValidationIssue::warning(
                "computed_column_rule",
                path,
                format!("column `{name}` is assigned by the database; the rule is ignored"),
            )),
            Some(column) => {
                if !rule_fits_family(column_rule, column.type_family()) {
                    report.push(ValidationIssue::warning(
                        "rule_type_mismatch",
                        path,
                        format!(
                            "{} rule on column of type `{}`",
                            column_rule.kind(),
                            column.column_type.data_type
                        ),
                    ));
                }
            }
        }
    }

    for name in &rule.unique_columns {
        if table.column(name).is_none() {
            report.push(ValidationIssue::warning(
                "unknown_column",
                format!("{base}/unique_columns"),
                format!("unique column `{name}` does not exist in {}", table.qualified_name()),
            ));
        }
    }

    report
}

fn rule_fits_family(rule: &ColumnRule, family: TypeFamily) -> bool {
    match (rule, family) {
        (_, TypeFamily::Other) => true,
        (ColumnRule::Int(_), TypeFamily::Integer | TypeFamily::Decimal | TypeFamily::Float) => {
            true
        }
        (ColumnRule::Decimal(_), TypeFamily::Decimal | TypeFamily::Float) => true,
        (ColumnRule::Boolean(_), TypeFamily::Boolean) => true,
        (ColumnRule::Date(_), TypeFamily::Date | TypeFamily::Timestamp) => true,
        (ColumnRule::Timestamp(_), TypeFamily::Timestamp | TypeFamily::Date) => true,
        (
            ColumnRule::Email(_) | ColumnRule::Pattern(_) | ColumnRule::Text(_),
            TypeFamily::Character,
        ) => true,
        (ColumnRule::Pattern(_), TypeFamily::Integer | TypeFamily::Decimal) => true,
        (ColumnRule::Enum(_), _) => true,
        (ColumnRule::Int(_), TypeFamily::Character) => true,
        _ => false,
    }
}

fn range_error(path: &str, min: impl std::fmt::Display, max: impl std::fmt::Display) -> ValidationIssue {
    ValidationIssue::error(
        "invalid_range",
        path,
        format!("lower bound {min} is greater than upper bound {max}"),
    )
}

fn is_probability(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}
