use rowsmith_core::{Column, TableSchema, TypeFamily};

use crate::model::{
    BooleanRule, ColumnRule, DatabaseConfig, DateRule, DecimalRule, EmailRule, GenerationConfig,
    GlobalSettings, IntRule, TableRule, TextRule, TimestampRule,
};

/// Defaults applied when building a full configuration from table structures.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaffoldOptions {
    pub rows_to_generate: u64,
    pub null_probability: f64,
}

impl Default for ScaffoldOptions {
    fn default() -> Self {
        Self {
            rows_to_generate: 100,
            null_probability: 0.05,
        }
    }
}

/// Build a rule set covering every writable column of a table.
///
/// Writable primary key columns are marked unique.
pub fn scaffold_table_rule(table: &TableSchema, options: &ScaffoldOptions) -> TableRule {
    let mut rule = TableRule::new(table.name.clone());
    rule.rows_to_generate = options.rows_to_generate;
    rule.null_probability = Some(options.null_probability);

    for column in table.writable_columns() {
        if let Some(column_rule) = rule_for_column(column) {
            rule.column_rules.insert(column.name.clone(), column_rule);
        }
    }

    rule.unique_columns = table
        .primary_key_columns()
        .iter()
        .filter(|name| table.column(name).is_some_and(|column| !column.is_computed()))
        .cloned()
        .collect();

    rule
}

/// Build a full configuration for the given tables.
///
/// Supplied global settings are kept as-is.
pub fn scaffold_config(
    database: DatabaseConfig,
    global_settings: Option<GlobalSettings>,
    tables: &[TableSchema],
    options: &ScaffoldOptions,
) -> GenerationConfig {
    let global_settings = global_settings.unwrap_or_else(|| GlobalSettings {
        default_null_probability: options.null_probability,
        ..GlobalSettings::default()
    });

    GenerationConfig {
        database,
        tables: tables
            .iter()
            .map(|table| scaffold_table_rule(table, options))
            .collect(),
        global_settings,
    }
}

fn rule_for_column(column: &Column) -> Option<ColumnRule> {
    let rule = match column.type_family() {
        TypeFamily::Integer => ColumnRule::Int(IntRule {
            min_value: 1,
            max_value: 1000,
        }),
        TypeFamily::Decimal | TypeFamily::Float => ColumnRule::Decimal(DecimalRule::default()),
        TypeFamily::Boolean => ColumnRule::Boolean(BooleanRule::default()),
        TypeFamily::Date => ColumnRule::Date(DateRule {
            start_date: "2023-01-01".to_string(),
            end_date: "2024-12-31".to_string(),
        }),
        TypeFamily::Timestamp => ColumnRule::Timestamp(TimestampRule {
            start_date: "2023-01-01 00:00:00".to_string(),
            end_date: "2024-12-31 23:59:59".to_string(),
        }),
        TypeFamily::Character if column.name.to_ascii_lowercase().contains("email") => {
            ColumnRule::Email(EmailRule::default())
        }
        TypeFamily::Character => ColumnRule::Text(TextRule {
            min_words: 2,
            max_words: 5,
            include_words: Vec::new(),
        }),
        TypeFamily::Time | TypeFamily::Uuid | TypeFamily::Other => return None,
    };
    Some(rule)
}
