use std::collections::BTreeMap;

use rowsmith_config::{
    IssueSeverity, ValidationIssue, ValidationReport, load_config, validate_config,
    validate_loaded_config, validate_rule_against_schema,
};
use rowsmith_generate::{SchemaSource, plan_tables};
use tracing::info;

use crate::registry::init_logging;
use crate::{CheckArgs, CliError};

use super::open_adapter;

pub async fn run(args: CheckArgs) -> Result<(), CliError> {
    let loaded = load_config(&args.config)?;
    init_logging(&loaded.config.global_settings.log_level, None)?;

    let mut report = validate_loaded_config(&loaded)?;
    for rejected in &loaded.rejected {
        report.push(ValidationIssue::error(
            "table_rejected",
            format!("tables[{}]", rejected.index),
            rejected.reason.clone(),
        ));
    }
    report.merge(validate_config(&loaded.config));

    if !args.offline {
        let adapter = open_adapter(&loaded.config.database).await?;
        let schema = loaded.config.database.schema.as_str();
        let mut schemas = BTreeMap::new();
        for rule in &loaded.config.tables {
            match adapter.table_schema(schema, &rule.table_name).await {
                Ok(table) => {
                    report.merge(validate_rule_against_schema(rule, &table));
                    schemas.insert(rule.table_name.clone(), table);
                }
                Err(err) => report.push(ValidationIssue::error(
                    "schema_unavailable",
                    format!("tables/{}", rule.table_name),
                    err.to_string(),
                )),
            }
        }
        for table in plan_tables(&loaded.config.tables, &schemas).unresolved {
            report.push(
                ValidationIssue::error(
                    "dependency_cycle",
                    format!("tables/{table}"),
                    "table is part of a foreign-key cycle or depends on one",
                )
                .with_hint(
                    "break the cycle with a nullable column or generate the tables separately",
                ),
            );
        }
    }

    print_report(&report);
    info!(
        errors = report.errors.len(),
        warnings = report.warnings.len(),
        offline = args.offline,
        "configuration checked"
    );

    if report.is_ok() {
        Ok(())
    } else {
        Err(CliError::InvalidConfig(format!(
            "{} error(s) found",
            report.errors.len()
        )))
    }
}

fn print_report(report: &ValidationReport) {
    for issue in report.errors.iter().chain(&report.warnings) {
        let label = match issue.severity {
            IssueSeverity::Error => "error",
            IssueSeverity::Warning => "warning",
        };
        println!("{label}{issue}");
    }
    println!(
        "{} error(s), {} warning(s)",
        report.errors.len(),
        report.warnings.len()
    );
}
