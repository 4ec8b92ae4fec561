use rowsmith_config::load_config;
use rowsmith_core::{Column, TableSchema};
use rowsmith_generate::SchemaSource;
use tracing::{info, warn};

use crate::registry::{init_logging, write_json};
use crate::{CliError, InspectArgs};

use super::open_adapter;

pub async fn run(args: InspectArgs) -> Result<(), CliError> {
    let loaded = load_config(&args.config)?;
    let database = &loaded.config.database;
    init_logging(&loaded.config.global_settings.log_level, None)?;

    let adapter = open_adapter(database).await?;
    let database_name = adapter.database_name().await?;
    println!("connected to {database_name} as {}", database.redacted());

    let names = if !args.tables.is_empty() {
        args.tables.clone()
    } else if !loaded.config.tables.is_empty() {
        loaded
            .config
            .tables
            .iter()
            .map(|rule| rule.table_name.clone())
            .collect()
    } else {
        adapter.list_tables(&database.schema).await?
    };

    let mut snapshot = Vec::with_capacity(names.len());
    for name in &names {
        match adapter.table_schema(&database.schema, name).await {
            Ok(table) => {
                print!("{}", render_table(&table));
                snapshot.push(table);
            }
            Err(err) => {
                warn!(table = %name, error = %err, "table unavailable");
                println!("\n{}.{}: {err}", database.schema, name);
            }
        }
    }

    if let Some(path) = &args.json {
        write_json(path, &snapshot)?;
        info!(path = %path.display(), tables = snapshot.len(), "structure snapshot written");
    }
    Ok(())
}

/// Column listing: name, type, nullability, generation kind and default.
fn render_table(table: &TableSchema) -> String {
    let rows: Vec<[String; 5]> = table
        .columns
        .iter()
        .map(|column| {
            [
                column.name.clone(),
                type_label(column),
                if column.is_nullable { "YES" } else { "NO" }.to_string(),
                column.generation_label().to_string(),
                column.default.clone().unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect();

    let header = ["column", "type", "null", "generated", "default"];
    let mut widths = header.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = format!(
        "\n{} ({} columns)\n",
        table.qualified_name(),
        table.columns.len()
    );
    out.push_str(&format_line(&header.map(str::to_string), &widths));
    for row in &rows {
        out.push_str(&format_line(row, &widths));
    }
    if !table.primary_key_columns().is_empty() {
        out.push_str(&format!(
            "  primary key: {}\n",
            table.primary_key_columns().join(", ")
        ));
    }
    for fk in &table.foreign_keys {
        out.push_str(&format!(
            "  {} -> {}.{}.{}\n",
            fk.column, fk.referenced_schema, fk.referenced_table, fk.referenced_column
        ));
    }
    out
}

fn format_line(cells: &[String; 5], widths: &[usize; 5]) -> String {
    let mut line = String::from(" ");
    for (cell, width) in cells.iter().zip(widths.iter().copied()) {
        line.push(' ');
        line.push_str(&format!("{cell:<width$}"));
    }
    line.truncate(line.trim_end().len());
    line.push('\n');
    line
}

/// Declared type, with the length appended when the type name lacks it.
fn type_label(column: &Column) -> String {
    let data_type = &column.column_type.data_type;
    match column.column_type.character_max_length {
        Some(length) if !data_type.contains('(') => format!("{data_type}({length})"),
        _ => data_type.clone(),
    }
}
