use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::schema::TableSchema;

/// Validate internal consistency of a table structure.
///
/// This checks:
/// - the table has at least one column
/// - duplicate columns
/// - primary key columns exist
/// - foreign key columns exist
pub fn validate_table_schema(table: &TableSchema) -> Result<()> {
    if table.columns.is_empty() {
        return Err(Error::SchemaUnavailable(format!(
            "table {} has no columns",
            table.qualified_name()
        )));
    }

    let mut columns = BTreeSet::new();
    for column in &table.columns {
        if !columns.insert(column.name.as_str()) {
            return Err(Error::InvalidSchema(format!(
                "duplicate column name: {}.{}",
                table.qualified_name(),
                column.name
            )));
        }
    }

    for column in table.primary_key_columns() {
        if !columns.contains(column.as_str()) {
            return Err(Error::InvalidSchema(format!(
                "primary key column not found: {}.{}",
                table.qualified_name(),
                column
            )));
        }
    }

    for fk in &table.foreign_keys {
        if !columns.contains(fk.column.as_str()) {
            return Err(Error::InvalidSchema(format!(
                "foreign key column not found: {}.{}",
                table.qualified_name(),
                fk.column
            )));
        }
        if fk.referenced_table.is_empty() || fk.referenced_column.is_empty() {
            return Err(Error::InvalidSchema(format!(
                "foreign key on {}.{} has no target",
                table.qualified_name(),
                fk.column
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::{ForeignKey, PrimaryKey};
    use crate::schema::Column;
    use crate::types::ColumnType;

    fn column(name: &str) -> Column {
        Column::new(name, ColumnType::new("integer", "int4"))
    }

    #[test]
    fn empty_table_is_unavailable() {
        let table = TableSchema::new("public", "ghost", Vec::new());
        assert!(matches!(
            validate_table_schema(&table),
            Err(Error::SchemaUnavailable(_))
        ));
    }

    #[test]
    fn rejects_dangling_key_columns() {
        let mut table = TableSchema::new("public", "orders", vec![column("id")]);
        table.primary_key = Some(PrimaryKey {
            name: None,
            columns: vec!["order_id".to_string()],
        });
        assert!(matches!(
            validate_table_schema(&table),
            Err(Error::InvalidSchema(_))
        ));

        table.primary_key = None;
        table.foreign_keys = vec![ForeignKey::new("user_id", "users", "id")];
        assert!(matches!(
            validate_table_schema(&table),
            Err(Error::InvalidSchema(_))
        ));
    }

    #[test]
    fn accepts_consistent_table() {
        let mut table = TableSchema::new("public", "orders", vec![column("id"), column("user_id")]);
        table.primary_key = Some(PrimaryKey {
            name: Some("orders_pkey".to_string()),
            columns: vec!["id".to_string()],
        });
        table.foreign_keys = vec![ForeignKey::new("user_id", "users", "id")];
        assert!(validate_table_schema(&table).is_ok());
    }
}
