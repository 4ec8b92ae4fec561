use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use rowsmith_core::{Column, Error, Result, TableSchema};

use crate::value::{GeneratedRow, GeneratedValue};

/// Source of table structure facts.
#[async_trait]
pub trait SchemaSource: Send + Sync {
    /// Base tables of a schema, sorted by name.
    async fn list_tables(&self, schema: &str) -> Result<Vec<String>>;

    /// Columns, primary key and foreign keys of one table.
    async fn table_schema(&self, schema: &str, table: &str) -> Result<TableSchema>;
}

/// Destination for generated rows.
#[async_trait]
pub trait RowStore: Send + Sync {
    /// Persist rows as one unit, returning the number of inserted rows.
    async fn insert_rows(
        &self,
        table: &TableSchema,
        columns: &[Column],
        rows: &[GeneratedRow],
        batch_size: usize,
    ) -> Result<u64>;

    /// Distinct non-null values currently stored in `schema.table.column`.
    async fn distinct_values(
        &self,
        schema: &str,
        table: &str,
        column: &str,
    ) -> Result<Vec<GeneratedValue>>;
}

/// Schema source backed by a fixed set of table structures, e.g. a JSON
/// snapshot written by `inspect --json`.
#[derive(Debug, Clone, Default)]
pub struct StaticSchemaSource {
    tables: BTreeMap<(String, String), TableSchema>,
}

impl StaticSchemaSource {
    pub fn new(tables: impl IntoIterator<Item = TableSchema>) -> Self {
        Self {
            tables: tables
                .into_iter()
                .map(|table| ((table.schema.clone(), table.name.clone()), table))
                .collect(),
        }
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .map_err(|err| Error::Other(format!("read {}: {err}", path.display())))?;
        let tables: Vec<TableSchema> = serde_json::from_slice(&bytes)
            .map_err(|err| Error::Other(format!("parse {}: {err}", path.display())))?;
        Ok(Self::new(tables))
    }
}

#[async_trait]
impl SchemaSource for StaticSchemaSource {
    async fn list_tables(&self, schema: &str) -> Result<Vec<String>> {
        Ok(self
            .tables
            .keys()
            .filter(|(owner, _)| owner == schema)
            .map(|(_, name)| name.clone())
            .collect())
    }

    async fn table_schema(&self, schema: &str, table: &str) -> Result<TableSchema> {
        self.tables
            .get(&(schema.to_string(), table.to_string()))
            .cloned()
            .ok_or_else(|| Error::SchemaUnavailable(format!("table {schema}.{table} not found")))
    }
}
