use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use rowsmith_core::{Column, Error, Result, TableSchema};

use crate::adapter::RowStore;
use crate::value::{GeneratedRow, GeneratedValue};

/// Row store that writes one CSV file per table instead of a database.
///
/// Used for dry runs. Rows written during the run are kept in memory so
/// that key capture and reference lookups behave as they would against
/// a database that started out empty.
#[derive(Debug)]
pub struct CsvStore {
    out_dir: PathBuf,
    written: Mutex<BTreeMap<String, Vec<GeneratedRow>>>,
}

impl CsvStore {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            written: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// `<schema>.<table>.csv` under the output directory.
    pub fn table_path(&self, schema: &str, table: &str) -> PathBuf {
        self.out_dir.join(format!("{schema}.{table}.csv"))
    }

    fn remember(&self, key: String, rows: &[GeneratedRow]) -> Result<()> {
        let mut written = self
            .written
            .lock()
            .map_err(|_| Error::Other("csv store state poisoned".to_string()))?;
        written.entry(key).or_default().extend_from_slice(rows);
        Ok(())
    }
}

#[async_trait]
impl RowStore for CsvStore {
    async fn insert_rows(
        &self,
        table: &TableSchema,
        columns: &[Column],
        rows: &[GeneratedRow],
        _batch_size: usize,
    ) -> Result<u64> {
        fs::create_dir_all(&self.out_dir).map_err(|err| Error::Other(err.to_string()))?;
        let path = self.table_path(&table.schema, &table.name);
        write_table_csv(&path, columns, rows).map_err(|err| {
            Error::Other(format!("failed to write {}: {err}", path.display()))
        })?;
        self.remember(table.qualified_name(), rows)?;
        Ok(rows.len() as u64)
    }

    async fn distinct_values(
        &self,
        schema: &str,
        table: &str,
        column: &str,
    ) -> Result<Vec<GeneratedValue>> {
        let written = self
            .written
            .lock()
            .map_err(|_| Error::Other("csv store state poisoned".to_string()))?;
        let Some(rows) = written.get(&format!("{schema}.{table}")) else {
            return Ok(Vec::new());
        };

        let mut seen = std::collections::HashSet::new();
        Ok(rows
            .iter()
            .filter_map(|row| row.get(column))
            .filter(|value| !value.is_null() && seen.insert(value.key()))
            .cloned()
            .collect())
    }
}

/// Write rows as CSV with a header line; nulls become empty fields.
pub fn write_table_csv(
    path: &Path,
    columns: &[Column],
    rows: &[GeneratedRow],
) -> std::result::Result<(), csv::Error> {
    let file = BufWriter::new(File::create(path)?);
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);

    writer.write_record(columns.iter().map(|col| col.name.as_str()))?;
    for row in rows {
        let record: Vec<String> = columns
            .iter()
            .map(|col| {
                row.get(&col.name)
                    .and_then(GeneratedValue::to_sql_text)
                    .unwrap_or_default()
            })
            .collect();
        writer.write_record(&record)?;
    }

    let mut inner = writer.into_inner().map_err(|err| err.into_error())?;
    inner.flush()?;
    Ok(())
}
