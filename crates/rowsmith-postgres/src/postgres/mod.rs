use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, info};

use rowsmith_config::DatabaseConfig;
use rowsmith_core::{Column, Error, Result, TableSchema};
use rowsmith_generate::{GeneratedRow, GeneratedValue, RowStore, SchemaSource};

use crate::options::PoolSettings;

mod mapper;
mod queries;

/// Postgres caps bind parameters per statement at 65535.
const MAX_BIND_PARAMS: usize = 65_535;

/// Adapter for PostgreSQL databases.
#[derive(Debug, Clone)]
pub struct PostgresAdapter {
    pool: PgPool,
}

impl PostgresAdapter {
    /// Create a new adapter using a pre-configured pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Name of the connected database; doubles as a connectivity check.
    pub async fn database_name(&self) -> Result<String> {
        queries::fetch_database_name(&self.pool).await
    }
}

/// Connection options for `config`. The password is only set when non-empty.
pub fn connect_options(config: &DatabaseConfig) -> PgConnectOptions {
    let options = PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .database(&config.database);
    if config.password.is_empty() {
        options
    } else {
        options.password(&config.password)
    }
}

/// Open a pool for `config`.
pub async fn connect(config: &DatabaseConfig, settings: &PoolSettings) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(settings.acquire_timeout)
        .connect_with(connect_options(config))
        .await
        .map_err(db_error)?;
    info!(
        host = %config.host,
        port = config.port,
        database = %config.database,
        "connected to postgres"
    );
    Ok(pool)
}

/// Quote an identifier for interpolation into SQL.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub(crate) fn db_error(err: sqlx::Error) -> Error {
    Error::Db(err.to_string())
}

#[async_trait]
impl SchemaSource for PostgresAdapter {
    async fn list_tables(&self, schema: &str) -> Result<Vec<String>> {
        queries::list_base_tables(&self.pool, schema).await
    }

    async fn table_schema(&self, schema: &str, table: &str) -> Result<TableSchema> {
        let columns = mapper::map_columns(queries::list_columns(&self.pool, schema, table).await?);
        if columns.is_empty() {
            return Err(Error::SchemaUnavailable(format!(
                "table {schema}.{table} not found or has no columns"
            )));
        }
        let mut table_schema = TableSchema::new(schema, table, columns);
        table_schema.primary_key =
            mapper::map_primary_key(queries::get_primary_key(&self.pool, schema, table).await?);
        table_schema.foreign_keys =
            mapper::map_foreign_keys(queries::list_foreign_keys(&self.pool, schema, table).await?);
        Ok(table_schema)
    }
}

#[async_trait]
impl RowStore for PostgresAdapter {
    /// Insert all rows in one transaction, split into multi-row statements.
    ///
    /// Values travel as text and are cast to each column's declared type, so
    /// the database does the parsing.
    async fn insert_rows(
        &self,
        table: &TableSchema,
        columns: &[Column],
        rows: &[GeneratedRow],
        batch_size: usize,
    ) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }
        let target = format!("{}.{}", quote_ident(&table.schema), quote_ident(&table.name));
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        let mut inserted = 0u64;

        if columns.is_empty() {
            let sql = format!("insert into {target} default values");
            for _ in rows {
                let result = sqlx::query(&sql).execute(&mut *tx).await.map_err(db_error)?;
                inserted += result.rows_affected();
            }
        } else {
            let column_list = columns
                .iter()
                .map(|column| quote_ident(&column.name))
                .collect::<Vec<_>>()
                .join(", ");
            let chunk_size = batch_size.max(1).min(MAX_BIND_PARAMS / columns.len()).max(1);

            for chunk in rows.chunks(chunk_size) {
                let mut builder: QueryBuilder<Postgres> =
                    QueryBuilder::new(format!("insert into {target} ({column_list}) "));
                builder.push_values(chunk, |mut values, row| {
                    for column in columns {
                        let text = row.get(&column.name).and_then(GeneratedValue::to_sql_text);
                        values
                            .push_bind(text)
                            .push_unseparated(format!("::{}", column.column_type.data_type));
                    }
                });
                let result = builder.build().execute(&mut *tx).await.map_err(db_error)?;
                inserted += result.rows_affected();
                debug!(table = %table.name, rows = chunk.len(), "batch inserted");
            }
        }

        tx.commit().await.map_err(db_error)?;
        Ok(inserted)
    }

    async fn distinct_values(
        &self,
        schema: &str,
        table: &str,
        column: &str,
    ) -> Result<Vec<GeneratedValue>> {
        let columns = queries::list_columns(&self.pool, schema, table).await?;
        let family = mapper::map_columns(columns)
            .into_iter()
            .find(|candidate| candidate.name == column)
            .map(|candidate| candidate.type_family())
            .ok_or_else(|| {
                Error::SchemaUnavailable(format!("column {schema}.{table}.{column} not found"))
            })?;

        let values = queries::distinct_column_text(&self.pool, schema, table, column).await?;
        Ok(values
            .iter()
            .map(|text| GeneratedValue::from_text(text, family))
            .collect())
    }
}
