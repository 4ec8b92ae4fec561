use sqlx::PgPool;

use rowsmith_core::Result;

use super::{db_error, quote_ident};

pub async fn fetch_database_name(pool: &PgPool) -> Result<String> {
    sqlx::query_scalar::<_, String>("select current_database()")
        .fetch_one(pool)
        .await
        .map_err(db_error)
}

pub async fn list_base_tables(pool: &PgPool, schema: &str) -> Result<Vec<String>> {
    sqlx::query_scalar::<_, String>(
        r#"
        select c.relname::text
        from pg_class c
        join pg_namespace n on n.oid = c.relnamespace
        where n.nspname = $1
          and c.relkind in ('r','p')
        order by c.relname
        "#,
    )
    .bind(schema)
    .fetch_all(pool)
    .await
    .map_err(db_error)
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RawColumn {
    pub ordinal_position: i16,
    pub name: String,
    pub data_type: String,
    pub udt_name: String,
    pub is_nullable: bool,
    pub default_expr: Option<String>,
    pub identity: Option<String>,
    pub is_generated: bool,
    pub character_max_length: Option<i32>,
}

pub async fn list_columns(pool: &PgPool, schema: &str, table: &str) -> Result<Vec<RawColumn>> {
    sqlx::query_as::<_, RawColumn>(
        r#"
        select
          a.attnum as ordinal_position,
          a.attname::text as name,
          pg_catalog.format_type(a.atttypid, a.atttypmod) as data_type,
          t.typname::text as udt_name,
          (not a.attnotnull) as is_nullable,
          pg_get_expr(ad.adbin, ad.adrelid) as default_expr,
          nullif(a.attidentity::text, '') as identity,
          (a.attgenerated::text <> '') as is_generated,
          case
            when t.typname in ('varchar', 'bpchar') and a.atttypmod > 4 then a.atttypmod - 4
            else null
          end as character_max_length
        from pg_attribute a
        join pg_class c on c.oid = a.attrelid
        join pg_namespace n on n.oid = c.relnamespace
        join pg_type t on t.oid = a.atttypid
        left join pg_attrdef ad on ad.adrelid = a.attrelid and ad.adnum = a.attnum
        where n.nspname = $1
          and c.relname = $2
          and a.attnum > 0
          and not a.attisdropped
        order by a.attnum
        "#,
    )
    .bind(schema)
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(db_error)
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RawKeyColumn {
    pub constraint_name: String,
    pub column_name: String,
}

pub async fn get_primary_key(
    pool: &PgPool,
    schema: &str,
    table: &str,
) -> Result<Vec<RawKeyColumn>> {
    sqlx::query_as::<_, RawKeyColumn>(
        r#"
        select
          con.conname::text as constraint_name,
          a.attname::text as column_name
        from pg_constraint con
        join pg_class c on c.oid = con.conrelid
        join pg_namespace n on n.oid = c.relnamespace
        cross join lateral unnest(con.conkey) with ordinality as k(attnum, ord)
        join pg_attribute a on a.attrelid = con.conrelid and a.attnum = k.attnum
        where con.contype = 'p'
          and n.nspname = $1
          and c.relname = $2
        order by k.ord
        "#,
    )
    .bind(schema)
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(db_error)
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RawForeignKey {
    pub constraint_name: String,
    pub column_name: String,
    pub referenced_schema: String,
    pub referenced_table: String,
    pub referenced_column: String,
}

pub async fn list_foreign_keys(
    pool: &PgPool,
    schema: &str,
    table: &str,
) -> Result<Vec<RawForeignKey>> {
    sqlx::query_as::<_, RawForeignKey>(
        r#"
        select
          con.conname::text as constraint_name,
          a.attname::text as column_name,
          rn.nspname::text as referenced_schema,
          rc.relname::text as referenced_table,
          ra.attname::text as referenced_column
        from pg_constraint con
        join pg_class c on c.oid = con.conrelid
        join pg_namespace n on n.oid = c.relnamespace
        join pg_class rc on rc.oid = con.confrelid
        join pg_namespace rn on rn.oid = rc.relnamespace
        cross join lateral unnest(con.conkey, con.confkey)
          with ordinality as k(attnum, ref_attnum, ord)
        join pg_attribute a on a.attrelid = con.conrelid and a.attnum = k.attnum
        join pg_attribute ra on ra.attrelid = con.confrelid and ra.attnum = k.ref_attnum
        where con.contype = 'f'
          and n.nspname = $1
          and c.relname = $2
        order by con.conname, k.ord
        "#,
    )
    .bind(schema)
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(db_error)
}

/// Distinct non-null values of one column rendered as text.
pub async fn distinct_column_text(
    pool: &PgPool,
    schema: &str,
    table: &str,
    column: &str,
) -> Result<Vec<String>> {
    let column = quote_ident(column);
    let sql = format!(
        "select distinct {column}::text from {}.{} where {column} is not null",
        quote_ident(schema),
        quote_ident(table),
    );
    sqlx::query_scalar::<_, String>(&sql)
        .fetch_all(pool)
        .await
        .map_err(db_error)
}
