use sqlx::postgres::PgRow;
use sqlx::PgPool;

use dummygen_core::{quote_ident, Error, Result, TableRef};

fn db_error(err: sqlx::Error) -> Error {
    Error::Db(err.to_string())
}

#[derive(Debug, sqlx::FromRow)]
pub struct RawTable {
    pub schema: String,
    pub name: String,
}

/// Base and partitioned tables of a schema; partitions are reached through their parent.
pub async fn list_base_tables(pool: &PgPool, schema: &str) -> Result<Vec<RawTable>> {
    sqlx::query_as::<_, RawTable>(
        r#"
        select
          n.nspname::text as schema,
          c.relname::text as name
        from pg_class c
        join pg_namespace n on n.oid = c.relnamespace
        where n.nspname = $1
          and c.relkind in ('r', 'p')
          and not c.relispartition
        order by c.relname
        "#,
    )
    .bind(schema)
    .fetch_all(pool)
    .await
    .map_err(db_error)
}

#[derive(Debug, sqlx::FromRow)]
pub struct RawColumn {
    pub name: String,
    pub data_type: String,
    pub udt_schema: String,
    pub udt_name: String,
    pub is_identity: bool,
    pub is_generated: bool,
    pub column_default: Option<String>,
}

pub async fn list_columns(pool: &PgPool, schema: &str, table: &str) -> Result<Vec<RawColumn>> {
    sqlx::query_as::<_, RawColumn>(
        r#"
        select
          ic.column_name::text as name,
          ic.data_type::text as data_type,
          ic.udt_schema::text as udt_schema,
          ic.udt_name::text as udt_name,
          coalesce(ic.is_identity = 'YES', false) as is_identity,
          coalesce(ic.is_generated = 'ALWAYS', false) as is_generated,
          ic.column_default::text as column_default
        from information_schema.columns ic
        where ic.table_schema = $1
          and ic.table_name = $2
        order by ic.ordinal_position
        "#,
    )
    .bind(schema)
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(db_error)
}

pub async fn tables_with_column(
    pool: &PgPool,
    schemas: &[String],
    column: &str,
) -> Result<Vec<RawTable>> {
    sqlx::query_as::<_, RawTable>(
        r#"
        select
          c.table_schema::text as schema,
          c.table_name::text as name
        from information_schema.columns c
        join information_schema.tables t
          on t.table_schema = c.table_schema and t.table_name = c.table_name
        where c.column_name = $1
          and c.table_schema = any($2)
          and t.table_type = 'BASE TABLE'
        order by 1, 2
        "#,
    )
    .bind(column)
    .bind(schemas)
    .fetch_all(pool)
    .await
    .map_err(db_error)
}

/// Parents referenced by `table`'s foreign keys, in any schema.
pub async fn list_referenced_tables(
    pool: &PgPool,
    schema: &str,
    table: &str,
) -> Result<Vec<RawTable>> {
    sqlx::query_as::<_, RawTable>(
        r#"
        select distinct
          ref_nsp.nspname::text as schema,
          ref_rel.relname::text as name
        from pg_constraint con
        join pg_class src_rel on src_rel.oid = con.conrelid
        join pg_namespace src_nsp on src_nsp.oid = src_rel.relnamespace
        join pg_class ref_rel on ref_rel.oid = con.confrelid
        join pg_namespace ref_nsp on ref_nsp.oid = ref_rel.relnamespace
        where con.contype = 'f'
          and src_nsp.nspname = $1
          and src_rel.relname = $2
        order by 1, 2
        "#,
    )
    .bind(schema)
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(db_error)
}

/// Children in `schemas` whose foreign keys reference `table`.
pub async fn list_referencing_tables(
    pool: &PgPool,
    schema: &str,
    table: &str,
    schemas: &[String],
) -> Result<Vec<RawTable>> {
    sqlx::query_as::<_, RawTable>(
        r#"
        select distinct
          src_nsp.nspname::text as schema,
          src_rel.relname::text as name
        from pg_constraint con
        join pg_class src_rel on src_rel.oid = con.conrelid
        join pg_namespace src_nsp on src_nsp.oid = src_rel.relnamespace
        join pg_class ref_rel on ref_rel.oid = con.confrelid
        join pg_namespace ref_nsp on ref_nsp.oid = ref_rel.relnamespace
        where con.contype = 'f'
          and ref_nsp.nspname = $1
          and ref_rel.relname = $2
          and src_nsp.nspname = any($3)
        order by 1, 2
        "#,
    )
    .bind(schema)
    .bind(table)
    .bind(schemas)
    .fetch_all(pool)
    .await
    .map_err(db_error)
}

pub async fn list_enum_labels(
    pool: &PgPool,
    type_schema: &str,
    type_name: &str,
) -> Result<Vec<String>> {
    sqlx::query_scalar::<_, String>(
        r#"
        select e.enumlabel::text
        from pg_enum e
        join pg_type t on t.oid = e.enumtypid
        join pg_namespace n on n.oid = t.typnamespace
        where n.nspname = $1
          and t.typname = $2
        order by e.enumsortorder
        "#,
    )
    .bind(type_schema)
    .bind(type_name)
    .fetch_all(pool)
    .await
    .map_err(db_error)
}

pub async fn list_check_definitions(
    pool: &PgPool,
    schema: &str,
    table: &str,
) -> Result<Vec<String>> {
    sqlx::query_scalar::<_, String>(
        r#"
        select pg_get_constraintdef(con.oid)
        from pg_constraint con
        join pg_class rel on rel.oid = con.conrelid
        join pg_namespace nsp on nsp.oid = rel.relnamespace
        where nsp.nspname = $1
          and rel.relname = $2
          and con.contype = 'c'
        order by con.conname
        "#,
    )
    .bind(schema)
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(db_error)
}

/// Grouped non-null values of a column by descending frequency.
///
/// Rows carry the typed `value`, its `value_text` rendering and `freq`.
pub async fn value_frequencies(
    pool: &PgPool,
    table: &TableRef,
    column: &str,
    limit: i64,
) -> Result<Vec<PgRow>> {
    let column = quote_ident(column);
    let sql = format!(
        "select {column} as value, {column}::text as value_text, count(*) as freq \
         from {table} \
         where {column} is not null \
         group by {column} \
         order by freq desc \
         limit $1",
        table = table.qualified(),
    );

    sqlx::query(&sql)
        .bind(limit)
        .fetch_all(pool)
        .await
        .map_err(db_error)
}
