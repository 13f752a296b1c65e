use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use tracing::debug;

use dummygen_core::{
    Catalog, ColumnDescriptor, Error, RelationSource, Result, SampledValue, TableRef, ValueSource,
};

use crate::options::{CatalogOptions, PoolSettings};

mod mapper;
mod queries;

pub use mapper::{value_kind, ValueKind};

/// Open a connection pool; every connection gets the configured `statement_timeout`.
pub async fn connect_pool(settings: &PoolSettings) -> Result<PgPool> {
    let statement_timeout = settings.statement_timeout;

    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(settings.acquire_timeout)
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                if let Some(timeout) = statement_timeout {
                    let sql = format!("set statement_timeout = {}", timeout.as_millis());
                    conn.execute(sql.as_str()).await?;
                }
                Ok(())
            })
        })
        .connect(&settings.url)
        .await
        .map_err(|err| Error::Db(err.to_string()))
}

/// Catalog reader for PostgreSQL databases.
#[derive(Debug, Clone)]
pub struct PostgresCatalog {
    pool: PgPool,
    opts: CatalogOptions,
}

impl PostgresCatalog {
    /// Create a new catalog reader using a pre-configured pool.
    pub fn new(pool: PgPool, opts: CatalogOptions) -> Self {
        Self { pool, opts }
    }
}

#[async_trait]
impl Catalog for PostgresCatalog {
    fn engine(&self) -> &'static str {
        "postgres"
    }

    async fn list_tables(&self, schema: &str) -> Result<Vec<TableRef>> {
        let raw = queries::list_base_tables(&self.pool, schema).await?;
        debug!(event = "catalog_tables", schema = %schema, count = raw.len());
        Ok(mapper::map_tables(raw))
    }

    async fn list_columns(&self, table: &TableRef) -> Result<Vec<ColumnDescriptor>> {
        let raw = queries::list_columns(&self.pool, &table.schema, &table.name).await?;
        if raw.is_empty() {
            return Err(Error::Db(format!("relation {table} has no visible columns")));
        }
        debug!(event = "catalog_columns", table = %table, count = raw.len());
        Ok(mapper::map_columns(raw))
    }
}

#[async_trait]
impl RelationSource for PostgresCatalog {
    async fn tables_with_column(&self, column: &str) -> Result<Vec<TableRef>> {
        let raw = queries::tables_with_column(&self.pool, &self.opts.schemas, column).await?;
        Ok(mapper::map_tables(raw))
    }

    async fn referenced_tables(&self, table: &TableRef) -> Result<Vec<TableRef>> {
        let raw = queries::list_referenced_tables(&self.pool, &table.schema, &table.name).await?;
        Ok(mapper::map_tables(raw))
    }

    async fn referencing_tables(&self, table: &TableRef) -> Result<Vec<TableRef>> {
        let raw = queries::list_referencing_tables(
            &self.pool,
            &table.schema,
            &table.name,
            &self.opts.schemas,
        )
        .await?;
        debug!(event = "catalog_referencing", table = %table, count = raw.len());
        Ok(mapper::map_tables(raw))
    }
}

#[async_trait]
impl ValueSource for PostgresCatalog {
    async fn enum_labels(&self, column: &ColumnDescriptor) -> Result<Option<Vec<String>>> {
        let labels =
            queries::list_enum_labels(&self.pool, &column.udt_schema, &column.udt_name).await?;
        Ok(if labels.is_empty() { None } else { Some(labels) })
    }

    async fn check_definitions(&self, table: &TableRef) -> Result<Vec<String>> {
        queries::list_check_definitions(&self.pool, &table.schema, &table.name).await
    }

    async fn most_common_values(
        &self,
        table: &TableRef,
        column: &ColumnDescriptor,
        limit: usize,
    ) -> Result<Vec<SampledValue>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = queries::value_frequencies(&self.pool, table, &column.name, limit).await?;
        debug!(
            event = "catalog_frequencies",
            table = %table,
            column = %column.name,
            count = rows.len()
        );
        rows.iter().map(mapper::decode_sampled_value).collect()
    }
}
