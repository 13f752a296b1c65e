use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ident::quote_qualified;

/// Declared types treated as free text.
pub const TEXT_TYPES: &[&str] = &["character varying", "varchar", "text"];

/// Declared types treated as integers.
pub const INTEGER_TYPES: &[&str] = &["integer", "bigint", "smallint"];

/// Name of the identity column by convention.
pub const IDENTITY_COLUMN: &str = "id";

/// A table identified by schema and name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TableRef {
    pub schema: String,
    pub name: String,
}

impl TableRef {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }

    /// Parse `schema.table` or a bare `table` that falls back to `default_schema`.
    pub fn parse(input: &str, default_schema: &str) -> Result<Self> {
        let input = input.trim();
        let mut parts = input.split('.');
        let (schema, name) = match (parts.next(), parts.next(), parts.next()) {
            (Some(name), None, None) => (default_schema, name),
            (Some(schema), Some(name), None) => (schema, name),
            _ => {
                return Err(Error::InvalidConfig(format!(
                    "invalid table reference '{input}'"
                )));
            }
        };

        if schema.is_empty() || name.is_empty() {
            return Err(Error::InvalidConfig(format!(
                "invalid table reference '{input}'"
            )));
        }

        Ok(Self::new(schema, name))
    }

    /// Quoted `schema.table` form for use inside SQL text.
    pub fn qualified(&self) -> String {
        quote_qualified(&self.schema, &self.name)
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

/// Column name and declared type, in catalog declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    /// `information_schema` type name, e.g. `character varying` or `USER-DEFINED`.
    pub declared_type: String,
    /// Namespace of the underlying type.
    pub udt_schema: String,
    /// Name of the underlying type, e.g. `int4` or an enum name.
    pub udt_name: String,
    /// Whether the store assigns this column's value on insert.
    pub is_identity: bool,
}

impl ColumnDescriptor {
    /// Build a descriptor for a built-in type; `id` is flagged as the identity column.
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        let name = name.into();
        let declared_type = declared_type.into();
        Self {
            is_identity: name == IDENTITY_COLUMN,
            udt_schema: "pg_catalog".to_string(),
            udt_name: builtin_udt_name(&declared_type).to_string(),
            name,
            declared_type,
        }
    }

    /// Point the descriptor at a user-defined type such as an enum.
    pub fn with_udt(mut self, schema: impl Into<String>, name: impl Into<String>) -> Self {
        self.udt_schema = schema.into();
        self.udt_name = name.into();
        self
    }

    pub fn with_identity(mut self, is_identity: bool) -> Self {
        self.is_identity = is_identity;
        self
    }

    pub fn is_text(&self) -> bool {
        TEXT_TYPES.contains(&self.declared_type.as_str())
    }

    pub fn is_integer(&self) -> bool {
        INTEGER_TYPES.contains(&self.declared_type.as_str())
    }

    /// Quoted underlying type, suitable as a cast target.
    pub fn cast_type(&self) -> String {
        quote_qualified(&self.udt_schema, &self.udt_name)
    }
}

/// Underlying type name of a built-in `information_schema` type name.
fn builtin_udt_name(declared_type: &str) -> &str {
    match declared_type {
        "smallint" => "int2",
        "integer" => "int4",
        "bigint" => "int8",
        "real" => "float4",
        "double precision" => "float8",
        "boolean" => "bool",
        "character varying" => "varchar",
        "character" => "bpchar",
        "timestamp without time zone" => "timestamp",
        "timestamp with time zone" => "timestamptz",
        "time without time zone" => "time",
        "time with time zone" => "timetz",
        other => other,
    }
}

/// A value observed in live table data.
#[derive(Debug, Clone, PartialEq)]
pub enum SampledValue {
    Text(String),
    Integer(i64),
    Float(f64),
    /// Arbitrary-precision numeric in its textual form.
    Decimal(String),
    Boolean(bool),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Time(NaiveTime),
    Bytes(Vec<u8>),
    Array(String),
    /// JSON or other map-shaped value.
    Document(String),
    Unsupported {
        type_name: String,
        text: Option<String>,
    },
}

/// Table and column listing against a catalog.
#[async_trait]
pub trait Catalog {
    /// Returns the engine identifier (e.g. `postgres`).
    fn engine(&self) -> &'static str;

    /// Base tables of one schema, ordered by name.
    async fn list_tables(&self, schema: &str) -> Result<Vec<TableRef>>;

    /// Columns of a table ordered by declaration position.
    async fn list_columns(&self, table: &TableRef) -> Result<Vec<ColumnDescriptor>>;
}

/// Lazily-queried relationship edges between tables.
#[async_trait]
pub trait RelationSource {
    /// Tables in the configured schemas having a column with exactly this name.
    async fn tables_with_column(&self, column: &str) -> Result<Vec<TableRef>>;

    /// Tables that `table` references through an outbound foreign key.
    async fn referenced_tables(&self, table: &TableRef) -> Result<Vec<TableRef>>;

    /// Tables holding a foreign key that references `table`.
    async fn referencing_tables(&self, table: &TableRef) -> Result<Vec<TableRef>>;
}

/// Sources of representative values for a column.
#[async_trait]
pub trait ValueSource {
    /// Labels in declaration order when the column's type is an enum.
    async fn enum_labels(&self, column: &ColumnDescriptor) -> Result<Option<Vec<String>>>;

    /// Raw check constraint definitions declared on the table.
    async fn check_definitions(&self, table: &TableRef) -> Result<Vec<String>>;

    /// Non-null values of the column by descending frequency, at most `limit`.
    async fn most_common_values(
        &self,
        table: &TableRef,
        column: &ColumnDescriptor,
        limit: usize,
    ) -> Result<Vec<SampledValue>>;
}

/// List tables across schemas, skipping schemas whose listing fails.
pub async fn list_tables_in_schemas<C>(catalog: &C, schemas: &[String]) -> Vec<TableRef>
where
    C: Catalog + ?Sized + Sync,
{
    let mut tables = Vec::new();
    for schema in schemas {
        match catalog.list_tables(schema).await {
            Ok(found) => tables.extend(found),
            Err(err) => {
                tracing::warn!(
                    event = "schema_listing_failed",
                    schema = %schema,
                    error = %err
                );
            }
        }
    }
    tables
}
