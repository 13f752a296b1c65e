//! Core contracts and helpers for dummygen.
//!
//! This crate defines the table/column types shared by the catalog reader,
//! the procedure generator and the CLI, the catalog traits they talk through,
//! and the relation traversal that decides which tables belong to a run.

pub mod catalog;
pub mod error;
pub mod graph;
pub mod ident;
pub mod memory;
pub mod redaction;
pub mod relations;

pub use catalog::{
    list_tables_in_schemas, Catalog, ColumnDescriptor, RelationSource, SampledValue, TableRef,
    ValueSource,
};
pub use error::{Error, Result};
pub use graph::dependency_order;
pub use ident::{quote_ident, quote_literal, quote_qualified};
pub use memory::MemoryCatalog;
pub use redaction::{redact_connection_string, RedactedConnection};
pub use relations::{close_over_foreign_keys, logical_column_name, related_tables, singularize};

/// Schema used when a table is named without one.
pub const DEFAULT_SCHEMA: &str = "public";
