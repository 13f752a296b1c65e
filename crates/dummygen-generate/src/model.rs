use serde::{Deserialize, Serialize};

use dummygen_core::TableRef;

use crate::type_defaults::TypeDefaults;

/// Options for the procedure generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateOptions {
    /// Maximum number of sampled values cycled per column.
    pub sample_limit: usize,
    /// Marker prefix of generated text values; the delete procedure matches on it.
    pub dummy_prefix: String,
    /// How procedure names are derived from table names.
    pub naming: ProcedureNaming,
    /// Fallback literals per declared type.
    pub type_defaults: TypeDefaults,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            sample_limit: 5,
            dummy_prefix: "Dummy".to_string(),
            naming: ProcedureNaming::Qualified,
            type_defaults: TypeDefaults::default(),
        }
    }
}

/// Procedure naming mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcedureNaming {
    /// `insert_dummy_<schema>_<table>`
    Qualified,
    /// `insert_dummy_<table>`
    Unqualified,
}

impl ProcedureNaming {
    /// Qualified names once more than one schema is in scope.
    pub fn for_schemas(count: usize) -> Self {
        if count > 1 {
            ProcedureNaming::Qualified
        } else {
            ProcedureNaming::Unqualified
        }
    }
}

/// Insert and delete procedure definitions for one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedProcedurePair {
    pub table: TableRef,
    pub insert_name: String,
    pub delete_name: String,
    pub insert_sql: String,
    pub delete_sql: String,
    /// The delete procedure has no predicate and removes every row.
    pub wipes_table: bool,
}
