//! In-memory catalog used by tests and offline tooling.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;

use crate::catalog::{Catalog, ColumnDescriptor, RelationSource, SampledValue, TableRef, ValueSource};
use crate::error::{Error, Result};

/// A catalog assembled by hand rather than read from a store.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    tables: BTreeMap<TableRef, Vec<ColumnDescriptor>>,
    foreign_keys: Vec<(TableRef, TableRef)>,
    enums: BTreeMap<(String, String), Vec<String>>,
    checks: BTreeMap<TableRef, Vec<String>>,
    values: BTreeMap<(TableRef, String), Vec<SampledValue>>,
    failing_schemas: BTreeSet<String>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, table: TableRef, columns: Vec<ColumnDescriptor>) -> Self {
        self.tables.insert(table, columns);
        self
    }

    /// Register `child -> parent`; both tables are created if missing.
    pub fn with_foreign_key(mut self, child: TableRef, parent: TableRef) -> Self {
        self.tables.entry(child.clone()).or_default();
        self.tables.entry(parent.clone()).or_default();
        self.foreign_keys.push((child, parent));
        self
    }

    pub fn with_enum(mut self, schema: &str, name: &str, labels: &[&str]) -> Self {
        self.enums.insert(
            (schema.to_string(), name.to_string()),
            labels.iter().map(|label| label.to_string()).collect(),
        );
        self
    }

    pub fn with_check(mut self, table: TableRef, definition: &str) -> Self {
        self.checks
            .entry(table)
            .or_default()
            .push(definition.to_string());
        self
    }

    /// Observed values for a column, most frequent first.
    pub fn with_values(mut self, table: TableRef, column: &str, values: Vec<SampledValue>) -> Self {
        self.values.insert((table, column.to_string()), values);
        self
    }

    /// Make listing of `schema` fail, as a privilege error would.
    pub fn with_failing_schema(mut self, schema: &str) -> Self {
        self.failing_schemas.insert(schema.to_string());
        self
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    fn engine(&self) -> &'static str {
        "memory"
    }

    async fn list_tables(&self, schema: &str) -> Result<Vec<TableRef>> {
        if self.failing_schemas.contains(schema) {
            return Err(Error::Db(format!(
                "permission denied for schema {schema}"
            )));
        }
        Ok(self
            .tables
            .keys()
            .filter(|table| table.schema == schema)
            .cloned()
            .collect())
    }

    async fn list_columns(&self, table: &TableRef) -> Result<Vec<ColumnDescriptor>> {
        self.tables
            .get(table)
            .cloned()
            .ok_or_else(|| Error::Db(format!("relation {table} does not exist")))
    }
}

#[async_trait]
impl RelationSource for MemoryCatalog {
    async fn tables_with_column(&self, column: &str) -> Result<Vec<TableRef>> {
        Ok(self
            .tables
            .iter()
            .filter(|(_, columns)| columns.iter().any(|col| col.name == column))
            .map(|(table, _)| table.clone())
            .collect())
    }

    async fn referenced_tables(&self, table: &TableRef) -> Result<Vec<TableRef>> {
        let parents: BTreeSet<TableRef> = self
            .foreign_keys
            .iter()
            .filter(|(child, _)| child == table)
            .map(|(_, parent)| parent.clone())
            .collect();
        Ok(parents.into_iter().collect())
    }

    async fn referencing_tables(&self, table: &TableRef) -> Result<Vec<TableRef>> {
        let children: BTreeSet<TableRef> = self
            .foreign_keys
            .iter()
            .filter(|(_, parent)| parent == table)
            .map(|(child, _)| child.clone())
            .collect();
        Ok(children.into_iter().collect())
    }
}

#[async_trait]
impl ValueSource for MemoryCatalog {
    async fn enum_labels(&self, column: &ColumnDescriptor) -> Result<Option<Vec<String>>> {
        Ok(self
            .enums
            .get(&(column.udt_schema.clone(), column.udt_name.clone()))
            .cloned())
    }

    async fn check_definitions(&self, table: &TableRef) -> Result<Vec<String>> {
        Ok(self.checks.get(table).cloned().unwrap_or_default())
    }

    async fn most_common_values(
        &self,
        table: &TableRef,
        column: &ColumnDescriptor,
        limit: usize,
    ) -> Result<Vec<SampledValue>> {
        Ok(self
            .values
            .get(&(table.clone(), column.name.clone()))
            .map(|values| values.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::list_tables_in_schemas;

    #[tokio::test]
    async fn schema_listing_skips_failing_schema() {
        let catalog = MemoryCatalog::new()
            .with_table(TableRef::new("public", "orders"), Vec::new())
            .with_table(TableRef::new("audit", "events"), Vec::new())
            .with_table(TableRef::new("billing", "invoices"), Vec::new())
            .with_failing_schema("audit");
        assert_eq!(catalog.engine(), "memory");

        let schemas = vec![
            "public".to_string(),
            "audit".to_string(),
            "billing".to_string(),
        ];
        let tables = list_tables_in_schemas(&catalog, &schemas).await;
        assert_eq!(
            tables,
            vec![
                TableRef::new("public", "orders"),
                TableRef::new("billing", "invoices"),
            ]
        );
    }
}
