//! Table resolution and the generate, stress and cleanup passes.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use sqlx::PgPool;
use tracing::{error, info, warn};

use dummygen_core::{
    dependency_order, list_tables_in_schemas, related_tables, Catalog, RelationSource,
    Result as CoreResult, TableRef, ValueSource,
};
use dummygen_generate::{GeneratedProcedurePair, ProcedureGenerator};

use crate::config::Settings;
use crate::CliError;

/// Tables in scope: the related set of the target, or every base table of the
/// configured schemas.
pub async fn resolve_tables<C>(
    catalog: &C,
    target: Option<&TableRef>,
    schemas: &[String],
) -> CoreResult<BTreeSet<TableRef>>
where
    C: Catalog + RelationSource + ?Sized + Sync,
{
    match target {
        Some(target) => related_tables(catalog, target).await,
        None => Ok(list_tables_in_schemas(catalog, schemas)
            .await
            .into_iter()
            .collect()),
    }
}

/// Referenced tables first.
pub async fn order_tables<C>(catalog: &C, tables: &BTreeSet<TableRef>) -> CoreResult<Vec<TableRef>>
where
    C: RelationSource + ?Sized + Sync,
{
    let mut parents = BTreeMap::new();
    for table in tables {
        let referenced: BTreeSet<TableRef> =
            catalog.referenced_tables(table).await?.into_iter().collect();
        parents.insert(table.clone(), referenced);
    }
    Ok(dependency_order(tables, &parents))
}

/// Resolve and order the tables for a run.
pub async fn plan_tables<C>(catalog: &C, settings: &Settings) -> Result<Vec<TableRef>, CliError>
where
    C: Catalog + RelationSource + ?Sized + Sync,
{
    let tables = resolve_tables(catalog, settings.target_table.as_ref(), &settings.schemas).await?;
    let ordered = order_tables(catalog, &tables).await?;

    let target = settings
        .target_table
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "*".to_string());
    info!(event = "tables_resolved", target = %target, count = ordered.len());

    Ok(ordered)
}

/// Generate the procedure pair of every table, in the given order.
///
/// Fails when two tables map to the same procedure name, since installing
/// both would let the later definition replace the earlier one.
pub async fn generate_procedures<C>(
    catalog: &C,
    generator: &ProcedureGenerator,
    tables: &[TableRef],
) -> Result<Vec<GeneratedProcedurePair>, CliError>
where
    C: Catalog + ValueSource + ?Sized + Sync,
{
    let mut owners: BTreeMap<String, &TableRef> = BTreeMap::new();
    for table in tables {
        let names = generator.names(table);
        for name in [names.insert, names.delete] {
            if let Some(other) = owners.get(&name).filter(|other| **other != table) {
                return Err(CliError::Config(format!(
                    "procedure name {name} is shared by {other} and {table}; use qualified naming"
                )));
            }
            owners.insert(name, table);
        }
    }

    let mut pairs = Vec::with_capacity(tables.len());
    for table in tables {
        let columns = catalog.list_columns(table).await?;
        let pair = generator.generate(catalog, table, &columns).await?;
        info!(
            event = "procedures_generated",
            table = %table,
            insert = %pair.insert_name,
            delete = %pair.delete_name
        );
        pairs.push(pair);
    }
    Ok(pairs)
}

/// Install every definition inside one transaction.
pub async fn install_procedures(
    pool: &PgPool,
    pairs: &[GeneratedProcedurePair],
) -> Result<(), CliError> {
    let mut tx = pool.begin().await?;

    for pair in pairs {
        for sql in [&pair.insert_sql, &pair.delete_sql] {
            sqlx::raw_sql(sql.as_str())
                .execute(&mut *tx)
                .await
                .map_err(|source| CliError::Install {
                    table: pair.table.to_string(),
                    sql: sql.clone(),
                    source,
                })?;
        }
    }

    tx.commit().await?;
    info!(event = "procedures_installed", count = pairs.len());
    Ok(())
}

/// `CALL` statements of the stress pass, parents first.
pub fn stress_calls(
    generator: &ProcedureGenerator,
    tables: &[TableRef],
    batch_size: u64,
) -> Vec<(TableRef, String)> {
    tables
        .iter()
        .map(|table| (table.clone(), generator.names(table).insert_call(batch_size)))
        .collect()
}

/// Insert `batch_size` rows into every table; each call commits on its own.
pub async fn run_stress(
    pool: &PgPool,
    generator: &ProcedureGenerator,
    tables: &[TableRef],
    batch_size: u64,
) -> Result<(), CliError> {
    let batch_timer = Instant::now();
    info!(event = "stress_started", tables = tables.len(), batch_size = batch_size);

    for (table, call) in stress_calls(generator, tables, batch_size) {
        let timer = Instant::now();
        execute_call(pool, &call).await?;
        info!(
            event = "stress_table_finished",
            table = %table,
            rows = batch_size,
            elapsed_ms = timer.elapsed().as_millis()
        );
    }

    info!(
        event = "stress_finished",
        tables = tables.len(),
        elapsed_ms = batch_timer.elapsed().as_millis()
    );
    Ok(())
}

/// One step of the cleanup pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupStep {
    Call { table: TableRef, sql: String },
    /// The delete procedure would remove every row and wipes are not allowed.
    SkipWipe { table: TableRef, procedure: String },
}

/// Cleanup steps in reverse dependency order.
pub async fn plan_cleanup<C>(
    catalog: &C,
    generator: &ProcedureGenerator,
    tables: &[TableRef],
    allow_full_table_wipe: bool,
) -> Result<Vec<CleanupStep>, CliError>
where
    C: Catalog + ?Sized + Sync,
{
    let mut steps = Vec::with_capacity(tables.len());
    for table in tables.iter().rev() {
        let columns = catalog.list_columns(table).await?;
        let names = generator.names(table);
        let wipes_table = generator.delete_marker(&columns).is_none();

        if wipes_table && !allow_full_table_wipe {
            steps.push(CleanupStep::SkipWipe {
                table: table.clone(),
                procedure: names.delete,
            });
        } else {
            steps.push(CleanupStep::Call {
                table: table.clone(),
                sql: names.delete_call(),
            });
        }
    }
    Ok(steps)
}

pub async fn run_cleanup(pool: &PgPool, steps: &[CleanupStep]) -> Result<(), CliError> {
    for step in steps {
        match step {
            CleanupStep::Call { table, sql } => {
                let timer = Instant::now();
                execute_call(pool, sql).await?;
                info!(
                    event = "cleanup_table_finished",
                    table = %table,
                    elapsed_ms = timer.elapsed().as_millis()
                );
            }
            CleanupStep::SkipWipe { table, procedure } => {
                warn!(
                    event = "cleanup_skipped",
                    table = %table,
                    procedure = %procedure,
                    "delete procedure removes every row; set allow_full_table_wipe to run it"
                );
            }
        }
    }
    Ok(())
}

async fn execute_call(pool: &PgPool, sql: &str) -> Result<(), CliError> {
    sqlx::raw_sql(sql).execute(pool).await.map_err(|err| {
        error!(event = "procedure_call_failed", sql = %sql, error = %err);
        CliError::Database(err)
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use dummygen_core::{ColumnDescriptor, MemoryCatalog, SampledValue};
    use dummygen_generate::{GenerateOptions, ProcedureNaming};

    use super::*;

    fn t(name: &str) -> TableRef {
        TableRef::new("public", name)
    }

    fn shop() -> MemoryCatalog {
        MemoryCatalog::new()
            .with_table(
                t("customers"),
                vec![
                    ColumnDescriptor::new("id", "integer"),
                    ColumnDescriptor::new("email", "text"),
                ],
            )
            .with_table(
                t("orders"),
                vec![
                    ColumnDescriptor::new("id", "integer"),
                    ColumnDescriptor::new("customer_id", "integer"),
                    ColumnDescriptor::new("note", "character varying"),
                ],
            )
            .with_table(
                t("order_items"),
                vec![
                    ColumnDescriptor::new("order_id", "integer"),
                    ColumnDescriptor::new("qty", "integer"),
                ],
            )
            .with_table(
                t("audit_log"),
                vec![ColumnDescriptor::new("message", "text")],
            )
            .with_foreign_key(t("orders"), t("customers"))
            .with_foreign_key(t("order_items"), t("orders"))
            .with_values(t("order_items"), "qty", vec![SampledValue::Integer(1)])
    }

    fn generator() -> ProcedureGenerator {
        ProcedureGenerator::new(GenerateOptions {
            naming: ProcedureNaming::Unqualified,
            ..GenerateOptions::default()
        })
    }

    fn public() -> Vec<String> {
        vec!["public".to_string()]
    }

    #[tokio::test]
    async fn target_resolves_to_related_set() {
        let catalog = shop();
        let tables = resolve_tables(&catalog, Some(&t("orders")), &public())
            .await
            .unwrap();
        assert_eq!(
            tables,
            BTreeSet::from([t("customers"), t("order_items"), t("orders")])
        );
    }

    #[tokio::test]
    async fn no_target_lists_every_schema_table() {
        let catalog = shop()
            .with_table(TableRef::new("billing", "invoices"), Vec::new())
            .with_failing_schema("secret");
        let schemas = vec![
            "public".to_string(),
            "secret".to_string(),
            "billing".to_string(),
        ];
        let tables = resolve_tables(&catalog, None, &schemas).await.unwrap();
        assert_eq!(tables.len(), 5);
        assert!(tables.contains(&TableRef::new("billing", "invoices")));
    }

    #[tokio::test]
    async fn parents_are_ordered_first() {
        let catalog = shop();
        let tables = resolve_tables(&catalog, Some(&t("order_items")), &public())
            .await
            .unwrap();
        let ordered = order_tables(&catalog, &tables).await.unwrap();
        assert_eq!(ordered, vec![t("customers"), t("orders"), t("order_items")]);
    }

    #[tokio::test]
    async fn generates_pairs_in_dependency_order() {
        let catalog = shop();
        let ordered = vec![t("customers"), t("orders"), t("order_items")];
        let pairs = generate_procedures(&catalog, &generator(), &ordered)
            .await
            .unwrap();

        let names: Vec<&str> = pairs.iter().map(|pair| pair.insert_name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "insert_dummy_customers",
                "insert_dummy_orders",
                "insert_dummy_order_items"
            ]
        );
        assert!(pairs[1].insert_sql.contains("INSERT INTO public.orders (customer_id, note)"));
        assert!(pairs[2].wipes_table);
    }

    #[tokio::test]
    async fn unqualified_names_collide_across_schemas() {
        let users = vec![ColumnDescriptor::new("login", "text")];
        let auth = TableRef::new("auth", "users");
        let catalog = MemoryCatalog::new()
            .with_table(t("users"), users.clone())
            .with_table(auth.clone(), users);

        let err = generate_procedures(&catalog, &generator(), &[auth.clone(), t("users")])
            .await
            .unwrap_err();
        match err {
            CliError::Config(message) => {
                assert!(message.contains("insert_dummy_users"));
                assert!(message.contains("auth.users"));
                assert!(message.contains("public.users"));
            }
            other => panic!("unexpected error: {other}"),
        }

        let qualified = ProcedureGenerator::new(GenerateOptions {
            naming: ProcedureNaming::Qualified,
            ..GenerateOptions::default()
        });
        let pairs = generate_procedures(&catalog, &qualified, &[auth, t("users")])
            .await
            .unwrap();
        assert_eq!(pairs[0].insert_name, "insert_dummy_auth_users");
        assert_eq!(pairs[1].insert_name, "insert_dummy_public_users");
    }

    #[tokio::test]
    async fn qualified_names_collide_on_underscores() {
        let first = TableRef::new("a_b", "c");
        let second = TableRef::new("a", "b_c");
        let columns = vec![ColumnDescriptor::new("label", "text")];
        let catalog = MemoryCatalog::new()
            .with_table(first.clone(), columns.clone())
            .with_table(second.clone(), columns);
        let qualified = ProcedureGenerator::new(GenerateOptions {
            naming: ProcedureNaming::Qualified,
            ..GenerateOptions::default()
        });

        let err = generate_procedures(&catalog, &qualified, &[first, second])
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::Config(message) if message.contains("insert_dummy_a_b_c")));
    }

    #[tokio::test]
    async fn missing_table_fails_generation() {
        let catalog = shop();
        let err = generate_procedures(&catalog, &generator(), &[t("ghost")])
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::Core(_)));
    }

    #[test]
    fn stress_calls_follow_table_order() {
        let calls = stress_calls(&generator(), &[t("customers"), t("orders")], 1000);
        assert_eq!(
            calls,
            vec![
                (t("customers"), "CALL insert_dummy_customers(1000)".to_string()),
                (t("orders"), "CALL insert_dummy_orders(1000)".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn cleanup_runs_children_first_and_skips_wipes() {
        let catalog = shop();
        let ordered = vec![t("customers"), t("orders"), t("order_items")];

        let steps = plan_cleanup(&catalog, &generator(), &ordered, false)
            .await
            .unwrap();
        assert_eq!(
            steps,
            vec![
                CleanupStep::SkipWipe {
                    table: t("order_items"),
                    procedure: "delete_dummy_order_items".to_string(),
                },
                CleanupStep::Call {
                    table: t("orders"),
                    sql: "CALL delete_dummy_orders()".to_string(),
                },
                CleanupStep::Call {
                    table: t("customers"),
                    sql: "CALL delete_dummy_customers()".to_string(),
                },
            ]
        );

        let allowed = plan_cleanup(&catalog, &generator(), &ordered, true)
            .await
            .unwrap();
        assert!(allowed
            .iter()
            .all(|step| matches!(step, CleanupStep::Call { .. })));
    }
}
