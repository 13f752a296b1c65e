use std::collections::BTreeSet;
use std::{env, fs};

use anyhow::{Context, Result};
use dummygen_core::{related_tables, TableRef};
use dummygen_generate::{GenerateOptions, ProcedureGenerator, ProcedureNaming};
use dummygen_introspect::{connect_pool, Catalog, CatalogOptions, PoolSettings, PostgresCatalog};
use sqlx::PgPool;

const FIXTURE_PATH: &str = "fixtures/sql/postgres/010_procedures.sql";

const SCHEMA: &str = "dummygen_proc_it";

fn database_url() -> Option<String> {
    env::var("TEST_DATABASE_URL")
        .or_else(|_| env::var("DATABASE_URL"))
        .ok()
}

async fn run_fixture(pool: &PgPool, path: &str) -> Result<()> {
    let script = fs::read_to_string(path).with_context(|| format!("reading fixture {path}"))?;

    for statement in script.split(';') {
        let sql = statement.trim();
        if sql.is_empty() {
            continue;
        }

        sqlx::query(sql)
            .execute(pool)
            .await
            .with_context(|| format!("executing fixture {path}"))?;
    }

    Ok(())
}

fn t(name: &str) -> TableRef {
    TableRef::new(SCHEMA, name)
}

async fn count_rows(pool: &PgPool, table: &TableRef) -> Result<i64> {
    let sql = format!("select count(*) from {}", table.qualified());
    Ok(sqlx::query_scalar::<_, i64>(&sql).fetch_one(pool).await?)
}

#[tokio::test]
async fn generated_procedures_install_insert_and_clean_up() -> Result<()> {
    let Some(db_url) = database_url() else {
        eprintln!("skipping: set TEST_DATABASE_URL or DATABASE_URL for integration tests");
        return Ok(());
    };

    let pool = connect_pool(&PoolSettings::new(db_url))
        .await
        .context("connecting to Postgres")?;
    run_fixture(&pool, FIXTURE_PATH).await?;

    let catalog = PostgresCatalog::new(
        pool.clone(),
        CatalogOptions {
            schemas: vec![SCHEMA.to_string()],
        },
    );
    assert_eq!(catalog.engine(), "postgres");

    let generator = ProcedureGenerator::new(GenerateOptions {
        naming: ProcedureNaming::Qualified,
        ..GenerateOptions::default()
    });

    let tables = related_tables(&catalog, &t("orders")).await?;
    assert_eq!(
        tables,
        BTreeSet::from([t("customers"), t("orders"), t("tallies")])
    );

    let mut tx = pool.begin().await?;
    for table in &tables {
        let columns = catalog.list_columns(table).await?;
        let pair = generator.generate(&catalog, table, &columns).await?;
        for sql in [&pair.insert_sql, &pair.delete_sql] {
            sqlx::raw_sql(sql.as_str())
                .execute(&mut *tx)
                .await
                .with_context(|| format!("installing procedure for {table}:\n{sql}"))?;
        }
    }
    tx.commit().await?;

    // Enum labels cycle by row number, so three rows cover every label.
    let orders = generator.names(&t("orders"));
    sqlx::raw_sql(&orders.insert_call(3)).execute(&pool).await?;
    let statuses: BTreeSet<String> = sqlx::query_scalar::<_, String>(
        "select status::text from dummygen_proc_it.orders where note like 'Dummy%'",
    )
    .fetch_all(&pool)
    .await?
    .into_iter()
    .collect();
    assert_eq!(
        statuses,
        BTreeSet::from([
            "cancelled".to_string(),
            "new".to_string(),
            "shipped".to_string(),
        ])
    );
    assert_eq!(count_rows(&pool, &t("orders")).await?, 4);

    // Dummy rows go away and the sequence restarts after the surviving row.
    sqlx::raw_sql(&orders.delete_call()).execute(&pool).await?;
    assert_eq!(count_rows(&pool, &t("orders")).await?, 1);
    let next_id = sqlx::query_scalar::<_, i64>(
        "select nextval(pg_get_serial_sequence('dummygen_proc_it.orders', 'id'))",
    )
    .fetch_one(&pool)
    .await?;
    assert_eq!(next_id, 2);

    // Without a text or identity column the delete procedure empties the table.
    let tallies = t("tallies");
    let columns = catalog.list_columns(&tallies).await?;
    let delete = generator.generate_delete(&tallies, &columns);
    assert!(delete.wipes_table);
    assert!(!delete.sql.contains("WHERE"));
    assert!(!delete.sql.contains("setval"));

    let names = generator.names(&tallies);
    sqlx::raw_sql(&names.insert_call(2)).execute(&pool).await?;
    assert_eq!(count_rows(&pool, &tallies).await?, 2);
    sqlx::raw_sql(&names.delete_call()).execute(&pool).await?;
    assert_eq!(count_rows(&pool, &tallies).await?, 0);

    Ok(())
}
