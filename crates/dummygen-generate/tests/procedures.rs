use dummygen_core::{
    related_tables, Catalog, ColumnDescriptor, MemoryCatalog, SampledValue, TableRef,
};
use dummygen_generate::{GenerateOptions, ProcedureGenerator, ProcedureNaming};

fn t(name: &str) -> TableRef {
    TableRef::new("public", name)
}

fn catalog() -> MemoryCatalog {
    MemoryCatalog::new()
        .with_table(
            t("customers"),
            vec![
                ColumnDescriptor::new("id", "integer"),
                ColumnDescriptor::new("name", "character varying"),
                ColumnDescriptor::new("tier", "text"),
                ColumnDescriptor::new("signed_up", "date"),
            ],
        )
        .with_table(
            t("orders"),
            vec![
                ColumnDescriptor::new("id", "bigint"),
                ColumnDescriptor::new("customer_id", "integer"),
                ColumnDescriptor::new("status", "USER-DEFINED").with_udt("public", "order_status"),
            ],
        )
        .with_table(
            t("order_items"),
            vec![
                ColumnDescriptor::new("order_id", "bigint"),
                ColumnDescriptor::new("sku", "text"),
            ],
        )
        .with_table(t("warehouses"), vec![ColumnDescriptor::new("code", "text")])
        .with_foreign_key(t("orders"), t("customers"))
        .with_foreign_key(t("order_items"), t("orders"))
        .with_check(t("customers"), "CHECK (tier IN ('gold', 'silver'))")
        .with_enum("public", "order_status", &["new", "shipped"])
        .with_values(
            t("customers"),
            "name",
            vec![SampledValue::Text("Ana".to_string())],
        )
}

fn generator() -> ProcedureGenerator {
    ProcedureGenerator::new(GenerateOptions {
        naming: ProcedureNaming::Unqualified,
        ..GenerateOptions::default()
    })
}

#[tokio::test]
async fn renders_complete_procedure_text() {
    let catalog = catalog();
    let columns = catalog.list_columns(&t("customers")).await.unwrap();
    let pair = generator()
        .generate(&catalog, &t("customers"), &columns)
        .await
        .unwrap();

    let expected_insert = "\
CREATE OR REPLACE PROCEDURE insert_dummy_customers(n integer)
LANGUAGE plpgsql
AS $proc$
BEGIN
    INSERT INTO public.customers (name, tier, signed_up)
    SELECT
        CAST('Ana' AS pg_catalog.varchar),
        CAST(CASE ((gs.row_number - 1) % 2) WHEN 0 THEN 'gold' WHEN 1 THEN 'silver' END AS pg_catalog.text),
        CURRENT_DATE
    FROM generate_series(1, n) AS gs(row_number);
END;
$proc$;
";
    assert_eq!(pair.insert_sql, expected_insert);

    let expected_delete = "\
CREATE OR REPLACE PROCEDURE delete_dummy_customers()
LANGUAGE plpgsql
AS $proc$
BEGIN
    DELETE FROM public.customers WHERE name LIKE 'Dummy%' ESCAPE '\\';
    PERFORM setval(pg_get_serial_sequence('public.customers', 'id'), COALESCE((SELECT MAX(id) FROM public.customers), 0) + 1, false);
END;
$proc$;
";
    assert_eq!(pair.delete_sql, expected_delete);
    assert!(!pair.wipes_table);
}

#[tokio::test]
async fn every_related_table_gets_a_pair() {
    let catalog = catalog();
    let tables = related_tables(&catalog, &t("orders")).await.unwrap();
    assert!(!tables.contains(&t("warehouses")));

    let generator = generator();
    let mut wipes = Vec::new();
    for table in &tables {
        let columns = catalog.list_columns(table).await.unwrap();
        let pair = generator.generate(&catalog, table, &columns).await.unwrap();
        assert_eq!(pair.insert_name, format!("insert_dummy_{}", table.name));
        if pair.wipes_table {
            wipes.push(pair.table.name.clone());
        }
    }

    // orders has no text column; order_items has `sku`.
    assert_eq!(wipes, vec!["orders".to_string()]);
}
