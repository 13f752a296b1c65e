//! Insert and delete procedure synthesis.

use tracing::{debug, warn};

use dummygen_core::{quote_ident, quote_literal, ColumnDescriptor, TableRef, ValueSource};

use crate::errors::GenerationError;
use crate::model::{GenerateOptions, GeneratedProcedurePair, ProcedureNaming};
use crate::sampler::sample_values;
use crate::type_defaults::NULL_LITERAL;

const INSERT_PREFIX: &str = "insert_dummy_";
const DELETE_PREFIX: &str = "delete_dummy_";
const ROW_SOURCE: &str = "gs.row_number";

/// Names of the two procedures generated for a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedureNames {
    pub insert: String,
    pub delete: String,
}

impl ProcedureNames {
    pub fn for_table(table: &TableRef, naming: ProcedureNaming) -> Self {
        let stem = match naming {
            ProcedureNaming::Qualified => format!("{}_{}", table.schema, table.name),
            ProcedureNaming::Unqualified => table.name.clone(),
        };
        Self {
            insert: format!("{INSERT_PREFIX}{stem}"),
            delete: format!("{DELETE_PREFIX}{stem}"),
        }
    }

    pub fn insert_call(&self, rows: u64) -> String {
        format!("CALL {}({rows})", quote_ident(&self.insert))
    }

    pub fn delete_call(&self) -> String {
        format!("CALL {}()", quote_ident(&self.delete))
    }
}

/// A column expression that cycles through a fixed list of literals by row ordinal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CyclingExpression {
    values: Vec<String>,
    cast: Option<String>,
}

impl CyclingExpression {
    /// `None` when there is nothing to cycle through.
    pub fn new(values: Vec<String>) -> Option<Self> {
        if values.is_empty() {
            None
        } else {
            Some(Self { values, cast: None })
        }
    }

    /// Cast the whole expression to `type_name`.
    pub fn with_cast(mut self, type_name: impl Into<String>) -> Self {
        self.cast = Some(type_name.into());
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Literal selected for the zero-based row ordinal.
    pub fn value_at(&self, ordinal: u64) -> &str {
        let index = (ordinal % self.values.len() as u64) as usize;
        &self.values[index]
    }

    pub fn to_sql(&self) -> String {
        let expr = match self.values.as_slice() {
            [single] => single.clone(),
            values => {
                let arms: Vec<String> = values
                    .iter()
                    .enumerate()
                    .map(|(index, value)| format!("WHEN {index} THEN {value}"))
                    .collect();
                format!(
                    "CASE (({ROW_SOURCE} - 1) % {}) {} END",
                    values.len(),
                    arms.join(" ")
                )
            }
        };

        match &self.cast {
            Some(type_name) => format!("CAST({expr} AS {type_name})"),
            None => expr,
        }
    }
}

/// Delete procedure text and whether it removes every row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteProcedure {
    pub sql: String,
    pub wipes_table: bool,
}

/// Renders insert/delete procedures for tables.
#[derive(Debug, Clone, Default)]
pub struct ProcedureGenerator {
    opts: GenerateOptions,
}

impl ProcedureGenerator {
    pub fn new(opts: GenerateOptions) -> Self {
        Self { opts }
    }

    pub fn options(&self) -> &GenerateOptions {
        &self.opts
    }

    pub fn names(&self, table: &TableRef) -> ProcedureNames {
        ProcedureNames::for_table(table, self.opts.naming)
    }

    /// Generate both procedures for one table.
    pub async fn generate<S>(
        &self,
        source: &S,
        table: &TableRef,
        columns: &[ColumnDescriptor],
    ) -> Result<GeneratedProcedurePair, GenerationError>
    where
        S: ValueSource + ?Sized + Sync,
    {
        if columns.is_empty() {
            return Err(GenerationError::NoColumns(table.to_string()));
        }

        let names = self.names(table);
        let insert_sql = self.generate_insert(source, table, columns).await?;
        let delete = self.generate_delete(table, columns);

        debug!(
            event = "procedures_generated",
            table = %table,
            insert = %names.insert,
            delete = %names.delete,
            wipes_table = delete.wipes_table
        );

        Ok(GeneratedProcedurePair {
            table: table.clone(),
            insert_name: names.insert,
            delete_name: names.delete,
            insert_sql,
            delete_sql: delete.sql,
            wipes_table: delete.wipes_table,
        })
    }

    /// Insert procedure text; one select expression per non-identity column.
    pub async fn generate_insert<S>(
        &self,
        source: &S,
        table: &TableRef,
        columns: &[ColumnDescriptor],
    ) -> Result<String, GenerationError>
    where
        S: ValueSource + ?Sized + Sync,
    {
        let insertable: Vec<&ColumnDescriptor> =
            columns.iter().filter(|col| !col.is_identity).collect();

        let mut expressions = Vec::with_capacity(insertable.len());
        for column in &insertable {
            expressions.push(self.column_expression(source, table, column).await?);
        }

        self.render_insert(table, &insertable, &expressions)
    }

    /// Render the insert procedure from precomputed column expressions.
    pub fn render_insert(
        &self,
        table: &TableRef,
        columns: &[&ColumnDescriptor],
        expressions: &[String],
    ) -> Result<String, GenerationError> {
        if columns.len() != expressions.len() {
            return Err(GenerationError::ColumnValueMismatch {
                table: table.to_string(),
                columns: columns.len(),
                values: expressions.len(),
            });
        }

        let statement = if columns.is_empty() {
            format!(
                "    FOR i IN 1..n LOOP\n        INSERT INTO {} DEFAULT VALUES;\n    END LOOP;",
                table.qualified()
            )
        } else {
            let names: Vec<String> = columns.iter().map(|col| quote_ident(&col.name)).collect();
            format!(
                "    INSERT INTO {} ({})\n    SELECT\n        {}\n    FROM generate_series(1, n) AS gs(row_number);",
                table.qualified(),
                names.join(", "),
                expressions.join(",\n        ")
            )
        };

        let name = self.names(table).insert;
        Ok(procedure_sql(&name, "n integer", &statement))
    }

    /// Delete procedure text.
    ///
    /// Rows are matched on the first non-identity text column starting with
    /// the dummy prefix. Without such a column the procedure deletes every
    /// row and is flagged as a table wipe.
    pub fn generate_delete(&self, table: &TableRef, columns: &[ColumnDescriptor]) -> DeleteProcedure {
        let qualified = table.qualified();
        let marker = self.delete_marker(columns);

        let mut statements = match marker {
            Some(column) => vec![format!(
                "    DELETE FROM {qualified} WHERE {} LIKE {} ESCAPE '\\';",
                quote_ident(&column.name),
                quote_literal(&prefix_pattern(&self.opts.dummy_prefix))
            )],
            None => {
                warn!(
                    event = "delete_without_predicate",
                    table = %table,
                    "no text column to match dummy rows on; delete procedure removes every row"
                );
                vec![format!("    DELETE FROM {qualified};")]
            }
        };

        if let Some(identity) = columns.iter().find(|col| col.is_identity && col.is_integer()) {
            let ident = quote_ident(&identity.name);
            statements.push(format!(
                "    PERFORM setval(pg_get_serial_sequence({}, {}), COALESCE((SELECT MAX({ident}) FROM {qualified}), 0) + 1, false);",
                quote_literal(&qualified),
                quote_literal(&identity.name)
            ));
        }

        let name = self.names(table).delete;
        DeleteProcedure {
            sql: procedure_sql(&name, "", &statements.join("\n")),
            wipes_table: marker.is_none(),
        }
    }

    /// Column the delete procedure matches dummy rows on, if any.
    pub fn delete_marker<'c>(&self, columns: &'c [ColumnDescriptor]) -> Option<&'c ColumnDescriptor> {
        columns.iter().find(|col| !col.is_identity && col.is_text())
    }

    async fn column_expression<S>(
        &self,
        source: &S,
        table: &TableRef,
        column: &ColumnDescriptor,
    ) -> Result<String, GenerationError>
    where
        S: ValueSource + ?Sized + Sync,
    {
        let candidates = sample_values(source, table, column, self.opts.sample_limit).await?;
        let literals: Vec<String> = candidates
            .iter()
            .map(|candidate| candidate.to_sql(&column.name))
            .collect();

        // Candidates that all render to NULL carry no information.
        if literals.iter().any(|literal| literal != NULL_LITERAL)
            && let Some(expr) = CyclingExpression::new(literals)
        {
            return Ok(expr.with_cast(column.cast_type()).to_sql());
        }

        if column.name.ends_with("_id") {
            return Ok("1".to_string());
        }

        Ok(self
            .opts
            .type_defaults
            .literal_for(&column.declared_type)
            .to_string())
    }
}

/// `LIKE` pattern matching values that start with `prefix` literally.
fn prefix_pattern(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for ch in prefix.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

fn procedure_sql(name: &str, params: &str, body: &str) -> String {
    let tag = dollar_tag(body);
    format!(
        "CREATE OR REPLACE PROCEDURE {}({params})\nLANGUAGE plpgsql\nAS {tag}\nBEGIN\n{body}\nEND;\n{tag};\n",
        quote_ident(name)
    )
}

/// A dollar-quote tag that does not occur in `body`.
fn dollar_tag(body: &str) -> String {
    let mut tag = "$proc$".to_string();
    let mut counter = 0;
    while body.contains(&tag) {
        counter += 1;
        tag = format!("$proc{counter}$");
    }
    tag
}
