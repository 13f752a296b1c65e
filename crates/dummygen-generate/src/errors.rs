use thiserror::Error;

/// Errors emitted while generating procedures for a table.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("{table}: {columns} insert columns but {values} value expressions")]
    ColumnValueMismatch {
        table: String,
        columns: usize,
        values: usize,
    },
    #[error("{0}: table has no columns")]
    NoColumns(String),
    #[error(transparent)]
    Core(#[from] dummygen_core::Error),
}
