use thiserror::Error;

/// Core error type shared across dummygen crates.
#[derive(Debug, Error)]
pub enum Error {
    /// Database error or adapter failure.
    #[error("database error: {0}")]
    Db(String),
    /// Configuration could not be resolved into something usable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Convenience alias for results returned by dummygen crates.
pub type Result<T> = std::result::Result<T, Error>;
