use std::time::Duration;

/// Options that scope what the catalog reader sees.
#[derive(Debug, Clone)]
pub struct CatalogOptions {
    /// Schemas searched for tables, naming matches and inbound foreign keys.
    pub schemas: Vec<String>,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            schemas: vec![dummygen_core::DEFAULT_SCHEMA.to_string()],
        }
    }
}

/// Connection pool settings.
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    /// Applied as `statement_timeout` on every pooled connection when set.
    pub statement_timeout: Option<Duration>,
}

impl PoolSettings {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(10),
            statement_timeout: None,
        }
    }
}
