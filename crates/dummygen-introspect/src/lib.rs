//! Catalog readers for dummygen.

pub mod options;
pub mod postgres;

pub use options::{CatalogOptions, PoolSettings};
pub use postgres::{connect_pool, PostgresCatalog};

pub use dummygen_core::{Catalog, RelationSource, ValueSource};
