use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use dummygen_core::{TableRef, DEFAULT_SCHEMA};
use dummygen_generate::{GenerateOptions, ProcedureNaming, TypeDefaults};
use dummygen_introspect::{CatalogOptions, PoolSettings};

use crate::CliError;

/// Configuration file consulted when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "dummygen.toml";

/// On-disk configuration; every section and key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub database: DatabaseSection,
    pub run: RunSection,
    pub sampling: SamplingSection,
    pub procedures: ProceduresSection,
    pub type_defaults: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseSection {
    pub url: Option<String>,
    pub schemas: Vec<String>,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    /// `0` disables the timeout.
    pub statement_timeout_ms: u64,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            url: None,
            schemas: vec![DEFAULT_SCHEMA.to_string()],
            max_connections: 5,
            acquire_timeout_secs: 10,
            statement_timeout_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunSection {
    pub target_table: Option<String>,
    pub batch_size: u64,
    pub generate: bool,
    pub stress: bool,
    pub cleanup: bool,
    pub allow_full_table_wipe: bool,
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            target_table: None,
            batch_size: 1_000_000,
            generate: true,
            stress: false,
            cleanup: true,
            allow_full_table_wipe: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SamplingSection {
    pub limit: usize,
    pub dummy_prefix: String,
}

impl Default for SamplingSection {
    fn default() -> Self {
        Self {
            limit: 5,
            dummy_prefix: "Dummy".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProceduresSection {
    pub naming: NamingMode,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamingMode {
    /// Qualified when the configured schemas or the resolved tables span
    /// more than one schema.
    #[default]
    Auto,
    Qualified,
    Unqualified,
}

/// Values given on the command line; `None` keeps the file value.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub url: Option<String>,
    pub schemas: Vec<String>,
    pub target_table: Option<String>,
    pub batch_size: Option<u64>,
    pub allow_full_table_wipe: bool,
    pub run_dir: Option<PathBuf>,
}

/// Passes executed by `run`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Passes {
    pub generate: bool,
    pub stress: bool,
    pub cleanup: bool,
}

/// Fully resolved configuration handed to the orchestrator.
#[derive(Debug, Clone, Serialize)]
pub struct Settings {
    #[serde(skip)]
    pub database_url: String,
    pub schemas: Vec<String>,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub statement_timeout_ms: u64,
    pub target_table: Option<TableRef>,
    pub batch_size: u64,
    pub passes: Passes,
    pub allow_full_table_wipe: bool,
    pub sample_limit: usize,
    pub dummy_prefix: String,
    pub naming: NamingMode,
    pub type_defaults: BTreeMap<String, String>,
    pub run_dir: PathBuf,
}

impl Settings {
    pub fn resolve(file: FileConfig, overrides: Overrides) -> Result<Self, CliError> {
        let FileConfig {
            database,
            run,
            sampling,
            procedures,
            type_defaults,
        } = file;

        let database_url = overrides
            .url
            .or(database.url)
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                CliError::Config(
                    "connection string is required (--conn, DATABASE_URL or [database].url)"
                        .to_string(),
                )
            })?;

        let schemas = if overrides.schemas.is_empty() {
            database.schemas
        } else {
            overrides.schemas
        };
        if schemas.is_empty() || schemas.iter().any(|schema| schema.trim().is_empty()) {
            return Err(CliError::Config(
                "at least one non-empty schema must be configured".to_string(),
            ));
        }

        let target_table = overrides
            .target_table
            .or(run.target_table)
            .filter(|table| !table.trim().is_empty())
            .map(|table| TableRef::parse(&table, &schemas[0]))
            .transpose()?;

        let batch_size = overrides.batch_size.unwrap_or(run.batch_size);
        if batch_size == 0 {
            return Err(CliError::Config("batch_size must be positive".to_string()));
        }
        // Insert procedures take `n integer`.
        if batch_size > i32::MAX as u64 {
            return Err(CliError::Config(format!(
                "batch_size must not exceed {}",
                i32::MAX
            )));
        }
        if sampling.limit == 0 {
            return Err(CliError::Config(
                "sampling.limit must be positive".to_string(),
            ));
        }
        if database.max_connections == 0 {
            return Err(CliError::Config(
                "max_connections must be positive".to_string(),
            ));
        }

        Ok(Self {
            database_url,
            schemas,
            max_connections: database.max_connections,
            acquire_timeout_secs: database.acquire_timeout_secs,
            statement_timeout_ms: database.statement_timeout_ms,
            target_table,
            batch_size,
            passes: Passes {
                generate: run.generate,
                stress: run.stress,
                cleanup: run.cleanup,
            },
            allow_full_table_wipe: overrides.allow_full_table_wipe || run.allow_full_table_wipe,
            sample_limit: sampling.limit,
            dummy_prefix: sampling.dummy_prefix,
            naming: procedures.naming,
            type_defaults,
            run_dir: overrides.run_dir.unwrap_or_else(|| PathBuf::from("runs")),
        })
    }

    pub fn pool_settings(&self) -> PoolSettings {
        PoolSettings {
            url: self.database_url.clone(),
            max_connections: self.max_connections,
            acquire_timeout: Duration::from_secs(self.acquire_timeout_secs),
            statement_timeout: (self.statement_timeout_ms > 0)
                .then(|| Duration::from_millis(self.statement_timeout_ms)),
        }
    }

    pub fn catalog_options(&self) -> CatalogOptions {
        CatalogOptions {
            schemas: self.schemas.clone(),
        }
    }

    /// Procedure naming for a run over `tables`.
    ///
    /// Foreign keys can pull tables from schemas outside the configured
    /// list, so `auto` counts the schemas of the resolved tables as well.
    pub fn procedure_naming(&self, tables: &[TableRef]) -> ProcedureNaming {
        match self.naming {
            NamingMode::Auto => {
                let spanned: BTreeSet<&str> =
                    tables.iter().map(|table| table.schema.as_str()).collect();
                ProcedureNaming::for_schemas(self.schemas.len().max(spanned.len()))
            }
            NamingMode::Qualified => ProcedureNaming::Qualified,
            NamingMode::Unqualified => ProcedureNaming::Unqualified,
        }
    }

    pub fn generate_options(&self, tables: &[TableRef]) -> GenerateOptions {
        let type_defaults = TypeDefaults::builtin(&self.dummy_prefix)
            .with_overrides(self.type_defaults.clone());
        GenerateOptions {
            sample_limit: self.sample_limit,
            dummy_prefix: self.dummy_prefix.clone(),
            naming: self.procedure_naming(tables),
            type_defaults,
        }
    }
}

/// Load the configuration file.
///
/// An explicit path must exist; the default path is optional.
pub fn load_file_config(path: Option<&Path>) -> Result<FileConfig, CliError> {
    let (path, required) = match path {
        Some(path) => (path, true),
        None => (Path::new(DEFAULT_CONFIG_PATH), false),
    };

    if !path.exists() {
        if required {
            return Err(CliError::Config(format!(
                "config file {} not found",
                path.display()
            )));
        }
        return Ok(FileConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|err| CliError::Config(format!("reading {}: {err}", path.display())))?;
    parse_file_config(&content)
        .map_err(|err| CliError::Config(format!("parsing {}: {err}", path.display())))
}

pub fn parse_file_config(content: &str) -> Result<FileConfig, toml::de::Error> {
    toml::from_str(content)
}
