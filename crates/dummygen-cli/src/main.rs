mod config;
mod orchestrator;
mod registry;

use std::path::PathBuf;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use dummygen_core::{redact_connection_string, Catalog, Error as CoreError};
use dummygen_generate::{GenerationError, ProcedureGenerator};
use dummygen_introspect::{connect_pool, PostgresCatalog};
use registry::{init_logging, init_run_logging, start_run, write_procedures, RunContext, RunPaths};
use thiserror::Error;
use uuid::Uuid;

use config::{load_file_config, Overrides, Passes, Settings};

#[derive(Debug, Error)]
enum CliError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("core error: {0}")]
    Core(#[from] CoreError),
    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("installing procedures for {table} failed: {source}\n{sql}")]
    Install {
        table: String,
        sql: String,
        #[source]
        source: sqlx::Error,
    },
    #[error("registry error: {0}")]
    Registry(#[from] registry::RegistryError),
    #[error("unsupported engine: {0}")]
    UnsupportedEngine(String),
}

#[derive(Parser, Debug)]
#[command(name = "dummygen", version, about = "Dummy-data procedures for Postgres load tests")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate and install insert/delete procedures.
    Generate(CommonArgs),
    /// Call every insert procedure with the batch size.
    Stress(CommonArgs),
    /// Call every delete procedure, children first.
    Cleanup(CommonArgs),
    /// Run the passes enabled in the `[run]` section.
    Run(CommonArgs),
    /// Print the resolved tables in dependency order.
    Tables(CommonArgs),
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Generate(_) => "generate",
            Command::Stress(_) => "stress",
            Command::Cleanup(_) => "cleanup",
            Command::Run(_) => "run",
            Command::Tables(_) => "tables",
        }
    }

    fn args(&self) -> &CommonArgs {
        match self {
            Command::Generate(args)
            | Command::Stress(args)
            | Command::Cleanup(args)
            | Command::Run(args)
            | Command::Tables(args) => args,
        }
    }

    fn passes(&self, settings: &Settings) -> Passes {
        let only = |generate, stress, cleanup| Passes {
            generate,
            stress,
            cleanup,
        };
        match self {
            Command::Generate(_) => only(true, false, false),
            Command::Stress(_) => only(false, true, false),
            Command::Cleanup(_) => only(false, false, true),
            Command::Run(_) => settings.passes,
            Command::Tables(_) => only(false, false, false),
        }
    }
}

#[derive(Args, Debug, Clone)]
struct CommonArgs {
    /// Configuration file (defaults to dummygen.toml when present).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Database connection string.
    #[arg(long, value_name = "CONNECTION_STRING", env = "DATABASE_URL", hide_env_values = true)]
    conn: Option<String>,
    /// Schema name(s) to include.
    #[arg(long, value_name = "SCHEMA")]
    schema: Vec<String>,
    /// Target table (`schema.table` or `table`); all tables when omitted.
    #[arg(long, value_name = "TABLE")]
    table: Option<String>,
    /// Rows inserted per table by the stress pass.
    #[arg(long)]
    batch_size: Option<u64>,
    /// Let cleanup call delete procedures that remove every row.
    #[arg(long, default_value_t = false)]
    allow_full_table_wipe: bool,
    /// Output directory for runs.
    #[arg(long)]
    run_dir: Option<PathBuf>,
}

impl CommonArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            url: self.conn.clone(),
            schemas: self.schema.clone(),
            target_table: self.table.clone(),
            batch_size: self.batch_size,
            allow_full_table_wipe: self.allow_full_table_wipe,
            run_dir: self.run_dir.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    let args = cli.command.args();
    let file = load_file_config(args.config.as_deref())?;
    let settings = Settings::resolve(file, args.overrides())?;
    let engine = detect_engine(&settings.database_url)?;

    match &cli.command {
        Command::Tables(_) => run_tables(&settings).await,
        command => run_passes(command, settings, engine).await,
    }
}

async fn run_tables(settings: &Settings) -> Result<(), CliError> {
    init_logging(None)?;

    let pool = connect_pool(&settings.pool_settings()).await?;
    let catalog = PostgresCatalog::new(pool.clone(), settings.catalog_options());
    let tables = orchestrator::plan_tables(&catalog, settings).await?;
    pool.close().await;

    for table in tables {
        println!("{table}");
    }
    Ok(())
}

async fn run_passes(command: &Command, settings: Settings, engine: &str) -> Result<(), CliError> {
    let passes = command.passes(&settings);
    let run_id = Uuid::new_v4().to_string();
    let run_ctx = RunContext {
        run_id: run_id.clone(),
        started_at: chrono::Utc::now(),
        command: command.name().to_string(),
        engine: engine.to_string(),
        connection: redact_connection_string(&settings.database_url),
        settings,
    };

    let run_paths = start_run(&run_ctx)?;
    init_run_logging(&run_paths.logs_path)?;

    tracing::info!(
        event = "run_started",
        run_id = %run_id,
        command = command.name(),
        engine = %engine,
        connection = %run_ctx.connection.redacted
    );

    let timer = Instant::now();
    let result = execute_passes(&run_ctx.settings, passes, &run_paths).await;
    let duration_ms = timer.elapsed().as_millis();

    match &result {
        Ok(()) => {
            tracing::info!(event = "run_finished", status = "success", duration_ms = duration_ms);
        }
        Err(err) => {
            tracing::error!(
                event = "run_finished",
                status = "failure",
                duration_ms = duration_ms,
                error = %err
            );
        }
    }

    result
}

async fn execute_passes(
    settings: &Settings,
    passes: Passes,
    run_paths: &RunPaths,
) -> Result<(), CliError> {
    let pool = connect_pool(&settings.pool_settings()).await?;
    let catalog = PostgresCatalog::new(pool.clone(), settings.catalog_options());
    tracing::debug!(event = "catalog_ready", engine = catalog.engine());

    let tables = orchestrator::plan_tables(&catalog, settings).await?;
    let generator = ProcedureGenerator::new(settings.generate_options(&tables));
    tracing::info!(
        event = "naming_resolved",
        naming = ?generator.options().naming,
        tables = tables.len()
    );

    if passes.generate {
        tracing::info!(event = "generate_started", tables = tables.len());
        let pairs = orchestrator::generate_procedures(&catalog, &generator, &tables).await?;
        write_procedures(run_paths, &pairs)?;
        tracing::info!(
            event = "procedures_written",
            path = %run_paths.procedures_path.display()
        );
        orchestrator::install_procedures(&pool, &pairs).await?;
    }

    if passes.stress {
        orchestrator::run_stress(&pool, &generator, &tables, settings.batch_size).await?;
    }

    if passes.cleanup {
        tracing::info!(event = "cleanup_started", tables = tables.len());
        let steps = orchestrator::plan_cleanup(
            &catalog,
            &generator,
            &tables,
            settings.allow_full_table_wipe,
        )
        .await?;
        orchestrator::run_cleanup(&pool, &steps).await?;
    }

    pool.close().await;
    Ok(())
}

fn detect_engine(conn: &str) -> Result<&'static str, CliError> {
    if conn.starts_with("postgres://") || conn.starts_with("postgresql://") {
        Ok("postgres")
    } else {
        Err(CliError::UnsupportedEngine(
            redact_connection_string(conn).redacted,
        ))
    }
}
