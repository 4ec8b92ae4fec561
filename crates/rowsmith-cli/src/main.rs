mod commands;
mod registry;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use rowsmith_config::ConfigError;
use rowsmith_core::Error as CoreError;
use rowsmith_generate::GenerationError;
use thiserror::Error;

#[derive(Debug, Error)]
enum CliError {
    #[error("registry error: {0}")]
    Registry(#[from] registry::RegistryError),
    #[error("core error: {0}")]
    Core(#[from] CoreError),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("toml serialization error: {0}")]
    Toml(#[from] toml::ser::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("{0} table(s) were not generated completely")]
    Incomplete(usize),
}

#[derive(Parser, Debug)]
#[command(name = "rowsmith", version, about = "Synthetic data generator for PostgreSQL")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate rows for every configured table.
    Generate(GenerateArgs),
    /// Validate a configuration file.
    Check(CheckArgs),
    /// Show the structure of configured tables.
    Inspect(InspectArgs),
    /// Write a full configuration derived from the live schema.
    Scaffold(ScaffoldArgs),
    /// Print the JSON Schema of the configuration format.
    ConfigSchema,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Configuration file (.json or .toml).
    #[arg(long, short)]
    config: PathBuf,
    /// Output directory for runs.
    #[arg(long, default_value = "runs")]
    run_dir: PathBuf,
    /// Seed overriding `global_settings.seed`.
    #[arg(long)]
    seed: Option<u64>,
    /// Write CSV files instead of inserting into the database.
    #[arg(long, default_value_t = false)]
    dry_run: bool,
    /// CSV directory for dry runs. Defaults to `csv/` inside the run directory.
    #[arg(long, requires = "dry_run")]
    out_dir: Option<PathBuf>,
    /// Read table structure from an `inspect --json` snapshot instead of the database.
    #[arg(long, requires = "dry_run")]
    schema_file: Option<PathBuf>,
    /// Restrict the run to these tables.
    #[arg(long = "table", value_name = "TABLE")]
    tables: Vec<String>,
}

#[derive(Args, Debug)]
struct CheckArgs {
    #[arg(long, short)]
    config: PathBuf,
    /// Skip the checks against the live schema.
    #[arg(long, default_value_t = false)]
    offline: bool,
}

#[derive(Args, Debug)]
struct InspectArgs {
    #[arg(long, short)]
    config: PathBuf,
    /// Tables to show. Defaults to the configured tables, or all base tables.
    #[arg(long = "table", value_name = "TABLE")]
    tables: Vec<String>,
    /// Also write the structures as JSON, usable with `generate --schema-file`.
    #[arg(long, value_name = "PATH")]
    json: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ScaffoldArgs {
    /// Configuration holding at least the `database` section.
    #[arg(long, short)]
    config: PathBuf,
    /// Output path (.json or .toml). Prints JSON to stdout when absent.
    #[arg(long, short)]
    output: Option<PathBuf>,
    /// Rows per table in the scaffolded rules.
    #[arg(long, default_value_t = 100)]
    rows: u64,
    /// Null probability per table in the scaffolded rules.
    #[arg(long, default_value_t = 0.05)]
    null_probability: f64,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Generate(args) => commands::generate::run(args).await,
        Command::Check(args) => commands::check::run(args).await,
        Command::Inspect(args) => commands::inspect::run(args).await,
        Command::Scaffold(args) => commands::scaffold::run(args).await,
        Command::ConfigSchema => commands::print_config_schema(),
    }
}
