use rowsmith_config::{
    ConfigFormat, GenerationConfig, ScaffoldOptions, load_config, scaffold_config,
};
use rowsmith_generate::SchemaSource;
use tracing::{info, warn};

use crate::registry::init_logging;
use crate::{CliError, ScaffoldArgs};

use super::open_adapter;

pub async fn run(args: ScaffoldArgs) -> Result<(), CliError> {
    if !(0.0..=1.0).contains(&args.null_probability) {
        return Err(CliError::InvalidConfig(format!(
            "--null-probability must be within [0, 1], got {}",
            args.null_probability
        )));
    }

    let loaded = load_config(&args.config)?;
    init_logging(&loaded.config.global_settings.log_level, None)?;
    let database = loaded.config.database.clone();

    let adapter = open_adapter(&database).await?;
    let names = if loaded.config.tables.is_empty() {
        adapter.list_tables(&database.schema).await?
    } else {
        loaded
            .config
            .tables
            .iter()
            .map(|rule| rule.table_name.clone())
            .collect()
    };

    let mut tables = Vec::with_capacity(names.len());
    for name in &names {
        match adapter.table_schema(&database.schema, name).await {
            Ok(table) => tables.push(table),
            Err(err) => warn!(table = %name, error = %err, "table skipped"),
        }
    }

    let options = ScaffoldOptions {
        rows_to_generate: args.rows,
        null_probability: args.null_probability,
    };
    let keep_settings = loaded
        .raw
        .get("global_settings")
        .is_some_and(|value| !value.is_null());
    let config = scaffold_config(
        database,
        keep_settings.then(|| loaded.config.global_settings.clone()),
        &tables,
        &options,
    );

    match &args.output {
        Some(path) => {
            std::fs::write(path, render(&config, ConfigFormat::from_path(path)?)?)?;
            info!(path = %path.display(), tables = config.tables.len(), "configuration scaffolded");
            println!("wrote {} table(s) to {}", config.tables.len(), path.display());
        }
        None => println!("{}", render(&config, ConfigFormat::Json)?),
    }
    Ok(())
}

fn render(config: &GenerationConfig, format: ConfigFormat) -> Result<String, CliError> {
    Ok(match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
    })
}
