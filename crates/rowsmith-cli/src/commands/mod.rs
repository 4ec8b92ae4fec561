pub mod check;
pub mod generate;
pub mod inspect;
pub mod scaffold;

use rowsmith_config::{DatabaseConfig, config_json_schema};
use rowsmith_postgres::{PoolSettings, PostgresAdapter, connect};

use crate::CliError;

async fn open_adapter(database: &DatabaseConfig) -> Result<PostgresAdapter, CliError> {
    let pool = connect(database, &PoolSettings::default()).await?;
    Ok(PostgresAdapter::new(pool))
}

pub fn print_config_schema() -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(&config_json_schema())?);
    Ok(())
}
